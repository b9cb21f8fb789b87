use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single scalar returned by a database driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SqlValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact NUMERIC / DECIMAL value
    Decimal(Decimal),
    Text(String),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Runtime type label used for result columns.
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "boolean",
            SqlValue::Int(_) | SqlValue::Float(_) | SqlValue::Decimal(_) => "number",
            SqlValue::Text(_) => "string",
            SqlValue::DateTime(_) => "datetime",
            SqlValue::Bytes(_) => "binary",
        }
    }

    /// Plain, locale independent string form. Used by CSV export and JSON.
    pub fn to_native_string(&self) -> String {
        match self {
            SqlValue::Null => String::new(),
            SqlValue::Bool(b) => b.to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Float(f) => f.to_string(),
            SqlValue::Decimal(d) => d.to_string(),
            SqlValue::Text(s) => s.clone(),
            SqlValue::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
            SqlValue::Bytes(bytes) => format!("0x{}", hex::encode_upper(bytes)),
        }
    }

    /// Reverses the string form used on the wire for cells of a column
    /// labelled `type_name`. Anything that does not parse is kept as is.
    fn restore(self, type_name: &str) -> Self {
        let SqlValue::Text(text) = self else {
            return self;
        };
        let restored = match type_name {
            "datetime" => NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT)
                .ok()
                .map(SqlValue::DateTime),
            "binary" => text
                .strip_prefix("0x")
                .and_then(|digits| hex::decode(digits).ok())
                .map(SqlValue::Bytes),
            "number" => text.parse::<Decimal>().ok().map(SqlValue::Decimal),
            _ => None,
        };
        restored.unwrap_or(SqlValue::Text(text))
    }
}

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => SqlValue::Null,
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SqlValue::Null => serializer.serialize_unit(),
            SqlValue::Bool(b) => serializer.serialize_bool(*b),
            SqlValue::Int(i) => serializer.serialize_i64(*i),
            // JSON has no NaN/Infinity; serde_json writes them as null
            SqlValue::Float(f) => serializer.serialize_f64(*f),
            SqlValue::Text(s) => serializer.serialize_str(s),
            // Strings keep every digit; JSON numbers would go through f64
            SqlValue::Decimal(_) | SqlValue::DateTime(_) | SqlValue::Bytes(_) => {
                serializer.serialize_str(&self.to_native_string())
            }
        }
    }
}

struct SqlValueVisitor;

impl<'de> Visitor<'de> for SqlValueVisitor {
    type Value = SqlValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON scalar")
    }

    fn visit_unit<E: de::Error>(self) -> Result<SqlValue, E> {
        Ok(SqlValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<SqlValue, E> {
        Ok(SqlValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<SqlValue, D::Error> {
        d.deserialize_any(SqlValueVisitor)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<SqlValue, E> {
        Ok(SqlValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<SqlValue, E> {
        Ok(SqlValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<SqlValue, E> {
        Ok(i64::try_from(v)
            .map(SqlValue::Int)
            .unwrap_or(SqlValue::Float(v as f64)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<SqlValue, E> {
        Ok(SqlValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<SqlValue, E> {
        Ok(SqlValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<SqlValue, E> {
        Ok(SqlValue::Text(v))
    }
}

impl<'de> Deserialize<'de> for SqlValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SqlValueVisitor)
    }
}

/// One result row as an ordered (column name, value) association list.
///
/// Serializes as a JSON object whose key order follows the column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(Vec<(String, SqlValue)>);

impl Row {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.0.push((column.into(), value.into()));
    }

    /// Builder-style push, handy for assembling rows in tests and fakes.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, value);
        self
    }

    /// First value stored under `column`.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.0.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.0.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct RowVisitor;

impl<'de> Visitor<'de> for RowVisitor {
    type Value = Row;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object of column values")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Row, M::Error> {
        let mut row = Row::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, value)) = access.next_entry::<String, SqlValue>()? {
            row.push(name, value);
        }
        Ok(row)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RowVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Canonical tabular result returned for every executed statement.
///
/// Decimal, datetime and binary cells travel as strings; deserializing puts
/// them back into their typed form using the column type labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "TabularResultWire")]
pub struct TabularResult {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<Row>,
    pub row_count: u64,
    /// Milliseconds
    pub execution_time: u64,
}

impl TabularResult {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TabularResultWire {
    columns: Vec<ResultColumn>,
    rows: Vec<Row>,
    row_count: u64,
    execution_time: u64,
}

impl From<TabularResultWire> for TabularResult {
    fn from(wire: TabularResultWire) -> Self {
        let TabularResultWire {
            columns,
            rows,
            row_count,
            execution_time,
        } = wire;
        let rows = rows
            .into_iter()
            .map(|Row(cells)| {
                Row(cells
                    .into_iter()
                    .map(|(name, value)| {
                        let value = match columns.iter().find(|c| c.name == name) {
                            Some(column) => value.restore(&column.type_name),
                            None => value,
                        };
                        (name, value)
                    })
                    .collect())
            })
            .collect();
        Self {
            columns,
            rows,
            row_count,
            execution_time,
        }
    }
}
