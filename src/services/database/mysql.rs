// MySQL sessions over mysql_async, one connection per session
use crate::models::{AuthenticationMode, ConnectionProfile, Row, SqlValue, TableInfo, TableKind};
use crate::services::database::adapter::{DatabaseSession, DriverError, Recordset};
use chrono::{NaiveDate, NaiveDateTime};
use mysql_async::consts::ColumnType;
use mysql_async::{prelude::*, Column, Conn, OptsBuilder, Value as MySqlValue};
use rust_decimal::Decimal;
use std::time::Duration;

/// Character set number MySQL uses for binary strings
const BINARY_CHARSET: u16 = 63;

pub struct MySQLSession {
    conn: Conn,
}

impl MySQLSession {
    pub async fn connect(
        profile: &ConnectionProfile,
        connect_timeout: Duration,
    ) -> Result<Self, DriverError> {
        let (host, port) = profile.host_and_port().map_err(DriverError::Connection)?;

        let mut opts = OptsBuilder::default()
            .ip_or_hostname(host.clone())
            .tcp_port(port)
            .db_name(Some(profile.database.clone()));
        if !profile.username.is_empty() {
            opts = opts.user(Some(profile.username.clone()));
        }
        if profile.authentication == AuthenticationMode::SqlCredential {
            opts = opts.pass(Some(profile.password.clone()));
        }

        tracing::debug!("Opening MySQL session to {}:{}/{}", host, port, profile.database);

        let conn = tokio::time::timeout(connect_timeout, Conn::new(opts))
            .await
            .map_err(|_| {
                DriverError::Connection(format!(
                    "Connection timeout after {} seconds",
                    connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| DriverError::Connection(e.to_string()))?;

        Ok(Self { conn })
    }
}

#[async_trait::async_trait]
impl DatabaseSession for MySQLSession {
    async fn execute(&mut self, sql: &str) -> Result<Recordset, DriverError> {
        let mut result = self
            .conn
            .query_iter(sql)
            .await
            .map_err(|e| DriverError::Execution(e.to_string()))?;

        let rows: Vec<mysql_async::Row> = result
            .collect()
            .await
            .map_err(|e| DriverError::Execution(e.to_string()))?;
        let affected = result.affected_rows();

        // Only the first result set is reported; the rest are drained
        result
            .drop_result()
            .await
            .map_err(|e| DriverError::Execution(e.to_string()))?;

        let converted: Vec<Row> = rows.into_iter().map(convert_row).collect();
        Ok(Recordset {
            rows: converted,
            rows_affected: Some(affected),
        })
    }

    async fn list_databases(&mut self) -> Result<Vec<String>, DriverError> {
        self.conn
            .query::<String, _>("SHOW DATABASES")
            .await
            .map_err(|e| DriverError::Execution(e.to_string()))
    }

    async fn list_tables(&mut self) -> Result<Vec<TableInfo>, DriverError> {
        let rows: Vec<(String, String, String)> = self
            .conn
            .query(
                r#"
                SELECT table_name, table_schema, table_type
                FROM information_schema.tables
                WHERE table_schema = DATABASE()
                ORDER BY table_type, table_name
                "#,
            )
            .await
            .map_err(|e| DriverError::Execution(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(name, schema, table_type)| TableInfo {
                name,
                schema,
                kind: TableKind::from_table_type(&table_type),
            })
            .collect())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        let MySQLSession { conn } = *self;
        conn.disconnect()
            .await
            .map_err(|e| DriverError::Connection(format!("Failed to close session: {}", e)))
    }
}

fn convert_row(mut row: mysql_async::Row) -> Row {
    let columns = row.columns();
    let mut out = Row::with_capacity(columns.len());
    for (idx, column) in columns.iter().enumerate() {
        let value = row.take::<MySqlValue, usize>(idx).unwrap_or(MySqlValue::NULL);
        out.push(column.name_str().into_owned(), convert_value(value, column));
    }
    out
}

fn convert_value(value: MySqlValue, column: &Column) -> SqlValue {
    match value {
        MySqlValue::NULL => SqlValue::Null,
        MySqlValue::Int(i) => SqlValue::Int(i),
        MySqlValue::UInt(u) => i64::try_from(u)
            .map(SqlValue::Int)
            .unwrap_or(SqlValue::Float(u as f64)),
        MySqlValue::Float(f) => SqlValue::Float(f as f64),
        MySqlValue::Double(d) => SqlValue::Float(d),
        MySqlValue::Date(y, m, d, h, min, s, micros) => NaiveDate::from_ymd_opt(y as i32, m as u32, d as u32)
            .and_then(|date| date.and_hms_micro_opt(h as u32, min as u32, s as u32, micros))
            .map(SqlValue::DateTime)
            // Zero dates such as 0000-00-00 have no calendar equivalent
            .unwrap_or_else(|| {
                SqlValue::Text(format!("{:04}-{:02}-{:02} {:02}:{:02}:{:02}", y, m, d, h, min, s))
            }),
        MySqlValue::Time(is_neg, days, h, m, s, _) => {
            let sign = if is_neg { "-" } else { "" };
            let total_hours = days * 24 + h as u32;
            SqlValue::Text(format!("{}{}:{:02}:{:02}", sign, total_hours, m, s))
        }
        MySqlValue::Bytes(bytes) => convert_text_protocol(bytes, column),
    }
}

/// The text protocol sends every value as bytes; the column type says what they mean
fn convert_text_protocol(bytes: Vec<u8>, column: &Column) -> SqlValue {
    let is_binary = column.character_set() == BINARY_CHARSET;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => return SqlValue::Bytes(e.into_bytes()),
    };

    match column.column_type() {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR => text
            .parse::<i64>()
            .map(SqlValue::Int)
            .or_else(|_| text.parse::<f64>().map(SqlValue::Float))
            .unwrap_or(SqlValue::Text(text)),
        ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => text
            .parse::<f64>()
            .map(SqlValue::Float)
            .unwrap_or(SqlValue::Text(text)),
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => text
            .parse::<Decimal>()
            .map(SqlValue::Decimal)
            .unwrap_or(SqlValue::Text(text)),
        ColumnType::MYSQL_TYPE_DATETIME
        | ColumnType::MYSQL_TYPE_TIMESTAMP
        | ColumnType::MYSQL_TYPE_DATE => parse_datetime(&text)
            .map(SqlValue::DateTime)
            .unwrap_or(SqlValue::Text(text)),
        ColumnType::MYSQL_TYPE_TINY_BLOB
        | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
        | ColumnType::MYSQL_TYPE_LONG_BLOB
        | ColumnType::MYSQL_TYPE_BLOB
        | ColumnType::MYSQL_TYPE_VAR_STRING
        | ColumnType::MYSQL_TYPE_STRING
            if is_binary =>
        {
            SqlValue::Bytes(text.into_bytes())
        }
        _ => SqlValue::Text(text),
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}
