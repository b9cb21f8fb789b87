// Converts driver recordsets into the canonical tabular result
use crate::models::{ResultColumn, Row, SqlValue, TabularResult};
use crate::services::database::Recordset;

pub struct ResultTransformer;

impl ResultTransformer {
    /// Builds the canonical result for one statement.
    ///
    /// Columns are the keys of the first row, in driver order. Every output row
    /// carries exactly those columns; a key missing from a later row becomes NULL
    /// and keys the first row did not have are dropped. A result with no rows
    /// therefore has no columns either.
    pub fn transform(recordset: Recordset, elapsed_ms: u64) -> TabularResult {
        let Recordset {
            rows,
            rows_affected,
        } = recordset;

        let names = match rows.first() {
            Some(first) => distinct_names(first),
            None => Vec::new(),
        };

        let columns = names
            .iter()
            .map(|name| ResultColumn {
                name: name.clone(),
                type_name: Self::infer_type(&rows, name).to_string(),
            })
            .collect();

        let rows: Vec<Row> = rows
            .iter()
            .map(|row| {
                names
                    .iter()
                    .map(|name| (name.clone(), row.get(name).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect();

        // Drivers report zero affected rows for plain SELECTs
        let row_count = match rows_affected {
            Some(n) if n > 0 => n,
            _ => rows.len() as u64,
        };

        TabularResult {
            columns,
            rows,
            row_count,
            execution_time: elapsed_ms,
        }
    }

    /// Type of the first non-NULL value in the column
    fn infer_type(rows: &[Row], column: &str) -> &'static str {
        rows.iter()
            .filter_map(|row| row.get(column))
            .find(|value| !value.is_null())
            .map(SqlValue::type_name)
            .unwrap_or("null")
    }
}

/// Column names of `row` with duplicates collapsed to their first position
fn distinct_names(row: &Row) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(row.len());
    for name in row.column_names() {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
