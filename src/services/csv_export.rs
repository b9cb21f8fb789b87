// CSV serialization of query results
use crate::models::{Row, SqlValue, TabularResult};
use thiserror::Error;

pub const EXPORT_FILENAME: &str = "query_results.csv";
pub const EXPORT_CONTENT_TYPE: &str = "text/csv;charset=utf-8";

#[derive(Debug, Error, PartialEq)]
pub enum ExportError {
    #[error("There are no query results to export.")]
    NothingToExport,
}

/// A CSV document ready to be offered as a download
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

pub struct CsvExporter;

impl CsvExporter {
    /// Header of quoted column names, then one line per row.
    ///
    /// Text cells are quoted with embedded quotes doubled, NULL is an empty
    /// field and every other value is written unquoted in its plain form. No
    /// locale formatting is applied, so the same input always gives the same
    /// bytes.
    pub fn to_csv(column_names: &[String], rows: &[Row]) -> String {
        let mut csv = String::new();

        let header: Vec<String> = column_names.iter().map(|name| quote(name)).collect();
        csv.push_str(&header.join(","));
        csv.push('\n');

        for row in rows {
            let cells: Vec<String> = column_names
                .iter()
                .map(|name| match row.get(name) {
                    None | Some(SqlValue::Null) => String::new(),
                    Some(SqlValue::Text(text)) => quote(text),
                    Some(other) => other.to_native_string(),
                })
                .collect();
            csv.push_str(&cells.join(","));
            csv.push('\n');
        }

        csv
    }

    pub fn export(result: &TabularResult) -> Result<ExportFile, ExportError> {
        if result.rows.is_empty() {
            return Err(ExportError::NothingToExport);
        }
        Ok(ExportFile {
            filename: EXPORT_FILENAME.to_string(),
            content_type: EXPORT_CONTENT_TYPE,
            body: Self::to_csv(&result.column_names(), &result.rows),
        })
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}
