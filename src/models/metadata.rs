use serde::{Deserialize, Serialize};

/// Table or view reported by the driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub schema: String,
    #[serde(rename = "type")]
    pub kind: TableKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
    Table,
    View,
}

impl TableKind {
    /// Maps `information_schema.tables.table_type`
    pub fn from_table_type(table_type: &str) -> Self {
        if table_type.eq_ignore_ascii_case("VIEW") || table_type.eq_ignore_ascii_case("SYSTEM VIEW")
        {
            TableKind::View
        } else {
            TableKind::Table
        }
    }
}
