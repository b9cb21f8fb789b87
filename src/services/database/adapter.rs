// Driver seam: a driver opens sessions, a session runs opaque SQL text
use crate::models::{ConnectionProfile, Row, TableInfo};
use thiserror::Error;

/// Raw response of one statement, before transformation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recordset {
    pub rows: Vec<Row>,
    /// Rows affected, when the driver reports it for mutating statements
    pub rows_affected: Option<u64>,
}

impl Recordset {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            rows_affected: None,
        }
    }

    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows: Vec::new(),
            rows_affected: Some(rows_affected),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DriverError {
    /// Server unreachable or credentials rejected
    #[error("{0}")]
    Connection(String),

    /// Statement rejected by the engine
    #[error("{0}")]
    Execution(String),
}

impl DriverError {
    pub fn message(&self) -> &str {
        match self {
            DriverError::Connection(msg) | DriverError::Execution(msg) => msg,
        }
    }
}

/// An open connection to the target database
#[async_trait::async_trait]
pub trait DatabaseSession: Send {
    /// Run `sql` exactly as given
    async fn execute(&mut self, sql: &str) -> Result<Recordset, DriverError>;

    async fn list_databases(&mut self) -> Result<Vec<String>, DriverError>;

    async fn list_tables(&mut self) -> Result<Vec<TableInfo>, DriverError>;

    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// Opens sessions from saved connection profiles
#[async_trait::async_trait]
pub trait DatabaseDriver: Send + Sync {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Box<dyn DatabaseSession>, DriverError>;
}
