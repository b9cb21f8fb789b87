//! Scripted in-memory driver for tests.

use super::adapter::{DatabaseDriver, DatabaseSession, DriverError, Recordset};
use crate::models::{ConnectionProfile, TableInfo, TableKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// Returns canned recordsets keyed by exact SQL text.
#[derive(Default, Clone)]
pub struct MockDriver {
    responses: Arc<Mutex<HashMap<String, Result<Recordset, DriverError>>>>,
    connect_error: Option<String>,
    counters: Arc<Counters>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connect attempt fails with `message`.
    pub fn unreachable(message: &str) -> Self {
        Self {
            connect_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn respond(self, sql: &str, recordset: Recordset) -> Self {
        self.script(sql, Ok(recordset))
    }

    pub fn fail(self, sql: &str, message: &str) -> Self {
        self.script(sql, Err(DriverError::Execution(message.to_string())))
    }

    fn script(self, sql: &str, outcome: Result<Recordset, DriverError>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(sql.to_string(), outcome);
        self
    }

    pub fn sessions_opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DatabaseDriver for MockDriver {
    async fn connect(
        &self,
        _profile: &ConnectionProfile,
    ) -> Result<Box<dyn DatabaseSession>, DriverError> {
        if let Some(message) = &self.connect_error {
            return Err(DriverError::Connection(message.clone()));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            responses: self.responses.clone(),
            counters: self.counters.clone(),
        }))
    }
}

struct MockSession {
    responses: Arc<Mutex<HashMap<String, Result<Recordset, DriverError>>>>,
    counters: Arc<Counters>,
}

#[async_trait::async_trait]
impl DatabaseSession for MockSession {
    async fn execute(&mut self, sql: &str) -> Result<Recordset, DriverError> {
        let scripted = self.responses.lock().unwrap().get(sql).cloned();
        scripted.unwrap_or_else(|| Ok(Recordset::default()))
    }

    async fn list_databases(&mut self) -> Result<Vec<String>, DriverError> {
        Ok(vec!["RestaurantManagerDB".to_string(), "InventorySystem".to_string()])
    }

    async fn list_tables(&mut self) -> Result<Vec<TableInfo>, DriverError> {
        Ok(vec![
            TableInfo {
                name: "Plato".to_string(),
                schema: "public".to_string(),
                kind: TableKind::Table,
            },
            TableInfo {
                name: "vw_InventarioBajo".to_string(),
                schema: "public".to_string(),
                kind: TableKind::View,
            },
        ])
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
