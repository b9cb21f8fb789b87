use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::models::{ConnectionProfile, NewConnection, NewQueryRecord, TableInfo, TabularResult};
use crate::services::database::{DatabaseDriver, DatabaseSession, DriverError};
use crate::services::result_transformer::ResultTransformer;
use crate::storage::{Store, StoreError};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Connection {0} not found")]
    ConnectionNotFound(i64),

    /// Session could not be opened
    #[error("{0}")]
    ConnectionFailed(String),

    /// Engine rejected the statement; carries the driver message verbatim
    #[error("{0}")]
    QueryExecutionFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Query task aborted: {0}")]
    Aborted(String),
}

impl From<DriverError> for QueryError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Connection(msg) => QueryError::ConnectionFailed(msg),
            DriverError::Execution(msg) => QueryError::QueryExecutionFailed(msg),
        }
    }
}

/// Failed attempt plus the elapsed time to record with it
type Failure = (QueryError, Option<u64>);

/// Runs operator SQL against saved connections and keeps the history log.
///
/// Every operation opens its own driver session and closes it before
/// returning, whatever the outcome.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn Store>,
    driver: Arc<dyn DatabaseDriver>,
}

impl QueryService {
    pub fn new(store: Arc<dyn Store>, driver: Arc<dyn DatabaseDriver>) -> Self {
        Self { store, driver }
    }

    /// Executes `sql` verbatim on the given connection and appends exactly one
    /// history record, success or not.
    ///
    /// The work runs on its own task, so dropping the returned future does not
    /// abort the driver call or the history write.
    pub async fn execute(&self, connection_id: i64, sql: String) -> Result<TabularResult, QueryError> {
        let service = self.clone();
        tokio::spawn(async move { service.execute_and_record(connection_id, sql).await })
            .await
            .map_err(|e| QueryError::Aborted(e.to_string()))?
    }

    async fn execute_and_record(&self, connection_id: i64, sql: String) -> Result<TabularResult, QueryError> {
        tracing::info!("Executing SQL query for connection: {}", connection_id);

        let outcome = self.run(connection_id, &sql).await;

        let record = match &outcome {
            Ok(result) => NewQueryRecord::success(connection_id, sql, result.clone()),
            Err((err, elapsed)) => {
                tracing::error!("Query on connection {} failed: {}", connection_id, err);
                NewQueryRecord::failed(connection_id, sql, *elapsed, err.to_string())
            }
        };

        if let Err(e) = self.store.create_query(record).await {
            tracing::error!(
                "Failed to record query history for connection {}: {}",
                connection_id,
                e
            );
        }

        outcome.map_err(|(err, _)| err)
    }

    async fn run(&self, connection_id: i64, sql: &str) -> Result<TabularResult, Failure> {
        let profile = self
            .load_profile(connection_id)
            .await
            .map_err(|e| (e, None))?;

        let connect_started = Instant::now();
        let mut session = self
            .driver
            .connect(&profile)
            .await
            .map_err(|e| (QueryError::from(e), Some(elapsed_ms(connect_started))))?;

        let started = Instant::now();
        let outcome = session.execute(sql).await;
        let elapsed = elapsed_ms(started);
        close_session(session, connection_id).await;

        match outcome {
            Ok(recordset) => {
                let result = ResultTransformer::transform(recordset, elapsed);
                tracing::info!(
                    "Query on connection {} returned {} rows in {}ms",
                    connection_id,
                    result.row_count,
                    elapsed
                );
                Ok(result)
            }
            Err(e) => Err((e.into(), Some(elapsed))),
        }
    }

    /// Opens and closes a session for an unsaved profile
    pub async fn test_connection(&self, new: NewConnection) -> Result<(), DriverError> {
        let profile = new.into_transient_profile();
        tracing::info!(
            "Testing {} connection to {} ({})",
            profile.engine,
            profile.server,
            profile.database
        );
        let session = self.driver.connect(&profile).await?;
        session.close().await
    }

    pub async fn list_databases(&self, connection_id: i64) -> Result<Vec<String>, QueryError> {
        let mut session = self.open(connection_id).await?;
        let outcome = session.list_databases().await;
        close_session(session, connection_id).await;
        Ok(outcome?)
    }

    pub async fn list_tables(&self, connection_id: i64) -> Result<Vec<TableInfo>, QueryError> {
        let mut session = self.open(connection_id).await?;
        let outcome = session.list_tables().await;
        close_session(session, connection_id).await;
        Ok(outcome?)
    }

    async fn load_profile(&self, connection_id: i64) -> Result<ConnectionProfile, QueryError> {
        self.store
            .get_connection(connection_id)
            .await?
            .ok_or(QueryError::ConnectionNotFound(connection_id))
    }

    async fn open(&self, connection_id: i64) -> Result<Box<dyn DatabaseSession>, QueryError> {
        let profile = self.load_profile(connection_id).await?;
        Ok(self.driver.connect(&profile).await?)
    }
}

async fn close_session(session: Box<dyn DatabaseSession>, connection_id: i64) {
    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close session for connection {}: {}", connection_id, e);
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AuthenticationMode, ConnectionPatch, DatabaseType, QueryRecord, QueryStatus, Row, SqlValue,
    };
    use crate::services::database::mock::MockDriver;
    use crate::services::database::Recordset;
    use crate::storage::{MemoryStore, StoreResult};

    fn new_connection() -> NewConnection {
        NewConnection {
            name: "Cocina".to_string(),
            server: "localhost".to_string(),
            authentication: AuthenticationMode::SqlCredential,
            username: "admin".to_string(),
            password: "pw".to_string(),
            database: "RestaurantManagerDB".to_string(),
            engine: DatabaseType::PostgreSQL,
            save_credentials: false,
        }
    }

    fn platos() -> Recordset {
        Recordset::from_rows(vec![
            Row::new().with("PlatoID", 1).with("Nombre", "Paella"),
            Row::new().with("PlatoID", 2).with("Nombre", SqlValue::Null),
        ])
    }

    async fn setup(driver: MockDriver) -> (QueryService, Arc<MemoryStore>, i64) {
        let store = Arc::new(MemoryStore::new());
        let conn = store.create_connection(new_connection()).await.unwrap();
        let service = QueryService::new(store.clone(), Arc::new(driver));
        (service, store, conn.id)
    }

    #[tokio::test]
    async fn test_successful_execution_is_recorded() {
        let driver = MockDriver::new().respond("SELECT * FROM Plato", platos());
        let (service, store, id) = setup(driver.clone()).await;

        let result = service.execute(id, "SELECT * FROM Plato".to_string()).await.unwrap();
        assert_eq!(result.column_names(), vec!["PlatoID", "Nombre"]);
        assert_eq!(result.row_count, 2);
        assert_eq!(result.columns[1].type_name, "string");

        let history = store.list_queries(Some(id)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, QueryStatus::Success);
        assert_eq!(history[0].results.as_ref(), Some(&result));
        assert_eq!(history[0].execution_time, Some(result.execution_time));
        assert_eq!(driver.sessions_opened(), 1);
        assert_eq!(driver.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn test_unknown_connection_still_recorded() {
        let (service, store, _) = setup(MockDriver::new()).await;

        let err = service.execute(99, "SELECT 1".to_string()).await.unwrap_err();
        assert!(matches!(err, QueryError::ConnectionNotFound(99)));

        let history = store.list_queries(None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].connection_id, Some(99));
        assert_eq!(history[0].status, QueryStatus::Error);
        assert_eq!(history[0].error.as_deref(), Some("Connection 99 not found"));
        assert_eq!(history[0].execution_time, None);
    }

    #[tokio::test]
    async fn test_driver_failure_closes_session_and_records_message() {
        let driver = MockDriver::new().fail("SELEC * FROM Plato", "syntax error at or near \"SELEC\"");
        let (service, store, id) = setup(driver.clone()).await;

        let err = service
            .execute(id, "SELEC * FROM Plato".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::QueryExecutionFailed(_)));
        assert_eq!(err.to_string(), "syntax error at or near \"SELEC\"");

        let history = store.list_queries(Some(id)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].error.as_deref(), Some("syntax error at or near \"SELEC\""));
        assert!(history[0].execution_time.is_some());
        assert!(history[0].results.is_none());
        assert_eq!(driver.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_recorded() {
        let driver = MockDriver::unreachable("Connection refused (os error 111)");
        let (service, store, id) = setup(driver.clone()).await;

        let err = service.execute(id, "SELECT 1".to_string()).await.unwrap_err();
        assert!(matches!(err, QueryError::ConnectionFailed(_)));
        assert_eq!(driver.sessions_opened(), 0);

        let history = store.list_queries(Some(id)).await.unwrap();
        assert_eq!(history[0].status, QueryStatus::Error);
        assert!(history[0].execution_time.is_some());
    }

    #[tokio::test]
    async fn test_history_grows_by_one_per_call() {
        let (service, store, id) = setup(MockDriver::new().fail("bad", "nope")).await;
        for (n, sql) in ["SELECT 1", "bad", "SELECT 2"].iter().enumerate() {
            let _ = service.execute(id, sql.to_string()).await;
            assert_eq!(store.list_queries(None).await.unwrap().len(), n + 1);
        }
    }

    #[tokio::test]
    async fn test_concurrent_executions_get_distinct_history_ids() {
        let (service, store, id) = setup(MockDriver::new()).await;
        let tasks = (0..20).map(|i| {
            let service = service.clone();
            async move { service.execute(id, format!("SELECT {}", i)).await }
        });
        let results = futures::future::join_all(tasks).await;
        assert!(results.iter().all(|r| r.is_ok()));

        let mut ids: Vec<i64> = store
            .list_queries(Some(id))
            .await
            .unwrap()
            .iter()
            .map(|q| q.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<i64>>());
    }

    /// Store whose history writes always fail
    struct BrokenHistoryStore(MemoryStore);

    #[async_trait::async_trait]
    impl Store for BrokenHistoryStore {
        async fn list_connections(&self) -> StoreResult<Vec<ConnectionProfile>> {
            self.0.list_connections().await
        }
        async fn get_connection(&self, id: i64) -> StoreResult<Option<ConnectionProfile>> {
            self.0.get_connection(id).await
        }
        async fn create_connection(&self, new: NewConnection) -> StoreResult<ConnectionProfile> {
            self.0.create_connection(new).await
        }
        async fn update_connection(
            &self,
            id: i64,
            patch: ConnectionPatch,
        ) -> StoreResult<Option<ConnectionProfile>> {
            self.0.update_connection(id, patch).await
        }
        async fn delete_connection(&self, id: i64) -> StoreResult<bool> {
            self.0.delete_connection(id).await
        }
        async fn list_queries(&self, connection_id: Option<i64>) -> StoreResult<Vec<QueryRecord>> {
            self.0.list_queries(connection_id).await
        }
        async fn get_query(&self, id: i64) -> StoreResult<Option<QueryRecord>> {
            self.0.get_query(id).await
        }
        async fn create_query(&self, _new: NewQueryRecord) -> StoreResult<QueryRecord> {
            Err(StoreError::Corrupt("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_recording_failure_does_not_mask_outcome() {
        let store = BrokenHistoryStore(MemoryStore::new());
        let conn = store.create_connection(new_connection()).await.unwrap();
        let driver = MockDriver::new()
            .respond("SELECT * FROM Plato", platos())
            .fail("DROP TABLE Plato", "permission denied for table plato");
        let service = QueryService::new(Arc::new(store), Arc::new(driver));

        let result = service
            .execute(conn.id, "SELECT * FROM Plato".to_string())
            .await
            .unwrap();
        assert_eq!(result.row_count, 2);

        let err = service
            .execute(conn.id, "DROP TABLE Plato".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "permission denied for table plato");
    }

    #[tokio::test]
    async fn test_connection_check() {
        let (service, _, _) = setup(MockDriver::new()).await;
        assert!(service.test_connection(new_connection()).await.is_ok());

        let (service, _, _) = setup(MockDriver::unreachable("Login failed for user 'admin'.")).await;
        let err = service.test_connection(new_connection()).await.unwrap_err();
        assert_eq!(err, DriverError::Connection("Login failed for user 'admin'.".to_string()));
    }

    #[tokio::test]
    async fn test_metadata_listing() {
        let driver = MockDriver::new();
        let (service, store, id) = setup(driver.clone()).await;

        let databases = service.list_databases(id).await.unwrap();
        assert_eq!(databases, vec!["RestaurantManagerDB", "InventorySystem"]);

        let tables = service.list_tables(id).await.unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "Plato");
        assert_eq!(driver.sessions_opened(), 2);
        assert_eq!(driver.sessions_closed(), 2);

        assert!(matches!(
            service.list_tables(404).await,
            Err(QueryError::ConnectionNotFound(404))
        ));
        // Metadata lookups are not part of the history
        assert!(store.list_queries(None).await.unwrap().is_empty());
    }
}
