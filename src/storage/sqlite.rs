use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    ConnectionPatch, ConnectionProfile, NewConnection, NewQueryRecord, QueryRecord, TabularResult,
};

const CONNECTION_COLUMNS: &str = "id, name, server, authentication, username, password, \
     database_name, engine, save_credentials, created_at";

const QUERY_COLUMNS: &str =
    "id, connection_id, query_text, status, execution_time_ms, error_message, results_json, created_at";

/// SQLite-backed store so profiles and history survive restarts.
/// Uses tokio::Mutex for async-friendly locking
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database file. Accepts plain paths and
    /// `sqlite:` / `sqlite://` URLs.
    pub async fn new<P: AsRef<Path>>(db_path: P) -> StoreResult<Self> {
        let path_str = db_path.as_ref().to_string_lossy();
        let clean_path = path_str
            .strip_prefix("sqlite:")
            .map(|rest| rest.trim_start_matches("//"))
            .unwrap_or(&*path_str);

        let conn = Connection::open(clean_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema().await?;
        Ok(store)
    }

    /// Private in-memory database, used by tests
    pub async fn in_memory() -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().await;

        // AUTOINCREMENT keeps ids of deleted rows from being handed out again
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS connections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                server TEXT NOT NULL,
                authentication TEXT NOT NULL,
                username TEXT NOT NULL,
                password TEXT NOT NULL,
                database_name TEXT NOT NULL,
                engine TEXT NOT NULL,
                save_credentials INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        // No foreign key: history outlives the profile it ran against
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS queries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                connection_id INTEGER,
                query_text TEXT NOT NULL,
                status TEXT NOT NULL,
                execution_time_ms INTEGER,
                error_message TEXT,
                results_json TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_queries_connection ON queries(connection_id, id)",
            [],
        )?;

        Ok(())
    }
}

/// Column values of a `connections` row before decoding
struct ConnectionRow {
    id: i64,
    name: String,
    server: String,
    authentication: String,
    username: String,
    password: String,
    database: String,
    engine: String,
    save_credentials: bool,
    created_at: String,
}

impl ConnectionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            server: row.get(2)?,
            authentication: row.get(3)?,
            username: row.get(4)?,
            password: row.get(5)?,
            database: row.get(6)?,
            engine: row.get(7)?,
            save_credentials: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn decode(self) -> StoreResult<ConnectionProfile> {
        Ok(ConnectionProfile {
            id: self.id,
            name: self.name,
            server: self.server,
            authentication: self.authentication.parse().map_err(StoreError::Corrupt)?,
            username: self.username,
            password: self.password,
            database: self.database,
            engine: self.engine.parse().map_err(StoreError::Corrupt)?,
            save_credentials: self.save_credentials,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Column values of a `queries` row before decoding
struct QueryRow {
    id: i64,
    connection_id: Option<i64>,
    query: String,
    status: String,
    execution_time: Option<i64>,
    error: Option<String>,
    results_json: Option<String>,
    created_at: String,
}

impl QueryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            connection_id: row.get(1)?,
            query: row.get(2)?,
            status: row.get(3)?,
            execution_time: row.get(4)?,
            error: row.get(5)?,
            results_json: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn decode(self) -> StoreResult<QueryRecord> {
        let results = match self.results_json {
            Some(json) => Some(serde_json::from_str::<TabularResult>(&json)?),
            None => None,
        };
        Ok(QueryRecord {
            id: self.id,
            connection_id: self.connection_id,
            query: self.query,
            status: self.status.parse().map_err(StoreError::Corrupt)?,
            execution_time: self.execution_time.map(|ms| ms.max(0) as u64),
            error: self.error,
            results,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn parse_timestamp(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {:?}: {}", value, e)))
}

fn load_connection(conn: &Connection, id: i64) -> StoreResult<Option<ConnectionProfile>> {
    let sql = format!("SELECT {} FROM connections WHERE id = ?1", CONNECTION_COLUMNS);
    conn.query_row(&sql, params![id], ConnectionRow::from_row)
        .optional()?
        .map(ConnectionRow::decode)
        .transpose()
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    async fn list_connections(&self) -> StoreResult<Vec<ConnectionProfile>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {} FROM connections ORDER BY id", CONNECTION_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], ConnectionRow::from_row)?;

        let mut connections = Vec::new();
        for row in rows {
            connections.push(row?.decode()?);
        }
        Ok(connections)
    }

    async fn get_connection(&self, id: i64) -> StoreResult<Option<ConnectionProfile>> {
        let conn = self.conn.lock().await;
        load_connection(&conn, id)
    }

    async fn create_connection(&self, new: NewConnection) -> StoreResult<ConnectionProfile> {
        let conn = self.conn.lock().await;
        let mut profile = ConnectionProfile::from_new(0, new);
        conn.execute(
            r#"
            INSERT INTO connections
            (name, server, authentication, username, password, database_name, engine, save_credentials, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                profile.name,
                profile.server,
                profile.authentication.as_str(),
                profile.username,
                profile.password,
                profile.database,
                profile.engine.as_str(),
                profile.save_credentials,
                profile.created_at.to_rfc3339(),
            ],
        )?;
        profile.id = conn.last_insert_rowid();
        Ok(profile)
    }

    async fn update_connection(
        &self,
        id: i64,
        patch: ConnectionPatch,
    ) -> StoreResult<Option<ConnectionProfile>> {
        let conn = self.conn.lock().await;
        let Some(mut profile) = load_connection(&conn, id)? else {
            return Ok(None);
        };
        profile.apply(patch);

        conn.execute(
            r#"
            UPDATE connections
            SET name = ?1, server = ?2, authentication = ?3, username = ?4, password = ?5,
                database_name = ?6, engine = ?7, save_credentials = ?8
            WHERE id = ?9
            "#,
            params![
                profile.name,
                profile.server,
                profile.authentication.as_str(),
                profile.username,
                profile.password,
                profile.database,
                profile.engine.as_str(),
                profile.save_credentials,
                id,
            ],
        )?;
        Ok(Some(profile))
    }

    async fn delete_connection(&self, id: i64) -> StoreResult<bool> {
        let conn = self.conn.lock().await;
        let rows_affected = conn.execute("DELETE FROM connections WHERE id = ?1", params![id])?;
        Ok(rows_affected > 0)
    }

    async fn list_queries(&self, connection_id: Option<i64>) -> StoreResult<Vec<QueryRecord>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM queries WHERE (?1 IS NULL OR connection_id = ?1) ORDER BY id",
            QUERY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![connection_id], QueryRow::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.decode()?);
        }
        Ok(records)
    }

    async fn get_query(&self, id: i64) -> StoreResult<Option<QueryRecord>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {} FROM queries WHERE id = ?1", QUERY_COLUMNS);
        conn.query_row(&sql, params![id], QueryRow::from_row)
            .optional()?
            .map(QueryRow::decode)
            .transpose()
    }

    async fn create_query(&self, new: NewQueryRecord) -> StoreResult<QueryRecord> {
        let results_json = new
            .results
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn.lock().await;
        let mut record = QueryRecord::from_new(0, new);
        conn.execute(
            r#"
            INSERT INTO queries
            (connection_id, query_text, status, execution_time_ms, error_message, results_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.connection_id,
                record.query,
                record.status.as_str(),
                record.execution_time.map(|ms| ms as i64),
                record.error,
                results_json,
                record.created_at.to_rfc3339(),
            ],
        )?;
        record.id = conn.last_insert_rowid();
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthenticationMode, DatabaseType, QueryStatus, ResultColumn, Row};
    use tempfile::tempdir;

    fn new_connection(name: &str) -> NewConnection {
        NewConnection {
            name: name.to_string(),
            server: "db.local,5433".to_string(),
            authentication: AuthenticationMode::SqlCredential,
            username: "gerente".to_string(),
            password: "pw".to_string(),
            database: "RestaurantManagerDB".to_string(),
            engine: DatabaseType::MySQL,
            save_credentials: true,
        }
    }

    fn sample_result() -> TabularResult {
        TabularResult {
            columns: vec![
                ResultColumn {
                    name: "PlatoID".to_string(),
                    type_name: "number".to_string(),
                },
                ResultColumn {
                    name: "Nombre".to_string(),
                    type_name: "string".to_string(),
                },
            ],
            rows: vec![
                Row::new().with("PlatoID", 1).with("Nombre", "Paella"),
                Row::new().with("PlatoID", 2).with("Nombre", "Gazpacho"),
            ],
            row_count: 2,
            execution_time: 12,
        }
    }

    #[tokio::test]
    async fn test_sqlite_store_creation_from_url() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("admin.db");
        let url = format!("sqlite://{}", db_path.display());

        let store = SqliteStore::new(&url).await;
        assert!(store.is_ok());
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_schema_initialization() {
        let store = SqliteStore::in_memory().await.unwrap();
        let conn = store.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name IN ('connections', 'queries')")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(tables.len(), 2);
    }

    #[tokio::test]
    async fn test_connection_crud() {
        let store = SqliteStore::in_memory().await.unwrap();
        let created = store.create_connection(new_connection("Cocina")).await.unwrap();
        assert_eq!(created.id, 1);

        let fetched = store.get_connection(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Cocina");
        assert_eq!(fetched.password, "pw");
        assert_eq!(fetched.engine, DatabaseType::MySQL);
        assert_eq!(fetched.created_at.timestamp(), created.created_at.timestamp());

        let updated = store
            .update_connection(
                created.id,
                ConnectionPatch {
                    name: Some("Cocina Central".to_string()),
                    save_credentials: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Cocina Central");
        assert!(!updated.save_credentials);
        assert_eq!(updated.server, "db.local,5433");

        assert!(store.delete_connection(created.id).await.unwrap());
        assert!(store.get_connection(created.id).await.unwrap().is_none());
        assert!(!store.delete_connection(created.id).await.unwrap());
        assert!(store
            .update_connection(created.id, ConnectionPatch::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_connection(new_connection("a")).await.unwrap();
        let second = store.create_connection(new_connection("b")).await.unwrap();
        store.delete_connection(second.id).await.unwrap();

        let third = store.create_connection(new_connection("c")).await.unwrap();
        assert_eq!(third.id, 3);
        let names: Vec<String> = store
            .list_connections()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_query_records_round_trip() {
        let store = SqliteStore::in_memory().await.unwrap();
        let ok = store
            .create_query(NewQueryRecord::success(1, "SELECT * FROM Plato".into(), sample_result()))
            .await
            .unwrap();
        let failed = store
            .create_query(NewQueryRecord::failed(
                2,
                "SELEC".into(),
                None,
                "Connection 2 not found".into(),
            ))
            .await
            .unwrap();

        let fetched = store.get_query(ok.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, QueryStatus::Success);
        assert_eq!(fetched.execution_time, Some(12));
        assert_eq!(fetched.results, Some(sample_result()));

        let fetched = store.get_query(failed.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, QueryStatus::Error);
        assert_eq!(fetched.execution_time, None);
        assert_eq!(fetched.error.as_deref(), Some("Connection 2 not found"));
        assert!(fetched.results.is_none());

        let for_two = store.list_queries(Some(2)).await.unwrap();
        assert_eq!(for_two.len(), 1);
        assert_eq!(for_two[0].id, failed.id);
        assert_eq!(store.list_queries(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("admin.db");
        {
            let store = SqliteStore::new(&db_path).await.unwrap();
            store.create_connection(new_connection("Barra")).await.unwrap();
            store
                .create_query(NewQueryRecord::success(1, "SELECT 1".into(), sample_result()))
                .await
                .unwrap();
        }

        let store = SqliteStore::new(&db_path).await.unwrap();
        assert_eq!(store.list_connections().await.unwrap().len(), 1);
        assert_eq!(store.list_queries(Some(1)).await.unwrap().len(), 1);
        let next = store.create_connection(new_connection("Sala")).await.unwrap();
        assert_eq!(next.id, 2);
    }

    #[tokio::test]
    async fn test_typed_cells_match_memory_store() {
        use crate::models::SqlValue;
        use crate::services::CsvExporter;
        use crate::storage::MemoryStore;
        use chrono::NaiveDate;

        let served = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let column = |name: &str, type_name: &str| ResultColumn {
            name: name.to_string(),
            type_name: type_name.to_string(),
        };
        let result = TabularResult {
            columns: vec![
                column("Servida", "datetime"),
                column("Firma", "binary"),
                column("Total", "number"),
            ],
            rows: vec![Row::new()
                .with("Servida", served)
                .with("Firma", SqlValue::Bytes(vec![0x01]))
                .with("Total", SqlValue::Decimal("42.50".parse().unwrap()))],
            row_count: 1,
            execution_time: 3,
        };

        let sqlite = SqliteStore::in_memory().await.unwrap();
        let memory = MemoryStore::new();
        let new = NewQueryRecord::success(1, "SELECT * FROM Orden".into(), result.clone());
        let from_sqlite = sqlite.create_query(new.clone()).await.unwrap();
        let from_memory = memory.create_query(new).await.unwrap();

        let from_sqlite = sqlite.get_query(from_sqlite.id).await.unwrap().unwrap();
        let from_memory = memory.get_query(from_memory.id).await.unwrap().unwrap();
        assert_eq!(from_sqlite.results, Some(result));

        let export = |record: &QueryRecord| {
            CsvExporter::export(record.results.as_ref().unwrap()).unwrap().body
        };
        assert_eq!(export(&from_sqlite), export(&from_memory));
        assert_eq!(
            export(&from_sqlite),
            "\"Servida\",\"Firma\",\"Total\"\n2024-06-01T12:00:00,0x01,42.50\n"
        );
    }
}
