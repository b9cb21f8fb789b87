use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{Store, StoreResult};
use crate::models::{ConnectionPatch, ConnectionProfile, NewConnection, NewQueryRecord, QueryRecord};

#[derive(Debug)]
struct Inner {
    connections: BTreeMap<i64, ConnectionProfile>,
    queries: BTreeMap<i64, QueryRecord>,
    next_connection_id: i64,
    next_query_id: i64,
}

/// Process-local store. Nothing survives a restart.
///
/// Maps and counters sit behind one lock, so an id is handed out and its
/// record inserted in the same critical section.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                connections: BTreeMap::new(),
                queries: BTreeMap::new(),
                next_connection_id: 1,
                next_query_id: 1,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn list_connections(&self) -> StoreResult<Vec<ConnectionProfile>> {
        let inner = self.inner.read().await;
        Ok(inner.connections.values().cloned().collect())
    }

    async fn get_connection(&self, id: i64) -> StoreResult<Option<ConnectionProfile>> {
        let inner = self.inner.read().await;
        Ok(inner.connections.get(&id).cloned())
    }

    async fn create_connection(&self, new: NewConnection) -> StoreResult<ConnectionProfile> {
        let mut inner = self.inner.write().await;
        let id = inner.next_connection_id;
        inner.next_connection_id += 1;

        let profile = ConnectionProfile::from_new(id, new);
        inner.connections.insert(id, profile.clone());
        Ok(profile)
    }

    async fn update_connection(
        &self,
        id: i64,
        patch: ConnectionPatch,
    ) -> StoreResult<Option<ConnectionProfile>> {
        let mut inner = self.inner.write().await;
        Ok(inner.connections.get_mut(&id).map(|profile| {
            profile.apply(patch);
            profile.clone()
        }))
    }

    async fn delete_connection(&self, id: i64) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.connections.remove(&id).is_some())
    }

    async fn list_queries(&self, connection_id: Option<i64>) -> StoreResult<Vec<QueryRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .queries
            .values()
            .filter(|q| connection_id.is_none() || q.connection_id == connection_id)
            .cloned()
            .collect())
    }

    async fn get_query(&self, id: i64) -> StoreResult<Option<QueryRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.queries.get(&id).cloned())
    }

    async fn create_query(&self, new: NewQueryRecord) -> StoreResult<QueryRecord> {
        let mut inner = self.inner.write().await;
        let id = inner.next_query_id;
        inner.next_query_id += 1;

        let record = QueryRecord::from_new(id, new);
        inner.queries.insert(id, record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthenticationMode, DatabaseType, QueryStatus};
    use std::sync::Arc;

    fn new_connection(name: &str) -> NewConnection {
        NewConnection {
            name: name.to_string(),
            server: "localhost".to_string(),
            authentication: AuthenticationMode::SqlCredential,
            username: "admin".to_string(),
            password: "s3cret".to_string(),
            database: "RestaurantManagerDB".to_string(),
            engine: DatabaseType::PostgreSQL,
            save_credentials: true,
        }
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips() {
        let store = MemoryStore::new();
        let created = store.create_connection(new_connection("Cocina")).await.unwrap();
        let fetched = store.get_connection(created.id).await.unwrap().unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.password, "s3cret");
        let json = serde_json::to_value(&fetched).unwrap();
        assert!(json.get("password").is_none());
    }

    #[tokio::test]
    async fn test_ids_are_never_reused() {
        let store = MemoryStore::new();
        let first = store.create_connection(new_connection("a")).await.unwrap();
        let second = store.create_connection(new_connection("b")).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        assert!(store.delete_connection(second.id).await.unwrap());
        let third = store.create_connection(new_connection("c")).await.unwrap();
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_distinct_ids() {
        let store = Arc::new(MemoryStore::new());
        let tasks = (0..50).map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .create_connection(new_connection(&format!("conn-{}", i)))
                    .await
                    .unwrap()
                    .id
            })
        });
        let mut ids: Vec<i64> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=50).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_update_and_delete_of_unknown_id() {
        let store = MemoryStore::new();
        let updated = store
            .update_connection(42, ConnectionPatch::default())
            .await
            .unwrap();
        assert!(updated.is_none());
        assert!(!store.delete_connection(42).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_replaces_supplied_fields() {
        let store = MemoryStore::new();
        let created = store.create_connection(new_connection("Sala")).await.unwrap();
        let updated = store
            .update_connection(
                created.id,
                ConnectionPatch {
                    server: Some("10.0.0.9:5433".to_string()),
                    password: Some("rotated".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.server, "10.0.0.9:5433");
        assert_eq!(updated.password, "rotated");
        assert_eq!(updated.name, "Sala");
    }

    #[tokio::test]
    async fn test_query_history_filter() {
        let store = MemoryStore::new();
        store
            .create_query(NewQueryRecord::failed(1, "SELEC 1".into(), Some(3), "syntax".into()))
            .await
            .unwrap();
        store
            .create_query(NewQueryRecord::failed(2, "SELECT x".into(), Some(1), "nope".into()))
            .await
            .unwrap();
        store
            .create_query(NewQueryRecord::failed(1, "SELECT y".into(), None, "nope".into()))
            .await
            .unwrap();

        let all = store.list_queries(None).await.unwrap();
        assert_eq!(all.iter().map(|q| q.id).collect::<Vec<_>>(), vec![1, 2, 3]);

        let for_one = store.list_queries(Some(1)).await.unwrap();
        assert_eq!(for_one.iter().map(|q| q.id).collect::<Vec<_>>(), vec![1, 3]);
        assert!(for_one.iter().all(|q| q.status == QueryStatus::Error));

        assert_eq!(store.get_query(2).await.unwrap().unwrap().query, "SELECT x");
        assert!(store.get_query(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_keeps_history_reference() {
        let store = MemoryStore::new();
        let conn = store.create_connection(new_connection("Barra")).await.unwrap();
        store
            .create_query(NewQueryRecord::failed(conn.id, "SELECT 1".into(), Some(0), "x".into()))
            .await
            .unwrap();
        store.delete_connection(conn.id).await.unwrap();

        let history = store.list_queries(Some(conn.id)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].connection_id, Some(conn.id));
    }
}
