// Database abstraction layer: one session per operation, no pooling
pub mod adapter;
#[cfg(test)]
pub mod mock;
pub mod mysql;
pub mod postgresql;

pub use adapter::{DatabaseDriver, DatabaseSession, DriverError, Recordset};
pub use mysql::MySQLSession;
pub use postgresql::PostgreSQLSession;

pub use crate::models::DatabaseType;

use crate::models::ConnectionProfile;
use std::time::Duration;

/// Driver that dispatches on the profile's engine to the real client libraries
#[derive(Debug, Clone)]
pub struct NativeDriver {
    connect_timeout: Duration,
}

impl NativeDriver {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for NativeDriver {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait::async_trait]
impl DatabaseDriver for NativeDriver {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Box<dyn DatabaseSession>, DriverError> {
        create_session(profile, self.connect_timeout).await
    }
}

/// Factory function to open a session for the profile's engine
pub async fn create_session(
    profile: &ConnectionProfile,
    connect_timeout: Duration,
) -> Result<Box<dyn DatabaseSession>, DriverError> {
    match profile.engine {
        DatabaseType::PostgreSQL => {
            let session = PostgreSQLSession::connect(profile, connect_timeout).await?;
            Ok(Box::new(session))
        }
        DatabaseType::MySQL => {
            let session = MySQLSession::connect(profile, connect_timeout).await?;
            Ok(Box::new(session))
        }
    }
}
