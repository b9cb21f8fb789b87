use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the operator authenticates against the target database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthenticationMode {
    /// Username and password checked by the database engine
    #[serde(rename = "sql_credential", alias = "SQL Server Authentication")]
    SqlCredential,
    /// Identity supplied by the host platform (peer/trust/socket auth)
    #[serde(rename = "platform_credential", alias = "Windows Authentication")]
    PlatformCredential,
}

impl AuthenticationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthenticationMode::SqlCredential => "sql_credential",
            AuthenticationMode::PlatformCredential => "platform_credential",
        }
    }
}

impl FromStr for AuthenticationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sql_credential" | "SQL Server Authentication" => Ok(AuthenticationMode::SqlCredential),
            "platform_credential" | "Windows Authentication" => {
                Ok(AuthenticationMode::PlatformCredential)
            }
            other => Err(format!("Unknown authentication mode: {}", other)),
        }
    }
}

/// Database engine a profile talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    #[serde(alias = "postgres")]
    PostgreSQL,
    #[serde(alias = "mariadb")]
    MySQL,
}

impl DatabaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::PostgreSQL => "postgresql",
            DatabaseType::MySQL => "mysql",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            DatabaseType::PostgreSQL => 5432,
            DatabaseType::MySQL => 3306,
        }
    }
}

impl FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(DatabaseType::PostgreSQL),
            "mysql" | "mariadb" => Ok(DatabaseType::MySQL),
            _ => Err(format!("Unsupported database type: {}", s)),
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Saved connection profile. The password is write-only and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    pub id: i64,
    pub name: String,
    pub server: String,
    pub authentication: AuthenticationMode,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub database: String,
    pub engine: DatabaseType,
    pub save_credentials: bool,
    pub created_at: DateTime<Utc>,
}

impl ConnectionProfile {
    pub fn from_new(id: i64, new: NewConnection) -> Self {
        Self {
            id,
            name: new.name,
            server: new.server,
            authentication: new.authentication,
            username: new.username,
            password: new.password,
            database: new.database,
            engine: new.engine,
            save_credentials: new.save_credentials,
            created_at: Utc::now(),
        }
    }

    /// Applies every field present in `patch`; id and created_at are untouched.
    pub fn apply(&mut self, patch: ConnectionPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(server) = patch.server {
            self.server = server;
        }
        if let Some(authentication) = patch.authentication {
            self.authentication = authentication;
        }
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(password) = patch.password {
            self.password = password;
        }
        if let Some(database) = patch.database {
            self.database = database;
        }
        if let Some(engine) = patch.engine {
            self.engine = engine;
        }
        if let Some(save_credentials) = patch.save_credentials {
            self.save_credentials = save_credentials;
        }
    }

    /// Same rules as [`NewConnection::validate`], applied to the stored state
    pub fn validate(&self) -> Result<(), String> {
        ConnectionFields {
            name: &self.name,
            server: &self.server,
            database: &self.database,
            authentication: self.authentication,
            username: &self.username,
            password: &self.password,
        }
        .validate()
    }

    /// Splits `server` into host and port. Accepts `host`, `host:port` and `host,port`.
    pub fn host_and_port(&self) -> Result<(String, u16), String> {
        let server = self.server.trim();
        let split = server.rsplit_once(',').or_else(|| {
            // Leave bracketless IPv6 literals alone
            if server.matches(':').count() == 1 {
                server.rsplit_once(':')
            } else {
                None
            }
        });
        match split {
            Some((host, port)) => {
                let port = port
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| format!("Invalid port in server address: {}", server))?;
                Ok((host.trim().to_string(), port))
            }
            None => Ok((server.to_string(), self.engine.default_port())),
        }
    }
}

/// Fields accepted when creating or testing a connection
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConnection {
    pub name: String,
    pub server: String,
    pub authentication: AuthenticationMode,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    #[serde(default)]
    pub engine: DatabaseType,
    #[serde(default)]
    pub save_credentials: bool,
}

impl NewConnection {
    /// Presence checks mirroring the connection form
    pub fn validate(&self) -> Result<(), String> {
        ConnectionFields {
            name: &self.name,
            server: &self.server,
            database: &self.database,
            authentication: self.authentication,
            username: &self.username,
            password: &self.password,
        }
        .validate()
    }

    /// Transient profile used for connection tests; never stored
    pub fn into_transient_profile(self) -> ConnectionProfile {
        ConnectionProfile::from_new(0, self)
    }
}

/// Partial update of a connection profile
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPatch {
    pub name: Option<String>,
    pub server: Option<String>,
    pub authentication: Option<AuthenticationMode>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub engine: Option<DatabaseType>,
    pub save_credentials: Option<bool>,
}

/// The fields a usable profile needs, borrowed from either a new
/// connection or a stored profile with a patch applied
struct ConnectionFields<'a> {
    name: &'a str,
    server: &'a str,
    database: &'a str,
    authentication: AuthenticationMode,
    username: &'a str,
    password: &'a str,
}

impl ConnectionFields<'_> {
    fn validate(&self) -> Result<(), String> {
        require("name", self.name, "Connection name is required")?;
        require("server", self.server, "Server address is required")?;
        require("database", self.database, "Database name is required")?;
        if self.authentication == AuthenticationMode::SqlCredential {
            require("username", self.username, "Username is required")?;
            require("password", self.password, "Password is required")?;
        }
        Ok(())
    }
}

fn require(field: &str, value: &str, message: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("Validation error: {} at \"{}\"", message, field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewConnection {
        NewConnection {
            name: "Cocina".to_string(),
            server: "db.local".to_string(),
            authentication: AuthenticationMode::SqlCredential,
            username: "sa".to_string(),
            password: "secret".to_string(),
            database: "RestaurantManagerDB".to_string(),
            engine: DatabaseType::PostgreSQL,
            save_credentials: false,
        }
    }

    #[test]
    fn test_password_never_serialized() {
        let profile = ConnectionProfile::from_new(1, sample());
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["name"], "Cocina");
        assert_eq!(json["saveCredentials"], false);
        assert_eq!(json["authentication"], "sql_credential");
    }

    #[test]
    fn test_new_connection_accepts_form_labels() {
        let body = serde_json::json!({
            "name": "Sala",
            "server": "localhost,5433",
            "authentication": "SQL Server Authentication",
            "username": "admin",
            "password": "pw",
            "database": "MenuDB"
        });
        let new: NewConnection = serde_json::from_value(body).unwrap();
        assert_eq!(new.authentication, AuthenticationMode::SqlCredential);
        assert_eq!(new.engine, DatabaseType::PostgreSQL);
        assert!(!new.save_credentials);
        assert!(new.validate().is_ok());
    }

    #[test]
    fn test_validation_names_the_field() {
        let mut new = sample();
        new.server = "  ".to_string();
        let err = new.validate().unwrap_err();
        assert!(err.contains("Server address is required"));
        assert!(err.contains("\"server\""));
    }

    #[test]
    fn test_platform_credential_needs_no_password() {
        let mut new = sample();
        new.authentication = AuthenticationMode::PlatformCredential;
        new.username = String::new();
        new.password = String::new();
        assert!(new.validate().is_ok());
    }

    #[test]
    fn test_host_and_port() {
        let mut profile = ConnectionProfile::from_new(1, sample());
        assert_eq!(profile.host_and_port().unwrap(), ("db.local".to_string(), 5432));

        profile.server = "db.local:6543".to_string();
        assert_eq!(profile.host_and_port().unwrap(), ("db.local".to_string(), 6543));

        profile.server = "10.0.0.4,1433".to_string();
        assert_eq!(profile.host_and_port().unwrap(), ("10.0.0.4".to_string(), 1433));

        profile.server = "db.local:notaport".to_string();
        assert!(profile.host_and_port().is_err());
    }

    #[test]
    fn test_apply_patch_keeps_identity() {
        let mut profile = ConnectionProfile::from_new(3, sample());
        let created = profile.created_at;
        profile.apply(ConnectionPatch {
            name: Some("Barra".to_string()),
            engine: Some(DatabaseType::MySQL),
            ..Default::default()
        });
        assert_eq!(profile.id, 3);
        assert_eq!(profile.created_at, created);
        assert_eq!(profile.name, "Barra");
        assert_eq!(profile.engine, DatabaseType::MySQL);
        assert_eq!(profile.username, "sa");
    }

    #[test]
    fn test_patched_profile_is_revalidated() {
        let mut profile = ConnectionProfile::from_new(1, sample());
        profile.apply(ConnectionPatch {
            password: Some(String::new()),
            ..Default::default()
        });
        assert!(profile.validate().unwrap_err().contains("\"password\""));

        let mut new = sample();
        new.authentication = AuthenticationMode::PlatformCredential;
        new.username = String::new();
        new.password = String::new();
        let mut profile = ConnectionProfile::from_new(2, new);
        assert!(profile.validate().is_ok());
        profile.apply(ConnectionPatch {
            authentication: Some(AuthenticationMode::SqlCredential),
            ..Default::default()
        });
        assert!(profile.validate().unwrap_err().contains("\"username\""));
    }
}
