// PostgreSQL sessions over tokio-postgres, one client per session
use crate::models::{AuthenticationMode, ConnectionProfile, Row, SqlValue, TableInfo, TableKind};
use crate::services::database::adapter::{DatabaseSession, DriverError, Recordset};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::error::Error;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{Client, NoTls};

pub struct PostgreSQLSession {
    client: Client,
    connection: JoinHandle<()>,
}

impl PostgreSQLSession {
    pub async fn connect(
        profile: &ConnectionProfile,
        connect_timeout: Duration,
    ) -> Result<Self, DriverError> {
        let (host, port) = profile.host_and_port().map_err(DriverError::Connection)?;

        let mut cfg = tokio_postgres::Config::new();
        cfg.host(&host)
            .port(port)
            .dbname(&profile.database)
            .application_name("restaurant-sql-admin")
            .connect_timeout(connect_timeout);

        let user = if profile.username.is_empty() {
            std::env::var("USER").unwrap_or_else(|_| "postgres".to_string())
        } else {
            profile.username.clone()
        };
        cfg.user(&user);
        if profile.authentication == AuthenticationMode::SqlCredential {
            cfg.password(&profile.password);
        }

        tracing::debug!("Opening PostgreSQL session to {}:{}/{}", host, port, profile.database);

        let (client, connection) = cfg
            .connect(NoTls)
            .await
            .map_err(|e| DriverError::Connection(describe_error(&e)))?;

        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self { client, connection })
    }
}

#[async_trait::async_trait]
impl DatabaseSession for PostgreSQLSession {
    async fn execute(&mut self, sql: &str) -> Result<Recordset, DriverError> {
        let statement = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| DriverError::Execution(describe_error(&e)))?;

        // Statements without a result shape only report a row count
        if statement.columns().is_empty() {
            let affected = self
                .client
                .execute(&statement, &[])
                .await
                .map_err(|e| DriverError::Execution(describe_error(&e)))?;
            return Ok(Recordset::affected(affected));
        }

        let rows = self
            .client
            .query(&statement, &[])
            .await
            .map_err(|e| DriverError::Execution(describe_error(&e)))?;

        Ok(Recordset::from_rows(rows.iter().map(convert_row).collect()))
    }

    async fn list_databases(&mut self) -> Result<Vec<String>, DriverError> {
        let rows = self
            .client
            .query(
                "SELECT datname FROM pg_database WHERE NOT datistemplate ORDER BY datname",
                &[],
            )
            .await
            .map_err(|e| DriverError::Execution(describe_error(&e)))?;

        Ok(rows.iter().map(|row| row.get::<_, String>(0)).collect())
    }

    async fn list_tables(&mut self) -> Result<Vec<TableInfo>, DriverError> {
        let rows = self
            .client
            .query(
                r#"
                SELECT
                    table_name::text,
                    table_schema::text,
                    table_type::text
                FROM information_schema.tables
                WHERE table_schema NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
                ORDER BY table_type, table_schema, table_name
                "#,
                &[],
            )
            .await
            .map_err(|e| DriverError::Execution(describe_error(&e)))?;

        Ok(rows
            .iter()
            .map(|row| TableInfo {
                name: row.get(0),
                schema: row.get(1),
                kind: TableKind::from_table_type(&row.get::<_, String>(2)),
            })
            .collect())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        let PostgreSQLSession { client, connection } = *self;
        // The connection task finishes once its client is gone
        drop(client);
        connection
            .await
            .map_err(|e| DriverError::Connection(format!("Failed to close session: {}", e)))
    }
}

/// Engine message plus SQLSTATE when the server sent one
fn describe_error(e: &tokio_postgres::Error) -> String {
    match e.as_db_error() {
        Some(db_error) => {
            let mut msg = format!("{} (SQLSTATE {})", db_error.message(), db_error.code().code());
            if let Some(detail) = db_error.detail() {
                msg.push_str(&format!(" Detail: {}", detail));
            }
            if let Some(hint) = db_error.hint() {
                msg.push_str(&format!(" Hint: {}", hint));
            }
            msg
        }
        None => match e.source() {
            Some(source) => format!("{}: {}", e, source),
            None => e.to_string(),
        },
    }
}

fn convert_row(row: &tokio_postgres::Row) -> Row {
    let mut out = Row::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        out.push(column.name(), convert_value(row, idx, column.type_()));
    }
    out
}

fn get<'a, T: FromSql<'a>>(row: &'a tokio_postgres::Row, idx: usize) -> Option<T> {
    row.try_get::<_, Option<T>>(idx).ok().flatten()
}

fn convert_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> SqlValue {
    match *ty {
        Type::BOOL => get::<bool>(row, idx).into(),
        Type::INT2 => get::<i16>(row, idx).map(i64::from).into(),
        Type::INT4 => get::<i32>(row, idx).map(i64::from).into(),
        Type::INT8 => get::<i64>(row, idx).into(),
        Type::OID => get::<u32>(row, idx).map(i64::from).into(),
        Type::FLOAT4 => get::<f32>(row, idx).map(f64::from).into(),
        Type::FLOAT8 => get::<f64>(row, idx).into(),
        // NaN, infinities and values beyond 28 digits have no Decimal form
        Type::NUMERIC => match row.try_get::<_, Option<Decimal>>(idx) {
            Ok(value) => value.into(),
            Err(_) => SqlValue::Text(format!("<{}>", ty.name())),
        },
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx).into(),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx)
            .map(|dt| dt.naive_utc())
            .into(),
        Type::DATE => get::<NaiveDate>(row, idx)
            .map(|d| d.and_time(chrono::NaiveTime::MIN))
            .into(),
        Type::BYTEA => match get::<Vec<u8>>(row, idx) {
            Some(bytes) => SqlValue::Bytes(bytes),
            None => SqlValue::Null,
        },
        _ => match row.try_get::<_, Option<String>>(idx) {
            Ok(Some(v)) => SqlValue::Text(v),
            Ok(None) => SqlValue::Null,
            // Types without a text decoding are shown by name
            Err(_) => SqlValue::Text(format!("<{}>", ty.name())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// NUMERIC binary wire form: base-10000 digit groups
    fn wire_numeric(weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&(digits.len() as u16).to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&dscale.to_be_bytes());
        for d in digits {
            raw.extend_from_slice(&d.to_be_bytes());
        }
        raw
    }

    fn decode(raw: &[u8]) -> String {
        let value = Decimal::from_sql(&Type::NUMERIC, raw).unwrap();
        SqlValue::from(value).to_native_string()
    }

    #[test]
    fn test_numeric_decodes_exactly() {
        let raw = wire_numeric(2, 0, 9, &[1, 2345, 6789, 1234, 5678, 9000]);
        assert_eq!(decode(&raw), "123456789.123456789");
        assert_eq!(decode(&wire_numeric(0, 0, 2, &[18, 5000])), "18.50");
        assert_eq!(decode(&wire_numeric(-1, 0x4000, 4, &[1])), "-0.0001");
        assert_eq!(decode(&wire_numeric(0, 0, 0, &[])), "0");
    }
}
