use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::result::TabularResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Success,
    Error,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Success => "success",
            QueryStatus::Error => "error",
        }
    }
}

impl FromStr for QueryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(QueryStatus::Success),
            "error" => Ok(QueryStatus::Error),
            other => Err(format!("Unknown query status: {}", other)),
        }
    }
}

/// One execution attempt, written once and never changed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecord {
    pub id: i64,
    pub connection_id: Option<i64>,
    pub query: String,
    pub status: QueryStatus,
    /// Milliseconds
    pub execution_time: Option<u64>,
    pub error: Option<String>,
    pub results: Option<TabularResult>,
    pub created_at: DateTime<Utc>,
}

impl QueryRecord {
    pub fn from_new(id: i64, new: NewQueryRecord) -> Self {
        Self {
            id,
            connection_id: new.connection_id,
            query: new.query,
            status: new.status,
            execution_time: new.execution_time,
            error: new.error,
            results: new.results,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewQueryRecord {
    pub connection_id: Option<i64>,
    pub query: String,
    pub status: QueryStatus,
    pub execution_time: Option<u64>,
    pub error: Option<String>,
    pub results: Option<TabularResult>,
}

impl NewQueryRecord {
    pub fn success(connection_id: i64, query: String, result: TabularResult) -> Self {
        Self {
            connection_id: Some(connection_id),
            query,
            status: QueryStatus::Success,
            execution_time: Some(result.execution_time),
            error: None,
            results: Some(result),
        }
    }

    pub fn failed(
        connection_id: i64,
        query: String,
        execution_time: Option<u64>,
        error: String,
    ) -> Self {
        Self {
            connection_id: Some(connection_id),
            query,
            status: QueryStatus::Error,
            execution_time,
            error: Some(error),
            results: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteQueryRequest {
    pub connection_id: i64,
    pub query: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryListParams {
    pub connection_id: Option<String>,
}
