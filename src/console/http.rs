use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use super::{ConsoleApi, ConsoleError};
use crate::api::middleware::ErrorResponse;
use crate::models::{ConnectionProfile, ExecuteQueryRequest, TabularResult};

/// [`ConsoleApi`] over the JSON endpoints of a running server
#[derive(Debug, Clone)]
pub struct HttpConsoleApi {
    client: Client,
    base_url: Url,
}

impl HttpConsoleApi {
    /// `base_url` is the server root, e.g. `http://localhost:3000`
    pub fn new(base_url: &str) -> Result<Self, ConsoleError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, ConsoleError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ConsoleError::InvalidUrl(e.to_string()))?;
        // Url::join drops the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ConsoleError> {
        self.base_url
            .join(path)
            .map_err(|e| ConsoleError::InvalidUrl(e.to_string()))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ConsoleError> {
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(ConsoleError::from);
        }

        let body = response.text().await.map_err(ConsoleError::from)?;
        let error = serde_json::from_str::<ErrorResponse>(&body).unwrap_or_else(|_| {
            ErrorResponse::new(if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            })
        });
        Err(ConsoleError::Api {
            status: status.as_u16(),
            message: error.message,
            error: error.error,
            kind: error.kind,
        })
    }
}

#[async_trait::async_trait]
impl ConsoleApi for HttpConsoleApi {
    async fn list_connections(&self) -> Result<Vec<ConnectionProfile>, ConsoleError> {
        let response = self
            .client
            .get(self.endpoint("api/connections")?)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn execute(&self, connection_id: i64, sql: &str) -> Result<TabularResult, ConsoleError> {
        let request = ExecuteQueryRequest {
            connection_id,
            query: sql.to_string(),
        };
        let response = self
            .client
            .post(self.endpoint("api/query")?)
            .json(&request)
            .send()
            .await?;
        Self::decode(response).await
    }
}
