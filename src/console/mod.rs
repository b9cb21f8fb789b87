//! Query console: the client-side state machine behind the SQL editor.
//!
//! The console owns the editor text, the selected connection, the last
//! result and the notice shown to the operator. It talks to the server only
//! through [`ConsoleApi`], so it can be driven by [`HttpConsoleApi`] or by a
//! fake in tests.

pub mod forms;
pub mod http;
pub mod pagination;
pub mod sql;

pub use forms::{EntityForm, FormError};
pub use http::HttpConsoleApi;
pub use pagination::{PageLink, ROWS_PER_PAGE};
pub use sql::{format_sql, SQL_TEMPLATES};

use thiserror::Error;

use crate::config::Config;
use crate::models::{ConnectionProfile, Row, TabularResult};
use crate::services::error_classifier::{classify, ErrorClass};
use crate::services::{CsvExporter, ExportFile, ValueFormatter};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConsoleError {
    #[error("Request failed: {0}")]
    Transport(String),

    /// Non-2xx answer; `error` carries the driver message when there is one
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        error: Option<String>,
        kind: Option<ErrorClass>,
    },

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

impl ConsoleError {
    /// Most specific text available for the operator
    pub fn detail(&self) -> String {
        match self {
            ConsoleError::Api {
                error: Some(error), ..
            } => error.clone(),
            other => other.to_string(),
        }
    }

    fn kind(&self) -> ErrorClass {
        match self {
            ConsoleError::Api {
                kind: Some(kind), ..
            } => *kind,
            ConsoleError::Transport(_) => ErrorClass::Connection,
            other => classify(&other.detail()),
        }
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        ConsoleError::Transport(err.to_string())
    }
}

/// Server operations the console depends on
#[async_trait::async_trait]
pub trait ConsoleApi: Send + Sync {
    async fn list_connections(&self) -> Result<Vec<ConnectionProfile>, ConsoleError>;

    async fn execute(&self, connection_id: i64, sql: &str) -> Result<TabularResult, ConsoleError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Toast-style message for the operator
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
    pub kind: Option<ErrorClass>,
}

impl Notice {
    fn new(level: NoticeLevel, title: &str, description: impl Into<String>) -> Self {
        Self {
            level,
            title: title.to_string(),
            description: description.into(),
            kind: None,
        }
    }

    fn failure(title: &str, err: &ConsoleError) -> Self {
        Self {
            kind: Some(err.kind()),
            ..Self::new(NoticeLevel::Error, title, err.detail())
        }
    }
}

/// A run claimed by [`QueryConsole::begin_execution`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub connection_id: i64,
    pub sql: String,
}

pub struct QueryConsole<A: ConsoleApi> {
    api: A,
    formatter: ValueFormatter,
    connections: Vec<ConnectionProfile>,
    selected: Option<ConnectionProfile>,
    sql: String,
    executing: bool,
    result: Option<TabularResult>,
    notice: Option<Notice>,
    page: usize,
}

impl<A: ConsoleApi> QueryConsole<A> {
    pub fn new(api: A, formatter: ValueFormatter) -> Self {
        Self {
            api,
            formatter,
            connections: Vec::new(),
            selected: None,
            sql: String::new(),
            executing: false,
            result: None,
            notice: None,
            page: 1,
        }
    }

    /// Console whose grid uses the configured display locale
    pub fn with_config(api: A, config: &Config) -> Self {
        Self::new(api, ValueFormatter::new(config.number_locale()))
    }

    /// Reloads the saved profiles. A selection that no longer exists is dropped.
    pub async fn refresh_connections(&mut self) -> Result<&[ConnectionProfile], ConsoleError> {
        match self.api.list_connections().await {
            Ok(connections) => {
                self.connections = connections;
                if let Some(selected) = &self.selected {
                    if !self.connections.iter().any(|c| c.id == selected.id) {
                        self.selected = None;
                        self.reset_results();
                    }
                }
                Ok(&self.connections)
            }
            Err(err) => {
                self.notice = Some(Notice::failure("Failed to load connections", &err));
                Err(err)
            }
        }
    }

    pub fn connections(&self) -> &[ConnectionProfile] {
        &self.connections
    }

    /// Switches to a known profile and clears results from the previous one
    pub fn select_connection(&mut self, connection_id: i64) -> bool {
        let found = self
            .connections
            .iter()
            .find(|c| c.id == connection_id)
            .cloned();
        match found {
            Some(profile) => {
                self.reset_results();
                self.notice = Some(Notice::new(
                    NoticeLevel::Info,
                    "Connected",
                    format!("Using {} ({})", profile.name, profile.database),
                ));
                self.selected = Some(profile);
                true
            }
            None => {
                self.notice = Some(Notice::new(
                    NoticeLevel::Error,
                    "Unknown Connection",
                    format!("Connection {} is not available.", connection_id),
                ));
                false
            }
        }
    }

    pub fn disconnect(&mut self) {
        self.selected = None;
        self.reset_results();
    }

    pub fn selected_connection(&self) -> Option<&ConnectionProfile> {
        self.selected.as_ref()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn set_sql(&mut self, sql: impl Into<String>) {
        self.sql = sql.into();
    }

    pub fn load_template(&mut self, name: &str) -> bool {
        match sql::template(name) {
            Some(template) => {
                self.sql = template.to_string();
                true
            }
            None => false,
        }
    }

    /// Reflows the editor text; blank text is left alone
    pub fn format_sql(&mut self) {
        if self.sql.trim().is_empty() {
            return;
        }
        self.sql = format_sql(&self.sql);
        self.notice = Some(Notice::new(
            NoticeLevel::Success,
            "Query Formatted",
            "SQL query has been formatted.",
        ));
    }

    pub fn is_executing(&self) -> bool {
        self.executing
    }

    /// Claims the console for a run of the editor text.
    ///
    /// Rejected with a notice without a selection, with blank text or while
    /// another run is still pending. On success the console stays busy until
    /// [`finish_execution`](Self::finish_execution) is called.
    pub fn begin_execution(&mut self) -> Option<PendingQuery> {
        if self.executing {
            self.notice = Some(Notice::new(
                NoticeLevel::Info,
                "Query Running",
                "Wait for the current query to finish.",
            ));
            return None;
        }
        let Some(connection_id) = self.selected.as_ref().map(|c| c.id) else {
            self.notice = Some(Notice::new(
                NoticeLevel::Error,
                "Not Connected",
                "Please connect to a database first.",
            ));
            return None;
        };
        if self.sql.trim().is_empty() {
            self.notice = Some(Notice::new(
                NoticeLevel::Error,
                "Empty Query",
                "Please enter a SQL query to execute.",
            ));
            return None;
        }

        self.executing = true;
        Some(PendingQuery {
            connection_id,
            sql: self.sql.clone(),
        })
    }

    /// Records the outcome of a pending run. A failed run leaves no result
    /// behind, so a stale grid is never shown next to an error.
    pub fn finish_execution(
        &mut self,
        outcome: Result<TabularResult, ConsoleError>,
    ) -> Option<&TabularResult> {
        self.executing = false;
        self.page = 1;

        match outcome {
            Ok(result) => {
                self.notice = Some(Notice::new(
                    NoticeLevel::Success,
                    "Query Executed",
                    format!(
                        "{} row(s) in {} ms.",
                        result.row_count, result.execution_time
                    ),
                ));
                self.result = Some(result);
                self.result.as_ref()
            }
            Err(err) => {
                self.result = None;
                self.notice = Some(Notice::failure("Query Failed", &err));
                None
            }
        }
    }

    /// Runs the editor text on the selected connection through the API
    pub async fn execute(&mut self) -> Option<&TabularResult> {
        let pending = self.begin_execution()?;
        let outcome = self.api.execute(pending.connection_id, &pending.sql).await;
        self.finish_execution(outcome)
    }

    /// Stores one row through the form's `INSERT` on the selected connection.
    /// Validation failures are reported without reaching the server.
    pub async fn submit_form(&mut self, form: &dyn EntityForm) -> bool {
        let Some(engine) = self.selected.as_ref().map(|c| c.engine) else {
            self.notice = Some(Notice::new(
                NoticeLevel::Error,
                "Not Connected",
                "Please connect to a database first.",
            ));
            return false;
        };
        let insert = match form.to_insert() {
            Ok(insert) => insert,
            Err(err) => {
                self.notice = Some(Notice::new(NoticeLevel::Error, "Datos inválidos", err.message));
                return false;
            }
        };

        self.sql = insert.to_sql(engine);
        if self.execute().await.is_none() {
            if let Some(notice) = self.notice.as_mut().filter(|n| n.level == NoticeLevel::Error) {
                notice.title = format!("Error al guardar en {}", insert.table());
            }
            return false;
        }
        self.notice = Some(Notice::new(NoticeLevel::Success, "¡Éxito!", form.success_message()));
        true
    }

    /// Loads the ingredients of one dish into the grid
    pub async fn show_dish_ingredients(&mut self, dish_id: i64) -> Option<&TabularResult> {
        self.sql = sql::dish_ingredients(dish_id);
        self.execute().await
    }

    /// Drops and recreates the restaurant tables on the selected connection,
    /// stopping at the first statement that fails
    pub async fn install_restaurant_schema(&mut self) -> bool {
        let Some(profile) = self.selected.clone() else {
            self.notice = Some(Notice::new(
                NoticeLevel::Error,
                "Not Connected",
                "Please connect to a database first.",
            ));
            return false;
        };

        let statements = sql::restaurant_schema(profile.engine);
        for statement in &statements {
            if let Err(err) = self.api.execute(profile.id, statement).await {
                self.notice = Some(Notice::failure("Schema Failed", &err));
                return false;
            }
        }
        self.reset_results();
        self.notice = Some(Notice::new(
            NoticeLevel::Success,
            "Schema Created",
            format!("{} statement(s) ran on {}.", statements.len(), profile.database),
        ));
        true
    }

    pub fn reset_results(&mut self) {
        self.result = None;
        self.page = 1;
    }

    pub fn result(&self) -> Option<&TabularResult> {
        self.result.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    fn total_rows(&self) -> usize {
        self.result.as_ref().map_or(0, |r| r.rows.len())
    }

    pub fn total_pages(&self) -> usize {
        pagination::total_pages(self.total_rows())
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    /// Moves to `page`, clamped to the available pages
    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages().max(1));
    }

    pub fn next_page(&mut self) {
        self.set_page(self.page + 1);
    }

    pub fn previous_page(&mut self) {
        self.set_page(self.page.saturating_sub(1));
    }

    pub fn page_links(&self) -> Vec<PageLink> {
        pagination::page_links(self.page, self.total_pages())
    }

    pub fn current_rows(&self) -> &[Row] {
        match &self.result {
            Some(result) => {
                let (start, end) = pagination::page_bounds(self.page, result.rows.len());
                &result.rows[start..end]
            }
            None => &[],
        }
    }

    /// "Showing x to y of n results", or nothing for an empty grid
    pub fn page_summary(&self) -> Option<String> {
        let total = self.total_rows();
        (total > 0).then(|| pagination::summary(self.page, total))
    }

    /// Display strings for one row, in column order
    pub fn display_row(&self, row: &Row) -> Vec<String> {
        let Some(result) = &self.result else {
            return Vec::new();
        };
        result
            .columns
            .iter()
            .map(|column| match row.get(&column.name) {
                Some(value) => self.formatter.format(value),
                None => crate::services::NULL_MARKER.to_string(),
            })
            .collect()
    }

    /// CSV of the whole current result
    pub fn export(&mut self) -> Option<ExportFile> {
        let exported = self
            .result
            .as_ref()
            .ok_or(crate::services::ExportError::NothingToExport)
            .and_then(CsvExporter::export);

        match exported {
            Ok(file) => {
                self.notice = Some(Notice::new(
                    NoticeLevel::Success,
                    "Export Successful",
                    "Query results have been exported to CSV.",
                ));
                Some(file)
            }
            Err(err) => {
                self.notice = Some(Notice::new(
                    NoticeLevel::Error,
                    "No Data to Export",
                    err.to_string(),
                ));
                None
            }
        }
    }
}
