// Best-effort classification of raw driver messages for UI hints.
// Substring heuristics only; swap for driver error codes where available.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Server unreachable, login rejected, timeouts
    Connection,
    /// Bad syntax or unknown objects
    Syntax,
    /// Missing privileges
    Permission,
    Other,
}

const CONNECTION_MARKERS: &[&str] = &[
    "login failed",
    "cannot connect",
    "network-related",
    "connection timeout",
    "connection refused",
    "could not connect",
    "password authentication failed",
    "access denied for user",
    "error connecting",
    "timed out",
];

const SYNTAX_MARKERS: &[&str] = &[
    "incorrect syntax",
    "syntax error",
    "invalid object name",
    "multi-part identifier",
    "invalid column name",
    "does not exist",
    "doesn't exist",
    "unknown column",
    "sqlstate 42601",
    "sqlstate 42p01",
    "sqlstate 42703",
];

const PERMISSION_MARKERS: &[&str] = &["permission", "denied", "authorization", "sqlstate 42501"];

/// Maps a driver message to an [`ErrorClass`]. Connection markers win over
/// permission markers so that "Access denied for user" reads as a login problem.
pub fn classify(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    let contains_any = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if contains_any(CONNECTION_MARKERS) {
        ErrorClass::Connection
    } else if contains_any(SYNTAX_MARKERS) {
        ErrorClass::Syntax
    } else if contains_any(PERMISSION_MARKERS) {
        ErrorClass::Permission
    } else {
        ErrorClass::Other
    }
}
