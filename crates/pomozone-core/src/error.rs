//! Core error types for pomozone-core.
//!
//! Every engine operation returns a typed outcome; nothing here is fatal to
//! the process. Callers re-issue the command once the underlying condition
//! (permission, network, storage) is resolved.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pomozone-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Bad input, rejected before any collaborator call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Command not valid in the current engine state
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Persistence or platform collaborator failure
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// Focus-zone monitoring failure
    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Input validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("'{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("'{field}' = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("'{field}' must be positive (got {value})")]
    NonPositive { field: &'static str, value: f64 },

    #[error("no focus zone with id '{id}'")]
    UnknownZone { id: String },
}

/// Commands rejected because of the engine's current state.
///
/// The engine state is left untouched when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("a session is already running (id {session_id})")]
    SessionAlreadyActive { session_id: i64 },

    #[error("no session is running")]
    NoActiveSession,
}

/// Failure reported by a collaborator (session/zone persistence).
///
/// Surfaced verbatim; the engines never retry on their own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{service}: {message}")]
pub struct CollaboratorError {
    pub service: String,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            message: message.into(),
        }
    }
}

/// Which half of a reconcile failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcilePhase {
    Remove,
    Add,
}

impl fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcilePhase::Remove => f.write_str("remove"),
            ReconcilePhase::Add => f.write_str("add"),
        }
    }
}

/// Focus-zone monitoring errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// Location permission missing; no platform call was attempted.
    #[error("location permission denied")]
    PermissionDenied,

    /// The platform cap was hit. Zones in `registered` are monitored,
    /// zones in `rejected` are not.
    #[error("region limit of {limit} exceeded; could not register: {rejected:?}")]
    RegionLimitExceeded {
        limit: usize,
        registered: Vec<String>,
        rejected: Vec<String>,
    },

    /// Location service not ready. Transient, reconcile may be retried.
    #[error("location service unavailable during {phase} phase")]
    PlatformUnavailable { phase: ReconcilePhase },

    /// Any other platform rejection.
    #[error("location service rejected {phase} phase: {message}")]
    Platform {
        phase: ReconcilePhase,
        message: String,
    },
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Row addressed by id does not exist
    #[error("{table} row '{id}' not found")]
    NotFound { table: &'static str, id: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Home/data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// The SQLite store reports its failures to the engines as collaborator errors.
impl From<DatabaseError> for CollaboratorError {
    fn from(err: DatabaseError) -> Self {
        CollaboratorError::new("sqlite", err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
