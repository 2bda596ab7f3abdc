//! Database connection capabilities.
//!
//! The runner only sees these traits; the SQL Server driver lives in the
//! binary crate and tests substitute in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::Result;
use crate::token::EncodedToken;

/// Default SQL Server port.
pub const DEFAULT_PORT: u16 = 1433;

/// Default bound on connection establishment.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where to connect. Holds no credentials and is safe to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    /// Server host name (e.g. `myserver.database.windows.net`)
    pub server: String,
    /// TCP port
    pub port: u16,
    /// Database to open
    pub database: String,
    /// Bound on establishing the session
    pub connect_timeout: Duration,
}

impl ConnectionTarget {
    /// Human-readable description without credentials.
    pub fn safe_description(&self) -> String {
        format!(
            "{}:{}/{} (timeout: {:?})",
            self.server, self.port, self.database, self.connect_timeout
        )
    }
}

/// Error text reported by the engine for one batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutionError {
    message: String,
}

impl ExecutionError {
    /// Wraps an engine error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Engine error text.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Opens authenticated database sessions.
///
/// Implementations must pass the token out-of-band (never inside a
/// connection string), require encrypted transport, and leave every batch
/// in autocommit mode.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a session to `target` authenticated with `token`.
    ///
    /// # Errors
    /// Returns [`crate::DeployError::Connection`] when the session cannot be
    /// established within the target's connect timeout.
    async fn connect(
        &self,
        target: &ConnectionTarget,
        token: &EncodedToken,
    ) -> Result<Box<dyn Connection>>;
}

/// An open database session executing SQL batches one at a time.
#[async_trait]
pub trait Connection: Send {
    /// Executes one batch, returning the affected row count when known.
    async fn execute(&mut self, sql: &str) -> std::result::Result<Option<u64>, ExecutionError>;

    /// Closes the session. Dropping an unclosed session must still release it.
    async fn close(&mut self) -> Result<()>;
}
