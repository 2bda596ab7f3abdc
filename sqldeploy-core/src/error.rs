//! Error types for the deployment pipeline.
//!
//! Access tokens, encoded credential payloads, and script bodies are never
//! included in error messages. Batch failures carry only a short preview of
//! the offending batch.

use thiserror::Error;

/// Remediation shown to the operator when no token could be obtained.
pub const LOGIN_HINT: &str = "Make sure you are logged in: az login";

/// Main error type for sqldeploy operations.
///
/// `Configuration`, `Io`, `Authentication` and `Connection` abort a run.
/// `BatchExecution` is recorded per batch and never stops the run on its own.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Missing or invalid configuration, including a missing script file
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// File read, write or temporary storage failure
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Access token could not be obtained
    #[error("Authentication failed: {context}")]
    Authentication {
        context: String,
        hint: &'static str,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database session could not be established (credentials sanitized)
    #[error("Database connection failed: {context}")]
    Connection {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A single batch was rejected by the database engine
    #[error("Batch {position} failed ({preview}): {detail}")]
    BatchExecution {
        position: usize,
        preview: String,
        detail: String,
    },

    /// Report serialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with DeployError
pub type Result<T> = std::result::Result<T, DeployError>;

impl DeployError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates an authentication error carrying the login remediation hint
    pub fn authentication<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Authentication {
            context: context.into(),
            hint: LOGIN_HINT,
            source: Some(Box::new(error)),
        }
    }

    /// Creates an authentication error without an underlying cause
    pub fn authentication_rejected(context: impl Into<String>) -> Self {
        Self::Authentication {
            context: context.into(),
            hint: LOGIN_HINT,
            source: None,
        }
    }

    /// Creates a connection error with sanitized context
    pub fn connection_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            context: context.into(),
            source: Some(Box::new(error)),
        }
    }

    /// Creates a connection error without an underlying cause
    pub fn connection(context: impl Into<String>) -> Self {
        Self::Connection {
            context: context.into(),
            source: None,
        }
    }

    /// Operator-facing remediation, if this error has one
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            Self::Authentication { hint, .. } => Some(*hint),
            _ => None,
        }
    }

    /// Whether this error aborts the whole run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::BatchExecution { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = DeployError::configuration("SQL_SERVER_FQDN is not set");
        assert!(error.to_string().contains("SQL_SERVER_FQDN"));
        assert!(error.is_fatal());
        assert!(error.remediation().is_none());
    }

    #[test]
    fn test_authentication_carries_hint() {
        let error = DeployError::authentication_rejected("token expired");
        assert_eq!(error.remediation(), Some(LOGIN_HINT));
        assert!(error.to_string().starts_with("Authentication failed"));
    }

    #[test]
    fn test_batch_execution_is_not_fatal() {
        let error = DeployError::BatchExecution {
            position: 2,
            preview: "CREATE TABLE dbo.Users".to_string(),
            detail: "There is already an object named 'Users'".to_string(),
        };
        assert!(!error.is_fatal());
        let message = error.to_string();
        assert!(message.contains("Batch 2"));
        assert!(message.contains("CREATE TABLE dbo.Users"));
    }

    #[test]
    fn test_connection_error_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = DeployError::connection_failed("TCP connect", io);
        assert!(std::error::Error::source(&error).is_some());
    }
}
