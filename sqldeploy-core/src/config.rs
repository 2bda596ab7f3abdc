//! Deployment configuration and the built-in deployment variants.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::DEFAULT_SEPARATOR;
use crate::connection::{ConnectionTarget, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT};
use crate::error::{DeployError, Result};
use crate::substitution::PlaceholderRule;

/// Database opened when none is configured.
pub const DEFAULT_DATABASE: &str = "Northwind";

/// Managed identity substituted into role scripts when none is configured.
pub const DEFAULT_IDENTITY_NAME: &str = "mid-AppModAssist";

/// The three deployment variants sharing the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentKind {
    /// Tables, keys and seed data
    Schema,
    /// Stored procedure definitions
    StoredProcedures,
    /// Managed identity user and role membership
    DatabaseRole,
}

impl DeploymentKind {
    /// Script path used when none is given.
    pub const fn default_script(self) -> &'static str {
        match self {
            Self::Schema => "Database-Schema/database_schema.sql",
            Self::StoredProcedures => "stored-procedures.sql",
            Self::DatabaseRole => "script.sql",
        }
    }

    /// Whether the variant substitutes the managed identity placeholder.
    pub const fn uses_identity_placeholder(self) -> bool {
        matches!(self, Self::DatabaseRole)
    }

    /// Summary printed after a clean run.
    pub const fn success_message(self) -> &'static str {
        match self {
            Self::Schema => "Schema imported successfully",
            Self::StoredProcedures => "Stored procedures deployed successfully",
            Self::DatabaseRole => "Database role configuration completed successfully",
        }
    }
}

impl std::fmt::Display for DeploymentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Schema => write!(f, "schema import"),
            Self::StoredProcedures => write!(f, "stored procedure deployment"),
            Self::DatabaseRole => write!(f, "database role configuration"),
        }
    }
}

/// Everything one deployment run needs. Holds no credentials.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Deployment variant
    pub kind: DeploymentKind,
    /// Server host name; required
    pub server: String,
    /// Server port
    pub port: u16,
    /// Target database
    pub database: String,
    /// Script to deploy
    pub script: PathBuf,
    /// Optional placeholder rewrite applied to a temporary copy
    pub placeholder: Option<PlaceholderRule>,
    /// Batch separator keyword
    pub separator: String,
    /// Bound on connection establishment
    pub connect_timeout: Duration,
}

impl DeployConfig {
    /// Configuration for `kind` against `server` with all defaults applied.
    ///
    /// Role deployments get the default identity placeholder rule.
    pub fn new(kind: DeploymentKind, server: impl Into<String>) -> Self {
        let placeholder = kind
            .uses_identity_placeholder()
            .then(|| PlaceholderRule::managed_identity(DEFAULT_IDENTITY_NAME));

        Self {
            kind,
            server: server.into().trim().to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            script: PathBuf::from(kind.default_script()),
            placeholder,
            separator: DEFAULT_SEPARATOR.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the target database.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into().trim().to_string();
        self
    }

    /// Sets the script path.
    #[must_use]
    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = script.into();
        self
    }

    /// Sets the server port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets or clears the placeholder rule.
    #[must_use]
    pub fn with_placeholder(mut self, rule: Option<PlaceholderRule>) -> Self {
        self.placeholder = rule;
        self
    }

    /// Replaces the managed identity substituted into the script.
    #[must_use]
    pub fn with_identity_name(self, identity_name: impl Into<String>) -> Self {
        let identity_name = identity_name.into().trim().to_string();
        self.with_placeholder(Some(PlaceholderRule::managed_identity(identity_name)))
    }

    /// Sets the batch separator keyword.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Sets the connection establishment timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Script path as configured.
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Managed identity being configured, for role deployments.
    pub fn identity_name(&self) -> Option<&str> {
        self.placeholder.as_ref().map(PlaceholderRule::replacement)
    }

    /// Checks required settings without touching the network or reading
    /// the script.
    ///
    /// # Errors
    /// Returns [`DeployError::Configuration`] for a missing server, a
    /// missing script file, an empty separator, or an empty placeholder.
    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(DeployError::configuration(
                "SQL server address is not set (SQL_SERVER_FQDN)",
            ));
        }

        if !self.script.is_file() {
            return Err(DeployError::configuration(format!(
                "SQL script file not found: {}",
                self.script.display()
            )));
        }

        if self.separator.trim().is_empty() {
            return Err(DeployError::configuration(
                "Batch separator must not be empty",
            ));
        }

        if let Some(rule) = &self.placeholder
            && rule.placeholder().is_empty()
        {
            return Err(DeployError::configuration("Placeholder must not be empty"));
        }

        if self.connect_timeout.is_zero() {
            return Err(DeployError::configuration(
                "Connect timeout must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Connection target derived from this configuration.
    pub fn target(&self) -> ConnectionTarget {
        ConnectionTarget {
            server: self.server.clone(),
            port: self.port,
            database: self.database.clone(),
            connect_timeout: self.connect_timeout,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn script_file() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "SELECT 1").unwrap();
        file
    }

    #[test]
    fn test_defaults_per_kind() {
        let schema = DeployConfig::new(DeploymentKind::Schema, "srv");
        assert_eq!(schema.database, DEFAULT_DATABASE);
        assert_eq!(schema.port, DEFAULT_PORT);
        assert_eq!(schema.script(), Path::new("Database-Schema/database_schema.sql"));
        assert!(schema.placeholder.is_none());

        let role = DeployConfig::new(DeploymentKind::DatabaseRole, "srv");
        assert_eq!(role.script(), Path::new("script.sql"));
        assert_eq!(role.identity_name(), Some(DEFAULT_IDENTITY_NAME));
    }

    #[test]
    fn test_values_are_trimmed() {
        let config = DeployConfig::new(DeploymentKind::DatabaseRole, "  srv.example  ")
            .with_database(" Sales ")
            .with_identity_name(" mid-test ");
        assert_eq!(config.server, "srv.example");
        assert_eq!(config.database, "Sales");
        assert_eq!(config.identity_name(), Some("mid-test"));
    }

    #[test]
    fn test_validate_missing_server() {
        let file = script_file();
        let config = DeployConfig::new(DeploymentKind::Schema, "   ").with_script(file.path());
        let error = config.validate().unwrap_err();
        assert!(matches!(error, DeployError::Configuration { .. }));
        assert!(error.to_string().contains("SQL_SERVER_FQDN"));
    }

    #[test]
    fn test_validate_missing_script() {
        let config = DeployConfig::new(DeploymentKind::StoredProcedures, "srv")
            .with_script("/nonexistent/stored-procedures.sql");
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("stored-procedures.sql"));
    }

    #[test]
    fn test_validate_rejects_empty_separator_and_timeout() {
        let file = script_file();
        let base = DeployConfig::new(DeploymentKind::Schema, "srv").with_script(file.path());
        assert!(base.clone().with_separator(" ").validate().is_err());
        assert!(
            base.clone()
                .with_connect_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(base.validate().is_ok());
    }

    #[test]
    fn test_target_from_config() {
        let config = DeployConfig::new(DeploymentKind::Schema, "srv")
            .with_port(14330)
            .with_database("Sales");
        let target = config.target();
        assert_eq!(target.server, "srv");
        assert_eq!(target.port, 14330);
        assert_eq!(target.database, "Sales");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&DeploymentKind::StoredProcedures).unwrap();
        assert_eq!(json, "\"stored_procedures\"");
    }
}
