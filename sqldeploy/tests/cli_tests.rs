//! End-to-end CLI tests that never reach the network.
//!
//! Dry runs and empty scripts exercise the full command path without a
//! token or database connection.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use clap::Parser;
use sqldeploy::{Cli, execute};
use sqldeploy_core::{DeployError, DeploymentKind};

fn cli(args: &[&str]) -> Cli {
    temp_env::with_vars_unset(
        [
            "SQL_SERVER_FQDN",
            "SQL_DATABASE",
            "SQL_SERVER_PORT",
            "ManagedIdentityName",
        ],
        || Cli::try_parse_from(args).expect("arguments parse"),
    )
}

#[test]
fn test_env_configuration_is_used() {
    let parsed = temp_env::with_vars(
        [
            ("SQL_SERVER_FQDN", Some("  env-server.database.windows.net ")),
            ("SQL_DATABASE", Some("Inventory")),
            ("SQL_SERVER_PORT", Some("14330")),
            ("ManagedIdentityName", Some("mid-from-env")),
        ],
        || Cli::try_parse_from(["sqldeploy", "dbrole"]).unwrap(),
    );
    let config = parsed.to_config();

    assert_eq!(config.kind, DeploymentKind::DatabaseRole);
    assert_eq!(config.server, "env-server.database.windows.net");
    assert_eq!(config.database, "Inventory");
    assert_eq!(config.port, 14330);
    assert_eq!(config.identity_name(), Some("mid-from-env"));
}

#[test]
fn test_env_flags_override_environment() {
    let parsed = temp_env::with_vars(
        [("SQL_SERVER_FQDN", Some("env-server")), ("SQL_DATABASE", Some("EnvDb"))],
        || Cli::try_parse_from(["sqldeploy", "schema", "--server", "flag-server"]).unwrap(),
    );
    let config = parsed.to_config();
    assert_eq!(config.server, "flag-server");
    assert_eq!(config.database, "EnvDb");
}

#[tokio::test]
async fn test_dry_run_succeeds_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("stored-procedures.sql");
    std::fs::write(
        &script,
        "CREATE OR ALTER PROCEDURE dbo.a AS SELECT 1\nGO\nCREATE OR ALTER PROCEDURE dbo.b AS SELECT 2\nGO\n",
    )
    .unwrap();

    let parsed = cli(&[
        "sqldeploy",
        "procs",
        "--quiet",
        "--server",
        "srv.invalid",
        "--script",
        script.to_str().unwrap(),
        "--dry-run",
    ]);

    assert_eq!(execute(&parsed).await.unwrap(), 0);
}

#[tokio::test]
async fn test_missing_server_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("database_schema.sql");
    std::fs::write(&script, "SELECT 1").unwrap();

    let parsed = cli(&["sqldeploy", "schema", "-q", "--script", script.to_str().unwrap()]);

    let error = execute(&parsed).await.unwrap_err();
    assert!(matches!(error, DeployError::Configuration { .. }));
}

#[tokio::test]
async fn test_missing_script_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("absent.sql");

    let parsed = cli(&[
        "sqldeploy",
        "schema",
        "-q",
        "--server",
        "srv.invalid",
        "--script",
        script.to_str().unwrap(),
    ]);

    let error = execute(&parsed).await.unwrap_err();
    assert!(error.to_string().contains("absent.sql"));
}

#[tokio::test]
async fn test_dry_run_of_empty_script_lists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("script.sql");
    std::fs::write(&script, "GO\n\n  go  \n").unwrap();

    let parsed = cli(&[
        "sqldeploy",
        "dbrole",
        "-q",
        "--server",
        "srv.invalid",
        "--script",
        script.to_str().unwrap(),
        "--dry-run",
    ]);

    assert_eq!(execute(&parsed).await.unwrap(), 0);
}

#[cfg(feature = "mssql")]
#[tokio::test]
async fn test_empty_script_still_reports_connection_failure() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("database_schema.sql");
    std::fs::write(&script, "GO\n").unwrap();
    let report_path = dir.path().join("report.json");

    let parsed = cli(&[
        "sqldeploy",
        "schema",
        "-q",
        "--server",
        "127.0.0.1",
        "--port",
        "1",
        "--connect-timeout",
        "2",
        "--script",
        script.to_str().unwrap(),
        "--report",
        report_path.to_str().unwrap(),
    ]);

    let error = execute(&parsed).await.unwrap_err();
    assert!(matches!(
        error,
        DeployError::Authentication { .. } | DeployError::Connection { .. }
    ));
    assert!(!report_path.exists());
}
