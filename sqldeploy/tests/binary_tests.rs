//! Tests running the compiled binary and checking its console contract.

#![allow(clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn sqldeploy() -> Command {
    let mut cmd = Command::cargo_bin("sqldeploy").unwrap();
    for var in [
        "SQL_SERVER_FQDN",
        "SQL_DATABASE",
        "SQL_SERVER_PORT",
        "ManagedIdentityName",
        "SQLDEPLOY_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_missing_server_fails_before_banner() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("database_schema.sql");
    std::fs::write(&script, "CREATE TABLE dbo.t (id int)\nGO\n").unwrap();

    sqldeploy()
        .args(["schema", "--script"])
        .arg(&script)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("SQL_SERVER_FQDN"));
}

#[test]
fn test_missing_script_fails_before_banner() {
    let dir = tempfile::tempdir().unwrap();

    sqldeploy()
        .env("SQL_SERVER_FQDN", "srv.example")
        .args(["procs", "--script"])
        .arg(dir.path().join("stored-procedures.sql"))
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("stored-procedures.sql"));
}

#[test]
fn test_dry_run_prints_banner_and_batches() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("script.sql");
    std::fs::write(
        &script,
        "CREATE USER [MANAGED-IDENTITY-NAME] FROM EXTERNAL PROVIDER;\nGO\nALTER ROLE db_datareader ADD MEMBER [MANAGED-IDENTITY-NAME];\nGO\n",
    )
    .unwrap();

    sqldeploy()
        .env("SQL_SERVER_FQDN", "srv.example")
        .env("ManagedIdentityName", "mid-orders")
        .args(["dbrole", "--dry-run", "--script"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("→  Server           : srv.example"))
        .stdout(predicate::str::contains("→  Managed identity : mid-orders"))
        .stdout(predicate::str::contains("CREATE USER [mid-orders]"))
        .stdout(predicate::str::contains("Dry run: 2 batch(es)"));
}
