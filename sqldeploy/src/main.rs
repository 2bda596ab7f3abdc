//! SQL deployment tool for Azure SQL Database.
//!
//! Deploys schema, stored procedure and role scripts batch by batch using
//! an Azure AD token from the signed-in Azure CLI session.
//!
//! # Exit codes
//! - `0`: every batch succeeded
//! - `1`: configuration, I/O, authentication or connection failure, or at
//!   least one failed batch

use std::process::ExitCode;

use clap::Parser;
use sqldeploy::{Cli, execute, output::ConsoleReporter};
use sqldeploy_core::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("✗  {e}");
        return ExitCode::FAILURE;
    }

    match execute(&cli).await {
        Ok(status) => ExitCode::from(status),
        Err(e) => {
            tracing::debug!("Run aborted: {:?}", e);
            ConsoleReporter::new(cli.global.quiet).fatal(&e);
            ExitCode::FAILURE
        }
    }
}
