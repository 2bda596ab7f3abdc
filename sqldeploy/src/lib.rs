//! Library module for the sqldeploy binary.
//!
//! Exposes the CLI definition and command execution so they can be tested;
//! `main.rs` only parses arguments, sets up logging and maps the exit code.

pub mod adapters;
pub mod output;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use sqldeploy_core::batch::DEFAULT_SEPARATOR;
use sqldeploy_core::connection::DEFAULT_PORT;
use sqldeploy_core::{
    DEFAULT_DATABASE, DEFAULT_IDENTITY_NAME, DeployConfig, DeploymentKind, Result, RunReport,
};

use crate::output::ConsoleReporter;

/// CLI argument structure
#[derive(Parser, Debug)]
#[command(name = "sqldeploy")]
#[command(about = "Deploy SQL scripts to Azure SQL with token authentication")]
#[command(version)]
#[command(long_about = "
sqldeploy - SQL batch deployment with Azure AD tokens

Splits a SQL script on GO separator lines and executes every batch in order
against Azure SQL Database, authenticating with a token from the signed-in
Azure CLI session. A failing batch is reported and the remaining batches
still run; the exit code is 1 if any batch failed.

SECURITY FEATURES:
- No static database passwords
- Access tokens are never logged or written to disk
- Encrypted transport required

EXAMPLES:
  az login
  export SQL_SERVER_FQDN=myserver.database.windows.net
  sqldeploy schema
  sqldeploy procs --script sql/stored-procedures.sql
  sqldeploy dbrole --identity-name mid-orders-api
  sqldeploy schema --dry-run
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Deployment variants
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import the database schema
    Schema(DeployArgs),
    /// Deploy stored procedures
    Procs(DeployArgs),
    /// Create the managed identity user and assign its roles
    Dbrole(RoleArgs),
}

/// Options shared by every deployment variant
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Server host name
    #[arg(long, env = "SQL_SERVER_FQDN", help = "Fully qualified server name")]
    pub server: Option<String>,

    /// Target database
    #[arg(long, env = "SQL_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Server port
    #[arg(long, env = "SQL_SERVER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Script to deploy (defaults per variant)
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Batch separator keyword
    #[arg(long, default_value = DEFAULT_SEPARATOR)]
    pub separator: String,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    pub connect_timeout: u64,

    /// Write a JSON run report to this path
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Prepare and list batches without connecting
    #[arg(long)]
    pub dry_run: bool,
}

/// Options for the role configuration variant
#[derive(Args, Debug)]
pub struct RoleArgs {
    #[command(flatten)]
    pub deploy: DeployArgs,

    /// Managed identity substituted for MANAGED-IDENTITY-NAME
    #[arg(long, env = "ManagedIdentityName", default_value = DEFAULT_IDENTITY_NAME)]
    pub identity_name: String,
}

/// Flags controlling log output
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(
        short,
        long,
        global = true,
        help = "Only print failures and the final summary"
    )]
    pub quiet: bool,
}

impl DeployArgs {
    fn to_config(&self, kind: DeploymentKind) -> DeployConfig {
        let config = DeployConfig::new(kind, self.server.clone().unwrap_or_default())
            .with_database(self.database.as_str())
            .with_port(self.port)
            .with_separator(self.separator.as_str())
            .with_connect_timeout(Duration::from_secs(self.connect_timeout));

        match &self.script {
            Some(script) => config.with_script(script),
            None => config,
        }
    }
}

impl Cli {
    /// Arguments common to every variant.
    pub fn deploy_args(&self) -> &DeployArgs {
        match &self.command {
            Command::Schema(args) | Command::Procs(args) => args,
            Command::Dbrole(role) => &role.deploy,
        }
    }

    /// Deployment configuration described by the arguments.
    pub fn to_config(&self) -> DeployConfig {
        match &self.command {
            Command::Schema(args) => args.to_config(DeploymentKind::Schema),
            Command::Procs(args) => args.to_config(DeploymentKind::StoredProcedures),
            Command::Dbrole(role) => role
                .deploy
                .to_config(DeploymentKind::DatabaseRole)
                .with_identity_name(role.identity_name.as_str()),
        }
    }
}

/// Process exit status for a finished run: 0 only when no batch failed.
pub fn exit_status(report: &RunReport) -> u8 {
    u8::from(!report.is_success())
}

/// Executes the parsed command, returning the process exit status.
///
/// # Errors
/// Returns the fatal configuration, I/O, authentication or connection error
/// that aborted the run. Batch failures are not errors; they yield status 1.
pub async fn execute(cli: &Cli) -> Result<u8> {
    let config = cli.to_config();
    let args = cli.deploy_args();
    let mut reporter = ConsoleReporter::new(cli.global.quiet);

    config.validate()?;
    reporter.banner(&config);

    if args.dry_run {
        let plan = sqldeploy_core::plan(&config, &mut reporter).await?;
        reporter.dry_run(&plan);
        plan.release();
        return Ok(0);
    }

    let deployer = adapters::create_deployer()?;
    let report = deployer.run(&config, &mut reporter).await?;
    reporter.summary(&report);

    if let Some(path) = &args.report {
        output::save_report(&report, path).await?;
    }

    Ok(exit_status(&report))
}
