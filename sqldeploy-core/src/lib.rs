//! Core SQL batch deployment pipeline for sqldeploy.
//!
//! This crate deploys SQL scripts to Azure SQL Database using short-lived
//! access tokens instead of static credentials. It provides the pipeline
//! pieces shared by every deployment variant:
//!
//! - [`substitution`]: placeholder rewriting into scoped temporary copies
//! - [`batch`]: splitting scripts on `GO` separator lines
//! - [`token`]: token acquisition and driver attribute encoding
//! - [`runner`]: sequential execution with per-batch fault isolation
//!
//! # Security Guarantees
//! - Tokens are held in zeroizing buffers and never logged
//! - Tokens reach the driver out-of-band, never inside a connection string
//! - Source scripts are never modified
//!
//! # Architecture
//! The credential provider and the database driver sit behind the
//! [`TokenProvider`] and [`Connector`] traits so the pipeline can run
//! against fakes in tests.

pub mod batch;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod report;
pub mod runner;
pub mod script;
pub mod substitution;
pub mod token;

// Re-export commonly used types
pub use batch::{Batch, BatchSequence, segment, segment_with};
pub use config::{DEFAULT_DATABASE, DEFAULT_IDENTITY_NAME, DeployConfig, DeploymentKind};
pub use connection::{Connection, ConnectionTarget, Connector, ExecutionError};
pub use error::{DeployError, Result};
pub use logging::init_logging;
pub use report::{BatchOutcome, ExecutionResult, RunObserver, RunReport, RunStatus};
pub use runner::{Deployer, Plan, plan};
pub use script::ScriptSource;
pub use substitution::{IDENTITY_PLACEHOLDER, PlaceholderRule, PreparedScript, substitute};
pub use token::{
    AccessToken, CredentialError, DATABASE_SCOPE, EncodedToken, SQL_COPT_SS_ACCESS_TOKEN,
    TokenBroker, TokenProvider,
};
