//! Deployment orchestration.
//!
//! A run validates configuration, prepares and segments the script, acquires
//! a token, opens one connection and executes every batch in order. Batch
//! failures are recorded and the run moves on; configuration, I/O,
//! authentication and connection failures abort it.
//!
//! The prepared script copy and the connection are scoped: both are released
//! on every exit path, early aborts included.

use crate::batch::BatchSequence;
use crate::config::DeployConfig;
use crate::connection::{Connection, Connector};
use crate::error::Result;
use crate::report::{ExecutionResult, RunObserver, RunReport};
use crate::script::ScriptSource;
use crate::substitution::{PreparedScript, substitute};
use crate::token::{TokenBroker, TokenProvider};

/// A validated, segmented script ready to execute.
///
/// Holds the temporary substituted copy (if any) alive until dropped or
/// released.
#[derive(Debug)]
pub struct Plan {
    batches: BatchSequence,
    prepared: Option<PreparedScript>,
}

impl Plan {
    /// Batches in execution order.
    pub fn batches(&self) -> &BatchSequence {
        &self.batches
    }

    /// Temporary substituted copy, when a placeholder rule was applied.
    pub fn prepared(&self) -> Option<&PreparedScript> {
        self.prepared.as_ref()
    }

    /// Removes the temporary copy, if any.
    pub fn release(self) {
        if let Some(prepared) = self.prepared {
            prepared.release();
        }
    }
}

/// Validates `config`, applies the placeholder rule and segments the script.
///
/// No token is requested and no connection is made.
///
/// # Errors
/// Returns [`crate::DeployError::Configuration`] before any file is read if
/// the configuration is invalid, or [`crate::DeployError::Io`] if the script
/// or its temporary copy cannot be read or written.
pub async fn plan(config: &DeployConfig, observer: &mut dyn RunObserver) -> Result<Plan> {
    config.validate()?;

    let prepared = match &config.placeholder {
        Some(rule) => {
            let prepared = substitute(config.script(), rule).await?;
            observer.substituted(prepared.path(), prepared.replacements());
            Some(prepared)
        }
        None => None,
    };

    let script_path = prepared
        .as_ref()
        .map_or_else(|| config.script(), PreparedScript::path);
    let batches = ScriptSource::load(script_path)
        .await?
        .into_batches(&config.separator);

    tracing::info!(
        "Parsed {} SQL batch(es) from {}",
        batches.len(),
        config.script().display()
    );
    observer.planned(config, batches.len());

    Ok(Plan { batches, prepared })
}

/// Drives deployments through injected credential and connection
/// capabilities.
pub struct Deployer {
    provider: Box<dyn TokenProvider>,
    connector: Box<dyn Connector>,
}

impl Deployer {
    /// Creates a deployer from a token provider and a connector.
    pub fn new(provider: Box<dyn TokenProvider>, connector: Box<dyn Connector>) -> Self {
        Self {
            provider,
            connector,
        }
    }

    /// Runs one deployment end to end.
    ///
    /// A script with no batches still requests a token and opens a
    /// connection, so credential and connectivity problems are reported.
    ///
    /// # Errors
    /// Returns the fatal errors of [`plan`], plus
    /// [`crate::DeployError::Authentication`] when no token can be obtained
    /// and [`crate::DeployError::Connection`] when the session cannot be
    /// opened. Batch failures are reported in the returned [`RunReport`].
    pub async fn run(
        &self,
        config: &DeployConfig,
        observer: &mut dyn RunObserver,
    ) -> Result<RunReport> {
        let mut report = RunReport::new(config.kind, config.script());
        tracing::info!("Starting {} (run {})", config.kind, report.run_id);

        let plan = plan(config, observer).await?;
        if plan.batches().is_empty() {
            tracing::warn!("No batches found in {}", config.script().display());
        }

        let target = config.target();
        let mut connection = {
            let token = TokenBroker::new(self.provider.as_ref()).acquire().await?;
            observer.token_acquired();
            tracing::info!("Connecting to {}", target.safe_description());
            self.connector.connect(&target, &token).await?
        };
        observer.connected(&target);

        execute_batches(connection.as_mut(), plan.batches(), &mut report, observer).await;

        if let Err(e) = connection.close().await {
            tracing::warn!("Connection did not close cleanly: {}", e);
        }
        drop(connection);
        plan.release();
        report.finish();

        tracing::info!(
            "Run {} finished: {} attempted, {} failed",
            report.run_id,
            report.attempted(),
            report.failed()
        );

        Ok(report)
    }
}

/// Executes every batch in order, recording each outcome and never stopping
/// early.
async fn execute_batches(
    connection: &mut dyn Connection,
    batches: &BatchSequence,
    report: &mut RunReport,
    observer: &mut dyn RunObserver,
) {
    for (position, batch) in (1..).zip(batches) {
        let preview = batch.preview();
        let result = match connection.execute(batch.text()).await {
            Ok(rows_affected) => {
                tracing::debug!("Batch {} succeeded: {}", position, preview);
                ExecutionResult::succeeded(position, preview, rows_affected)
            }
            Err(e) => {
                tracing::warn!("Batch {} failed: {}", position, e);
                ExecutionResult::failed(position, preview, e.message())
            }
        };
        observer.batch_finished(&result);
        report.record(result);
    }
}
