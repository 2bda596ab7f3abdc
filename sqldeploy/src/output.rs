//! Console reporting and report file output.
//!
//! Progress goes to stdout in a fixed line format; fatal diagnostics go to
//! stderr. Formatting lives in pure functions so it can be tested.

use std::path::Path;

use sqldeploy_core::{
    BatchOutcome, ConnectionTarget, DeployConfig, DeployError, ExecutionResult, Plan, Result,
    RunObserver, RunReport,
};

/// Banner lines describing the run about to start.
pub fn banner_lines(config: &DeployConfig) -> Vec<String> {
    let mut lines = vec![
        format!("→  Server           : {}", config.server),
        format!("→  Database         : {}", config.database),
    ];
    if config.kind.uses_identity_placeholder()
        && let Some(identity) = config.identity_name()
    {
        lines.push(format!("→  Managed identity : {identity}"));
    }
    lines.push(format!("→  Script           : {}", config.script().display()));
    lines
}

/// Status line for one batch, plus the error line when it failed.
pub fn batch_lines(result: &ExecutionResult) -> Vec<String> {
    match &result.outcome {
        BatchOutcome::Succeeded { .. } => {
            vec![format!("✓  Batch {:>3}: {}", result.position, result.preview)]
        }
        BatchOutcome::Failed { error } => vec![
            format!("✗  Batch {:>3}: {}", result.position, result.preview),
            format!("           Error: {error}"),
        ],
    }
}

/// Final summary line.
pub fn summary_line(report: &RunReport) -> String {
    if report.is_success() {
        format!("✓  {}", report.summary())
    } else {
        format!("✗  {}", report.summary())
    }
}

/// Diagnostic lines for a fatal error.
pub fn fatal_lines(error: &DeployError) -> Vec<String> {
    let mut lines = vec![format!("✗  {error}")];
    if let Some(hint) = error.remediation() {
        lines.push(format!("   {hint}"));
    }
    lines
}

/// Prints run progress to the console.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    /// Creates a reporter; `quiet` keeps only failures and the summary.
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn progress(&self, line: &str) {
        if !self.quiet {
            println!("{line}");
        }
    }

    /// Prints the run banner.
    pub fn banner(&self, config: &DeployConfig) {
        for line in banner_lines(config) {
            self.progress(&line);
        }
    }

    /// Lists the batches a dry run would execute.
    pub fn dry_run(&self, plan: &Plan) {
        for (position, batch) in (1..).zip(plan.batches()) {
            println!("•  Batch {:>3}: {}", position, batch.preview());
        }
        println!(
            "\n✓  Dry run: {} batch(es) would be executed.",
            plan.batches().len()
        );
    }

    /// Prints the final summary.
    pub fn summary(&self, report: &RunReport) {
        println!("\n{}", summary_line(report));
    }

    /// Prints a fatal error to stderr.
    pub fn fatal(&self, error: &DeployError) {
        for line in fatal_lines(error) {
            eprintln!("{line}");
        }
    }
}

impl RunObserver for ConsoleReporter {
    fn planned(&mut self, _config: &DeployConfig, batches: usize) {
        self.progress(&format!("→  Parsed {batches} SQL batch(es)"));
    }

    fn substituted(&mut self, prepared: &Path, replacements: usize) {
        self.progress(&format!(
            "✓  Placeholder replaced ({replacements} occurrence(s)) → {}",
            prepared.display()
        ));
    }

    fn token_acquired(&mut self) {
        self.progress("✓  Obtained Azure AD access token");
    }

    fn connected(&mut self, target: &ConnectionTarget) {
        self.progress(&format!(
            "✓  Connected to {}/{}",
            target.server, target.database
        ));
    }

    fn batch_finished(&mut self, result: &ExecutionResult) {
        for line in batch_lines(result) {
            if result.is_success() {
                self.progress(&line);
            } else {
                println!("{line}");
            }
        }
    }
}

/// Writes the run report as pretty JSON.
///
/// # Errors
/// Returns a serialization or I/O error if the report cannot be written.
pub async fn save_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let json = report.to_json()?;
    tokio::fs::write(output_path, json).await.map_err(|e| {
        DeployError::io(
            format!("Failed to write report to {}", output_path.display()),
            e,
        )
    })?;
    tracing::info!("Run report saved to {}", output_path.display());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sqldeploy_core::DeploymentKind;

    #[test]
    fn test_batch_lines_success() {
        let result = ExecutionResult::succeeded(7, "CREATE TABLE dbo.Users".to_string(), None);
        assert_eq!(batch_lines(&result), vec!["✓  Batch   7: CREATE TABLE dbo.Users"]);
    }

    #[test]
    fn test_batch_lines_failure_includes_error() {
        let result = ExecutionResult::failed(12, "DROP TABLE x".to_string(), "Cannot drop");
        assert_eq!(
            batch_lines(&result),
            vec![
                "✗  Batch  12: DROP TABLE x".to_string(),
                "           Error: Cannot drop".to_string(),
            ]
        );
    }

    #[test]
    fn test_banner_shows_identity_for_role_runs() {
        let role = DeployConfig::new(DeploymentKind::DatabaseRole, "srv")
            .with_identity_name("mid-test");
        let lines = banner_lines(&role);
        assert!(lines.iter().any(|l| l.contains("Managed identity : mid-test")));

        let schema = DeployConfig::new(DeploymentKind::Schema, "srv");
        assert!(!banner_lines(&schema).iter().any(|l| l.contains("Managed identity")));
    }

    #[test]
    fn test_fatal_lines_include_login_hint() {
        let error = DeployError::authentication_rejected("no session");
        let lines = fatal_lines(&error);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("az login"));
    }

    #[test]
    fn test_summary_line_marks_failures() {
        let mut report = RunReport::new(DeploymentKind::Schema, Path::new("s.sql"));
        report.record(ExecutionResult::failed(1, String::new(), "boom"));
        assert!(summary_line(&report).starts_with("✗  Completed with 1 error(s)"));
    }

    #[tokio::test]
    async fn test_save_report_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = RunReport::new(DeploymentKind::StoredProcedures, Path::new("p.sql"));

        save_report(&report, &path).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["kind"], "stored_procedures");
    }
}
