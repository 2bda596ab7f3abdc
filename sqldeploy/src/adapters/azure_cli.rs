//! Azure CLI credential provider.
//!
//! Obtains tokens for the signed-in `az` session by running
//! `az account get-access-token --scope <scope> --output json`.
//!
//! # Security
//! - The CLI's stdout is held in a zeroizing buffer
//! - The token is never logged; only the CLI's error text is surfaced

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use sqldeploy_core::{AccessToken, CredentialError, TokenProvider};
use zeroize::Zeroizing;

/// Time allowed for the CLI to answer.
pub const DEFAULT_CLI_TIMEOUT: Duration = Duration::from_secs(10);

const CLI_PROGRAM: &str = if cfg!(windows) { "az.cmd" } else { "az" };

/// JSON printed by `az account get-access-token`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
    /// Local timestamp, e.g. `2024-05-01 10:11:12.000000`
    expires_on: Option<String>,
    /// Epoch seconds, present in Azure CLI 2.54 and later
    #[serde(rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

/// Token provider backed by the Azure CLI.
#[derive(Debug, Clone)]
pub struct AzureCliCredential {
    program: String,
    timeout: Duration,
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self {
            program: CLI_PROGRAM.to_string(),
            timeout: DEFAULT_CLI_TIMEOUT,
        }
    }
}

impl AzureCliCredential {
    /// Uses a different executable in place of `az`.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Sets how long to wait for the CLI.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TokenProvider for AzureCliCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let command = tokio::process::Command::new(&self.program)
            .args(["account", "get-access-token", "--output", "json", "--scope"])
            .arg(scope)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, command)
            .await
            .map_err(|_| {
                CredentialError::Unavailable(format!(
                    "Azure CLI did not respond within {:?}",
                    self.timeout
                ))
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CredentialError::Unavailable(format!("{} not found on PATH", self.program))
                } else {
                    CredentialError::Unavailable(format!("failed to run {}: {}", self.program, e))
                }
            })?;

        let stdout = Zeroizing::new(output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CredentialError::NotAuthenticated(first_line(&stderr)));
        }

        parse_token_response(&stdout)
    }

    fn name(&self) -> &'static str {
        "Azure CLI"
    }
}

/// Parses the CLI's JSON answer into an access token.
///
/// # Errors
/// Returns [`CredentialError::InvalidResponse`] when the output is not the
/// expected JSON or carries an empty token.
pub fn parse_token_response(stdout: &[u8]) -> Result<AccessToken, CredentialError> {
    let response: CliTokenResponse = serde_json::from_slice(stdout)
        .map_err(|e| CredentialError::InvalidResponse(format!("unexpected CLI output: {e}")))?;

    if response.access_token.trim().is_empty() {
        return Err(CredentialError::InvalidResponse(
            "CLI returned an empty access token".to_string(),
        ));
    }

    let expires_on = response
        .expires_on_epoch
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .or_else(|| response.expires_on.as_deref().and_then(parse_local_timestamp));

    Ok(AccessToken::new(
        Zeroizing::new(response.access_token).as_str(),
        expires_on,
    ))
}

fn parse_local_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("Azure CLI exited with an error")
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_with_epoch_expiry() {
        let json = br#"{
            "accessToken": "eyJ0eXAi.token",
            "expiresOn": "2024-05-01 10:11:12.000000",
            "expires_on": 1714558272,
            "subscription": "00000000-0000-0000-0000-000000000000",
            "tenant": "00000000-0000-0000-0000-000000000000",
            "tokenType": "Bearer"
        }"#;
        let token = parse_token_response(json).unwrap();
        assert_eq!(token.secret(), "eyJ0eXAi.token");
        assert_eq!(
            token.expires_on(),
            DateTime::<Utc>::from_timestamp(1_714_558_272, 0)
        );
    }

    #[test]
    fn test_parse_response_with_local_expiry_only() {
        let json = br#"{"accessToken": "abc", "expiresOn": "2030-01-01 00:00:00.000000"}"#;
        let token = parse_token_response(json).unwrap();
        assert!(token.expires_on().is_some());
        assert!(!token.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_parse_response_without_expiry() {
        let token = parse_token_response(br#"{"accessToken": "abc"}"#).unwrap();
        assert!(token.expires_on().is_none());
    }

    #[test]
    fn test_parse_response_rejects_garbage() {
        assert!(matches!(
            parse_token_response(b"Please run 'az login'"),
            Err(CredentialError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_token_response(br#"{"accessToken": "  "}"#),
            Err(CredentialError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_first_line_skips_blank_lines() {
        assert_eq!(
            first_line("\n  ERROR: Please run 'az login' to setup account.\nmore"),
            "ERROR: Please run 'az login' to setup account."
        );
        assert_eq!(first_line(""), "Azure CLI exited with an error");
    }

    #[tokio::test]
    async fn test_missing_cli_is_unavailable() {
        let credential =
            AzureCliCredential::default().with_program("sqldeploy-test-missing-az-binary");
        let error = credential
            .get_token(sqldeploy_core::DATABASE_SCOPE)
            .await
            .unwrap_err();
        assert!(matches!(error, CredentialError::Unavailable(_)));
    }
}
