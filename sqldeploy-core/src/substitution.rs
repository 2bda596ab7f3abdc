//! Placeholder substitution into scoped temporary script copies.
//!
//! The source script is only ever read. Substituted text is written to a
//! fresh temporary directory owned by a [`PreparedScript`]; dropping the
//! handle removes the directory, so cleanup happens on every exit path.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{DeployError, Result};

/// Placeholder used by role scripts for the managed identity name.
pub const IDENTITY_PLACEHOLDER: &str = "MANAGED-IDENTITY-NAME";

/// A literal token and the value that replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderRule {
    placeholder: String,
    replacement: String,
}

impl PlaceholderRule {
    /// Creates a rule replacing every occurrence of `placeholder`.
    pub fn new(placeholder: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            replacement: replacement.into(),
        }
    }

    /// Rule for the managed identity placeholder.
    pub fn managed_identity(identity_name: impl Into<String>) -> Self {
        Self::new(IDENTITY_PLACEHOLDER, identity_name)
    }

    /// The literal being replaced.
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// The replacement value.
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Replaces every case-sensitive occurrence, returning the new text and
    /// the number of replacements made. An empty placeholder matches nothing.
    pub fn apply(&self, text: &str) -> (String, usize) {
        if self.placeholder.is_empty() {
            return (text.to_string(), 0);
        }
        let count = text.matches(self.placeholder.as_str()).count();
        (text.replace(&self.placeholder, &self.replacement), count)
    }
}

/// A substituted copy of a script living in its own temporary directory.
#[derive(Debug)]
pub struct PreparedScript {
    dir: TempDir,
    path: PathBuf,
    replacements: usize,
}

impl PreparedScript {
    /// Path of the substituted copy.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of placeholder occurrences replaced.
    pub fn replacements(&self) -> usize {
        self.replacements
    }

    /// Directory holding the copy; removed when the handle is released.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Removes the temporary directory now, logging instead of failing.
    pub fn release(self) {
        let dir = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::warn!(
                "Failed to remove prepared script directory {}: {}",
                dir.display(),
                e
            );
        } else {
            tracing::debug!("Removed prepared script directory {}", dir.display());
        }
    }
}

/// Copies `source` into a temporary directory with `rule` applied.
///
/// The copy keeps the source file name. Zero matches is not an error.
///
/// # Errors
/// Returns [`DeployError::Io`] if the source cannot be read or the
/// temporary copy cannot be created.
pub async fn substitute(source: &Path, rule: &PlaceholderRule) -> Result<PreparedScript> {
    let text = tokio::fs::read_to_string(source).await.map_err(|e| {
        DeployError::io(format!("Failed to read script {}", source.display()), e)
    })?;

    let dir = tempfile::Builder::new()
        .prefix("sqldeploy-")
        .tempdir()
        .map_err(|e| DeployError::io("Failed to create temporary directory", e))?;

    let file_name = source
        .file_name()
        .map_or_else(|| "script.sql".into(), std::ffi::OsStr::to_os_string);
    let path = dir.path().join(file_name);

    let (prepared, replacements) = rule.apply(&text);
    tokio::fs::write(&path, prepared).await.map_err(|e| {
        DeployError::io(
            format!("Failed to write prepared script {}", path.display()),
            e,
        )
    })?;

    tracing::debug!(
        "Replaced {} occurrence(s) of {} with {} in {}",
        replacements,
        rule.placeholder(),
        rule.replacement(),
        path.display()
    );

    Ok(PreparedScript {
        dir,
        path,
        replacements,
    })
}
