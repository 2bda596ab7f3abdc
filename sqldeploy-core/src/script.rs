//! Loading SQL scripts from disk.

use std::path::{Path, PathBuf};

use crate::batch::{BatchSequence, segment_with};
use crate::error::{DeployError, Result};

/// Script text together with the path it was read from.
#[derive(Debug, Clone)]
pub struct ScriptSource {
    path: PathBuf,
    text: String,
}

impl ScriptSource {
    /// Reads a UTF-8 script from `path`.
    ///
    /// # Errors
    /// Returns [`DeployError::Io`] when the file cannot be read or is not
    /// valid UTF-8.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            DeployError::io(format!("Failed to read script {}", path.display()), e)
        })?;

        tracing::debug!(
            "Loaded script {} ({} bytes)",
            path.display(),
            text.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }

    /// Builds a source from in-memory text.
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Path the script was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw script text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the source and splits it into batches.
    pub fn into_batches(self, separator: &str) -> BatchSequence {
        segment_with(&self.text, separator)
    }
}
