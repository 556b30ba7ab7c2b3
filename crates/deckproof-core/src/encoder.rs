//! Base64 encoding of selected files for the JSON payload

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::SubmitError;

/// A file chosen by the user: either on disk or already in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileHandle {
    Path(PathBuf),
    Memory { name: String, bytes: Vec<u8> },
}

impl FileHandle {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        FileHandle::Path(path.into())
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        FileHandle::Memory {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Display name used in error messages.
    pub fn name(&self) -> String {
        match self {
            FileHandle::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            FileHandle::Memory { name, .. } => name.clone(),
        }
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        match self {
            FileHandle::Path(path) => tokio::fs::read(path).await,
            FileHandle::Memory { bytes, .. } => Ok(bytes.clone()),
        }
    }
}

/// Reads the file and returns its contents as standard padded base64.
///
/// An empty file is an encoding error: the endpoint rejects empty payloads.
pub async fn encode(file: &FileHandle) -> Result<String, SubmitError> {
    let bytes = file.read().await.map_err(|source| SubmitError::Read {
        name: file.name(),
        source,
    })?;

    if bytes.is_empty() {
        return Err(SubmitError::Encoding { name: file.name() });
    }

    tracing::debug!(file = %file.name(), bytes = bytes.len(), "encoded file");
    Ok(STANDARD.encode(bytes))
}
