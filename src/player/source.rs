//! Resolution of user-supplied media locations to local files.

use std::path::{Path, PathBuf};
use url::Url;

use crate::utils::LoadError;

#[derive(Debug, Clone, PartialEq)]
pub struct MediaSource {
    path: PathBuf,
}

impl MediaSource {
    /// Accepts a plain path or a `file://` URL. Anything with another scheme is
    /// rejected, only local files are played.
    pub fn parse(source: &str) -> Result<Self, LoadError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(LoadError::InvalidSource(source.to_string()));
        }

        match Url::parse(trimmed) {
            Ok(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| LoadError::InvalidSource(source.to_string()))?;
                Ok(Self { path })
            }
            // Single letters are Windows drive prefixes, not schemes
            Ok(url) if url.scheme().len() > 1 => {
                Err(LoadError::UnsupportedSource(url.scheme().to_string()))
            }
            _ => Ok(Self {
                path: PathBuf::from(trimmed),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fails with `NotFound` when the file does not exist
    pub fn ensure_exists(&self) -> Result<(), LoadError> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(LoadError::NotFound(self.path.clone()))
        }
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}
