use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::{DevtoolsError, DevtoolsResult};

/// Script evaluated in every window, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionScript {
    /// Where the script was read from
    pub path: PathBuf,
    source: String,
}

impl InjectionScript {
    /// Read and trim the script at `path`
    pub fn load(path: impl AsRef<Path>) -> DevtoolsResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DevtoolsError::ScriptNotFound(path.to_path_buf()));
        }
        let source = fs::read_to_string(path)?.trim().to_string();
        debug!("Loaded {} bytes of script from \"{}\"", source.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Wrap script text that did not come from a file
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            path: PathBuf::new(),
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}
