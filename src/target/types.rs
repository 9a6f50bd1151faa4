use std::path::PathBuf;

use crate::config;

/// Substring in an executable's file name that marks the PTB build
pub const PTB_MARKER: &str = "ptb";

/// Build identity of the Discord client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Regular release build
    Stable,
    /// Public Test Build
    Ptb,
}

impl Variant {
    /// Infer the variant from an executable's file name (case-insensitive)
    pub fn from_file_name(name: &str) -> Self {
        if name.to_lowercase().contains(PTB_MARKER) {
            Variant::Ptb
        } else {
            Variant::Stable
        }
    }

    pub fn is_ptb(self) -> bool {
        self == Variant::Ptb
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Stable => write!(f, "stable"),
            Variant::Ptb => write!(f, "PTB"),
        }
    }
}

/// What to do about Discord's own launch at boot once the run is over
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BootPatch {
    /// Leave boot behaviour alone
    #[default]
    Disabled,
    /// Patch using the bundled boot script
    Default,
    /// Patch, handing the boot script a custom script path
    CustomScript(PathBuf),
}

impl BootPatch {
    /// Build from the `--boot [PATH]` flag, which may be absent, bare, or carry a path
    pub fn from_flag(flag: Option<Option<PathBuf>>) -> Self {
        match flag {
            None => BootPatch::Disabled,
            Some(None) => BootPatch::Default,
            Some(Some(path)) => BootPatch::CustomScript(path),
        }
    }

    pub fn is_requested(&self) -> bool {
        !matches!(self, BootPatch::Disabled)
    }

    pub fn custom_script(&self) -> Option<&PathBuf> {
        match self {
            BootPatch::CustomScript(path) => Some(path),
            _ => None,
        }
    }
}

/// Unresolved launch inputs, as given on the command line
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Explicit executable path
    pub executable: Option<PathBuf>,
    /// Requested debug port (`None` or `0` selects the default)
    pub port: Option<u16>,
    /// Boot patch request
    pub boot: BootPatch,
    /// Start Discord minimized
    pub minimized: bool,
    /// Force the PTB variant
    pub ptb: bool,
}

/// Fully resolved settings for one run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Validated executable path
    pub executable: PathBuf,
    /// Remote debugging port
    pub port: u16,
    /// Build identity
    pub variant: Variant,
    /// Pass `--start-minimized`
    pub minimized: bool,
    /// Boot patch request
    pub boot: BootPatch,
}

impl RunConfig {
    /// `http://localhost:<port>/json`
    pub fn introspection_url(&self) -> String {
        config::introspection_url(self.port)
    }
}

/// Result type for target operations
pub type TargetResult<T> = Result<T, TargetError>;

/// Error types for locating, launching and patching the target
#[derive(Debug)]
pub enum TargetError {
    /// Executable or script file missing
    NotFound(String),

    /// No path given and this OS has no default install locations
    NoDefaults(String),

    /// The termination command reported something other than "no such process"
    Terminate(String),

    /// Boot patch script could not be run
    BootPatch(String),

    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for TargetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetError::NotFound(what) => write!(f, "Not found: {}", what),
            TargetError::NoDefaults(os) => {
                write!(f, "No Discord executable path provided and no defaults known for {}", os)
            }
            TargetError::Terminate(msg) => write!(f, "Failed to stop running Discord: {}", msg),
            TargetError::BootPatch(msg) => write!(f, "Boot patch failed: {}", msg),
            TargetError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for TargetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TargetError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TargetError {
    fn from(err: std::io::Error) -> Self {
        TargetError::Io(err)
    }
}
