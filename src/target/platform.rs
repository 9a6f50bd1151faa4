//! Operating-system specific behaviour.
//!
//! Everything that differs between Windows, macOS and Linux lives behind the
//! [`Platform`] enum: where Discord is installed by default, how running
//! instances are stopped, and whether the boot patch is available.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use super::types::{BootPatch, TargetError, TargetResult, Variant};

/// Directory (under the resource root) holding the Windows boot patch scripts
const WINDOWS_BOOT_DIR: &str = "scripts/windows";
const STABLE_BOOT_SCRIPT: &str = "autostartreg.bat";
const PTB_BOOT_SCRIPT: &str = "autostartregPTB.bat";

/// Where to look for an installed client when no path is given.
///
/// Patterns are globs relative to `root`, tried in order: stable first, then PTB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultSearch {
    pub root: PathBuf,
    pub stable_pattern: String,
    pub ptb_pattern: String,
}

/// What the boot patcher ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootOutcome {
    /// The boot script ran
    Patched,
    /// This OS has no boot patch; a notice was shown instead
    Unsupported,
}

/// Operating system the tool is running on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    /// Detect the current platform. Other Unix-likes behave like Linux.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Default install locations, if this OS has any
    pub fn default_search(self) -> Option<DefaultSearch> {
        match self {
            Platform::Windows => dirs::data_local_dir().map(|root| DefaultSearch {
                root,
                stable_pattern: "Discord/*/Discord.exe".to_string(),
                ptb_pattern: "DiscordPTB/*/DiscordPTB.exe".to_string(),
            }),
            Platform::MacOs => Some(DefaultSearch {
                root: PathBuf::from("/Applications"),
                stable_pattern: "Discord.app/Contents/MacOS/Discord".to_string(),
                ptb_pattern: "Discord PTB.app/Contents/MacOS/Discord PTB".to_string(),
            }),
            Platform::Linux => None,
        }
    }

    /// Process image name used to find running instances
    pub fn process_name(self, variant: Variant) -> &'static str {
        match (self, variant) {
            (Platform::Windows, Variant::Stable) => "Discord.exe",
            (Platform::Windows, Variant::Ptb) => "DiscordPTB.exe",
            (Platform::MacOs, Variant::Ptb) => "Discord PTB",
            (_, Variant::Stable) => "Discord",
            (Platform::Linux, Variant::Ptb) => "DiscordPTB",
        }
    }

    /// Program and arguments that stop every running instance of `variant`.
    ///
    /// `pkill` gets `-x` so the stable name never matches the PTB process.
    pub fn termination_command(self, variant: Variant) -> (&'static str, Vec<String>) {
        let name = self.process_name(variant).to_string();
        match self {
            Platform::Windows => (
                "taskkill",
                vec!["/F".to_string(), "/IM".to_string(), name, "/T".to_string()],
            ),
            Platform::MacOs | Platform::Linux => ("pkill", vec!["-x".to_string(), name]),
        }
    }

    /// Decide whether the termination command's error output is a real failure.
    ///
    /// Nothing being there to kill is fine: `taskkill` reports it as "not found",
    /// `pkill` stays silent.
    pub fn check_termination(self, stderr: &str) -> TargetResult<()> {
        let stderr = stderr.trim();
        if stderr.is_empty() {
            return Ok(());
        }
        let no_match = match self {
            Platform::Windows => stderr.to_lowercase().contains("not found"),
            Platform::MacOs | Platform::Linux => false,
        };
        if no_match {
            debug!("No running instance: {}", stderr);
            Ok(())
        } else {
            Err(TargetError::Terminate(stderr.to_string()))
        }
    }

    /// Stop every running instance of `variant`
    pub async fn terminate_running(self, variant: Variant) -> TargetResult<()> {
        let (program, args) = self.termination_command(variant);
        debug!("Command: `{} {}`", program, args.join(" "));

        let output = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("Process STDOUT: {}", stdout.trim());
        if !stderr.trim().is_empty() {
            warn!("Process STDERR: {}", stderr.trim());
        }
        self.check_termination(&stderr)
    }

    /// Boot patch script for `variant`, if this OS supports patching
    pub fn boot_script(self, resource_dir: &Path, variant: Variant) -> Option<PathBuf> {
        match self {
            Platform::Windows => {
                let name = if variant.is_ptb() { PTB_BOOT_SCRIPT } else { STABLE_BOOT_SCRIPT };
                Some(resource_dir.join(WINDOWS_BOOT_DIR).join(name))
            }
            Platform::MacOs | Platform::Linux => None,
        }
    }

    /// Fail with `NotFound` when this OS patches boot but the script is missing
    pub fn check_boot_script(self, resource_dir: &Path, variant: Variant) -> TargetResult<()> {
        match self.boot_script(resource_dir, variant) {
            Some(script) if !script.is_file() => Err(TargetError::NotFound(format!(
                "boot patch script \"{}\"",
                script.display()
            ))),
            _ => Ok(()),
        }
    }

    /// Make the injection survive Discord's own launch at boot.
    ///
    /// Unsupported platforms print a notice and do nothing.
    pub async fn patch_boot(
        self,
        variant: Variant,
        boot: &BootPatch,
        resource_dir: &Path,
    ) -> TargetResult<BootOutcome> {
        let Some(script) = self.boot_script(resource_dir, variant) else {
            warn!("Patching boot is currently unavailable on {}", self);
            println!("Patching boot is currently unavailable on {}", self);
            return Ok(BootOutcome::Unsupported);
        };
        self.check_boot_script(resource_dir, variant)?;

        let mut command = Command::new(&script);
        if let Some(custom) = boot.custom_script() {
            let quoted = quote_boot_arg(&custom.to_string_lossy());
            // cmd.exe receives the quotes as written
            #[cfg(windows)]
            command.raw_arg(&quoted);
            #[cfg(not(windows))]
            command.arg(&quoted);
        }
        debug!("Command: `{}` (custom script: {:?})", script.display(), boot.custom_script());

        let output = command
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| TargetError::BootPatch(format!("{}: {}", script.display(), e)))?;
        debug!("Process STDOUT: {}", String::from_utf8_lossy(&output.stdout).trim());
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!("Process STDERR: {}", stderr.trim());
        }
        info!("Boot patch finished with {}", output.status);
        Ok(BootOutcome::Patched)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Windows => write!(f, "Windows"),
            Platform::MacOs => write!(f, "macOS"),
            Platform::Linux => write!(f, "Linux"),
        }
    }
}

/// Wrap a boot script argument in double quotes unless it already is
pub fn quote_boot_arg(arg: &str) -> String {
    if arg.starts_with('"') && arg.ends_with('"') {
        arg.to_string()
    } else {
        format!("\"{}\"", arg)
    }
}
