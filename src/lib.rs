//! hideside - launch Discord with remote debugging and inject a script.
//!
//! This crate provides:
//! - Executable discovery and PTB detection per platform
//! - Process launch with `--remote-debugging-port`, and termination of old instances
//! - Polling of the DevTools introspection endpoint
//! - One-shot `Runtime.evaluate` sessions over the DevTools websocket
//! - The optional Windows boot patch
//!
//! # Example
//!
//! ```rust,no_run
//! use hideside::config::Config;
//! use hideside::devtools::{InjectionScript, InjectionSession};
//! use hideside::target::{LaunchOptions, Platform, resolve_run_config};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env();
//! let platform = Platform::current();
//! let run_config = resolve_run_config(platform, LaunchOptions::default(), config.devtools.port)?;
//! let script = InjectionScript::load(&config.paths.script_path)?;
//! let session = InjectionSession::new(
//!     "init",
//!     &script,
//!     &config.devtools.object_group,
//!     &config.devtools.title_denylist,
//!     config.devtools.socket_timeout(),
//! )?;
//! let summary = hideside::run(platform, &run_config, &session, &config.devtools, &config.paths.resource_dir).await?;
//! println!("{:?}", summary.outcome);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod devtools;
pub mod logging;
pub mod runner;
pub mod target;

// Re-export runner types
pub use runner::{RunError, RunOutcome, RunResult, RunSummary, drive, run, supervise};

// Re-export devtools types
pub use devtools::{
    DebugEndpoint, DevtoolsError, EvaluationResult, Evaluator, InjectionScript, InjectionSession,
    WindowDescriptor, WindowSource,
};

// Re-export target types
pub use target::{
    BootOutcome, BootPatch, LaunchOptions, Platform, RunConfig, TargetError, TargetProcess, Variant,
};

pub use config::Config;
