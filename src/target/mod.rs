pub mod locator;
pub mod platform;
pub mod process;
pub mod types;

pub use locator::{last_match, locate_default, locate_explicit, resolve_run_config};
pub use platform::{BootOutcome, DefaultSearch, Platform, quote_boot_arg};
pub use process::{Launcher, ManagedProcess, TargetProcess, launch_args};
pub use types::{BootPatch, LaunchOptions, RunConfig, TargetError, TargetResult, Variant};
