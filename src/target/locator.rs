//! Finding the Discord executable.
//!
//! An explicit path always wins. Otherwise the platform's default install
//! locations are globbed, stable build first. When a glob matches several
//! versions the lexicographically last match is taken, which is usually, but
//! not always, the newest version.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::platform::{DefaultSearch, Platform};
use super::types::{LaunchOptions, RunConfig, TargetError, TargetResult, Variant};
use crate::config;

/// Resolve launch options into the immutable settings for one run
pub fn resolve_run_config(
    platform: Platform,
    options: LaunchOptions,
    fallback_port: u16,
) -> TargetResult<RunConfig> {
    let (executable, variant) = match &options.executable {
        Some(path) => locate_explicit(path, options.ptb)?,
        None => {
            info!("No executable path provided, searching defaults for {}", platform);
            locate_default(platform.default_search(), options.ptb, platform)?
        }
    };

    let run_config = RunConfig {
        executable,
        port: config::resolve_port(options.port, fallback_port),
        variant,
        minimized: options.minimized,
        boot: options.boot,
    };
    debug!("Resolved: {:?}", run_config);
    Ok(run_config)
}

/// Validate an explicit executable path and work out its variant.
///
/// `force_ptb` overrides whatever the file name suggests.
pub fn locate_explicit(path: &Path, force_ptb: bool) -> TargetResult<(PathBuf, Variant)> {
    if !path.is_file() {
        return Err(TargetError::NotFound(format!("\"{}\" is not a file", path.display())));
    }
    let inferred = path
        .file_name()
        .map(|name| Variant::from_file_name(&name.to_string_lossy()))
        .unwrap_or(Variant::Stable);
    let variant = if force_ptb {
        info!("PTB flag overrides inferred variant {}", inferred);
        Variant::Ptb
    } else {
        inferred
    };
    info!("Using provided executable \"{}\" ({})", path.display(), variant);
    Ok((path.to_path_buf(), variant))
}

/// Search default install locations
pub fn locate_default(
    search: Option<DefaultSearch>,
    force_ptb: bool,
    platform: Platform,
) -> TargetResult<(PathBuf, Variant)> {
    let Some(search) = search else {
        return Err(TargetError::NoDefaults(platform.to_string()));
    };
    debug!(
        "Default root: \"{}\", stable: \"{}\", PTB: \"{}\"",
        search.root.display(),
        search.stable_pattern,
        search.ptb_pattern
    );

    if !force_ptb {
        if let Some(path) = last_match(&search.root, &search.stable_pattern) {
            return Ok((path, Variant::Stable));
        }
    }
    if let Some(path) = last_match(&search.root, &search.ptb_pattern) {
        return Ok((path, Variant::Ptb));
    }

    Err(TargetError::NotFound(format!(
        "no Discord executable in \"{}\" matching {:?} (PTB flag: {})",
        search.root.display(),
        [&search.stable_pattern, &search.ptb_pattern],
        force_ptb
    )))
}

/// Lexicographically last path under `root` matching `pattern`
pub fn last_match(root: &Path, pattern: &str) -> Option<PathBuf> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        pattern
    );
    let paths = match glob::glob(&full) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("Invalid pattern \"{}\": {}", full, e);
            return None;
        }
    };

    let mut matches: Vec<PathBuf> = paths.filter_map(Result::ok).collect();
    matches.sort();
    let found = matches.pop();
    match &found {
        Some(path) => debug!("Pattern \"{}\" matched \"{}\"", pattern, path.display()),
        None => warn!("No executable found in \"{}\" with pattern \"{}\"", root.display(), pattern),
    }
    found
}
