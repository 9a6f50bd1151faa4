use clap::Parser;
use std::error::Error;
use std::path::PathBuf;

use tracing::{error, info};

use hideside::config::{self, Config};
use hideside::devtools::{InjectionScript, InjectionSession};
use hideside::logging;
use hideside::runner::{RunOutcome, run};
use hideside::target::{BootOutcome, BootPatch, LaunchOptions, Platform, resolve_run_config};

/// hideside - start Discord with remote debugging and inject a script into its windows
#[derive(Parser, Debug)]
#[command(
    name = "hideside",
    version,
    about = "Start Discord with a remote debugging port and evaluate a script in its windows",
    after_help = "ENVIRONMENT VARIABLES:\n\
        HIDESIDE_PORT               Remote debugging port\n\
        HIDESIDE_POLL_INTERVAL_MS   Delay between introspection attempts (ms)\n\
        HIDESIDE_HTTP_TIMEOUT       Introspection request timeout (s, 0 = none)\n\
        HIDESIDE_SOCKET_TIMEOUT     Websocket timeout (s, 0 = none)\n\
        HIDESIDE_SCRIPT             Script to inject\n\
        HIDESIDE_RESOURCE_DIR       Resource directory\n\
        HIDESIDE_LOG_FILE           Log file\n\
        HIDESIDE_LOG                Log filter (e.g. debug, info)"
)]
struct Args {
    /// Path to the Discord executable (default: searched per OS)
    #[arg(short, long)]
    discord_path: Option<PathBuf>,

    /// Remote debugging port (0 selects the default)
    #[arg(short, long, env = config::ENV_PORT)]
    port: Option<u16>,

    /// Add the sidebar hider to boot (Windows only), optionally with a custom script.
    /// Needs `scripts/windows/autostartreg.bat` (or `autostartregPTB.bat`) under the
    /// resource directory; the run stops before launching Discord when it is missing.
    #[arg(short, long, num_args = 0..=1, value_name = "SCRIPT")]
    boot: Option<Option<PathBuf>>,

    /// Start Discord minimized
    #[arg(short, long)]
    minimized: bool,

    /// Treat the executable as Discord PTB
    #[arg(long)]
    ptb: bool,

    /// Script to inject instead of the bundled one
    #[arg(short, long, env = config::ENV_SCRIPT)]
    js_path: Option<PathBuf>,

    /// Log file path
    #[arg(long, env = config::ENV_LOG_FILE)]
    log_file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(file) = args.log_file {
        config.logging.file = file;
    }
    if let Some(script) = args.js_path {
        config.paths.script_path = script;
    }
    let log_path = logging::init(&config.logging).map_err(|e| {
        format!("cannot open log file \"{}\": {}", config.logging.file.display(), e)
    })?;
    info!(
        "hideside {} starting {}, log at \"{}\"",
        env!("CARGO_PKG_VERSION"),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        log_path.display()
    );

    let platform = Platform::current();
    let options = LaunchOptions {
        executable: args.discord_path,
        port: args.port,
        boot: BootPatch::from_flag(args.boot),
        minimized: args.minimized,
        ptb: args.ptb,
    };

    let run_config = resolve_run_config(platform, options, config.devtools.port).inspect_err(|e| error!("{}", e))?;
    let script = InjectionScript::load(&config.paths.script_path).inspect_err(|e| error!("{}", e))?;
    let script_name = script
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string());
    let session = InjectionSession::new(
        script_name,
        &script,
        &config.devtools.object_group,
        &config.devtools.title_denylist,
        config.devtools.socket_timeout(),
    )?;

    println!(
        "Starting {} ({}) on port {}",
        run_config.executable.display(),
        run_config.variant,
        run_config.port
    );

    let summary = run(
        platform,
        &run_config,
        &session,
        &config.devtools,
        &config.paths.resource_dir,
    )
    .await
    .inspect_err(|e| error!("{}", e))?;

    match &summary.outcome {
        RunOutcome::Injected { title } => println!("Injected into \"{}\"", title),
        RunOutcome::ProcessExited => println!("Discord exited before the script could be injected"),
    }
    info!("Discord exited with {:?}", summary.exit_code);
    if summary.boot == Some(BootOutcome::Patched) {
        println!("Boot patch applied");
    }

    Ok(())
}
