//! Launching Discord and supervising the child process.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::platform::Platform;
use super::types::{RunConfig, TargetError, TargetResult};

/// Flag enabling the remote debugging endpoint; the port is appended
pub const DEBUG_PORT_FLAG: &str = "--remote-debugging-port=";

/// Flag asking Discord to start in the tray
pub const MINIMIZED_FLAG: &str = "--start-minimized";

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// The supervised target as the control loop sees it
#[async_trait]
pub trait TargetProcess: Send {
    /// Check for exit without blocking
    fn has_exited(&mut self) -> std::io::Result<bool>;

    /// Block until the process exits, returning its exit code if it had one
    async fn wait(&mut self) -> std::io::Result<Option<i32>>;
}

/// Handle to the one Discord process started for this run
#[derive(Debug)]
pub struct ManagedProcess {
    child: Child,
    pid: Option<u32>,
}

impl ManagedProcess {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

#[async_trait]
impl TargetProcess for ManagedProcess {
    fn has_exited(&mut self) -> std::io::Result<bool> {
        Ok(self.child.try_wait()?.is_some())
    }

    async fn wait(&mut self) -> std::io::Result<Option<i32>> {
        let status = self.child.wait().await?;
        info!("Discord process {:?} exited with {}", self.pid, status);
        Ok(status.code())
    }
}

/// Command-line arguments Discord is started with
pub fn launch_args(config: &RunConfig) -> Vec<String> {
    let mut args = vec![format!("{}{}", DEBUG_PORT_FLAG, config.port)];
    if config.minimized {
        args.push(MINIMIZED_FLAG.to_string());
    }
    args
}

/// Stops old instances and starts the new one
pub struct Launcher<'a> {
    platform: Platform,
    config: &'a RunConfig,
}

impl<'a> Launcher<'a> {
    pub fn new(platform: Platform, config: &'a RunConfig) -> Self {
        Self { platform, config }
    }

    /// Terminate every running instance of the configured variant
    pub async fn kill_running(&self) -> TargetResult<()> {
        debug!(
            "Stopping running \"{}\"",
            self.platform.process_name(self.config.variant)
        );
        self.platform.terminate_running(self.config.variant).await?;
        debug!("Running instances killed");
        Ok(())
    }

    /// Spawn Discord with the debugging port open.
    ///
    /// Output streams are piped and drained into the log in the background so
    /// the child never blocks on a full pipe. Must be called inside the runtime.
    pub fn start_program(&self) -> TargetResult<ManagedProcess> {
        let args = launch_args(self.config);
        debug!("Command: `{} {}`", self.config.executable.display(), args.join(" "));

        let mut command = Command::new(&self.config.executable);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(windows)]
        command.creation_flags(CREATE_NEW_PROCESS_GROUP);

        let mut child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TargetError::NotFound(format!(
                "\"{}\" could not be started: {}",
                self.config.executable.display(),
                e
            )),
            _ => TargetError::Io(e),
        })?;

        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr, "stderr");
        }

        let pid = child.id();
        info!("Discord started as process {:?}", pid);
        Ok(ManagedProcess { child, pid })
    }
}

fn forward_output<R>(reader: R, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => debug!("[{}] {}", stream, line),
                Ok(None) => break,
                Err(e) => {
                    warn!("Reading child {} failed: {}", stream, e);
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::types::{BootPatch, Variant};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn run_config(executable: &str, minimized: bool) -> RunConfig {
        RunConfig {
            executable: PathBuf::from(executable),
            port: 9222,
            variant: Variant::Stable,
            minimized,
            boot: BootPatch::Disabled,
        }
    }

    #[test]
    fn test_launch_args_always_open_debug_port() {
        assert_eq!(
            launch_args(&run_config("Discord", false)),
            vec!["--remote-debugging-port=9222"]
        );
        assert_eq!(
            launch_args(&run_config("Discord", true)),
            vec!["--remote-debugging-port=9222", "--start-minimized"]
        );
    }

    #[tokio::test]
    async fn test_missing_executable_is_not_found() {
        let config = run_config("/nonexistent/hideside-test/Discord", false);
        let err = Launcher::new(Platform::Linux, &config).start_program().unwrap_err();
        assert!(matches!(err, TargetError::NotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_started_process_can_be_polled_and_waited() {
        let config = run_config("/bin/echo", true);
        let mut process = Launcher::new(Platform::Linux, &config).start_program().unwrap();
        assert!(process.pid().is_some());

        let code = process.wait().await.unwrap();
        assert_eq!(code, Some(0));
        assert!(process.has_exited().unwrap());
    }
}
