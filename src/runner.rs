//! The control loop.
//!
//! `Launching -> Polling -> (Evaluating)* -> Finished`. Polling and evaluation
//! alternate until one window accepts the script or Discord exits; the child
//! is then waited on, and the boot patch runs last when requested.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::DevtoolsSettings;
use crate::devtools::{
    DebugEndpoint, DevtoolsError, Evaluator, WindowSource, poll_windows,
};
use crate::target::{BootOutcome, Launcher, Platform, RunConfig, TargetError, TargetProcess};

/// How the polling loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The script ran in the window with this title
    Injected { title: String },
    /// Discord exited before any window accepted the script
    ProcessExited,
}

/// Everything a finished run reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// Exit code of the Discord process
    pub exit_code: Option<i32>,
    /// Set when a boot patch was requested
    pub boot: Option<BootOutcome>,
}

/// Result type for a run
pub type RunResult<T> = Result<T, RunError>;

/// Error types for a run
#[derive(Debug)]
pub enum RunError {
    /// Locating, launching or patching failed
    Target(TargetError),

    /// The debugging endpoint misbehaved
    Devtools(DevtoolsError),

    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Target(err) => write!(f, "{}", err),
            RunError::Devtools(err) => write!(f, "{}", err),
            RunError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Target(err) => Some(err),
            RunError::Devtools(err) => Some(err),
            RunError::Io(err) => Some(err),
        }
    }
}

impl From<TargetError> for RunError {
    fn from(err: TargetError) -> Self {
        RunError::Target(err)
    }
}

impl From<DevtoolsError> for RunError {
    fn from(err: DevtoolsError) -> Self {
        RunError::Devtools(err)
    }
}

impl From<std::io::Error> for RunError {
    fn from(err: std::io::Error) -> Self {
        RunError::Io(err)
    }
}

/// Alternate polling and evaluation until a window accepts the script or the
/// process exits.
///
/// Every listed window is tried once per cycle; the first success ends the
/// loop, so no window is evaluated again after succeeding.
pub async fn drive<P, S, E>(
    process: &mut P,
    source: &S,
    evaluator: &E,
    interval: Duration,
) -> RunResult<RunOutcome>
where
    P: TargetProcess + ?Sized,
    S: WindowSource + ?Sized,
    E: Evaluator + ?Sized,
{
    loop {
        let Some(windows) = poll_windows(source, process, interval).await? else {
            return Ok(RunOutcome::ProcessExited);
        };
        for window in &windows {
            let result = evaluator.evaluate(window).await;
            debug!("\"{}\" -> {}", window.title, result);
            if result.is_success() {
                return Ok(RunOutcome::Injected {
                    title: window.title.clone(),
                });
            }
        }
        debug!("No window accepted the script, polling again");
    }
}

/// Drive the loop, then block until the process exits
pub async fn supervise<P, S, E>(
    process: &mut P,
    source: &S,
    evaluator: &E,
    interval: Duration,
) -> RunResult<(RunOutcome, Option<i32>)>
where
    P: TargetProcess + ?Sized,
    S: WindowSource + ?Sized,
    E: Evaluator + ?Sized,
{
    let outcome = drive(process, source, evaluator, interval).await?;
    info!("Loop finished: {:?}, waiting for Discord to exit", outcome);
    let exit_code = process.wait().await?;
    Ok((outcome, exit_code))
}

/// One complete run: stop old instances, launch, inject, wait, patch boot.
///
/// A requested boot patch whose script is missing fails before anything is
/// stopped or started.
pub async fn run<E>(
    platform: Platform,
    run_config: &RunConfig,
    evaluator: &E,
    settings: &DevtoolsSettings,
    resource_dir: &Path,
) -> RunResult<RunSummary>
where
    E: Evaluator + ?Sized,
{
    if run_config.boot.is_requested() {
        platform.check_boot_script(resource_dir, run_config.variant)?;
    }

    let launcher = Launcher::new(platform, run_config);
    launcher.kill_running().await?;
    let mut process = launcher.start_program()?;

    let endpoint = DebugEndpoint::new(run_config.introspection_url(), settings.http_timeout())?;
    debug!("Polling \"{}\"", endpoint.url());
    let (outcome, exit_code) =
        supervise(&mut process, &endpoint, evaluator, settings.poll_interval()).await?;

    let boot = if run_config.boot.is_requested() {
        Some(
            platform
                .patch_boot(run_config.variant, &run_config.boot, resource_dir)
                .await?,
        )
    } else {
        None
    };

    Ok(RunSummary {
        outcome,
        exit_code,
        boot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devtools::{DevtoolsResult, EvaluationResult, WindowDescriptor};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    const TICK: Duration = Duration::from_millis(1);

    /// Alive until `exit_after` liveness checks have been made
    struct FakeProcess {
        exit_after: usize,
        checks: usize,
        waited: bool,
    }

    impl FakeProcess {
        fn alive() -> Self {
            Self::exiting_after(usize::MAX)
        }

        fn exiting_after(exit_after: usize) -> Self {
            Self {
                exit_after,
                checks: 0,
                waited: false,
            }
        }
    }

    #[async_trait]
    impl TargetProcess for FakeProcess {
        fn has_exited(&mut self) -> std::io::Result<bool> {
            self.checks += 1;
            Ok(self.checks >= self.exit_after)
        }

        async fn wait(&mut self) -> std::io::Result<Option<i32>> {
            self.waited = true;
            Ok(Some(0))
        }
    }

    /// Replies `None` (refused) `refusals` times, then lists `windows` forever
    struct FlakySource {
        refusals: Mutex<usize>,
        windows: Vec<WindowDescriptor>,
        fetches: Mutex<usize>,
    }

    impl FlakySource {
        fn new(refusals: usize, windows: Vec<WindowDescriptor>) -> Self {
            Self {
                refusals: Mutex::new(refusals),
                windows,
                fetches: Mutex::new(0),
            }
        }

        fn fetches(&self) -> usize {
            *self.fetches.lock().unwrap()
        }
    }

    #[async_trait]
    impl WindowSource for FlakySource {
        async fn fetch_windows(&self) -> DevtoolsResult<Option<Vec<WindowDescriptor>>> {
            *self.fetches.lock().unwrap() += 1;
            let mut refusals = self.refusals.lock().unwrap();
            if *refusals > 0 || self.windows.is_empty() {
                *refusals = refusals.saturating_sub(1);
                return Ok(None);
            }
            Ok(Some(self.windows.clone()))
        }
    }

    /// Answers from a fixed script, keyed by call order
    struct ScriptedEvaluator {
        results: Mutex<Vec<EvaluationResult>>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedEvaluator {
        fn new(results: Vec<EvaluationResult>) -> Self {
            Self {
                results: Mutex::new(results),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Evaluator for ScriptedEvaluator {
        async fn evaluate(&self, window: &WindowDescriptor) -> EvaluationResult {
            self.seen.lock().unwrap().push(window.title.clone());
            let mut results = self.results.lock().unwrap();
            if results.is_empty() {
                EvaluationResult::Failed
            } else {
                results.remove(0)
            }
        }
    }

    fn window(title: &str) -> WindowDescriptor {
        WindowDescriptor::new(title, format!("ws://localhost:1/devtools/page/{}", title))
    }

    #[tokio::test]
    async fn test_refused_then_single_successful_evaluation() {
        let mut process = FakeProcess::alive();
        let source = FlakySource::new(3, vec![window("Discord")]);
        let evaluator = ScriptedEvaluator::new(vec![EvaluationResult::Success]);

        let (outcome, exit_code) = supervise(&mut process, &source, &evaluator, TICK)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Injected {
                title: "Discord".to_string()
            }
        );
        assert_eq!(evaluator.seen(), vec!["Discord"]);
        assert_eq!(source.fetches(), 4);
        assert_eq!(process.checks, 3);
        assert_eq!(exit_code, Some(0));
        assert!(process.waited);
    }

    #[tokio::test]
    async fn test_process_exit_without_windows() {
        let mut process = FakeProcess::exiting_after(5);
        let source = FlakySource::new(usize::MAX, Vec::new());
        let evaluator = ScriptedEvaluator::new(Vec::new());

        let (outcome, _) = supervise(&mut process, &source, &evaluator, TICK)
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::ProcessExited);
        assert!(evaluator.seen().is_empty());
        assert!(process.waited);
    }

    #[tokio::test]
    async fn test_first_success_stops_the_cycle() {
        let mut process = FakeProcess::alive();
        let source = FlakySource::new(0, vec![window("Discord Updater"), window("Discord"), window("Popout")]);
        let evaluator = ScriptedEvaluator::new(vec![EvaluationResult::Failed, EvaluationResult::Success]);

        let outcome = drive(&mut process, &source, &evaluator, TICK).await.unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Injected {
                title: "Discord".to_string()
            }
        );
        assert_eq!(evaluator.seen(), vec!["Discord Updater", "Discord"]);
    }

    #[tokio::test]
    async fn test_failed_and_unknown_retry_next_cycle() {
        let mut process = FakeProcess::alive();
        let source = FlakySource::new(0, vec![window("Discord")]);
        let evaluator = ScriptedEvaluator::new(vec![
            EvaluationResult::Unknown,
            EvaluationResult::Failed,
            EvaluationResult::Success,
        ]);

        drive(&mut process, &source, &evaluator, TICK).await.unwrap();

        assert_eq!(evaluator.seen().len(), 3);
        assert_eq!(source.fetches(), 3);
    }

    #[tokio::test]
    async fn test_missing_boot_script_fails_before_launch() {
        let dir = tempfile::tempdir().unwrap();
        let run_config = RunConfig {
            executable: dir.path().join("Discord.exe"),
            port: crate::config::DEFAULT_PORT,
            variant: crate::target::Variant::Stable,
            minimized: false,
            boot: crate::target::BootPatch::Default,
        };
        let evaluator = ScriptedEvaluator::new(Vec::new());

        let err = run(
            Platform::Windows,
            &run_config,
            &evaluator,
            &DevtoolsSettings::defaults(),
            dir.path(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RunError::Target(TargetError::NotFound(msg)) if msg.contains("autostartreg.bat")));
        assert!(evaluator.seen().is_empty());
    }

    struct BrokenSource;

    #[async_trait]
    impl WindowSource for BrokenSource {
        async fn fetch_windows(&self) -> DevtoolsResult<Option<Vec<WindowDescriptor>>> {
            Err(DevtoolsError::Protocol("not a window list".to_string()))
        }
    }

    #[tokio::test]
    async fn test_protocol_error_aborts_without_waiting() {
        let mut process = FakeProcess::alive();
        let evaluator = ScriptedEvaluator::new(Vec::new());

        let err = supervise(&mut process, &BrokenSource, &evaluator, TICK)
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Devtools(DevtoolsError::Protocol(_))));
        assert!(!process.waited);
        assert!(evaluator.seen().is_empty());
    }
}
