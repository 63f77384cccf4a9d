//! Process execution for a single invocation.
//!
//! Runs the command with no stdin, copies stdout and stderr into the item's
//! sinks while the process runs, and enforces the optional deadline with
//! SIGTERM followed by SIGKILL after a grace period.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::AsyncRead;
use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::invocation::InvocationSpec;
use crate::sink::SinkPair;

/// How an invocation reached its terminal state.
///
/// None of these fail a run: exit codes and failures are for whoever reads
/// the sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationOutcome {
    /// The process exited on its own. `code` is `None` if a signal ended it.
    Exited { code: Option<i32> },
    /// The deadline fired and the process was terminated.
    TimedOut { code: Option<i32> },
    /// The process could not be started.
    SpawnFailed { error: String },
    /// Waiting for the process failed after it was started.
    WaitFailed { error: String },
    /// The sink files could not be opened; nothing was spawned.
    SinkFailed { error: String },
}

impl InvocationOutcome {
    /// Short name of the variant, as used in the serialized `status` tag.
    pub fn status(&self) -> &'static str {
        match self {
            InvocationOutcome::Exited { .. } => "exited",
            InvocationOutcome::TimedOut { .. } => "timed_out",
            InvocationOutcome::SpawnFailed { .. } => "spawn_failed",
            InvocationOutcome::WaitFailed { .. } => "wait_failed",
            InvocationOutcome::SinkFailed { .. } => "sink_failed",
        }
    }
}

/// Executes one invocation to a terminal state.
///
/// The scheduler only depends on this trait so tests can substitute
/// instrumented fakes for real processes.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, spec: &InvocationSpec) -> InvocationOutcome;
}

/// Runs invocations as OS processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    working_directory: PathBuf,
    kill_grace: Duration,
}

impl ProcessRunner {
    const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

    pub fn new(working_directory: PathBuf) -> Self {
        Self {
            working_directory,
            kill_grace: Self::DEFAULT_KILL_GRACE,
        }
    }

    /// Time between the termination signal and a forced kill.
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    async fn drive(&self, mut child: Child, sinks: &mut SinkPair, spec: &InvocationSpec) -> InvocationOutcome {
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        // The group outlives its leader while any descendant is alive.
        let group = child.id().and_then(|pid| i32::try_from(pid).ok());
        let deadline = spec.deadline.filter(|d| !d.is_zero());

        // The deadline covers the copies as well as the wait: a background
        // descendant can hold a pipe open long after the leader exits.
        let mut timed_out = false;
        let settled = {
            let work = async {
                tokio::join!(
                    child.wait(),
                    pipe_into(stdout, &mut sinks.stdout),
                    pipe_into(stderr, &mut sinks.stderr),
                )
            };
            tokio::pin!(work);
            match deadline {
                None => Some(work.await),
                Some(deadline) => match tokio::time::timeout(deadline, &mut work).await {
                    Ok(done) => Some(done),
                    Err(_) => {
                        timed_out = true;
                        info!(
                            item = %spec.item,
                            pgid = group,
                            deadline_secs = deadline.as_secs_f64(),
                            "deadline exceeded, terminating"
                        );
                        self.terminate(group, work).await
                    }
                },
            }
        };

        let (waited, out_copied, err_copied) = match settled {
            Some(done) => done,
            None => {
                warn!(item = %spec.item, "output still held open after kill, abandoning pipes");
                if let Err(e) = child.start_kill() {
                    debug!(item = %spec.item, error = %e, "start_kill failed");
                }
                let abandoned = || -> io::Result<u64> {
                    Err(io::Error::new(io::ErrorKind::TimedOut, "pipe abandoned after kill"))
                };
                (child.wait().await, abandoned(), abandoned())
            }
        };

        match &out_copied {
            Ok(bytes) => debug!(item = %spec.item, bytes, "stdout drained"),
            Err(e) => warn!(item = %spec.item, error = %e, "stdout copy failed"),
        }
        match &err_copied {
            Ok(bytes) => debug!(item = %spec.item, bytes, "stderr drained"),
            Err(e) => warn!(item = %spec.item, error = %e, "stderr copy failed"),
        }

        match waited {
            Ok(status) if timed_out => InvocationOutcome::TimedOut { code: status.code() },
            Ok(status) => InvocationOutcome::Exited { code: status.code() },
            Err(e) => {
                warn!(item = %spec.item, error = %e, "failed waiting for process");
                if let Err(write_err) = sinks
                    .write_diagnostic(&format!("failed waiting for {}: {e}", spec.invocation))
                    .await
                {
                    warn!(item = %spec.item, error = %write_err, "failed to record wait error");
                }
                InvocationOutcome::WaitFailed { error: e.to_string() }
            }
        }
    }

    /// SIGTERM the group, SIGKILL it after the grace period, and keep
    /// draining `work` throughout. `None` if it is still pending a grace
    /// period after the kill.
    async fn terminate<F: Future>(&self, group: Option<i32>, mut work: Pin<&mut F>) -> Option<F::Output> {
        signal_group(group, Termination::Graceful);
        if let Ok(done) = tokio::time::timeout(self.kill_grace, work.as_mut()).await {
            return Some(done);
        }

        warn!(pgid = group, grace_secs = self.kill_grace.as_secs_f64(), "group ignored SIGTERM, killing");
        signal_group(group, Termination::Forced);
        tokio::time::timeout(self.kill_grace, work).await.ok()
    }
}

#[async_trait]
impl Executor for ProcessRunner {
    async fn execute(&self, spec: &InvocationSpec) -> InvocationOutcome {
        let started = Instant::now();

        let mut sinks = match SinkPair::open(&spec.sinks).await {
            Ok(sinks) => sinks,
            Err(e) => {
                warn!(
                    item = %spec.item,
                    path = %spec.sinks.stdout.display(),
                    error = %e,
                    "failed to open sinks, skipping item"
                );
                return InvocationOutcome::SinkFailed { error: e.to_string() };
            }
        };

        let mut cmd = spec.invocation.command();
        cmd.current_dir(&self.working_directory);
        // Own process group, so the deadline signal reaches every descendant.
        #[cfg(unix)]
        cmd.process_group(0);

        debug!(
            index = spec.index,
            item = %spec.item,
            command = %spec.invocation,
            deadline_secs = spec.deadline.map(|d| d.as_secs_f64()),
            "spawning process"
        );

        let outcome = match cmd.spawn() {
            Ok(child) => self.drive(child, &mut sinks, spec).await,
            Err(e) => {
                warn!(item = %spec.item, error = %e, "failed to spawn process");
                let message = format!("failed to spawn {}: {e}", spec.invocation);
                if let Err(write_err) = sinks.write_diagnostic(&message).await {
                    warn!(item = %spec.item, error = %write_err, "failed to record spawn error");
                }
                InvocationOutcome::SpawnFailed { error: e.to_string() }
            }
        };

        if let Err(e) = sinks.close().await {
            warn!(item = %spec.item, error = %e, "failed to flush sinks");
        }

        info!(
            index = spec.index,
            item = %spec.item,
            outcome = ?outcome,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "invocation finished"
        );
        outcome
    }
}

#[derive(Debug, Clone, Copy)]
enum Termination {
    Graceful,
    Forced,
}

#[cfg(unix)]
fn signal_group(group: Option<i32>, how: Termination) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = group else {
        return;
    };
    let signal = match how {
        Termination::Graceful => Signal::SIGTERM,
        Termination::Forced => Signal::SIGKILL,
    };
    // ESRCH once every member has exited.
    if let Err(e) = killpg(Pid::from_raw(pgid), signal) {
        debug!(pgid, ?signal, error = %e, "killpg failed");
    }
}

// No process groups: the forced stage falls through to `start_kill` on the child.
#[cfg(not(unix))]
fn signal_group(_group: Option<i32>, _how: Termination) {}

async fn pipe_into<R>(reader: Option<R>, sink: &mut File) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    match reader {
        Some(mut reader) => tokio::io::copy(&mut reader, sink).await,
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::Invocation;
    use crate::sink::SinkAllocator;

    fn spec_in(alloc: &SinkAllocator, item: &str, invocation: Invocation, deadline: Option<Duration>) -> InvocationSpec {
        InvocationSpec {
            index: 0,
            item: item.to_string(),
            invocation,
            sinks: alloc.paths_for(item),
            deadline,
        }
    }

    async fn setup() -> (tempfile::TempDir, SinkAllocator, ProcessRunner) {
        let root = tempfile::tempdir().unwrap();
        let alloc = SinkAllocator::new(root.path(), "run");
        alloc.prepare().await.unwrap();
        let runner = ProcessRunner::new(root.path().to_path_buf()).with_kill_grace(Duration::from_secs(1));
        (root, alloc, runner)
    }

    #[test]
    fn test_status_matches_serialized_tag() {
        let outcomes = [
            InvocationOutcome::Exited { code: Some(0) },
            InvocationOutcome::TimedOut { code: None },
            InvocationOutcome::SpawnFailed { error: "x".into() },
            InvocationOutcome::WaitFailed { error: "x".into() },
            InvocationOutcome::SinkFailed { error: "x".into() },
        ];
        for outcome in outcomes {
            let json = serde_json::to_value(&outcome).unwrap();
            assert_eq!(json["status"], outcome.status());
        }
    }

    #[tokio::test]
    async fn test_streams_go_to_separate_sinks() {
        let (_root, alloc, runner) = setup().await;
        let spec = spec_in(&alloc, "x", Invocation::Shell("echo out; echo err >&2".into()), None);

        let outcome = runner.execute(&spec).await;

        assert_eq!(outcome, InvocationOutcome::Exited { code: Some(0) });
        assert_eq!(std::fs::read_to_string(&spec.sinks.stdout).unwrap(), "out\n");
        assert_eq!(std::fs::read_to_string(&spec.sinks.stderr).unwrap(), "err\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let (_root, alloc, runner) = setup().await;
        let spec = spec_in(&alloc, "x", Invocation::Shell("exit 3".into()), None);

        assert_eq!(runner.execute(&spec).await, InvocationOutcome::Exited { code: Some(3) });
    }

    #[tokio::test]
    async fn test_stdin_is_closed() {
        let (_root, alloc, runner) = setup().await;
        // Would block forever if stdin were inherited or piped and left open.
        let spec = spec_in(&alloc, "x", Invocation::Shell("cat; echo done".into()), Some(Duration::from_secs(10)));

        assert_eq!(runner.execute(&spec).await, InvocationOutcome::Exited { code: Some(0) });
        assert_eq!(std::fs::read_to_string(&spec.sinks.stdout).unwrap(), "done\n");
    }

    #[tokio::test]
    async fn test_spawn_failure_recorded_in_stderr_sink() {
        let (_root, alloc, runner) = setup().await;
        let spec = spec_in(
            &alloc,
            "x",
            Invocation::Program {
                program: "definitely-not-a-real-binary-4f2a".into(),
                args: vec![],
            },
            None,
        );

        let outcome = runner.execute(&spec).await;

        assert!(matches!(outcome, InvocationOutcome::SpawnFailed { .. }));
        let stderr = std::fs::read_to_string(&spec.sinks.stderr).unwrap();
        assert!(stderr.starts_with("failed to spawn definitely-not-a-real-binary-4f2a"));
        assert_eq!(std::fs::read_to_string(&spec.sinks.stdout).unwrap(), "");
    }

    #[tokio::test]
    async fn test_deadline_terminates_process_group() {
        let (_root, alloc, runner) = setup().await;
        let spec = spec_in(
            &alloc,
            "slow",
            Invocation::Shell("echo start; sleep 30; echo end".into()),
            Some(Duration::from_millis(300)),
        );

        let started = Instant::now();
        let outcome = runner.execute(&spec).await;

        assert!(matches!(outcome, InvocationOutcome::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(std::fs::read_to_string(&spec.sinks.stdout).unwrap(), "start\n");
    }

    #[tokio::test]
    async fn test_sigterm_ignored_falls_back_to_kill() {
        let (_root, alloc, runner) = setup().await;
        let spec = spec_in(
            &alloc,
            "stubborn",
            Invocation::Shell("trap '' TERM; echo armed; while true; do sleep 0.1; done".into()),
            Some(Duration::from_millis(300)),
        );

        let started = Instant::now();
        let outcome = runner.execute(&spec).await;

        assert_eq!(outcome, InvocationOutcome::TimedOut { code: None });
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(std::fs::read_to_string(&spec.sinks.stdout).unwrap(), "armed\n");
    }

    #[tokio::test]
    async fn test_deadline_covers_background_child_holding_pipe() {
        let (_root, alloc, runner) = setup().await;
        // The shell exits at once; the subshell keeps stdout open past the deadline.
        let spec = spec_in(
            &alloc,
            "x",
            Invocation::Shell("echo begin; (sleep 6; echo late) &".into()),
            Some(Duration::from_millis(500)),
        );

        let started = Instant::now();
        let outcome = runner.execute(&spec).await;

        assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
        assert_eq!(outcome, InvocationOutcome::TimedOut { code: Some(0) });
        assert_eq!(std::fs::read_to_string(&spec.sinks.stdout).unwrap(), "begin\n");
    }

    #[tokio::test]
    async fn test_background_child_without_deadline_is_drained() {
        let (_root, alloc, runner) = setup().await;
        let spec = spec_in(&alloc, "x", Invocation::Shell("echo begin; (sleep 0.3; echo late) &".into()), None);

        assert_eq!(runner.execute(&spec).await, InvocationOutcome::Exited { code: Some(0) });
        assert_eq!(std::fs::read_to_string(&spec.sinks.stdout).unwrap(), "begin\nlate\n");
    }

    #[tokio::test]
    async fn test_missing_run_dir_is_sink_failure() {
        let root = tempfile::tempdir().unwrap();
        let alloc = SinkAllocator::new(root.path(), "never-prepared");
        let runner = ProcessRunner::new(root.path().to_path_buf());
        let spec = spec_in(&alloc, "x", Invocation::Shell("echo hi".into()), None);

        assert!(matches!(runner.execute(&spec).await, InvocationOutcome::SinkFailed { .. }));
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let (root, alloc, runner) = setup().await;
        let spec = spec_in(&alloc, "x", Invocation::Shell("pwd".into()), None);

        runner.execute(&spec).await;

        let pwd = std::fs::read_to_string(&spec.sinks.stdout).unwrap();
        let expected = root.path().canonicalize().unwrap();
        assert_eq!(std::path::Path::new(pwd.trim()).canonicalize().unwrap(), expected);
    }
}
