use crate::error::AutoTestError;
use ff_core::build_event::BuildResult;
use futures::future::BoxFuture;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

pub const ENV_BUILD_NUMBER: &str = "JENKINS_BUILD_NUMBER";
pub const ENV_JOB_NAME: &str = "JENKINS_JOB_NAME";
pub const ENV_BUILD_URL: &str = "JENKINS_BUILD_URL";

/// A resolved test command: program, arguments and the extra environment
/// describing the build that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl TestInvocation {
    /// Split `command` on whitespace. Returns `None` for a blank command.
    pub fn for_build(command: &str, result: &BuildResult) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            env: vec![
                (ENV_BUILD_NUMBER.to_string(), result.build.number.to_string()),
                (ENV_JOB_NAME.to_string(), result.name.clone()),
                (ENV_BUILD_URL.to_string(), result.build.full_url.clone()),
            ],
        })
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestReport {
    pub exit_code: i32,
    pub duration_seconds: f64,
}

/// Executes auto-test invocations. The listener uses `ProcessRunner`; tests
/// substitute a recorder.
pub trait TestRunner: Send + Sync {
    fn run(&self, invocation: TestInvocation) -> BoxFuture<'static, Result<TestReport, AutoTestError>>;
}

// ---------------------------------------------------------------------------
// ProcessRunner
// ---------------------------------------------------------------------------

/// Runs the command as a child process in the listener's working directory,
/// inheriting the environment, and forwards its stdout/stderr line by line
/// to the console.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

/// Copy `reader` to the console a line at a time until EOF. Lines that are
/// not valid UTF-8 are printed lossily; the pipe is always drained.
async fn forward_lines<R>(reader: R, to_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                let line = String::from_utf8_lossy(&buf);
                if to_stderr {
                    eprintln!("{line}");
                } else {
                    println!("{line}");
                }
            }
            Err(e) => {
                tracing::debug!("stopped forwarding test output: {e}");
                break;
            }
        }
    }
}

impl TestRunner for ProcessRunner {
    fn run(&self, invocation: TestInvocation) -> BoxFuture<'static, Result<TestReport, AutoTestError>> {
        Box::pin(async move {
            let start = Instant::now();

            let mut cmd = Command::new(&invocation.program);
            cmd.args(&invocation.args)
                .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());

            let mut child = cmd.spawn().map_err(|source| AutoTestError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

            let stdout_task = child
                .stdout
                .take()
                .map(|stdout| tokio::spawn(forward_lines(stdout, false)));
            let stderr_task = child
                .stderr
                .take()
                .map(|stderr| tokio::spawn(forward_lines(stderr, true)));

            if let Some(task) = stdout_task {
                let _ = task.await;
            }
            if let Some(task) = stderr_task {
                let _ = task.await;
            }

            let status = child.wait().await.map_err(AutoTestError::Wait)?;
            let exit_code = status.code().unwrap_or(-1);
            if !status.success() {
                return Err(AutoTestError::Exit {
                    program: invocation.program,
                    code: exit_code,
                });
            }

            Ok(TestReport {
                exit_code,
                duration_seconds: start.elapsed().as_secs_f64(),
            })
        })
    }
}

/// Run the configured test command for a successful build. Failures are
/// logged and never propagated.
pub async fn run_auto_test(runner: &dyn TestRunner, command: &str, result: &BuildResult) -> bool {
    let Some(invocation) = TestInvocation::for_build(command, result) else {
        return false;
    };

    tracing::info!("Auto-triggering tests: {command}");
    match runner.run(invocation).await {
        Ok(report) => {
            tracing::info!("Tests completed in {:.1}s", report.duration_seconds);
            true
        }
        Err(e) => {
            tracing::error!("Tests failed: {e}");
            false
        }
    }
}
