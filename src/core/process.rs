/*!
 * External process supervision
 *
 * Every radio-facing tool (iw, airmon-ng, airodump-ng, reaver, ...) is driven
 * as an opaque child process. Short commands run to completion untracked;
 * the one long-running capture/attack process is tracked so it can be
 * time-bounded and cancelled from another thread.
 */

use std::fmt;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::core::error::WpsError;

/// Program plus arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// What a finished (or terminated) process left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// stdout and stderr joined, for marker scanning
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    fn from_parts(status: Option<ExitStatus>, stdout: String, stderr: String) -> Self {
        Self {
            status: status.and_then(|s| s.code()),
            stdout,
            stderr,
            ..Default::default()
        }
    }
}

/// Seam between orchestration and the OS
///
/// `ProcessSupervisor` is the real implementation; tests script their own.
pub trait CommandRunner: Send + Sync {
    /// Run a short command to completion without tracking it; implementations
    /// bound it by their own command timeout
    fn output(&self, spec: &CommandSpec) -> Result<ProcessOutput, WpsError>;

    /// Run the tracked long-running process, bounded by `timeout`
    fn run(&self, spec: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, WpsError>;

    /// Terminate the tracked process; returns whether one was running
    fn cancel(&self) -> bool;

    fn is_busy(&self) -> bool;
}

/// Spawns, time-bounds and cancels external processes
pub struct ProcessSupervisor {
    current: Arc<Mutex<Option<Child>>>,
    cancelled: Arc<AtomicBool>,
    poll_interval: Duration,
    grace: Duration,
    command_timeout: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(2))
    }
}

impl ProcessSupervisor {
    pub fn new(poll_interval: Duration, grace: Duration) -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            cancelled: Arc::new(AtomicBool::new(false)),
            poll_interval,
            grace,
            command_timeout: Duration::from_secs(30),
        }
    }

    /// Upper bound for untracked commands run through `output()`
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    fn slot(&self) -> MutexGuard<'_, Option<Child>> {
        // A panic while holding the lock leaves the Option intact
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn spawn(spec: &CommandSpec) -> Result<Child, WpsError> {
        debug!("Running: {}", spec);
        spec.command()
            .spawn()
            .map_err(|e| WpsError::from_spawn(&spec.program, e))
    }

    /// SIGTERM, wait up to `grace`, then SIGKILL; always reaps the child
    fn terminate(child: &mut Child, grace: Duration, poll: Duration) -> Option<ExitStatus> {
        signal_terminate(child);

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            match child.try_wait() {
                Ok(Some(status)) => return Some(status),
                Ok(None) => thread::sleep(poll.min(Duration::from_millis(50))),
                Err(_) => break,
            }
        }

        warn!("Process {} ignored SIGTERM, killing", child.id());
        let _ = child.kill();
        child.wait().ok()
    }
}

#[cfg(unix)]
fn signal_terminate(child: &Child) {
    // SAFETY: plain kill(2) on a pid we spawned and have not yet reaped
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn signal_terminate(child: &mut Child) {
    let _ = child.kill();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

impl CommandRunner for ProcessSupervisor {
    fn output(&self, spec: &CommandSpec) -> Result<ProcessOutput, WpsError> {
        let started = Instant::now();
        let mut child = Self::spawn(spec)?;
        let (stdout, stderr) = (drain(child.stdout.take()), drain(child.stderr.take()));

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) if started.elapsed() >= self.command_timeout => {
                    warn!("{} hung for {:?}, terminating", spec, self.command_timeout);
                    Self::terminate(&mut child, self.grace, self.poll_interval);
                    // Not joined: a grandchild may still hold the pipes
                    drop((stdout, stderr));
                    return Err(WpsError::ProcessTimeout {
                        program: spec.program.clone(),
                        after: self.command_timeout,
                    });
                }
                Ok(None) => thread::sleep(self.poll_interval.min(Duration::from_millis(20))),
                Err(e) => {
                    warn!("Failed to poll {}: {}", spec.program, e);
                    let _ = child.kill();
                    break child.wait().ok();
                }
            }
        };

        let mut result = ProcessOutput::from_parts(status, collect(stdout), collect(stderr));
        result.elapsed = started.elapsed();
        Ok(result)
    }

    fn run(&self, spec: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, WpsError> {
        let (stdout, stderr) = {
            let mut slot = self.slot();
            if slot.is_some() {
                return Err(WpsError::ProcessBusy);
            }
            self.cancelled.store(false, Ordering::SeqCst);

            let mut child = Self::spawn(spec)?;
            let pipes = (drain(child.stdout.take()), drain(child.stderr.take()));
            *slot = Some(child);
            pipes
        };

        let started = Instant::now();
        let mut timed_out = false;

        let status = loop {
            {
                let mut slot = self.slot();
                let Some(child) = slot.as_mut() else {
                    break None;
                };

                match child.try_wait() {
                    Ok(Some(status)) => {
                        slot.take();
                        break Some(status);
                    }
                    Ok(None) if started.elapsed() >= timeout => {
                        debug!("{} exceeded {:?}, terminating", spec.program, timeout);
                        timed_out = true;
                        let status = Self::terminate(child, self.grace, self.poll_interval);
                        slot.take();
                        break status;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Failed to poll {}: {}", spec.program, e);
                        let _ = child.kill();
                        let status = child.wait().ok();
                        slot.take();
                        break status;
                    }
                }
            }
            thread::sleep(self.poll_interval);
        };

        let mut result = ProcessOutput::from_parts(status, collect(stdout), collect(stderr));
        result.timed_out = timed_out;
        result.cancelled = self.cancelled.load(Ordering::SeqCst);
        result.elapsed = started.elapsed();
        Ok(result)
    }

    fn cancel(&self) -> bool {
        let mut slot = self.slot();
        match slot.as_mut() {
            Some(child) => {
                self.cancelled.store(true, Ordering::SeqCst);
                debug!("Cancelling supervised process {}", child.id());
                // Reaped here; the polling loop then sees the exit status
                Self::terminate(child, self.grace, self.poll_interval);
                true
            }
            None => false,
        }
    }

    fn is_busy(&self) -> bool {
        self.slot().is_some()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn supervisor() -> ProcessSupervisor {
        ProcessSupervisor::new(Duration::from_millis(10), Duration::from_millis(500))
    }

    #[test]
    fn test_command_spec_display() {
        let spec = CommandSpec::new("reaver").args(["-i", "wlan0mon"]).arg("-vv");
        assert_eq!(spec.to_string(), "reaver -i wlan0mon -vv");
    }

    #[test]
    fn test_output_captures_stdout_and_status() {
        let out = supervisor()
            .output(&CommandSpec::new("sh").args(["-c", "echo hello; echo oops >&2; exit 3"]))
            .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
        assert_eq!(out.status, Some(3));
        assert!(!out.success());
        assert!(out.combined().contains("oops"));
    }

    #[test]
    fn test_output_bounded_by_command_timeout() {
        let sup = supervisor().with_command_timeout(Duration::from_millis(200));
        let started = Instant::now();
        let err = sup
            .output(&CommandSpec::new("sh").args(["-c", "exec sleep 30"]))
            .unwrap_err();

        assert!(matches!(err, WpsError::ProcessTimeout { ref program, .. } if program == "sh"));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!sup.is_busy());
    }

    #[test]
    fn test_missing_tool_reported() {
        let err = supervisor()
            .output(&CommandSpec::new("definitely-not-a-real-tool-xyz"))
            .unwrap_err();
        assert!(matches!(err, WpsError::ToolMissing(_)));
    }

    #[test]
    fn test_run_completes_before_timeout() {
        let sup = supervisor();
        let out = sup
            .run(&CommandSpec::new("sh").args(["-c", "echo done"]), Duration::from_secs(5))
            .unwrap();
        assert!(out.success());
        assert!(!out.timed_out);
        assert_eq!(out.stdout.trim(), "done");
        assert!(!sup.is_busy());
    }

    #[test]
    fn test_run_times_out_and_keeps_partial_output() {
        let sup = supervisor();
        let out = sup
            .run(
                &CommandSpec::new("sh").args(["-c", "echo partial; exec sleep 30"]),
                Duration::from_millis(200),
            )
            .unwrap();
        assert!(out.timed_out);
        assert!(!out.success());
        assert_eq!(out.stdout.trim(), "partial");
        assert!(out.elapsed < Duration::from_secs(5));
        assert!(!sup.is_busy());
    }
}
