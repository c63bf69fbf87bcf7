//! Running commands and compressing their captured output.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::tracker::SavingsTracker;
use crate::config::Config;
use crate::domain::{Engine, RoutingResult};

/// Exit code reported when `wrap` kills a command at its deadline.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Output of a finished or killed command.
#[derive(Debug)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the command was killed at the deadline
    pub status: Option<ExitStatus>,
}

/// Applies the engine plus the size and savings gates from the config.
pub struct CompressService {
    engine: Engine,
    min_input_length: usize,
    min_compression_ratio: f64,
    timeout: Option<Duration>,
    tracker: Option<SavingsTracker>,
}

impl CompressService {
    pub fn new(engine: Engine, config: &Config) -> Self {
        Self {
            engine,
            min_input_length: config.min_input_length,
            min_compression_ratio: config.min_compression_ratio,
            timeout: (config.wrap_timeout > 0).then(|| Duration::from_secs(config.wrap_timeout)),
            tracker: None,
        }
    }

    /// Record compressions applied by `wrap` with `tracker`.
    pub fn with_tracker(mut self, tracker: SavingsTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Run `command` through `sh -c`, print its compressed output and
    /// return the exit code to propagate (1 when killed by a signal,
    /// [`TIMEOUT_EXIT_CODE`] when the deadline passed).
    pub fn wrap(&self, command: &str) -> Result<i32> {
        let captured = run_captured(command, self.timeout)?;
        let combined = combine_streams(&captured.stdout, &captured.stderr);

        let result = self.compress(command, &combined);
        if result.was_modified {
            if let Some(tracker) = &self.tracker {
                if let Err(e) = tracker.record(command, combined.len(), &result) {
                    warn!("Failed to record savings: {:#}", e);
                }
            }
        }

        let code = match captured.status {
            Some(status) => {
                write_output(&result.compressed_output)?;
                status.code().unwrap_or(1)
            }
            None => {
                let secs = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
                warn!(command, secs, "Command timed out");
                let notice = format!("[token-saver] command timed out after {}s", secs);
                write_output(&combine_streams(&result.compressed_output, &notice))?;
                TIMEOUT_EXIT_CODE
            }
        };

        debug!(command, code, handled_by = %result.handled_by, "Wrapped command finished");
        Ok(code)
    }

    /// Compress output read from stdin and print it, or the routing result
    /// as JSON.
    pub fn compress_stdin(&self, command: &str, json: bool) -> Result<()> {
        let mut bytes = Vec::new();
        io::stdin()
            .read_to_end(&mut bytes)
            .context("Failed to read output from stdin")?;
        let output = String::from_utf8_lossy(&bytes);

        let result = self.compress(command, &output);
        if json {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", serde_json::to_string(&result)?)?;
            stdout.flush()?;
            return Ok(());
        }
        write_output(&result.compressed_output)
    }

    /// Route `output`, falling back to the original when it is too short or
    /// the savings are below the configured ratio.
    pub fn compress(&self, command: &str, output: &str) -> RoutingResult {
        if output.len() < self.min_input_length {
            debug!(command, len = output.len(), "Output below minimum length");
            return RoutingResult::unhandled(output);
        }

        let result = self.engine.compress(command, output);
        if !result.was_modified {
            return result;
        }

        let ratio = result.savings_ratio(output.len());
        if ratio < self.min_compression_ratio {
            debug!(
                command,
                processor = %result.handled_by,
                ratio,
                "Savings below minimum, keeping original"
            );
            return RoutingResult::handled(&result.handled_by, output, output.to_string());
        }

        result
    }
}

/// Run `command` with `sh -c`, killing it and its children once `timeout`
/// has elapsed.
pub fn run_captured(command: &str, timeout: Option<Duration>) -> Result<Captured> {
    let mut builder = Command::new("sh");
    builder
        .arg("-c")
        .arg(command)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so a timeout also reaches grandchildren
        builder.process_group(0);
    }

    let mut child = builder
        .spawn()
        .with_context(|| format!("Failed to run command: {}", command))?;

    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());
    let status = wait_with_deadline(&mut child, timeout)?;

    Ok(Captured {
        stdout: String::from_utf8_lossy(&stdout.join().unwrap_or_default()).into_owned(),
        stderr: String::from_utf8_lossy(&stderr.join().unwrap_or_default()).into_owned(),
        status,
    })
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn wait_with_deadline(child: &mut Child, timeout: Option<Duration>) -> Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return Ok(Some(child.wait().context("Failed to wait for command")?));
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().context("Failed to poll command")? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            kill_group(child);
            child.wait().context("Failed to reap timed out command")?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        if killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL).is_ok() {
            return;
        }
    }
    let _ = child.kill();
}

/// Stdout followed by stderr, separated by a newline when needed.
fn combine_streams(stdout: &str, stderr: &str) -> String {
    if stderr.is_empty() {
        return stdout.to_string();
    }
    if stdout.is_empty() {
        return stderr.to_string();
    }
    let separator = if stdout.ends_with('\n') { "" } else { "\n" };
    format!("{}{}{}", stdout, separator, stderr)
}

fn write_output(output: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.is_empty() && !output.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Registry;

    fn service(config: Config) -> CompressService {
        let engine = Engine::new(Registry::discover(&config).unwrap());
        CompressService::new(engine, &config)
    }

    fn long_listing() -> String {
        let lines: Vec<String> = (0..300)
            .map(|i| format!("-rw-r--r-- 1 dev staff 1024 report_{}.csv", i))
            .collect();
        lines.join("\n")
    }

    #[test]
    fn test_short_output_not_compressed() {
        let result = service(Config::default()).compress("ls -la", "total 0");
        assert_eq!(result.compressed_output, "total 0");
        assert_eq!(result.handled_by, "none");
        assert!(!result.was_modified);
    }

    #[test]
    fn test_long_output_compressed() {
        let output = long_listing();
        let result = service(Config::default()).compress("ls -la", &output);
        assert_eq!(result.handled_by, "generic");
        assert!(result.was_modified);
        assert!(result.compressed_output.contains("lines truncated, 300 total"));
    }

    #[test]
    fn test_low_savings_keeps_original() {
        let config = Config {
            min_compression_ratio: 0.99,
            ..Config::default()
        };
        let output = long_listing();
        let result = service(config).compress("ls -la", &output);
        assert_eq!(result.compressed_output, output);
        assert!(!result.was_modified);
    }

    #[test]
    fn test_run_captured_collects_both_streams() {
        let captured = run_captured("echo out; echo err 1>&2; exit 4", None).unwrap();
        assert_eq!(captured.stdout, "out\n");
        assert_eq!(captured.stderr, "err\n");
        assert_eq!(captured.status.and_then(|s| s.code()), Some(4));
    }

    #[test]
    fn test_run_captured_kills_at_deadline() {
        let started = Instant::now();
        let captured =
            run_captured("echo partial; sleep 30; echo late", Some(Duration::from_millis(300)))
                .unwrap();
        assert!(captured.status.is_none());
        assert_eq!(captured.stdout, "partial\n");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let config = Config {
            wrap_timeout: 0,
            ..Config::default()
        };
        assert!(service(config).timeout.is_none());
        assert_eq!(
            service(Config::default()).timeout,
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn test_combine_streams() {
        assert_eq!(combine_streams("out", ""), "out");
        assert_eq!(combine_streams("", "err"), "err");
        assert_eq!(combine_streams("out", "err"), "out\nerr");
        assert_eq!(combine_streams("out\n", "err\n"), "out\nerr\n");
    }
}
