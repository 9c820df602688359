// ============================================================================
// rotobox-core/src/external/command.rs
// ============================================================================
//
// COMMAND EXECUTION: Bounded execution of external processes
//
// Every external stage runs under a timeout. One-shot commands (ffprobe, the
// remux, encoder listing, dependency checks) go through `run_with_timeout`,
// which polls the child and kills it once the wall-clock limit passes.
// Streaming stages (decode, encode) arm a `Watchdog` that kills the process
// from a background thread when a single read, write or final wait outlives
// the budget. The deadline restarts on every `resume` and stands still while
// paused.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{CoreError, CoreResult, Stage, command_start_error};

/// Interval between `try_wait` polls.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Last non-empty stderr lines, for error messages.
    pub fn stderr_tail(&self, lines: usize) -> String {
        tail(&self.stderr, lines)
    }
}

/// Renders a command as a shell-like string for logs.
pub fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Runs `cmd` to completion, killing it if it exceeds `timeout`.
///
/// The exit status is returned as-is; interpreting a failure is up to the
/// caller. Expiry yields [`CoreError::StageTimeout`] for `stage`.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration, stage: Stage) -> CoreResult<CommandOutput> {
    let description = describe(cmd);
    log::debug!("Running {stage} command: {description}");

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| command_start_error(description.clone(), e))?;

    let stdout_handle = child.stdout.take().map(spawn_reader);
    let stderr_handle = child.stderr.take().map(spawn_reader);

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if start.elapsed() >= timeout {
            kill_and_reap(&mut child);
            log::error!("{stage} command timed out after {}s: {description}", timeout.as_secs());
            return Err(CoreError::StageTimeout {
                stage,
                seconds: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = join_reader(stdout_handle);
    let stderr = join_reader(stderr_handle);
    log::debug!("{stage} command exited with {status}");

    Ok(CommandOutput {
        status,
        stdout,
        stderr,
    })
}

fn spawn_reader<R: Read + Send + 'static>(pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = BufReader::new(pipe).read_to_string(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("kill failed (process may have exited): {e}");
    }
    let _ = child.wait();
}

/// Collects lines from a streaming stderr pipe on a background thread.
pub fn spawn_line_collector<R: Read + Send + 'static>(pipe: R, label: &'static str) -> JoinHandle<Vec<String>> {
    thread::spawn(move || {
        let mut lines = Vec::new();
        for line in BufReader::new(pipe).lines().map_while(Result::ok) {
            log::trace!("{label}: {line}");
            lines.push(line);
        }
        lines
    })
}

/// Last `lines` non-empty lines of `text`, joined with "; ".
pub fn tail(text: &str, lines: usize) -> String {
    let kept: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let start = kept.len().saturating_sub(lines);
    kept[start..].join("; ")
}

/// Locks a mutex, recovering the guard if another thread panicked with it.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Waits for a shared child without holding its lock between polls, so a
/// watchdog can still reach the process to kill it.
pub fn wait_shared<C, F>(child: &Mutex<C>, mut try_wait: F) -> std::io::Result<ExitStatus>
where
    F: FnMut(&mut C) -> std::io::Result<Option<ExitStatus>>,
{
    loop {
        {
            let mut guard = lock(child);
            if let Some(status) = try_wait(&mut *guard)? {
                return Ok(status);
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Control messages for the watchdog thread.
#[derive(Debug, Clone, Copy)]
enum Signal {
    Resume,
    Pause,
}

/// Background timer that runs an expiry action unless disarmed in time.
///
/// The timer starts running. `pause` suspends it and `resume` restarts it
/// with a fresh deadline, so a stage that keeps making progress is never
/// killed however long it runs overall.
#[derive(Debug)]
pub struct Watchdog {
    control: Option<mpsc::Sender<Signal>>,
    fired: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Starts the timer. `on_expire` runs on the watchdog thread.
    pub fn arm<F>(timeout: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Signal>();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let handle = thread::spawn(move || {
            let mut running = true;
            loop {
                let signal = if running {
                    match rx.recv_timeout(timeout) {
                        Ok(signal) => signal,
                        Err(RecvTimeoutError::Timeout) => {
                            flag.store(true, Ordering::SeqCst);
                            on_expire();
                            return;
                        }
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                } else {
                    match rx.recv() {
                        Ok(signal) => signal,
                        Err(_) => return,
                    }
                };
                running = matches!(signal, Signal::Resume);
            }
        });

        Self {
            control: Some(tx),
            fired,
            handle: Some(handle),
        }
    }

    /// Restarts the deadline from now.
    pub fn resume(&self) {
        self.send(Signal::Resume);
    }

    /// Suspends the deadline until the next `resume`.
    pub fn pause(&self) {
        self.send(Signal::Pause);
    }

    fn send(&self, signal: Signal) {
        if let Some(tx) = &self.control {
            // A closed channel means the timer already fired.
            let _ = tx.send(signal);
        }
    }

    /// Whether the expiry action has run.
    pub fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Stops the timer and reports whether it had already fired.
    pub fn disarm(mut self) -> bool {
        self.stop();
        self.fired()
    }

    fn stop(&mut self) {
        // Dropping the sender wakes the thread with a disconnect.
        self.control.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}
