//! Interactive shutdown confirmation.
//!
//! The prompt runs on a dedicated thread; it is the only code in the server
//! allowed to block, and it blocks for at most the given timeout.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::Duration;

/// How long the prompt waits for an answer.
pub const CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of asking the user whether to shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The answer started with `y`.
    Confirmed,
    /// Any other answer, or end of input.
    Declined,
    /// No answer within the timeout.
    TimedOut,
}

/// Asks for shutdown confirmation. Called off the event loop thread.
pub trait ConfirmPrompt: Send + Sync + 'static {
    fn confirm(&self, timeout: Duration) -> ConfirmOutcome;
}

/// Map a line typed by the user to an outcome.
pub fn interpret_answer(line: &str) -> ConfirmOutcome {
    if line.to_lowercase().starts_with('y') {
        ConfirmOutcome::Confirmed
    } else {
        ConfirmOutcome::Declined
    }
}

/// Prompts on a terminal: writes the question, then waits on a line source.
pub struct TerminalPrompt {
    lines: Arc<Mutex<Receiver<String>>>,
    out: Mutex<Box<dyn Write + Send>>,
}

impl TerminalPrompt {
    /// Prompt over explicit input lines and output.
    pub fn with_io(lines: Receiver<String>, out: impl Write + Send + 'static) -> Self {
        Self {
            lines: Arc::new(Mutex::new(lines)),
            out: Mutex::new(Box::new(out)),
        }
    }
}

impl Default for TerminalPrompt {
    /// Prompt on stdout, reading answers from stdin.
    fn default() -> Self {
        Self {
            lines: stdin_lines(),
            out: Mutex::new(Box::new(io::stdout())),
        }
    }
}

impl ConfirmPrompt for TerminalPrompt {
    fn confirm(&self, timeout: Duration) -> ConfirmOutcome {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        // Input typed before the prompt appeared is not an answer.
        while lines.try_recv().is_ok() {}

        let _ = write!(out, "Shutdown Notebook Server (y/[n])? ");
        let _ = out.flush();

        let outcome = match lines.recv_timeout(timeout) {
            Ok(line) => interpret_answer(&line),
            Err(RecvTimeoutError::Timeout) => {
                let _ = write!(out, "No answer for {}s: ", timeout.as_secs());
                ConfirmOutcome::TimedOut
            }
            Err(RecvTimeoutError::Disconnected) => ConfirmOutcome::Declined,
        };

        if outcome == ConfirmOutcome::Confirmed {
            tracing::error!("Shutdown confirmed");
        } else {
            let _ = writeln!(out, "resuming operation...");
        }
        let _ = out.flush();
        outcome
    }
}

/// Lines read from stdin by a single long-lived reader thread.
///
/// Waiting on this channel with a timeout is the readiness wait; the reader
/// thread is the only thing that ever blocks on stdin itself.
fn stdin_lines() -> Arc<Mutex<Receiver<String>>> {
    static LINES: OnceLock<Arc<Mutex<Receiver<String>>>> = OnceLock::new();
    let lines = LINES.get_or_init(|| {
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "Failed to start stdin reader");
        }
        Arc::new(Mutex::new(rx))
    });
    Arc::clone(lines)
}

/// Prompt that returns a fixed outcome, optionally after a delay or a gate.
#[cfg(test)]
pub(crate) struct ScriptedPrompt {
    outcome: ConfirmOutcome,
    gate: Option<Mutex<Receiver<()>>>,
    asked: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl ScriptedPrompt {
    pub(crate) fn answer(outcome: ConfirmOutcome) -> Self {
        Self {
            outcome,
            gate: None,
            asked: Default::default(),
        }
    }

    /// Answer only once the returned sender fires (or is dropped).
    pub(crate) fn gated(outcome: ConfirmOutcome) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let prompt = Self {
            outcome,
            gate: Some(Mutex::new(rx)),
            asked: Default::default(),
        };
        (prompt, tx)
    }

    pub(crate) fn times_asked(&self) -> usize {
        self.asked.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl ConfirmPrompt for ScriptedPrompt {
    fn confirm(&self, _timeout: Duration) -> ConfirmOutcome {
        self.asked.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _ = gate.lock().unwrap().recv();
        }
        self.outcome
    }
}
