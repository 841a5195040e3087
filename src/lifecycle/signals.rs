//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGINT, SIGTERM)
//! - Translate signals to internal events
//! - Arbitrate between confirmed shutdown and immediate stop
//!
//! # Design Decisions
//! - OS delivery only forwards events; all decisions run on the event loop
//! - First SIGINT asks for confirmation, a second one stops immediately
//! - SIGTERM always stops immediately
//!
//! # State Machine
//! ```text
//!            SIGINT (handler = Confirm)
//!   Normal ───────────────────────────▶ ConfirmPending
//!     ▲                                   │        │
//!     │  declined / timed out             │        │ SIGINT (handler = ForceStop)
//!     └───────────────────────────────────┘        │ or confirmed
//!                                                  ▼
//!   any ──────────── SIGTERM ─────────────────▶ ForcedStop
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::lifecycle::prompt::{ConfirmOutcome, ConfirmPrompt, CONFIRM_TIMEOUT};
use crate::lifecycle::reactor::{ReactorHandle, ReactorMessage, StopReason};

/// A signal observed by the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

/// Where the coordinator is in the shutdown conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    Normal,
    /// A confirmation prompt is outstanding.
    ConfirmPending,
    ForcedStop,
}

/// What the next interrupt does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptHandler {
    /// Ask for confirmation.
    Confirm,
    /// Stop without asking.
    ForceStop,
}

/// Owns the interrupt-handler registration and the shutdown state machine.
///
/// Every method runs on the event loop thread.
pub struct SignalCoordinator {
    state: SignalState,
    handler: InterruptHandler,
    reactor: ReactorHandle,
    prompt: Arc<dyn ConfirmPrompt>,
    timeout: Duration,
    restorations: u32,
    confirmations_started: u32,
}

impl SignalCoordinator {
    pub fn new(reactor: ReactorHandle, prompt: Arc<dyn ConfirmPrompt>) -> Self {
        Self {
            state: SignalState::Normal,
            handler: InterruptHandler::Confirm,
            reactor,
            prompt,
            timeout: CONFIRM_TIMEOUT,
            restorations: 0,
            confirmations_started: 0,
        }
    }

    /// Override the confirmation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> SignalState {
        self.state
    }

    pub fn handler(&self) -> InterruptHandler {
        self.handler
    }

    /// How many times the original interrupt handler has been restored.
    pub fn restorations(&self) -> u32 {
        self.restorations
    }

    /// How many confirmation tasks have been spawned.
    pub fn confirmations_started(&self) -> u32 {
        self.confirmations_started
    }

    /// React to a delivered signal.
    pub fn handle_signal(&mut self, event: SignalEvent) {
        match event {
            SignalEvent::Terminate => {
                tracing::error!("received signal SIGTERM, stopping");
                self.force_stop(StopReason::Terminated);
            }
            SignalEvent::Interrupt => match self.handler {
                InterruptHandler::Confirm => self.begin_confirmation(),
                InterruptHandler::ForceStop => {
                    tracing::error!("received signal SIGINT, stopping");
                    self.force_stop(StopReason::Interrupted);
                }
            },
        }
    }

    /// Apply the result of a confirmation task.
    ///
    /// Outcomes arriving after the state already left `ConfirmPending` are
    /// dropped, so the handler is restored at most once per prompt.
    pub fn handle_confirmation(&mut self, outcome: ConfirmOutcome) {
        if self.state != SignalState::ConfirmPending {
            tracing::debug!(?outcome, state = ?self.state, "Ignoring stale confirmation");
            return;
        }

        match outcome {
            ConfirmOutcome::Confirmed => self.force_stop(StopReason::Confirmed),
            ConfirmOutcome::Declined | ConfirmOutcome::TimedOut => {
                tracing::info!(?outcome, "Shutdown not confirmed, resuming");
                self.restore_interrupt_handler();
                self.state = SignalState::Normal;
            }
        }
    }

    fn begin_confirmation(&mut self) {
        match self.state {
            SignalState::Normal => {}
            SignalState::ConfirmPending => {
                // Unreachable while the handler is re-armed; stop rather than double-prompt.
                self.force_stop(StopReason::Interrupted);
                return;
            }
            SignalState::ForcedStop => {
                self.reactor.stop(StopReason::Interrupted);
                return;
            }
        }

        // Re-arm before spawning so a second ^C never reaches this path.
        self.handler = InterruptHandler::ForceStop;
        self.state = SignalState::ConfirmPending;
        self.confirmations_started += 1;

        let prompt = Arc::clone(&self.prompt);
        let reactor = self.reactor.clone();
        let timeout = self.timeout;
        let spawned = thread::Builder::new()
            .name("confirm-exit".into())
            .spawn(move || {
                let outcome = prompt.confirm(timeout);
                reactor.add_callback(ReactorMessage::ConfirmationResolved(outcome));
            });

        if let Err(e) = spawned {
            tracing::warn!(error = %e, "Failed to start confirmation prompt");
            self.handle_confirmation(ConfirmOutcome::Declined);
        }
    }

    fn restore_interrupt_handler(&mut self) {
        self.handler = InterruptHandler::Confirm;
        self.restorations += 1;
    }

    fn force_stop(&mut self, reason: StopReason) {
        self.state = SignalState::ForcedStop;
        self.reactor.stop(reason);
    }
}

/// Register OS signal handlers and forward deliveries into a channel.
///
/// Must be called from within a Tokio runtime. Registration happens before
/// this returns; forwarding runs as a task on the current runtime.
pub fn install_os_signals() -> std::io::Result<mpsc::UnboundedReceiver<SignalEvent>> {
    let (tx, rx) = mpsc::unbounded_channel();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    Some(()) = interrupt.recv() => SignalEvent::Interrupt,
                    Some(()) = terminate.recv() => SignalEvent::Terminate,
                    else => break,
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if tx.send(SignalEvent::Interrupt).is_err() {
                    break;
                }
            }
        });
    }

    tracing::debug!("Signal handlers installed");
    Ok(rx)
}
