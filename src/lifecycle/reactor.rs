//! The single-threaded event loop and its cross-thread entry point.
//!
//! # Responsibilities
//! - Provide the one sanctioned way for other threads to reach the loop
//! - Multiplex OS signal delivery and queued messages on the loop thread
//! - Report why the loop stopped
//!
//! # Design Decisions
//! - Background threads never touch loop-owned state; they enqueue messages
//! - The queue is unbounded so posting never blocks a signal or prompt thread

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::lifecycle::prompt::{ConfirmOutcome, ConfirmPrompt};
use crate::lifecycle::signals::{SignalCoordinator, SignalEvent};

/// Why the event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was confirmed at the prompt.
    Confirmed,
    /// A second interrupt arrived while confirmation was pending.
    Interrupted,
    /// A termination signal was received.
    Terminated,
    /// The HTTP server exited on its own.
    ServerExited,
    /// Stop requested programmatically.
    Requested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Confirmed => write!(f, "shutdown confirmed"),
            StopReason::Interrupted => write!(f, "interrupted"),
            StopReason::Terminated => write!(f, "terminated"),
            StopReason::ServerExited => write!(f, "server exited"),
            StopReason::Requested => write!(f, "stop requested"),
        }
    }
}

/// Work posted onto the loop thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorMessage {
    /// Stop the loop.
    Stop(StopReason),
    /// The confirmation prompt finished.
    ConfirmationResolved(ConfirmOutcome),
}

/// Thread-safe handle for scheduling work on the event loop.
#[derive(Debug, Clone)]
pub struct ReactorHandle {
    tx: mpsc::UnboundedSender<ReactorMessage>,
}

impl ReactorHandle {
    /// Create a handle and the receiver the loop consumes.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ReactorMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue a message. Safe to call from any thread.
    ///
    /// Returns `false` once the loop has gone away.
    pub fn add_callback(&self, message: ReactorMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    /// Ask the loop to stop.
    pub fn stop(&self, reason: StopReason) {
        if !self.add_callback(ReactorMessage::Stop(reason)) {
            tracing::debug!(%reason, "Event loop already gone");
        }
    }
}

/// The reactor loop: signal coordinator plus its two inboxes.
pub struct EventLoop {
    coordinator: SignalCoordinator,
    signals: mpsc::UnboundedReceiver<SignalEvent>,
    messages: mpsc::UnboundedReceiver<ReactorMessage>,
}

impl EventLoop {
    /// Build a loop fed by `signals`, returning the handle other tasks use.
    pub fn new(
        signals: mpsc::UnboundedReceiver<SignalEvent>,
        prompt: Arc<dyn ConfirmPrompt>,
    ) -> (Self, ReactorHandle) {
        let (handle, messages) = ReactorHandle::channel();
        let coordinator = SignalCoordinator::new(handle.clone(), prompt);
        (
            Self {
                coordinator,
                signals,
                messages,
            },
            handle,
        )
    }

    pub fn coordinator(&self) -> &SignalCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut SignalCoordinator {
        &mut self.coordinator
    }

    /// Run until a stop message is processed.
    pub async fn run(&mut self) -> StopReason {
        loop {
            tokio::select! {
                Some(event) = self.signals.recv() => {
                    self.coordinator.handle_signal(event);
                }
                message = self.messages.recv() => match message {
                    Some(ReactorMessage::Stop(reason)) => return reason,
                    Some(ReactorMessage::ConfirmationResolved(outcome)) => {
                        self.coordinator.handle_confirmation(outcome);
                    }
                    // The coordinator holds a sender, so the queue outlives the loop.
                    None => return StopReason::Requested,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::prompt::ScriptedPrompt;
    use crate::lifecycle::signals::SignalState;

    fn event_loop(
        prompt: ScriptedPrompt,
    ) -> (EventLoop, ReactorHandle, mpsc::UnboundedSender<SignalEvent>) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (event_loop, handle) = EventLoop::new(signal_rx, Arc::new(prompt));
        (event_loop, handle, signal_tx)
    }

    #[tokio::test]
    async fn stop_from_another_thread_ends_loop() {
        let prompt = ScriptedPrompt::answer(ConfirmOutcome::Declined);
        let (mut el, handle, _signals) = event_loop(prompt);

        std::thread::spawn(move || handle.stop(StopReason::Requested));
        assert_eq!(el.run().await, StopReason::Requested);
    }

    #[tokio::test]
    async fn terminate_signal_stops_loop() {
        let prompt = ScriptedPrompt::answer(ConfirmOutcome::Declined);
        let (mut el, _handle, signals) = event_loop(prompt);

        signals.send(SignalEvent::Terminate).unwrap();
        assert_eq!(el.run().await, StopReason::Terminated);
        assert_eq!(el.coordinator().state(), SignalState::ForcedStop);
    }

    #[tokio::test]
    async fn confirmed_interrupt_stops_loop() {
        let prompt = ScriptedPrompt::answer(ConfirmOutcome::Confirmed);
        let (mut el, _handle, signals) = event_loop(prompt);

        signals.send(SignalEvent::Interrupt).unwrap();
        assert_eq!(el.run().await, StopReason::Confirmed);
        assert_eq!(el.coordinator().state(), SignalState::ForcedStop);
    }

    #[tokio::test]
    async fn declined_interrupt_keeps_running() {
        let prompt = ScriptedPrompt::answer(ConfirmOutcome::TimedOut);
        let (mut el, handle, signals) = event_loop(prompt);

        signals.send(SignalEvent::Interrupt).unwrap();
        let outcome = tokio::time::timeout(std::time::Duration::from_millis(300), el.run()).await;
        assert!(outcome.is_err(), "loop should still be running");
        assert_eq!(el.coordinator().state(), SignalState::Normal);
        assert_eq!(el.coordinator().restorations(), 1);

        handle.stop(StopReason::Requested);
        assert_eq!(el.run().await, StopReason::Requested);
    }
}
