//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Build subsystems → Reconcile → Install signals → Bind listener
//!
//! Run (reactor.rs):
//!     Serve HTTP + event loop on one thread until a stop message
//!
//! Signals (signals.rs, prompt.rs):
//!     SIGINT → confirm on the terminal (5s) → stop or resume
//!     SIGINT twice / SIGTERM → stop immediately
//!
//! Shutdown (shutdown.rs):
//!     Loop exits → stop HTTP → snapshot kernel ids → stop each kernel
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Background threads talk to the loop only through `ReactorHandle`
//! - Kernel teardown is guaranteed by a drop guard, including on panic

pub mod browser;
pub mod prompt;
pub mod reactor;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use prompt::{ConfirmOutcome, ConfirmPrompt, TerminalPrompt, CONFIRM_TIMEOUT};
pub use reactor::{EventLoop, ReactorHandle, ReactorMessage, StopReason};
pub use shutdown::{cleanup_kernels, Shutdown, TeardownGuard};
pub use signals::{InterruptHandler, SignalCoordinator, SignalEvent, SignalState};
pub use startup::{is_exposed, LifecycleHooks, NotebookServer, StartupError, EXPOSURE_WARNING};
