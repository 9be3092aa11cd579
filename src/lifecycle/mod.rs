//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Region table → Storage → Intake → Listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal received → latched flag → servers stop accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: storage first, listeners last
//! - Fail fast: any startup error is fatal
//! - Public and admin servers share one latched shutdown flag

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{build_intake, run, StartupError};
