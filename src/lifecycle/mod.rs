//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → HTTP server stops accepting
//!             → liveness loop and config loop exit
//!             → switchboard closes peers and releases waiters
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
