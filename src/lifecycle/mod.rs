//! Lifecycle management.
//!
//! Startup order is owned by `main`: config first, then chain client and
//! store, then the correlator task and the HTTP listener. Shutdown is a
//! broadcast signal every long-running task subscribes to.

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
