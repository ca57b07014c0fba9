//! Cross-service conventions shared by the granary binaries
//!
//! Correlation ids that join one job's log lines across the dispatcher and
//! the processor, process bootstrap, and the shared shutdown signal.

pub mod correlation;
pub mod init;
pub mod shutdown;

pub use correlation::CorrelationId;
pub use init::initialize_environment;
pub use shutdown::shutdown_signal;
