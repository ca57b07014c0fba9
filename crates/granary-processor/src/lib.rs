//! Processor worker service
//!
//! Receives tasks from the durable queue, runs the media dispatcher as a
//! background job under a process-wide concurrency cap and a wall-clock
//! deadline, and keeps the document row updated on every exit path.

pub mod bootstrap;
pub mod routes;
pub mod runner;
pub mod state;

pub use bootstrap::build_state;
pub use routes::create_router;
pub use state::{ActiveJob, AppState};
