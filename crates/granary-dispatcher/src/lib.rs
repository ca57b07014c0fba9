//! Queue dispatcher service
//!
//! Translates object-storage finalized events into durable processing
//! tasks. Stateless: the document row and the queue carry all state.

pub mod events;
pub mod handler;
pub mod queue;

pub use events::StorageEvent;
pub use handler::{DispatcherState, create_router};
pub use queue::{HttpTaskQueue, MockTaskQueue, QueueError, QueueResult, TaskPayload, TaskQueue};
