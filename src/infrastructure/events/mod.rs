//! Event publisher implementations

mod in_memory;
mod tracing_publisher;

pub use in_memory::{InMemoryEventPublisher, RecordedEvent};
pub use tracing_publisher::TracingEventPublisher;
