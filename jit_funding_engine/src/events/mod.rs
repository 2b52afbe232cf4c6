//! Engine events and the hooks that subscribe to them.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler, HandlerFuture};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
