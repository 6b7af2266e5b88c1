mod channel;
mod event_handler;

pub use channel::{
    wire_handler, wire_projection, Channel, EventEmitter, EventObserver, PendingQueue,
    SubscriptionId, Unsubscriber,
};
pub use event_handler::EventHandler;
