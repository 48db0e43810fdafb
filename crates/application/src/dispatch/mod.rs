mod deferred;
mod dispatcher;

pub use deferred::{DeferredAction, DeferredCommand};
pub use dispatcher::ActionDispatcher;
