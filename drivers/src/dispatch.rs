use std::sync::{Arc, PoisonError, RwLock};

use shared::event::NullSink;
use shared::{CanonicalEvent, EventSink};

/// Holds the host callback of a driver. Workers dispatch through it so the
/// callback can be replaced while instances run.
pub struct EventDispatcher {
    sink: RwLock<Arc<dyn EventSink>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            sink: RwLock::new(Arc::new(NullSink)),
        }
    }

    pub fn set_sink(&self, sink: Arc<dyn EventSink>) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = sink;
    }

    /// Deliver an event on the calling thread
    pub fn dispatch(&self, event: CanonicalEvent) {
        let sink = Arc::clone(&self.sink.read().unwrap_or_else(PoisonError::into_inner));
        sink.dispatch(event);
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
