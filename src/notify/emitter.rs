use std::sync::Mutex;

use event_emitter_rs::EventEmitter;

use super::{ChangeEvent, ChangeListener};

/// Adapts an `EventEmitter` to the `ChangeListener` interface.
///
/// Each change is emitted under its event label with the JSON form of the
/// event (`ChangeEvent::to_json`) as a string payload. Emitter callbacks run
/// on their own threads; `on_change` waits for them so delivery stays
/// synchronous with the write.
///
/// The wait blocks the calling thread, which inside an async runtime is an
/// executor worker, until every callback returns. Use the `UnboundedSender`
/// listener when callbacks are slow.
///
/// # Example
///
/// ```ignore
/// let listener = EmitterListener::new(EventEmitter::new());
/// listener.on("object-change", |payload: String| {
///     println!("changed: {}", payload);
/// });
/// ```
pub struct EmitterListener {
    emitter: Mutex<EventEmitter>,
}

impl EmitterListener {
    pub fn new(emitter: EventEmitter) -> Self {
        Self {
            emitter: Mutex::new(emitter),
        }
    }

    /// Register a callback for an event label. Returns the emitter's listener id.
    pub fn on<F>(&self, event: &str, listener: F) -> Option<String>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        match self.emitter.lock() {
            Ok(mut emitter) => Some(emitter.on(event, listener)),
            Err(_) => {
                tracing::warn!(event, "event emitter lock poisoned, listener not registered");
                None
            }
        }
    }
}

impl ChangeListener for EmitterListener {
    fn on_change(&self, event: &ChangeEvent) {
        let payload = event.to_json().to_string();

        let handles = match self.emitter.lock() {
            Ok(mut emitter) => emitter.emit(&event.label, payload),
            Err(_) => {
                tracing::warn!(
                    event = %event.label,
                    "event emitter lock poisoned, dropping notification"
                );
                return;
            }
        };

        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!(event = %event.label, "event emitter callback panicked");
            }
        }
    }
}
