use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use portico_core::ConfigEvent;

/// A handler for one configuration event type.
///
/// Handlers apply the change to in-process state (registry, authz cache,
/// tenant cache) and must not fail the stream: errors are their own to log.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: ConfigEvent);
}

/// Dispatch map from event type to handler.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event type, replacing any previous one.
    #[must_use]
    pub fn with_handler(
        mut self,
        event_type: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        self.handlers.insert(event_type.into(), handler);
        self
    }

    /// Route one decoded event to its handler.
    ///
    /// Events with no registered handler are logged and dropped.
    pub async fn dispatch(&self, event: ConfigEvent) {
        let Some(handler) = self.handlers.get(&event.event_type) else {
            warn!(
                event_type = %event.event_type,
                event_id = %event.event_id,
                "no handler registered for event type, skipping"
            );
            return;
        };

        debug!(
            event_type = %event.event_type,
            event_id = %event.event_id,
            correlation_id = event.correlation_id.as_deref().unwrap_or("-"),
            "dispatching configuration event"
        );
        handler.handle(event).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for Counting {
        async fn handle(&self, _event: ConfigEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn event(event_type: &str) -> ConfigEvent {
        serde_json::from_value(serde_json::json!({
            "eventId": "e1",
            "eventType": event_type,
            "timestamp": "2025-01-01T00:00:00Z",
            "payload": {"changeType": "CREATED", "entity": {}}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn routes_by_event_type() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new()
            .with_handler("config.collection.changed", Arc::new(Counting(count.clone())));

        dispatcher.dispatch(event("config.collection.changed")).await;
        dispatcher.dispatch(event("config.unknown")).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
