//! Client side of the host's named-event channel.
//!
//! Handlers are keyed by event name and run synchronously, in registration
//! order, on the thread that calls [`EventBus::emit`]. A host bridge forwards
//! whatever the native process emits into `emit`; tests call it directly.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use crate::store::Subscription;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub payload: Option<String>,
}

pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

type Registry = HashMap<String, Vec<(u64, Handler)>>;

#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<Mutex<Registry>>,
    next_id: Arc<AtomicU64>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(
        &self,
        event: impl Into<String>,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) -> Subscription {
        let event = event.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.handlers)
            .entry(event.clone())
            .or_default()
            .push((id, Arc::new(handler)));

        let weak = Arc::downgrade(&self.handlers);
        Subscription::new(move || {
            let Some(handlers) = weak.upgrade() else {
                return;
            };
            let mut registry = lock(&handlers);
            if let Some(list) = registry.get_mut(&event) {
                list.retain(|(handler_id, _)| *handler_id != id);
                if list.is_empty() {
                    registry.remove(&event);
                }
            }
        })
    }

    /// Delivers an event to every handler registered for its name.
    ///
    /// Returns how many handlers ran.
    pub fn emit(&self, name: &str, payload: Option<String>) -> usize {
        let handlers: Vec<Handler> = match lock(&self.handlers).get(name) {
            Some(list) => list.iter().map(|(_, handler)| Arc::clone(handler)).collect(),
            None => return 0,
        };

        let event = Event {
            name: name.to_string(),
            payload,
        };
        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        lock(&self.handlers).get(name).map_or(0, Vec::len)
    }

    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = lock(&self.handlers).keys().cloned().collect();
        topics.sort();
        topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_reaches_only_matching_handlers_in_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let a = Arc::clone(&seen);
        let _first = bus.listen("job", move |event| {
            a.lock().unwrap().push(format!("first:{:?}", event.payload))
        });
        let b = Arc::clone(&seen);
        let _second = bus.listen("job", move |_| b.lock().unwrap().push("second".to_string()));
        let c = Arc::clone(&seen);
        let _other = bus.listen("other", move |_| c.lock().unwrap().push("other".to_string()));

        assert_eq!(bus.emit("job", Some("1".to_string())), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:Some(\"1\")".to_string(), "second".to_string()]
        );
    }

    #[test]
    fn unknown_event_runs_nothing() {
        let bus = EventBus::new();
        assert_eq!(bus.emit("nobody", None), 0);
    }

    #[test]
    fn dropping_subscription_removes_handler_and_topic() {
        let bus = EventBus::new();
        let sub = bus.listen("pause_selection", |_| {});
        assert_eq!(bus.listener_count("pause_selection"), 1);
        assert_eq!(bus.topics(), vec!["pause_selection".to_string()]);

        drop(sub);
        assert_eq!(bus.listener_count("pause_selection"), 0);
        assert!(bus.topics().is_empty());
    }

    #[test]
    fn handler_may_listen_while_being_dispatched() {
        let bus = EventBus::new();
        let inner = bus.clone();
        let _sub = bus.listen("boot", move |_| inner.listen("late", |_| {}).detach());

        bus.emit("boot", None);
        assert_eq!(bus.listener_count("late"), 1);
    }
}
