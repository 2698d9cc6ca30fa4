//! Minimal typed publish/subscribe for session progress events.

use std::sync::{Arc, Mutex, PoisonError};

use super::controller::Termination;

/// Events published by the run controller.
#[derive(Debug, Clone)]
pub enum SearchEvent {
    /// A generation finished and its record was appended.
    Generation { index: u64 },
    /// The search reached its terminal state.
    EvolutionEnded { reason: Termination },
}

/// Handle returned by [`EventBus::subscribe`]; pass it back to
/// [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&SearchEvent) + Send + Sync>;

/// Synchronous publish/subscribe.
///
/// Delivery happens on the publishing thread (the worker thread for
/// generation and end-of-run events), in registration order. Publishing
/// snapshots the listener list first, so a listener that unsubscribes
/// while a publish is in flight may still see that one event.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<BusState>,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; returns the handle used to unsubscribe.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SearchEvent) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let id = ListenerId(state.next_id);
        state.next_id += 1;
        state.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Unknown handles are ignored.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.lock().listeners.retain(|(lid, _)| *lid != id);
    }

    /// Deliver `event` to every registered listener, in registration
    /// order, on the calling thread.
    pub fn publish(&self, event: &SearchEvent) {
        let snapshot: Vec<Listener> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(event);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_in_registration_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |_| seen.lock().unwrap().push(tag));
        }

        bus.publish(&SearchEvent::Generation { index: 1 });
        assert_eq!(*seen.lock().unwrap(), ["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0usize));

        let counter = Arc::clone(&count);
        let id = bus.subscribe(move |_| *counter.lock().unwrap() += 1);

        bus.publish(&SearchEvent::Generation { index: 1 });
        bus.unsubscribe(id);
        bus.publish(&SearchEvent::Generation { index: 2 });

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_event_payloads() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        bus.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        bus.publish(&SearchEvent::Generation { index: 3 });
        bus.publish(&SearchEvent::EvolutionEnded {
            reason: Termination::MaxGenerations,
        });

        let events = seen.lock().unwrap();
        assert!(matches!(events[0], SearchEvent::Generation { index: 3 }));
        assert!(matches!(
            events[1],
            SearchEvent::EvolutionEnded {
                reason: Termination::MaxGenerations
            }
        ));
    }
}
