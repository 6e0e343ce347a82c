//! Shared observer/event-listener plumbing for the resilience engine,
//! generalized from the pattern used across the resilience crates this
//! workspace started from (one `XxxEvent` enum per pattern, a listener
//! trait, a panic-safe emitter).

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Trait for events emitted by the resilience engine (circuit breaker
/// transitions, retry attempts, budget exhaustion, ...).
pub trait ResilienceEvent: Send + Sync + fmt::Debug {
    fn event_type(&self) -> &'static str;
    fn timestamp(&self) -> Instant;
    /// The operation or target this event pertains to.
    fn target(&self) -> &str;
}

pub trait EventListener<E: ResilienceEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// A collection of event listeners that emits to all of them, isolating
/// panics so one misbehaving listener can't silence the others.
#[derive(Clone)]
pub struct EventListeners<E: ResilienceEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: ResilienceEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self { listeners: Vec::new() }
    }

    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
            if result.is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    target = event.target(),
                    event_type = event.event_type(),
                    "resilience event listener panicked"
                );
                #[cfg(feature = "metrics")]
                metrics::counter!(
                    "gateway_resilience_event_listener_panics_total",
                    "target" => event.target().to_string(),
                    "event_type" => event.event_type().to_string()
                )
                .increment(1);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: ResilienceEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<E>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f, _phantom: std::marker::PhantomData }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: ResilienceEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestEvent;

    impl ResilienceEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            "test"
        }
        fn timestamp(&self) -> Instant {
            Instant::now()
        }
        fn target(&self) -> &str {
            "test-target"
        }
    }

    #[test]
    fn listeners_all_receive_events() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let mut listeners = EventListeners::new();
        listeners.add(FnListener::new(move |_: &TestEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        listeners.emit(&TestEvent);
        listeners.emit(&TestEvent);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let mut listeners = EventListeners::new();
        listeners.add(FnListener::new(|_: &TestEvent| panic!("boom")));
        listeners.add(FnListener::new(move |_: &TestEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        listeners.emit(&TestEvent);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
