//! Observable value container.
//!
//! A [`Store`] owns one value and a list of observers. Every `set`/`update`
//! notifies the observers synchronously, in the order they subscribed. No
//! lock is held while observers run, so an observer may read or write the
//! store it is observing.
//!
//! Values are delivered one at a time and in the order they were written.
//! A `set` made while a delivery is already running (from an observer, or
//! from another thread) is queued and delivered by the running delivery
//! before it returns, so the last value observers see is always the value
//! the store holds.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, RwLock,
    },
};

pub type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Delivery<T> {
    running: bool,
    queue: VecDeque<T>,
}

struct StoreInner<T> {
    value: RwLock<T>,
    observers: Mutex<Vec<(u64, Observer<T>)>>,
    delivery: Mutex<Delivery<T>>,
    next_id: AtomicU64,
}

pub struct Store<T> {
    inner: Arc<StoreInner<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                value: RwLock::new(value),
                observers: Mutex::new(Vec::new()),
                delivery: Mutex::new(Delivery {
                    running: false,
                    queue: VecDeque::new(),
                }),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the whole value and notifies every observer.
    pub fn set(&self, value: T) {
        // The write and the enqueue happen under one lock so delivery order
        // matches write order.
        let mut delivery = lock(&self.inner.delivery);
        *self
            .inner
            .value
            .write()
            .unwrap_or_else(PoisonError::into_inner) = value.clone();
        delivery.queue.push_back(value);
        if delivery.running {
            return;
        }
        delivery.running = true;

        loop {
            let Some(next) = delivery.queue.pop_front() else {
                delivery.running = false;
                return;
            };
            drop(delivery);
            self.notify(&next);
            delivery = lock(&self.inner.delivery);
        }
    }

    /// Replaces the value with `f(current)` and notifies every observer.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let current = self.get();
        self.set(f(&current));
    }

    /// Registers `observer`, calling it right away with the current value.
    ///
    /// The observer stays registered until the returned [`Subscription`] is
    /// dropped or unsubscribed.
    pub fn subscribe(&self, observer: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let observer: Observer<T> = Arc::new(observer);
        observer(&self.get());

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.observers).push((id, observer));

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner.observers).retain(|(observer_id, _)| *observer_id != id);
            }
        })
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.inner.observers).len()
    }

    fn notify(&self, value: &T) {
        let observers: Vec<Observer<T>> = lock(&self.inner.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(value);
        }
    }
}

/// Handle returned by [`Store::subscribe`] and [`crate::bus::EventBus::listen`].
#[must_use = "dropping a Subscription removes the observer"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keeps the observer registered for as long as its source lives.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: &T| sink.lock().unwrap().push(value.clone()))
    }

    #[test]
    fn subscribe_delivers_current_value_then_changes() {
        let store = Store::new(1);
        let (seen, observer) = recorder::<i32>();
        let _sub = store.subscribe(observer);

        store.set(2);
        store.update(|v| v * 10);

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 20]);
        assert_eq!(store.get(), 20);
    }

    #[test]
    fn observers_run_in_registration_order() {
        let store = Store::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&order);
        let _a = store.subscribe(move |v| first.lock().unwrap().push(("a", *v)));
        let second = Arc::clone(&order);
        let _b = store.subscribe(move |v| second.lock().unwrap().push(("b", *v)));

        order.lock().unwrap().clear();
        store.set(5);

        assert_eq!(*order.lock().unwrap(), vec![("a", 5), ("b", 5)]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = Store::new("x".to_string());
        let (seen, observer) = recorder::<String>();
        let sub = store.subscribe(observer);
        assert_eq!(store.observer_count(), 1);

        sub.unsubscribe();
        store.set("y".to_string());

        assert_eq!(store.observer_count(), 0);
        assert_eq!(*seen.lock().unwrap(), vec!["x".to_string()]);
    }

    #[test]
    fn dropping_subscription_unsubscribes_but_detach_keeps_it() {
        let store = Store::new(0u8);
        {
            let _dropped = store.subscribe(|_| {});
        }
        assert_eq!(store.observer_count(), 0);

        store.subscribe(|_| {}).detach();
        assert_eq!(store.observer_count(), 1);
    }

    #[test]
    fn observer_may_read_store_reentrantly() {
        let store = Store::new(1);
        let reader = store.clone();
        let (seen, observer) = recorder::<i32>();
        let _sub = store.subscribe(move |v| {
            assert_eq!(reader.get(), *v);
            observer(v);
        });

        store.set(3);
        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    }

    #[test]
    fn write_from_observer_is_delivered_after_current_value() {
        let store = Store::new(0);
        let writer = store.clone();
        let (seen, observer) = recorder::<i32>();
        let _sub = store.subscribe(move |v| {
            observer(v);
            if *v > 10 {
                writer.set(10);
            }
        });

        store.set(15);

        assert_eq!(*seen.lock().unwrap(), vec![0, 15, 10]);
        assert_eq!(store.get(), 10);
    }

    #[test]
    fn last_delivery_matches_stored_value_across_threads() {
        let store = Store::new(0u32);
        let last = Arc::new(Mutex::new(0u32));
        let sink = Arc::clone(&last);
        let _sub = store.subscribe(move |v| *sink.lock().unwrap() = *v);

        let writers: Vec<_> = (0..4u32)
            .map(|thread| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for n in 0..500u32 {
                        store.set(thread * 1_000 + n);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        assert_eq!(*last.lock().unwrap(), store.get());
    }
}
