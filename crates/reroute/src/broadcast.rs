//! Ordered, failure-isolated callback listeners.
//!
//! Listeners are invoked synchronously in registration order. A listener that
//! returns an error or panics is logged and counted; delivery continues with
//! the next listener and the broadcaster's own state is never touched.

use std::panic::{catch_unwind, AssertUnwindSafe};

use bevy::prelude::*;

use crate::error::ListenerError;

pub type ListenerResult = Result<(), ListenerError>;

type Callback<T> = Box<dyn FnMut(&T) -> ListenerResult + Send + Sync>;

/// Handle returned by [`Listeners::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Outcome of one [`Listeners::notify`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct Listeners<T> {
    entries: Vec<(ListenerId, Callback<T>)>,
    next_id: u64,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> Listeners<T> {
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&T) -> ListenerResult + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Returns false if the id was not (or no longer) registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn notify(&mut self, value: &T) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for (id, callback) in &mut self.entries {
            match catch_unwind(AssertUnwindSafe(|| callback(value))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    warn!("listener {:?} failed: {}", id, err);
                    report.failed += 1;
                }
                Err(_) => {
                    warn!("listener {:?} panicked; continuing delivery", id);
                    report.failed += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_notify_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = Listeners::<u32>::default();
        for tag in ["a", "b", "c"] {
            let log = Arc::clone(&log);
            listeners.subscribe(move |v| {
                log.lock().unwrap().push(format!("{tag}{v}"));
                Ok(())
            });
        }
        let report = listeners.notify(&7);
        assert_eq!(report.delivered, 3);
        assert_eq!(*log.lock().unwrap(), vec!["a7", "b7", "c7"]);
    }

    #[test]
    fn test_failing_listener_is_isolated() {
        let hits = Arc::new(Mutex::new(0));
        let mut listeners = Listeners::<()>::default();
        listeners.subscribe(|_| Err(ListenerError::new("boom")));
        listeners.subscribe(|_| panic!("listener exploded"));
        let counter = Arc::clone(&hits);
        listeners.subscribe(move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        let report = listeners.notify(&());
        assert_eq!(report, DeliveryReport { delivered: 1, failed: 2 });
        assert_eq!(*hits.lock().unwrap(), 1);

        // The panicking listener stays registered and isolation keeps working.
        let report = listeners.notify(&());
        assert_eq!(report.failed, 2);
        assert_eq!(*hits.lock().unwrap(), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let mut listeners = Listeners::<()>::default();
        let a = listeners.subscribe(|_| Ok(()));
        let _b = listeners.subscribe(|_| Ok(()));
        assert_eq!(listeners.len(), 2);
        assert!(listeners.unsubscribe(a));
        assert!(!listeners.unsubscribe(a));
        assert_eq!(listeners.notify(&()).delivered, 1);
    }
}
