use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback<E> = Rc<dyn Fn(&E)>;

struct ListenerSet<E> {
    next_id: u64,
    entries: Vec<(u64, Callback<E>)>,
}

/// Single-threaded observer list. Components publish change notifications
/// through it; the UI layer subscribes and re-reads snapshots.
pub struct Listeners<E> {
    inner: Rc<RefCell<ListenerSet<E>>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Listeners {
            inner: Rc::new(RefCell::new(ListenerSet {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }
}

impl<E: 'static> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(&E) + 'static) -> Subscription {
        let id = {
            let mut set = self.inner.borrow_mut();
            let id = set.next_id;
            set.next_id += 1;
            set.entries.push((id, Rc::new(callback)));
            id
        };
        let weak: Weak<RefCell<ListenerSet<E>>> = Rc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(set) = weak.upgrade() {
                    set.borrow_mut().entries.retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// Callbacks run against a snapshot, so they may subscribe, unsubscribe
    /// or emit again without tripping the borrow.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for cb in snapshot {
            cb(event);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unsubscribes when dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Keep the callback registered for the lifetime of the emitter.
    pub fn persist(mut self) {
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_emit_reaches_subscribers_until_dropped() {
        let listeners: Listeners<u32> = Listeners::new();
        let seen = Rc::new(Cell::new(0));
        let s = seen.clone();
        let sub = listeners.subscribe(move |v| s.set(s.get() + *v));
        listeners.emit(&2);
        listeners.emit(&3);
        assert_eq!(seen.get(), 5);
        drop(sub);
        listeners.emit(&10);
        assert_eq!(seen.get(), 5);
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_persisted_subscription_survives() {
        let listeners: Listeners<()> = Listeners::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        listeners.subscribe(move |_| h.set(h.get() + 1)).persist();
        listeners.emit(&());
        assert_eq!(hits.get(), 1);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn test_callback_may_subscribe_during_emit() {
        let listeners: Rc<Listeners<()>> = Rc::new(Listeners::new());
        let l = listeners.clone();
        listeners
            .subscribe(move |_| l.subscribe(|_| {}).persist())
            .persist();
        listeners.emit(&());
        assert_eq!(listeners.len(), 2);
    }
}
