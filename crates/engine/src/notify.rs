use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::debug;

use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::events::{Listeners, Subscription};
use crate::runtime::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
}

struct Inner {
    runtime: Rc<dyn Runtime>,
    error_lifetime: Duration,
    lifetime: Duration,
    state: RefCell<State>,
    listeners: Listeners<()>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    items: Vec<Notification>,
}

/// Dismissible toasts. Errors linger longer than other levels; every toast
/// removes itself after its lifetime unless dismissed first.
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Rc<Inner>,
}

impl NotificationCenter {
    pub fn new(runtime: Rc<dyn Runtime>, config: &DashboardConfig) -> Self {
        NotificationCenter {
            inner: Rc::new(Inner {
                runtime,
                error_lifetime: Duration::from_secs(config.error_notification_secs),
                lifetime: Duration::from_secs(config.notification_secs),
                state: RefCell::new(State::default()),
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn push(&self, level: NotificationLevel, message: impl Into<String>) -> u64 {
        let message = message.into();
        let id = {
            let mut state = self.inner.state.borrow_mut();
            state.next_id += 1;
            let id = state.next_id;
            state.items.push(Notification {
                id,
                level,
                message: message.clone(),
            });
            id
        };
        debug!(id, ?level, %message, "notification");

        let lifetime = match level {
            NotificationLevel::Error => self.inner.error_lifetime,
            _ => self.inner.lifetime,
        };
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let sleep = self.inner.runtime.sleep(lifetime);
        self.inner.runtime.spawn(Box::pin(async move {
            sleep.await;
            if let Some(inner) = weak.upgrade() {
                NotificationCenter { inner }.dismiss(id);
            }
        }));

        self.inner.listeners.emit(&());
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Success, message)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Error, message)
    }

    /// Surface a failure. Validation problems are warnings, everything else an error.
    pub fn report(&self, context: &str, error: &DashboardError) -> u64 {
        match error {
            DashboardError::Validation(msg) => self.warning(msg.clone()),
            other => self.error(format!("{}: {}", context, other)),
        }
    }

    pub fn dismiss(&self, id: u64) {
        let removed = {
            let mut state = self.inner.state.borrow_mut();
            let before = state.items.len();
            state.items.retain(|n| n.id != id);
            before != state.items.len()
        };
        if removed {
            self.inner.listeners.emit(&());
        }
    }

    pub fn list(&self) -> Vec<Notification> {
        self.inner.state.borrow().items.clone()
    }

    pub fn subscribe(&self, callback: impl Fn(&()) + 'static) -> Subscription {
        self.inner.listeners.subscribe(callback)
    }
}
