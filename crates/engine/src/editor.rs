use std::cell::RefCell;
use std::rc::{Rc, Weak};

use dronedash_shared::models::{DroneAssignment, TerminalPatch, TerminalStatus, WarehousePatch};
use tracing::debug;

use crate::api::Backend;
use crate::error::{DashboardError, Result};
use crate::events::{Listeners, Subscription};
use crate::runtime::Runtime;
use crate::store::{EntityKey, EntityStore};

/// Editable fields, per entity kind. Coordinates are not editable here.
#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    Terminal {
        name: String,
        active: bool,
        control_key: String,
    },
    Warehouse {
        name: String,
    },
}

/// Drone assignments shown in the warehouse editor.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignments {
    NotApplicable,
    Loading,
    Loaded(Vec<DroneAssignment>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorSession {
    pub id: u64,
    pub target: EntityKey,
    pub title: String,
    pub draft: Draft,
    pub assignments: Assignments,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorState {
    Closed,
    Open(EditorSession),
    /// Waiting for the user to confirm a delete.
    ConfirmDelete(EditorSession),
    Saving(EditorSession),
    Deleting(EditorSession),
    /// The last save or delete failed; the overlay stays open with `message`.
    Error {
        session: EditorSession,
        message: String,
    },
}

impl EditorState {
    pub fn session(&self) -> Option<&EditorSession> {
        match self {
            EditorState::Closed => None,
            EditorState::Open(s)
            | EditorState::ConfirmDelete(s)
            | EditorState::Saving(s)
            | EditorState::Deleting(s)
            | EditorState::Error { session: s, .. } => Some(s),
        }
    }

    fn session_mut(&mut self) -> Option<&mut EditorSession> {
        match self {
            EditorState::Closed => None,
            EditorState::Open(s)
            | EditorState::ConfirmDelete(s)
            | EditorState::Saving(s)
            | EditorState::Deleting(s)
            | EditorState::Error { session: s, .. } => Some(s),
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, EditorState::Closed)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, EditorState::Saving(_) | EditorState::Deleting(_))
    }
}

struct Inner<B> {
    store: EntityStore<B>,
    runtime: Rc<dyn Runtime>,
    state: RefCell<EditorState>,
    next_session: RefCell<u64>,
    listeners: Listeners<EditorState>,
}

/// Modal editor bound to one terminal or warehouse at a time.
///
/// Save closes the overlay only when the store accepts the update; a failure
/// leaves it open in [`EditorState::Error`]. Delete goes through
/// [`EditorState::ConfirmDelete`] first. Completions that arrive after the
/// overlay was closed or re-targeted are dropped.
pub struct EditorOverlay<B> {
    inner: Rc<Inner<B>>,
}

impl<B> Clone for EditorOverlay<B> {
    fn clone(&self) -> Self {
        EditorOverlay {
            inner: self.inner.clone(),
        }
    }
}

impl<B: Backend + 'static> EditorOverlay<B> {
    pub fn new(store: EntityStore<B>, runtime: Rc<dyn Runtime>) -> Self {
        EditorOverlay {
            inner: Rc::new(Inner {
                store,
                runtime,
                state: RefCell::new(EditorState::Closed),
                next_session: RefCell::new(0),
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn state(&self) -> EditorState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self, callback: impl Fn(&EditorState) + 'static) -> Subscription {
        self.inner.listeners.subscribe(callback)
    }

    fn set_state(&self, next: EditorState) {
        *self.inner.state.borrow_mut() = next;
        self.publish();
    }

    fn publish(&self) {
        let snapshot = self.state();
        self.inner.listeners.emit(&snapshot);
    }

    fn current_session_id(&self) -> Option<u64> {
        self.inner.state.borrow().session().map(|s| s.id)
    }

    /// Open the overlay on `target`, replacing whatever was open before.
    pub fn open(&self, target: EntityKey) -> Result<()> {
        let id = {
            let mut next = self.inner.next_session.borrow_mut();
            *next += 1;
            *next
        };
        let session = match target {
            EntityKey::Terminal(tid) => {
                let t = self
                    .inner
                    .store
                    .terminal(tid)
                    .ok_or_else(|| DashboardError::NotFound(format!("Terminal {}", tid)))?;
                EditorSession {
                    id,
                    target,
                    title: format!("Edit DDT: {}", t.name),
                    draft: Draft::Terminal {
                        name: t.name,
                        active: t.active,
                        control_key: t.control_key,
                    },
                    assignments: Assignments::NotApplicable,
                }
            }
            EntityKey::Warehouse(wid) => {
                let w = self
                    .inner
                    .store
                    .warehouse(wid)
                    .ok_or_else(|| DashboardError::NotFound(format!("Warehouse {}", wid)))?;
                self.load_assignments(id, w.name.clone());
                EditorSession {
                    id,
                    target,
                    title: format!("Edit Warehouse: {}", w.name),
                    draft: Draft::Warehouse { name: w.name },
                    assignments: Assignments::Loading,
                }
            }
        };
        debug!(session = id, ?target, "editor opened");
        self.set_state(EditorState::Open(session));
        Ok(())
    }

    fn load_assignments(&self, session: u64, warehouse_name: String) {
        let backend = self.inner.store.backend();
        let weak: Weak<Inner<B>> = Rc::downgrade(&self.inner);
        self.inner.runtime.spawn(Box::pin(async move {
            let result = backend.drone_assignments(&warehouse_name).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let editor = EditorOverlay { inner };
            let updated = {
                let mut state = editor.inner.state.borrow_mut();
                match state.session_mut() {
                    Some(s) if s.id == session => {
                        s.assignments = match result {
                            Ok(rows) => Assignments::Loaded(rows),
                            Err(e) => Assignments::Failed(e.to_string()),
                        };
                        true
                    }
                    _ => false,
                }
            };
            if updated {
                editor.publish();
            }
        }));
    }

    fn edit_draft(&self, apply: impl FnOnce(&mut Draft)) {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            match &mut *state {
                EditorState::Open(s) | EditorState::Error { session: s, .. } => {
                    apply(&mut s.draft);
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.publish();
        }
    }

    pub fn set_name(&self, value: &str) {
        self.edit_draft(|draft| match draft {
            Draft::Terminal { name, .. } | Draft::Warehouse { name } => *name = value.to_string(),
        });
    }

    pub fn set_active(&self, value: bool) {
        self.edit_draft(|draft| {
            if let Draft::Terminal { active, .. } = draft {
                *active = value;
            }
        });
    }

    pub fn set_control_key(&self, value: &str) {
        self.edit_draft(|draft| {
            if let Draft::Terminal { control_key, .. } = draft {
                *control_key = value.to_string();
            }
        });
    }

    /// Push the draft through the store. Only valid from `Open` or `Error`.
    pub async fn save(&self) -> Result<()> {
        let session = {
            let state = self.inner.state.borrow();
            match &*state {
                EditorState::Open(s) | EditorState::Error { session: s, .. } => s.clone(),
                _ => {
                    return Err(DashboardError::Validation(
                        "Nothing to save right now.".to_string(),
                    ))
                }
            }
        };
        self.set_state(EditorState::Saving(session.clone()));

        let result = match (&session.target, &session.draft) {
            (
                EntityKey::Terminal(id),
                Draft::Terminal {
                    name,
                    active,
                    control_key,
                },
            ) => {
                let patch = TerminalPatch {
                    name: Some(name.trim().to_string()),
                    status: Some(TerminalStatus::from_active(*active)),
                    control_key: Some(control_key.trim().to_string()),
                };
                self.inner.store.update_terminal(*id, patch).await.map(|_| ())
            }
            (EntityKey::Warehouse(id), Draft::Warehouse { name }) => {
                let patch = WarehousePatch {
                    name: Some(name.trim().to_string()),
                };
                self.inner.store.update_warehouse(*id, patch).await.map(|_| ())
            }
            _ => Err(DashboardError::DataQuality(
                "editor draft does not match its target".to_string(),
            )),
        };
        self.finish(session, result)
    }

    pub fn request_delete(&self) {
        let next = match &*self.inner.state.borrow() {
            EditorState::Open(s) | EditorState::Error { session: s, .. } => {
                Some(EditorState::ConfirmDelete(s.clone()))
            }
            _ => None,
        };
        if let Some(next) = next {
            self.set_state(next);
        }
    }

    pub fn cancel_delete(&self) {
        let next = match &*self.inner.state.borrow() {
            EditorState::ConfirmDelete(s) => Some(EditorState::Open(s.clone())),
            _ => None,
        };
        if let Some(next) = next {
            self.set_state(next);
        }
    }

    /// Delete the target. Only valid after [`request_delete`](Self::request_delete).
    pub async fn confirm_delete(&self) -> Result<()> {
        let session = match &*self.inner.state.borrow() {
            EditorState::ConfirmDelete(s) => s.clone(),
            _ => {
                return Err(DashboardError::Validation(
                    "Delete has not been confirmed.".to_string(),
                ))
            }
        };
        self.set_state(EditorState::Deleting(session.clone()));
        let result = match session.target {
            EntityKey::Terminal(id) => self.inner.store.delete_terminal(id).await,
            EntityKey::Warehouse(id) => self.inner.store.delete_warehouse(id).await,
        };
        self.finish(session, result)
    }

    fn finish(&self, session: EditorSession, result: Result<()>) -> Result<()> {
        if self.current_session_id() != Some(session.id) {
            debug!(session = session.id, "editor completion ignored, session replaced");
            return result;
        }
        match &result {
            Ok(()) => self.set_state(EditorState::Closed),
            Err(e) => self.set_state(EditorState::Error {
                session,
                message: e.to_string(),
            }),
        }
        result
    }

    pub fn close(&self) {
        if self.inner.state.borrow().is_open() {
            self.set_state(EditorState::Closed);
        }
    }
}
