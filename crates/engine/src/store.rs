use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use dronedash_shared::models::{
    FleetStats, NewTerminal, NewWarehouse, Terminal, TerminalPatch, Warehouse, WarehousePatch,
};
use futures::future::{AbortHandle, Abortable};
use tracing::{debug, info, warn};

use crate::api::Backend;
use crate::config::{DashboardConfig, UndoStrategy};
use crate::error::{DashboardError, Result};
use crate::events::{Listeners, Subscription};
use crate::notify::NotificationCenter;
use crate::runtime::Runtime;

/// Identifies one entity across the store, the map and the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Terminal(i64),
    Warehouse(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    TerminalsChanged,
    WarehousesChanged,
    UndoChanged,
}

/// Outcome of [`EntityStore::load_all`]. Each collection succeeds or fails on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub terminals: Result<Vec<Terminal>>,
    pub warehouses: Result<Vec<Warehouse>>,
}

/// A deleted terminal that can still be brought back.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUndo {
    pub ticket: u64,
    pub terminal: Terminal,
    pub original_index: usize,
    /// A backend re-create is in flight for this entry.
    pub restoring: bool,
}

struct UndoEntry {
    pending: PendingUndo,
    timer: AbortHandle,
}

#[derive(Default)]
struct State {
    terminals: Vec<Terminal>,
    warehouses: Vec<Warehouse>,
    undo: VecDeque<UndoEntry>,
    next_ticket: u64,
    revision: u64,
}

/// Matches of a name search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub terminals: Vec<Terminal>,
    pub warehouses: Vec<Warehouse>,
}

struct Inner<B> {
    backend: Rc<B>,
    runtime: Rc<dyn Runtime>,
    config: DashboardConfig,
    notifier: NotificationCenter,
    state: RefCell<State>,
    listeners: Listeners<StoreEvent>,
}

impl<B> Drop for Inner<B> {
    fn drop(&mut self) {
        for entry in self.state.get_mut().undo.drain(..) {
            entry.timer.abort();
        }
    }
}

/// In-memory mirror of the terminal and warehouse collections.
///
/// The backend is the source of truth: every mutation waits for the server's
/// answer and applies the server's record. Terminal deletes go through an
/// undo queue bounded by `undo_capacity`, each entry expiring after
/// `undo_window_secs` on its own timer.
pub struct EntityStore<B> {
    inner: Rc<Inner<B>>,
}

impl<B> Clone for EntityStore<B> {
    fn clone(&self) -> Self {
        EntityStore {
            inner: self.inner.clone(),
        }
    }
}

impl<B: Backend + 'static> EntityStore<B> {
    pub fn new(
        backend: Rc<B>,
        runtime: Rc<dyn Runtime>,
        config: DashboardConfig,
        notifier: NotificationCenter,
    ) -> Self {
        EntityStore {
            inner: Rc::new(Inner {
                backend,
                runtime,
                config,
                notifier,
                state: RefCell::new(State::default()),
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn backend(&self) -> Rc<B> {
        self.inner.backend.clone()
    }

    pub fn notifier(&self) -> &NotificationCenter {
        &self.inner.notifier
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn subscribe(&self, callback: impl Fn(&StoreEvent) + 'static) -> Subscription {
        self.inner.listeners.subscribe(callback)
    }

    fn changed(&self, event: StoreEvent) {
        self.inner.state.borrow_mut().revision += 1;
        self.inner.listeners.emit(&event);
    }

    // ---- Snapshots ----

    pub fn terminals(&self) -> Vec<Terminal> {
        self.inner.state.borrow().terminals.clone()
    }

    pub fn warehouses(&self) -> Vec<Warehouse> {
        self.inner.state.borrow().warehouses.clone()
    }

    pub fn terminal(&self, id: i64) -> Option<Terminal> {
        self.inner
            .state
            .borrow()
            .terminals
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    pub fn warehouse(&self, id: i64) -> Option<Warehouse> {
        self.inner
            .state
            .borrow()
            .warehouses
            .iter()
            .find(|w| w.id == id)
            .cloned()
    }

    /// Bumped on every change; lets views skip redundant work.
    pub fn revision(&self) -> u64 {
        self.inner.state.borrow().revision
    }

    pub fn stats(&self) -> FleetStats {
        let state = self.inner.state.borrow();
        FleetStats::collect(&state.terminals, &state.warehouses)
    }

    /// Case-insensitive substring match on names. A blank term matches everything.
    pub fn search(&self, term: &str) -> SearchResults {
        let needle = term.trim().to_lowercase();
        let state = self.inner.state.borrow();
        let hit = |name: &str| needle.is_empty() || name.to_lowercase().contains(&needle);
        SearchResults {
            terminals: state
                .terminals
                .iter()
                .filter(|t| hit(&t.name))
                .cloned()
                .collect(),
            warehouses: state
                .warehouses
                .iter()
                .filter(|w| hit(&w.name))
                .cloned()
                .collect(),
        }
    }

    /// Pending undo entries, oldest first.
    pub fn pending_undos(&self) -> Vec<PendingUndo> {
        self.inner
            .state
            .borrow()
            .undo
            .iter()
            .map(|e| e.pending.clone())
            .collect()
    }

    // ---- Loading ----

    /// Fetch both collections concurrently. A failure on one side leaves that
    /// collection as it was and does not hold back the other.
    pub async fn load_all(&self) -> LoadReport {
        let backend = self.inner.backend.clone();
        let (terminals, warehouses) =
            futures::join!(backend.list_terminals(), backend.list_warehouses());

        match &terminals {
            Ok(list) => {
                info!(count = list.len(), "terminals loaded");
                self.inner.state.borrow_mut().terminals = list.clone();
                self.changed(StoreEvent::TerminalsChanged);
            }
            Err(e) => {
                warn!(error = %e, "failed to load terminals");
                self.inner.notifier.report("Failed to load terminals", e);
            }
        }
        match &warehouses {
            Ok(list) => {
                info!(count = list.len(), "warehouses loaded");
                self.inner.state.borrow_mut().warehouses = list.clone();
                self.changed(StoreEvent::WarehousesChanged);
            }
            Err(e) => {
                warn!(error = %e, "failed to load warehouses");
                self.inner.notifier.report("Failed to load warehouses", e);
            }
        }

        LoadReport {
            terminals,
            warehouses,
        }
    }

    // ---- Terminals ----

    pub async fn create_terminal(&self, body: NewTerminal) -> Result<Terminal> {
        if let Err(msg) = body.validate() {
            let err = DashboardError::Validation(msg);
            self.inner.notifier.report("Could not add terminal", &err);
            return Err(err);
        }
        let backend = self.inner.backend.clone();
        match backend.create_terminal(&body).await {
            Ok(terminal) => {
                info!(id = terminal.id, name = %terminal.name, "terminal created");
                self.inner
                    .state
                    .borrow_mut()
                    .terminals
                    .push(terminal.clone());
                self.changed(StoreEvent::TerminalsChanged);
                self.inner
                    .notifier
                    .success(format!("Terminal '{}' added.", terminal.name));
                Ok(terminal)
            }
            Err(e) => {
                warn!(error = %e, "terminal create failed");
                self.inner.notifier.report("Could not add terminal", &e);
                Err(e)
            }
        }
    }

    /// Send `patch` and put the server's record in place of the old one,
    /// keeping its position in the list.
    pub async fn update_terminal(&self, id: i64, patch: TerminalPatch) -> Result<Terminal> {
        if let Err(msg) = patch.validate() {
            let err = DashboardError::Validation(msg);
            self.inner.notifier.report("Could not update terminal", &err);
            return Err(err);
        }
        if self.terminal(id).is_none() {
            return Err(DashboardError::NotFound(format!("Terminal {}", id)));
        }
        let backend = self.inner.backend.clone();
        match backend.update_terminal(id, &patch).await {
            Ok(updated) => {
                let replaced = {
                    let mut state = self.inner.state.borrow_mut();
                    match state.terminals.iter_mut().find(|t| t.id == id) {
                        Some(slot) => {
                            *slot = updated.clone();
                            true
                        }
                        None => false,
                    }
                };
                if replaced {
                    self.changed(StoreEvent::TerminalsChanged);
                } else {
                    debug!(id, "terminal vanished while update was in flight");
                }
                self.inner
                    .notifier
                    .success(format!("Terminal '{}' updated.", updated.name));
                Ok(updated)
            }
            Err(e) => {
                warn!(id, error = %e, "terminal update failed");
                self.inner.notifier.report("Could not update terminal", &e);
                Err(e)
            }
        }
    }

    /// Delete on the backend, then move the terminal into the undo queue.
    pub async fn delete_terminal(&self, id: i64) -> Result<()> {
        if self.terminal(id).is_none() {
            return Err(DashboardError::NotFound(format!("Terminal {}", id)));
        }
        let backend = self.inner.backend.clone();
        if let Err(e) = backend.delete_terminal(id).await {
            warn!(id, error = %e, "terminal delete failed");
            self.inner.notifier.report("Could not delete terminal", &e);
            return Err(e);
        }

        let removed = {
            let mut state = self.inner.state.borrow_mut();
            state
                .terminals
                .iter()
                .position(|t| t.id == id)
                .map(|index| (index, state.terminals.remove(index)))
        };
        let Some((original_index, terminal)) = removed else {
            debug!(id, "terminal already gone after delete");
            return Ok(());
        };
        info!(id, index = original_index, "terminal deleted");
        let name = terminal.name.clone();
        self.push_undo(terminal, original_index);
        self.changed(StoreEvent::TerminalsChanged);
        self.inner.notifier.info(format!(
            "Terminal '{}' deleted. Undo available for {} seconds.",
            name, self.inner.config.undo_window_secs
        ));
        Ok(())
    }

    fn push_undo(&self, terminal: Terminal, original_index: usize) {
        let ticket = {
            let mut state = self.inner.state.borrow_mut();
            state.next_ticket += 1;
            state.next_ticket
        };
        let timer = self.arm_undo_timer(ticket);

        let evicted: Vec<UndoEntry> = {
            let mut state = self.inner.state.borrow_mut();
            state.undo.push_back(UndoEntry {
                pending: PendingUndo {
                    ticket,
                    terminal,
                    original_index,
                    restoring: false,
                },
                timer,
            });
            let overflow = state
                .undo
                .len()
                .saturating_sub(self.inner.config.undo_capacity);
            state.undo.drain(..overflow).collect()
        };
        for entry in evicted {
            entry.timer.abort();
            debug!(
                ticket = entry.pending.ticket,
                id = entry.pending.terminal.id,
                "undo entry evicted"
            );
        }
        self.changed(StoreEvent::UndoChanged);
    }

    fn arm_undo_timer(&self, ticket: u64) -> AbortHandle {
        let (handle, registration) = AbortHandle::new_pair();
        let sleep = Abortable::new(
            self.inner.runtime.sleep(self.inner.config.undo_window()),
            registration,
        );
        let weak: Weak<Inner<B>> = Rc::downgrade(&self.inner);
        self.inner.runtime.spawn(Box::pin(async move {
            if sleep.await.is_ok() {
                if let Some(inner) = weak.upgrade() {
                    EntityStore { inner }.expire_undo(ticket);
                }
            }
        }));
        handle
    }

    fn expire_undo(&self, ticket: u64) {
        let expired = {
            let mut state = self.inner.state.borrow_mut();
            let before = state.undo.len();
            state.undo.retain(|e| e.pending.ticket != ticket);
            before != state.undo.len()
        };
        if expired {
            debug!(ticket, "undo window closed");
            self.changed(StoreEvent::UndoChanged);
        }
    }

    /// Drop an undo entry early, e.g. when the user dismisses the banner.
    pub fn discard_undo(&self, ticket: u64) {
        let entry = {
            let mut state = self.inner.state.borrow_mut();
            let index = state.undo.iter().position(|e| e.pending.ticket == ticket);
            index.and_then(|i| state.undo.remove(i))
        };
        if let Some(entry) = entry {
            entry.timer.abort();
            self.changed(StoreEvent::UndoChanged);
        }
    }

    /// Restore the most recently deleted terminal still in its window.
    ///
    /// `Ok(None)` when there is nothing to undo. With
    /// [`UndoStrategy::RecreateOnBackend`] the terminal reappears only after
    /// the backend has re-created it, carrying the server's new id; on failure
    /// the entry stays pending until its own timer runs out.
    pub async fn undo(&self) -> Result<Option<Terminal>> {
        let candidate = {
            let state = self.inner.state.borrow();
            state
                .undo
                .iter()
                .rev()
                .find(|e| !e.pending.restoring)
                .map(|e| e.pending.clone())
        };
        let Some(pending) = candidate else {
            return Ok(None);
        };

        match self.inner.config.undo_strategy {
            UndoStrategy::LocalOnly => {
                self.take_undo(pending.ticket);
                let restored = pending.terminal.clone();
                self.insert_restored(restored.clone(), pending.original_index);
                self.inner.notifier.info("Terminal deletion undone locally.");
                Ok(Some(restored))
            }
            UndoStrategy::RecreateOnBackend => {
                let body = match NewTerminal::try_from(&pending.terminal) {
                    Ok(body) => body,
                    Err(msg) => {
                        let err = DashboardError::DataQuality(msg);
                        self.inner.notifier.report("Could not restore terminal", &err);
                        return Err(err);
                    }
                };
                self.set_restoring(pending.ticket, true);
                let backend = self.inner.backend.clone();
                match backend.create_terminal(&body).await {
                    Ok(recreated) => {
                        // Honor the restore even if the window closed while the call was in flight.
                        self.take_undo(pending.ticket);
                        info!(
                            old_id = pending.terminal.id,
                            new_id = recreated.id,
                            "terminal restored"
                        );
                        self.insert_restored(recreated.clone(), pending.original_index);
                        self.inner
                            .notifier
                            .success(format!("Terminal '{}' restored.", recreated.name));
                        Ok(Some(recreated))
                    }
                    Err(e) => {
                        warn!(id = pending.terminal.id, error = %e, "terminal restore failed");
                        self.set_restoring(pending.ticket, false);
                        self.inner.notifier.report("Could not restore terminal", &e);
                        Err(e)
                    }
                }
            }
        }
    }

    fn take_undo(&self, ticket: u64) {
        let entry = {
            let mut state = self.inner.state.borrow_mut();
            let index = state.undo.iter().position(|e| e.pending.ticket == ticket);
            index.and_then(|i| state.undo.remove(i))
        };
        if let Some(entry) = entry {
            entry.timer.abort();
        }
        self.changed(StoreEvent::UndoChanged);
    }

    fn set_restoring(&self, ticket: u64, restoring: bool) {
        let found = {
            let mut state = self.inner.state.borrow_mut();
            match state.undo.iter_mut().find(|e| e.pending.ticket == ticket) {
                Some(entry) => {
                    entry.pending.restoring = restoring;
                    true
                }
                None => false,
            }
        };
        if found {
            self.changed(StoreEvent::UndoChanged);
        }
    }

    fn insert_restored(&self, terminal: Terminal, original_index: usize) {
        {
            let mut state = self.inner.state.borrow_mut();
            let index = original_index.min(state.terminals.len());
            state.terminals.insert(index, terminal);
        }
        self.changed(StoreEvent::TerminalsChanged);
    }

    // ---- Warehouses ----

    pub async fn create_warehouse(&self, body: NewWarehouse) -> Result<Warehouse> {
        if let Err(msg) = body.validate() {
            let err = DashboardError::Validation(msg);
            self.inner.notifier.report("Could not add warehouse", &err);
            return Err(err);
        }
        let backend = self.inner.backend.clone();
        match backend.create_warehouse(&body).await {
            Ok(warehouse) => {
                info!(id = warehouse.id, name = %warehouse.name, "warehouse created");
                self.inner
                    .state
                    .borrow_mut()
                    .warehouses
                    .push(warehouse.clone());
                self.changed(StoreEvent::WarehousesChanged);
                self.inner
                    .notifier
                    .success(format!("Warehouse '{}' added.", warehouse.name));
                Ok(warehouse)
            }
            Err(e) => {
                warn!(error = %e, "warehouse create failed");
                self.inner.notifier.report("Could not add warehouse", &e);
                Err(e)
            }
        }
    }

    pub async fn update_warehouse(&self, id: i64, patch: WarehousePatch) -> Result<Warehouse> {
        if let Err(msg) = patch.validate() {
            let err = DashboardError::Validation(msg);
            self.inner.notifier.report("Could not update warehouse", &err);
            return Err(err);
        }
        if self.warehouse(id).is_none() {
            return Err(DashboardError::NotFound(format!("Warehouse {}", id)));
        }
        let backend = self.inner.backend.clone();
        match backend.update_warehouse(id, &patch).await {
            Ok(updated) => {
                let replaced = {
                    let mut state = self.inner.state.borrow_mut();
                    match state.warehouses.iter_mut().find(|w| w.id == id) {
                        Some(slot) => {
                            *slot = updated.clone();
                            true
                        }
                        None => false,
                    }
                };
                if replaced {
                    self.changed(StoreEvent::WarehousesChanged);
                }
                self.inner
                    .notifier
                    .success(format!("Warehouse '{}' updated.", updated.name));
                Ok(updated)
            }
            Err(e) => {
                warn!(id, error = %e, "warehouse update failed");
                self.inner.notifier.report("Could not update warehouse", &e);
                Err(e)
            }
        }
    }

    /// Irreversible. The local copy goes only after the backend confirms.
    pub async fn delete_warehouse(&self, id: i64) -> Result<()> {
        if self.warehouse(id).is_none() {
            return Err(DashboardError::NotFound(format!("Warehouse {}", id)));
        }
        let backend = self.inner.backend.clone();
        if let Err(e) = backend.delete_warehouse(id).await {
            warn!(id, error = %e, "warehouse delete failed");
            self.inner.notifier.report("Could not delete warehouse", &e);
            return Err(e);
        }
        let name = {
            let mut state = self.inner.state.borrow_mut();
            let index = state.warehouses.iter().position(|w| w.id == id);
            index.map(|i| state.warehouses.remove(i).name)
        };
        if let Some(name) = name {
            info!(id, "warehouse deleted");
            self.changed(StoreEvent::WarehousesChanged);
            self.inner
                .notifier
                .success(format!("Warehouse '{}' deleted.", name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::TokioRuntime;
    use crate::testing::{sample_terminal, sample_warehouse, FakeBackend};
    use dronedash_shared::models::GeoPoint;
    use std::time::Duration;
    use tokio::task::LocalSet;

    fn store_with(backend: Rc<FakeBackend>, config: DashboardConfig) -> EntityStore<FakeBackend> {
        let runtime: Rc<dyn Runtime> = Rc::new(TokioRuntime);
        let notifier = NotificationCenter::new(runtime.clone(), &config);
        EntityStore::new(backend, runtime, config, notifier)
    }

    fn seeded() -> Rc<FakeBackend> {
        let backend = FakeBackend::new();
        backend.seed_terminal(sample_terminal(1, "Alpha", 10.0, 20.0));
        backend.seed_terminal(sample_terminal(2, "Bravo", 11.0, 21.0));
        backend.seed_terminal(sample_terminal(3, "Charlie", 12.0, 22.0));
        backend.seed_warehouse(sample_warehouse(1, "Central", 10.5, 20.5));
        Rc::new(backend)
    }

    fn ids(store: &EntityStore<FakeBackend>) -> Vec<i64> {
        store.terminals().iter().map(|t| t.id).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_all_independent_failures() {
        LocalSet::new()
            .run_until(async {
                let backend = seeded();
                backend.fail_next("list_warehouses");
                let store = store_with(backend.clone(), DashboardConfig::default());
                let report = store.load_all().await;
                assert_eq!(report.terminals.as_ref().map(Vec::len), Ok(3));
                assert!(report.warehouses.is_err());
                assert_eq!(store.terminals().len(), 3);
                assert!(store.warehouses().is_empty());
                assert_eq!(store.notifier().list().len(), 1);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_then_load_uses_server_id() {
        LocalSet::new()
            .run_until(async {
                let backend = seeded();
                let store = store_with(backend.clone(), DashboardConfig::default());
                store.load_all().await;
                let loc = GeoPoint::new(1.0, 1.0).unwrap();
                let created = store
                    .create_terminal(NewTerminal::new("Delta", loc, 2, "key"))
                    .await
                    .unwrap();
                assert_eq!(created.id, 4);
                assert_eq!(store.terminals().last().map(|t| t.id), Some(4));

                store.load_all().await;
                assert!(store.terminals().iter().any(|t| t.id == 4 && t.name == "Delta"));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_rejects_invalid_input_without_calling_backend() {
        LocalSet::new()
            .run_until(async {
                let backend = seeded();
                let store = store_with(backend.clone(), DashboardConfig::default());
                let loc = GeoPoint::new(1.0, 1.0).unwrap();
                let err = store
                    .create_terminal(NewTerminal::new("  ", loc, 2, "key"))
                    .await
                    .unwrap_err();
                assert!(matches!(err, DashboardError::Validation(_)));
                assert_eq!(backend.calls("create_terminal"), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_replaces_in_place_with_server_record() {
        LocalSet::new()
            .run_until(async {
                let backend = seeded();
                let store = store_with(backend.clone(), DashboardConfig::default());
                store.load_all().await;
                let patch = TerminalPatch {
                    name: Some("Bravo Prime".to_string()),
                    status: Some(dronedash_shared::models::TerminalStatus::Inactive),
                    control_key: None,
                };
                let updated = store.update_terminal(2, patch).await.unwrap();
                assert_eq!(updated.name, "Bravo Prime");
                assert_eq!(ids(&store), vec![1, 2, 3]);
                let local = store.terminal(2).unwrap();
                assert!(!local.active);
                // Coordinates come from the server, untouched by the edit.
                assert_eq!(local.location, GeoPoint::new(11.0, 21.0));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_failure_leaves_collection_unchanged() {
        LocalSet::new()
            .run_until(async {
                let backend = seeded();
                let store = store_with(backend.clone(), DashboardConfig::default());
                store.load_all().await;
                let before = store.terminals();
                backend.fail_next("update_terminal");
                let patch = TerminalPatch {
                    name: Some("Nope".to_string()),
                    ..Default::default()
                };
                assert!(store.update_terminal(1, patch).await.is_err());
                assert_eq!(store.terminals(), before);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_then_undo_local_restores_original_position() {
        LocalSet::new()
            .run_until(async {
                let backend = seeded();
                let config = DashboardConfig {
                    undo_strategy: UndoStrategy::LocalOnly,
                    ..Default::default()
                };
                let store = store_with(backend.clone(), config);
                store.load_all().await;
                store.delete_terminal(2).await.unwrap();
                assert_eq!(ids(&store), vec![1, 3]);
                assert_eq!(store.pending_undos().len(), 1);

                tokio::time::sleep(Duration::from_secs(5)).await;
                let restored = store.undo().await.unwrap().unwrap();
                assert_eq!(restored.id, 2);
                assert_eq!(ids(&store), vec![1, 2, 3]);
                assert!(store.pending_undos().is_empty());
                // Local only: nothing was re-created on the backend.
                assert_eq!(backend.calls("create_terminal"), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_recreates_on_backend_at_original_position() {
        LocalSet::new()
            .run_until(async {
                let backend = seeded();
                let store = store_with(backend.clone(), DashboardConfig::default());
                store.load_all().await;
                store.delete_terminal(1).await.unwrap();
                let restored = store.undo().await.unwrap().unwrap();
                assert_eq!(restored.name, "Alpha");
                assert_ne!(restored.id, 1);
                assert_eq!(store.terminals()[0].id, restored.id);
                assert_eq!(backend.calls("create_terminal"), 1);

                store.load_all().await;
                assert!(store.terminals().iter().any(|t| t.id == restored.id));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_failure_keeps_entry_pending() {
        LocalSet::new()
            .run_until(async {
                let backend = seeded();
                let store = store_with(backend.clone(), DashboardConfig::default());
                store.load_all().await;
                store.delete_terminal(3).await.unwrap();
                backend.fail_next("create_terminal");
                assert!(store.undo().await.is_err());
                assert_eq!(ids(&store), vec![1, 2]);
                let pending = store.pending_undos();
                assert_eq!(pending.len(), 1);
                assert!(!pending[0].restoring);

                // A second attempt inside the window succeeds.
                assert!(store.undo().await.unwrap().is_some());
                assert_eq!(store.terminals().len(), 3);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_after_window_is_noop() {
        LocalSet::new()
            .run_until(async {
                let backend = seeded();
                let store = store_with(backend.clone(), DashboardConfig::default());
                store.load_all().await;
                store.delete_terminal(2).await.unwrap();
                tokio::time::sleep(Duration::from_millis(10_001)).await;
                assert!(store.pending_undos().is_empty());
                assert_eq!(store.undo().await, Ok(None));
                assert_eq!(ids(&store), vec![1, 3]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_with_nothing_pending_is_noop() {
        LocalSet::new()
            .run_until(async {
                let store = store_with(seeded(), DashboardConfig::default());
                store.load_all().await;
                assert_eq!(store.undo().await, Ok(None));
                assert_eq!(ids(&store), vec![1, 2, 3]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_queue_restores_most_recent_first() {
        LocalSet::new()
            .run_until(async {
                let config = DashboardConfig {
                    undo_strategy: UndoStrategy::LocalOnly,
                    ..Default::default()
                };
                let store = store_with(seeded(), config);
                store.load_all().await;
                store.delete_terminal(1).await.unwrap();
                store.delete_terminal(3).await.unwrap();
                assert_eq!(ids(&store), vec![2]);

                assert_eq!(store.undo().await.unwrap().map(|t| t.id), Some(3));
                assert_eq!(ids(&store), vec![2, 3]);
                assert_eq!(store.undo().await.unwrap().map(|t| t.id), Some(1));
                assert_eq!(ids(&store), vec![1, 2, 3]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_slot_capacity_replaces_previous_entry() {
        LocalSet::new()
            .run_until(async {
                let config = DashboardConfig {
                    undo_strategy: UndoStrategy::LocalOnly,
                    undo_capacity: 1,
                    ..Default::default()
                };
                let store = store_with(seeded(), config);
                store.load_all().await;
                store.delete_terminal(1).await.unwrap();
                store.delete_terminal(2).await.unwrap();
                let pending = store.pending_undos();
                assert_eq!(pending.len(), 1);
                assert_eq!(pending[0].terminal.id, 2);

                assert_eq!(store.undo().await.unwrap().map(|t| t.id), Some(2));
                assert_eq!(store.undo().await, Ok(None));
                assert_eq!(ids(&store), vec![2, 3]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_undo_entry_expires_on_its_own_timer() {
        LocalSet::new()
            .run_until(async {
                let store = store_with(seeded(), DashboardConfig::default());
                store.load_all().await;
                store.delete_terminal(1).await.unwrap();
                tokio::time::sleep(Duration::from_secs(6)).await;
                store.delete_terminal(2).await.unwrap();
                tokio::time::sleep(Duration::from_secs(5)).await;
                let pending = store.pending_undos();
                assert_eq!(pending.len(), 1);
                assert_eq!(pending[0].terminal.id, 2);
                tokio::time::sleep(Duration::from_secs(6)).await;
                assert!(store.pending_undos().is_empty());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_failure_keeps_terminal() {
        LocalSet::new()
            .run_until(async {
                let backend = seeded();
                let store = store_with(backend.clone(), DashboardConfig::default());
                store.load_all().await;
                backend.fail_next("delete_terminal");
                assert!(store.delete_terminal(1).await.is_err());
                assert_eq!(ids(&store), vec![1, 2, 3]);
                assert!(store.pending_undos().is_empty());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_warehouse_delete_has_no_undo() {
        LocalSet::new()
            .run_until(async {
                let backend = seeded();
                let store = store_with(backend.clone(), DashboardConfig::default());
                store.load_all().await;
                store.delete_warehouse(1).await.unwrap();
                assert!(store.warehouses().is_empty());
                assert!(store.pending_undos().is_empty());
                assert_eq!(store.undo().await, Ok(None));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_and_search() {
        LocalSet::new()
            .run_until(async {
                let backend = FakeBackend::new();
                backend.seed_terminal(sample_terminal(1, "Harbor North", 0.0, 0.0));
                let mut off = sample_terminal(2, "Airport", 0.0, 1.0);
                off.active = false;
                backend.seed_terminal(off);
                backend.seed_warehouse(sample_warehouse(1, "North Depot", 0.0, 0.5));
                let store = store_with(Rc::new(backend), DashboardConfig::default());
                store.load_all().await;

                let stats = store.stats();
                assert_eq!(stats.total_terminals, 2);
                assert_eq!(stats.active_terminals, 1);
                assert_eq!(stats.coverage_percent, 50);

                let hits = store.search("NORTH");
                assert_eq!(hits.terminals.len(), 1);
                assert_eq!(hits.warehouses.len(), 1);
                assert_eq!(store.search("").terminals.len(), 2);
            })
            .await;
    }
}
