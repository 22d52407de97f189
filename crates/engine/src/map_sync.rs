use std::cell::RefCell;
use std::rc::{Rc, Weak};

use dronedash_shared::models::{GeoPoint, Terminal, Warehouse};
use futures::channel::oneshot;
use tracing::{debug, info, warn};

use crate::api::Backend;
use crate::config::DashboardConfig;
use crate::events::{Listeners, Subscription};
use crate::runtime::Runtime;
use crate::store::{EntityKey, EntityStore, StoreEvent};

/// The map widget as seen by the engine. Implemented over Leaflet in the
/// browser and by a recorder in tests.
pub trait MapSurface {
    fn clear_markers(&self);
    fn add_marker(&self, desc: &MarkerSpec, on_click: Rc<dyn Fn(EntityKey)>);
    fn set_view(&self, center: GeoPoint, zoom: u8);
    fn pan_to(&self, center: GeoPoint);
}

/// Where the map is looking. The location tracker drives the view through this.
pub trait Viewport {
    /// Center on `center`, changing zoom only when one is given.
    fn focus(&self, center: GeoPoint, zoom: Option<u8>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerIcon {
    Terminal,
    InactiveTerminal,
    Warehouse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub key: EntityKey,
    pub position: GeoPoint,
    /// Permanent tooltip text.
    pub label: String,
    /// Popup body, one entry per line.
    pub popup_lines: Vec<String>,
    pub icon: MarkerIcon,
}

impl MarkerSpec {
    pub fn for_terminal(terminal: &Terminal, position: GeoPoint) -> Self {
        MarkerSpec {
            key: EntityKey::Terminal(terminal.id),
            position,
            label: terminal.name.clone(),
            popup_lines: vec![
                format!("Drop terminal #{}", terminal.id),
                format!("Status: {}", terminal.status()),
                format!(
                    "Racks: {} of {} occupied",
                    terminal.occupied_racks(),
                    terminal.total_racks
                ),
                format!("Location: {}", position),
            ],
            icon: if terminal.active {
                MarkerIcon::Terminal
            } else {
                MarkerIcon::InactiveTerminal
            },
        }
    }

    pub fn for_warehouse(warehouse: &Warehouse, position: GeoPoint) -> Self {
        MarkerSpec {
            key: EntityKey::Warehouse(warehouse.id),
            position,
            label: warehouse.name.clone(),
            popup_lines: vec![
                format!("Warehouse #{}", warehouse.id),
                format!("Location: {}", position),
            ],
            icon: MarkerIcon::Warehouse,
        }
    }
}

/// Where the current refresh cycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapPhase {
    AwaitingMap,
    Clearing,
    Populating,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Rendered { markers: usize, skipped: usize },
    /// A newer refresh took over while this one waited for the map.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    /// A marker was clicked; the map has already been recentered on it.
    Selected(EntityKey),
    Rendered { markers: usize, skipped: usize },
}

struct State {
    surface: Option<Rc<dyn MapSurface>>,
    generation: u64,
    phase: MapPhase,
    waiters: Vec<oneshot::Sender<()>>,
    /// Last requested center and zoom; every attach starts from it.
    view: (GeoPoint, u8),
}

struct Inner<B> {
    store: EntityStore<B>,
    runtime: Rc<dyn Runtime>,
    focus_zoom: u8,
    state: RefCell<State>,
    listeners: Listeners<MapEvent>,
    store_subscription: RefCell<Option<Subscription>>,
}

/// Keeps a map widget's markers in line with the [`EntityStore`].
///
/// The widget mounts on its own schedule. Refreshes requested before
/// [`attach`](Self::attach) park on a one-shot waiter and are woken when the
/// surface arrives. Each refresh takes a generation number and only the newest
/// one populates, so a burst of changes renders once. Population itself is
/// synchronous and cannot interleave with another pass.
pub struct MapSyncEngine<B> {
    inner: Rc<Inner<B>>,
}

impl<B> Clone for MapSyncEngine<B> {
    fn clone(&self) -> Self {
        MapSyncEngine {
            inner: self.inner.clone(),
        }
    }
}

impl<B: Backend + 'static> MapSyncEngine<B> {
    /// Create the engine and start following `store`: every collection change
    /// schedules a refresh.
    pub fn new(store: EntityStore<B>, runtime: Rc<dyn Runtime>, config: &DashboardConfig) -> Self {
        let engine = MapSyncEngine {
            inner: Rc::new(Inner {
                store: store.clone(),
                runtime,
                focus_zoom: config.focus_zoom,
                state: RefCell::new(State {
                    surface: None,
                    generation: 0,
                    phase: MapPhase::AwaitingMap,
                    waiters: Vec::new(),
                    view: (config.default_center, config.default_zoom),
                }),
                listeners: Listeners::new(),
                store_subscription: RefCell::new(None),
            }),
        };

        let weak: Weak<Inner<B>> = Rc::downgrade(&engine.inner);
        let subscription = store.subscribe(move |event| {
            if matches!(
                event,
                StoreEvent::TerminalsChanged | StoreEvent::WarehousesChanged
            ) {
                if let Some(inner) = weak.upgrade() {
                    MapSyncEngine { inner }.schedule_refresh();
                }
            }
        });
        *engine.inner.store_subscription.borrow_mut() = Some(subscription);
        engine
    }

    pub fn subscribe(&self, callback: impl Fn(&MapEvent) + 'static) -> Subscription {
        self.inner.listeners.subscribe(callback)
    }

    pub fn phase(&self) -> MapPhase {
        self.inner.state.borrow().phase
    }

    pub fn is_attached(&self) -> bool {
        self.inner.state.borrow().surface.is_some()
    }

    /// Spawn a refresh on the runtime.
    pub fn schedule_refresh(&self) {
        let engine = self.clone();
        self.inner.runtime.spawn(Box::pin(async move {
            engine.refresh().await;
        }));
    }

    /// The map widget has mounted. Applies the last requested view and wakes
    /// parked refreshes; with none parked, renders the current snapshot right
    /// away. A remounted widget is treated like the first one.
    pub fn attach(&self, surface: Rc<dyn MapSurface>) {
        let ((center, zoom), waiters) = {
            let mut state = self.inner.state.borrow_mut();
            state.surface = Some(surface.clone());
            (state.view, std::mem::take(&mut state.waiters))
        };
        info!(parked = waiters.len(), "map surface attached");
        surface.set_view(center, zoom);

        if waiters.is_empty() {
            self.inner.state.borrow_mut().generation += 1;
            self.populate();
        } else {
            for waiter in waiters {
                let _ = waiter.send(());
            }
        }
    }

    /// The widget is going away. Later refreshes park until the next attach.
    pub fn detach(&self) {
        let mut state = self.inner.state.borrow_mut();
        state.surface = None;
        state.phase = MapPhase::AwaitingMap;
        debug!("map surface detached");
    }

    /// Bring the markers in line with the store's current contents.
    pub async fn refresh(&self) -> RefreshOutcome {
        let (generation, ready) = {
            let mut state = self.inner.state.borrow_mut();
            state.generation += 1;
            let generation = state.generation;
            if state.surface.is_some() {
                (generation, None)
            } else {
                state.phase = MapPhase::AwaitingMap;
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                (generation, Some(rx))
            }
        };

        if let Some(rx) = ready {
            debug!(generation, "refresh waiting for map");
            if rx.await.is_err() {
                return RefreshOutcome::Superseded;
            }
        }

        if self.inner.state.borrow().generation != generation {
            debug!(generation, "refresh superseded");
            return RefreshOutcome::Superseded;
        }
        self.populate()
    }

    fn set_phase(&self, phase: MapPhase) {
        self.inner.state.borrow_mut().phase = phase;
    }

    fn populate(&self) -> RefreshOutcome {
        let Some(surface) = self.inner.state.borrow().surface.clone() else {
            return RefreshOutcome::Superseded;
        };

        self.set_phase(MapPhase::Clearing);
        surface.clear_markers();

        self.set_phase(MapPhase::Populating);
        let on_click = self.click_handler();
        let mut markers = 0;
        let mut skipped = 0;

        for terminal in self.inner.store.terminals() {
            match terminal.location {
                Some(position) => {
                    surface.add_marker(&MarkerSpec::for_terminal(&terminal, position), on_click.clone());
                    markers += 1;
                }
                None => {
                    warn!(id = terminal.id, name = %terminal.name, "terminal has invalid coordinates, not drawn");
                    skipped += 1;
                }
            }
        }
        for warehouse in self.inner.store.warehouses() {
            match warehouse.location {
                Some(position) => {
                    surface.add_marker(
                        &MarkerSpec::for_warehouse(&warehouse, position),
                        on_click.clone(),
                    );
                    markers += 1;
                }
                None => {
                    warn!(id = warehouse.id, name = %warehouse.name, "warehouse has invalid coordinates, not drawn");
                    skipped += 1;
                }
            }
        }

        self.set_phase(MapPhase::Idle);
        debug!(markers, skipped, "markers rendered");
        self.inner
            .listeners
            .emit(&MapEvent::Rendered { markers, skipped });
        RefreshOutcome::Rendered { markers, skipped }
    }

    fn click_handler(&self) -> Rc<dyn Fn(EntityKey)> {
        let weak: Weak<Inner<B>> = Rc::downgrade(&self.inner);
        Rc::new(move |key| {
            if let Some(inner) = weak.upgrade() {
                MapSyncEngine { inner }.select(key);
            }
        })
    }

    /// Recenter on the entity behind `key` and announce the selection.
    /// Looks the entity up in the store; markers never hold a copy.
    pub fn select(&self, key: EntityKey) {
        let location = match key {
            EntityKey::Terminal(id) => self.inner.store.terminal(id).and_then(|t| t.location),
            EntityKey::Warehouse(id) => self.inner.store.warehouse(id).and_then(|w| w.location),
        };
        let Some(location) = location else {
            debug!(?key, "clicked marker no longer in store");
            return;
        };
        self.center_on(location, Some(self.inner.focus_zoom));
        self.inner.listeners.emit(&MapEvent::Selected(key));
    }

    /// Set the view, keeping the current zoom when `zoom` is `None`. Remembered
    /// for the next attach if the map has not mounted yet.
    pub fn center_on(&self, center: GeoPoint, zoom: Option<u8>) {
        let (surface, zoom) = {
            let mut state = self.inner.state.borrow_mut();
            let zoom = zoom.unwrap_or(state.view.1);
            state.view = (center, zoom);
            (state.surface.clone(), zoom)
        };
        if let Some(surface) = surface {
            surface.set_view(center, zoom);
        }
    }

    pub fn pan(&self, center: GeoPoint) {
        let surface = {
            let mut state = self.inner.state.borrow_mut();
            state.view.0 = center;
            state.surface.clone()
        };
        if let Some(surface) = surface {
            surface.pan_to(center);
        }
    }
}

impl<B: Backend + 'static> Viewport for MapSyncEngine<B> {
    fn focus(&self, center: GeoPoint, zoom: Option<u8>) {
        match zoom {
            Some(_) => self.center_on(center, zoom),
            None => self.pan(center),
        }
    }
}
