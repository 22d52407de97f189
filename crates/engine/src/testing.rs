//! In-memory fakes shared by the engine's unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use dronedash_shared::models::{
    DroneAssignment, GeoPoint, NewTerminal, NewWarehouse, PackageTelemetry, Terminal,
    TerminalPatch, Warehouse, WarehousePatch,
};

use crate::api::Backend;
use crate::error::{DashboardError, GeolocationError, Result};
use crate::map_sync::{MapSurface, MarkerSpec};
use crate::store::EntityKey;
use crate::tracker::{LocationEvent, LocationSink, LocationSource, WatchId};

pub fn sample_terminal(id: i64, name: &str, lat: f64, lng: f64) -> Terminal {
    Terminal {
        id,
        name: name.to_string(),
        location: GeoPoint::new(lat, lng),
        active: true,
        total_racks: 4,
        control_key: format!("KEY-{}", id),
        rack_assignments: Default::default(),
    }
}

pub fn sample_warehouse(id: i64, name: &str, lat: f64, lng: f64) -> Warehouse {
    Warehouse {
        id,
        name: name.to_string(),
        location: GeoPoint::new(lat, lng),
    }
}

#[derive(Default)]
struct FakeState {
    terminals: Vec<Terminal>,
    warehouses: Vec<Warehouse>,
    telemetry: HashMap<String, PackageTelemetry>,
    assignments: HashMap<String, Vec<DroneAssignment>>,
    failures: Vec<String>,
    calls: HashMap<String, usize>,
    delays: HashMap<String, Duration>,
    last_terminal_id: i64,
    last_warehouse_id: i64,
}

#[derive(Default)]
pub struct FakeBackend {
    state: RefCell<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_terminal(&self, terminal: Terminal) {
        let mut state = self.state.borrow_mut();
        state.last_terminal_id = state.last_terminal_id.max(terminal.id);
        state.terminals.push(terminal);
    }

    pub fn seed_warehouse(&self, warehouse: Warehouse) {
        let mut state = self.state.borrow_mut();
        state.last_warehouse_id = state.last_warehouse_id.max(warehouse.id);
        state.warehouses.push(warehouse);
    }

    pub fn seed_telemetry(&self, telemetry: PackageTelemetry) {
        self.state
            .borrow_mut()
            .telemetry
            .insert(telemetry.package_id.clone(), telemetry);
    }

    pub fn seed_assignments(&self, warehouse: &str, rows: Vec<DroneAssignment>) {
        self.state
            .borrow_mut()
            .assignments
            .insert(warehouse.to_string(), rows);
    }

    /// Make the next call to `op` fail with a 500.
    pub fn fail_next(&self, op: &str) {
        self.state.borrow_mut().failures.push(op.to_string());
    }

    /// Make every call to `op` take `delay` before answering.
    pub fn delay(&self, op: &str, delay: Duration) {
        self.state.borrow_mut().delays.insert(op.to_string(), delay);
    }

    pub fn calls(&self, op: &str) -> usize {
        self.state.borrow().calls.get(op).copied().unwrap_or(0)
    }

    async fn enter(&self, op: &str) -> Result<()> {
        let delay = {
            let mut state = self.state.borrow_mut();
            *state.calls.entry(op.to_string()).or_default() += 1;
            state.delays.get(op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.borrow_mut();
        if let Some(i) = state.failures.iter().position(|f| f == op) {
            state.failures.remove(i);
            return Err(DashboardError::Server {
                status: 500,
                message: Some(format!("{} failed", op)),
            });
        }
        Ok(())
    }
}

impl Backend for FakeBackend {
    async fn list_terminals(&self) -> Result<Vec<Terminal>> {
        self.enter("list_terminals").await?;
        Ok(self.state.borrow().terminals.clone())
    }

    async fn create_terminal(&self, body: &NewTerminal) -> Result<Terminal> {
        self.enter("create_terminal").await?;
        let mut state = self.state.borrow_mut();
        state.last_terminal_id += 1;
        let id = state.last_terminal_id;
        let terminal = Terminal {
            id,
            name: body.name.clone(),
            location: body.location(),
            active: body.status.is_active(),
            total_racks: body.total_racks,
            control_key: body.control_key.clone(),
            rack_assignments: body.racks.clone().into(),
        };
        state.terminals.push(terminal.clone());
        Ok(terminal)
    }

    async fn update_terminal(&self, id: i64, patch: &TerminalPatch) -> Result<Terminal> {
        self.enter("update_terminal").await?;
        let mut state = self.state.borrow_mut();
        let t = state
            .terminals
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| DashboardError::Server {
                status: 404,
                message: Some("DDT not found".to_string()),
            })?;
        if let Some(name) = &patch.name {
            t.name = name.clone();
        }
        if let Some(status) = patch.status {
            t.active = status.is_active();
        }
        if let Some(key) = &patch.control_key {
            t.control_key = key.clone();
        }
        Ok(t.clone())
    }

    async fn delete_terminal(&self, id: i64) -> Result<()> {
        self.enter("delete_terminal").await?;
        self.state.borrow_mut().terminals.retain(|t| t.id != id);
        Ok(())
    }

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>> {
        self.enter("list_warehouses").await?;
        Ok(self.state.borrow().warehouses.clone())
    }

    async fn create_warehouse(&self, body: &NewWarehouse) -> Result<Warehouse> {
        self.enter("create_warehouse").await?;
        let mut state = self.state.borrow_mut();
        state.last_warehouse_id += 1;
        let id = state.last_warehouse_id;
        let warehouse = Warehouse {
            id,
            name: body.name.clone(),
            location: body.location(),
        };
        state.warehouses.push(warehouse.clone());
        Ok(warehouse)
    }

    async fn update_warehouse(&self, id: i64, patch: &WarehousePatch) -> Result<Warehouse> {
        self.enter("update_warehouse").await?;
        let mut state = self.state.borrow_mut();
        let w = state
            .warehouses
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| DashboardError::Server {
                status: 404,
                message: Some("Warehouse not found".to_string()),
            })?;
        if let Some(name) = &patch.name {
            w.name = name.clone();
        }
        Ok(w.clone())
    }

    async fn delete_warehouse(&self, id: i64) -> Result<()> {
        self.enter("delete_warehouse").await?;
        self.state.borrow_mut().warehouses.retain(|w| w.id != id);
        Ok(())
    }

    async fn package_telemetry(&self, package_id: &str) -> Result<PackageTelemetry> {
        self.enter("package_telemetry").await?;
        self.state
            .borrow()
            .telemetry
            .get(package_id)
            .cloned()
            .ok_or_else(|| DashboardError::Server {
                status: 404,
                message: Some("Package not found".to_string()),
            })
    }

    async fn drone_assignments(&self, warehouse_name: &str) -> Result<Vec<DroneAssignment>> {
        self.enter("drone_assignments").await?;
        Ok(self
            .state
            .borrow()
            .assignments
            .get(warehouse_name)
            .cloned()
            .unwrap_or_default())
    }
}

/// Records every call a map widget would receive.
#[derive(Default)]
pub struct FakeSurface {
    pub markers: RefCell<Vec<MarkerSpec>>,
    pub handlers: RefCell<Vec<(EntityKey, Rc<dyn Fn(EntityKey)>)>>,
    pub clears: Cell<usize>,
    pub adds: Cell<usize>,
    pub views: RefCell<Vec<(GeoPoint, u8)>>,
    pub pans: RefCell<Vec<GeoPoint>>,
}

impl FakeSurface {
    pub fn click(&self, key: EntityKey) {
        let handler = self
            .handlers
            .borrow()
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, h)| h.clone());
        if let Some(handler) = handler {
            handler(key);
        }
    }
}

impl MapSurface for FakeSurface {
    fn clear_markers(&self) {
        self.clears.set(self.clears.get() + 1);
        self.markers.borrow_mut().clear();
        self.handlers.borrow_mut().clear();
    }

    fn add_marker(&self, desc: &MarkerSpec, on_click: Rc<dyn Fn(EntityKey)>) {
        self.adds.set(self.adds.get() + 1);
        self.markers.borrow_mut().push(desc.clone());
        self.handlers.borrow_mut().push((desc.key, on_click));
    }

    fn set_view(&self, center: GeoPoint, zoom: u8) {
        self.views.borrow_mut().push((center, zoom));
    }

    fn pan_to(&self, center: GeoPoint) {
        self.pans.borrow_mut().push(center);
    }
}

/// A location source driven by the test.
#[derive(Default)]
pub struct FakeLocationSource {
    pub sinks: RefCell<Vec<(WatchId, LocationSink)>>,
    pub cleared: RefCell<Vec<WatchId>>,
    pub refuse: RefCell<Option<GeolocationError>>,
    /// Delivered synchronously from inside `watch`, before it returns.
    pub immediate: RefCell<Option<LocationEvent>>,
    /// Runs once from inside the next `watch`, after the sink is registered.
    pub on_watch: RefCell<Option<Box<dyn FnOnce()>>>,
    next_id: Cell<i32>,
}

impl FakeLocationSource {
    pub fn active_watches(&self) -> usize {
        self.sinks.borrow().len()
    }

    pub fn send(&self, event: LocationEvent) {
        let sinks: Vec<LocationSink> = self.sinks.borrow().iter().map(|(_, s)| s.clone()).collect();
        for sink in sinks {
            sink(event.clone());
        }
    }
}

impl LocationSource for FakeLocationSource {
    fn watch(&self, sink: LocationSink) -> std::result::Result<WatchId, GeolocationError> {
        if let Some(err) = self.refuse.borrow_mut().take() {
            return Err(err);
        }
        self.next_id.set(self.next_id.get() + 1);
        let id = WatchId(self.next_id.get());
        self.sinks.borrow_mut().push((id, sink.clone()));
        let hook = self.on_watch.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
        if let Some(event) = self.immediate.borrow_mut().take() {
            sink(event);
        }
        Ok(id)
    }

    fn clear_watch(&self, id: WatchId) {
        self.cleared.borrow_mut().push(id);
        self.sinks.borrow_mut().retain(|(w, _)| *w != id);
    }
}
