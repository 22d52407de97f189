use std::rc::Rc;

use tracing::{debug, info};

use crate::api::Backend;
use crate::config::DashboardConfig;
use crate::editor::EditorOverlay;
use crate::events::Subscription;
use crate::map_sync::{MapEvent, MapSyncEngine, Viewport};
use crate::monitor::DeliveryMonitor;
use crate::notify::NotificationCenter;
use crate::runtime::Runtime;
use crate::store::{EntityStore, LoadReport};
use crate::tracker::{LiveLocationTracker, LocationSource};

/// All dashboard services wired together over one backend.
///
/// Marker clicks open the editor for the clicked entity, and the live tracker
/// moves the same map the markers are drawn on.
pub struct Dashboard<B> {
    config: DashboardConfig,
    notifier: NotificationCenter,
    store: EntityStore<B>,
    map: MapSyncEngine<B>,
    editor: EditorOverlay<B>,
    tracker: LiveLocationTracker,
    _selection: Subscription,
}

impl<B: Backend + 'static> Dashboard<B> {
    pub fn new(
        backend: Rc<B>,
        runtime: Rc<dyn Runtime>,
        location: Rc<dyn LocationSource>,
        config: DashboardConfig,
    ) -> Self {
        let notifier = NotificationCenter::new(runtime.clone(), &config);
        let store = EntityStore::new(backend, runtime.clone(), config.clone(), notifier.clone());
        let map = MapSyncEngine::new(store.clone(), runtime.clone(), &config);
        let editor = EditorOverlay::new(store.clone(), runtime);

        let viewport: Rc<dyn Viewport> = Rc::new(map.clone());
        let tracker = LiveLocationTracker::new(location, viewport, notifier.clone(), config.tracking_zoom);

        let selection = {
            let editor = editor.clone();
            map.subscribe(move |event| {
                if let MapEvent::Selected(key) = event {
                    if let Err(e) = editor.open(*key) {
                        debug!(?key, error = %e, "selection did not open editor");
                    }
                }
            })
        };

        info!(api = %config.api_base_url, "dashboard assembled");
        Dashboard {
            config,
            notifier,
            store,
            map,
            editor,
            tracker,
            _selection: selection,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn notifier(&self) -> &NotificationCenter {
        &self.notifier
    }

    pub fn store(&self) -> &EntityStore<B> {
        &self.store
    }

    pub fn map(&self) -> &MapSyncEngine<B> {
        &self.map
    }

    pub fn editor(&self) -> &EditorOverlay<B> {
        &self.editor
    }

    pub fn tracker(&self) -> &LiveLocationTracker {
        &self.tracker
    }

    /// Fetch both collections. The map follows through store events.
    pub async fn load(&self) -> LoadReport {
        self.store.load_all().await
    }

    /// A delivery monitor sharing this dashboard's backend and speed setting.
    pub fn monitor(&self) -> DeliveryMonitor<B> {
        DeliveryMonitor::new(self.store.backend(), self.config.average_speed_kmh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorState;
    use crate::runtime::TokioRuntime;
    use crate::store::EntityKey;
    use crate::testing::{sample_terminal, sample_warehouse, FakeBackend, FakeLocationSource, FakeSurface};
    use crate::tracker::LocationEvent;
    use dronedash_shared::models::GeoPoint;
    use std::time::Duration;
    use tokio::task::LocalSet;

    fn dashboard() -> (Rc<FakeBackend>, Rc<FakeLocationSource>, Dashboard<FakeBackend>) {
        let backend = Rc::new(FakeBackend::new());
        backend.seed_terminal(sample_terminal(1, "Alpha", 10.0, 20.0));
        backend.seed_warehouse(sample_warehouse(1, "Central", 11.0, 21.0));
        let location = Rc::new(FakeLocationSource::default());
        let dashboard = Dashboard::new(
            backend.clone(),
            Rc::new(TokioRuntime),
            location.clone(),
            DashboardConfig::default(),
        );
        (backend, location, dashboard)
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_draws_markers_and_click_opens_editor() {
        LocalSet::new()
            .run_until(async {
                let (_backend, _location, dashboard) = dashboard();
                let surface = Rc::new(FakeSurface::default());
                dashboard.map().attach(surface.clone());

                let report = dashboard.load().await;
                assert!(report.terminals.is_ok() && report.warehouses.is_ok());
                tokio::time::sleep(Duration::from_millis(1)).await;
                assert_eq!(surface.markers.borrow().len(), 2);

                surface.click(EntityKey::Warehouse(1));
                match dashboard.editor().state() {
                    EditorState::Open(session) => {
                        assert_eq!(session.target, EntityKey::Warehouse(1));
                    }
                    other => panic!("unexpected {:?}", other),
                }
                let (center, zoom) = *surface.views.borrow().last().unwrap();
                assert_eq!(center, GeoPoint::new(11.0, 21.0).unwrap());
                assert_eq!(zoom, dashboard.config().focus_zoom);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracker_moves_the_dashboard_map() {
        LocalSet::new()
            .run_until(async {
                let (_backend, location, dashboard) = dashboard();
                let surface = Rc::new(FakeSurface::default());
                dashboard.map().attach(surface.clone());

                dashboard.tracker().start().unwrap();
                let here = GeoPoint::new(48.0, 2.0).unwrap();
                location.send(LocationEvent::Position(here));

                let (center, zoom) = *surface.views.borrow().last().unwrap();
                assert_eq!(center, here);
                assert_eq!(zoom, 9);
                dashboard.tracker().stop();
                assert_eq!(location.active_watches(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_and_returning_to_the_map() {
        LocalSet::new()
            .run_until(async {
                let (_backend, location, dashboard) = dashboard();
                let first = Rc::new(FakeSurface::default());
                dashboard.map().attach(first.clone());
                dashboard.tracker().start().unwrap();
                let here = GeoPoint::new(48.0, 2.0).unwrap();
                location.send(LocationEvent::Position(here));

                // The page unmounts: tracking ends with it and the map goes away.
                dashboard.tracker().stop();
                dashboard.map().detach();
                assert_eq!(location.active_watches(), 0);
                assert!(!dashboard.tracker().is_tracking());

                let second = Rc::new(FakeSurface::default());
                dashboard.map().attach(second.clone());
                assert_eq!(*second.views.borrow(), vec![(here, 9)]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_shares_backend() {
        LocalSet::new()
            .run_until(async {
                let (backend, _location, dashboard) = dashboard();
                let monitor = dashboard.monitor();
                assert!(monitor.load("missing").await.is_err());
                assert_eq!(backend.calls("package_telemetry"), 1);
            })
            .await;
    }
}
