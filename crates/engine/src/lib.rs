//! Client-side core of the drone-delivery dashboard: entity cache with undo,
//! map marker synchronization, live location tracking and delivery metrics.
//!
//! Everything here is single-threaded. Async work goes through a [`Runtime`]
//! so the same code runs under tokio in tests and in the browser.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod editor;
pub mod error;
pub mod events;
pub mod map_sync;
pub mod monitor;
pub mod notify;
pub mod runtime;
pub mod store;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use api::{Backend, HttpBackend};
pub use config::{DashboardConfig, UndoStrategy};
pub use dashboard::Dashboard;
pub use editor::{EditorOverlay, EditorState};
pub use error::{DashboardError, GeolocationError, Result};
pub use map_sync::{MapSurface, MapSyncEngine, MarkerSpec, Viewport};
pub use monitor::{DeliveryMetrics, DeliveryMonitor, MonitorState};
pub use notify::{Notification, NotificationCenter, NotificationLevel};
pub use runtime::Runtime;
pub use store::{EntityKey, EntityStore};
pub use tracker::{LiveLocationTracker, LocationEvent, LocationSource};
