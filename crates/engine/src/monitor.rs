use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

use dronedash_shared::geo::{self, Distance, Percent, Speed, TimeSpan};
use dronedash_shared::models::PackageTelemetry;
use tracing::{debug, info, warn};

use crate::api::Backend;
use crate::error::{DashboardError, Result};
use crate::events::{Listeners, Subscription};

/// Placeholder for any metric that cannot be computed.
pub const UNAVAILABLE: &str = "N/A";

/// Render an optional metric, falling back to [`UNAVAILABLE`].
pub fn display_or_unavailable<T: Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => UNAVAILABLE.to_string(),
    }
}

/// Everything the monitor shows that is computed rather than fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryMetrics {
    pub total_distance: Option<Distance>,
    pub remaining_distance: Option<Distance>,
    pub eta: Option<TimeSpan>,
    pub progress: Percent,
    pub average_speed: Option<Speed>,
    pub flight_duration: Option<TimeSpan>,
    pub status_text: &'static str,
}

impl DeliveryMetrics {
    pub fn derive(t: &PackageTelemetry, average_speed_kmh: f64) -> Self {
        DeliveryMetrics {
            total_distance: geo::distance(t.source_location, t.destination_location),
            remaining_distance: geo::distance(t.last_known_location, t.destination_location),
            eta: geo::estimated_time_remaining(
                t.last_known_location,
                t.destination_location,
                t.current_status,
                average_speed_kmh,
            ),
            progress: geo::progress_percent(
                t.source_location,
                t.last_known_location,
                t.destination_location,
            ),
            average_speed: geo::average_speed(
                t.dispatch_time,
                t.last_update_time,
                t.source_location,
                t.last_known_location,
            ),
            flight_duration: geo::flight_duration(t.dispatch_time, t.last_update_time),
            status_text: t.current_status.status_text(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReport {
    pub telemetry: PackageTelemetry,
    pub metrics: DeliveryMetrics,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorState {
    Idle,
    Loading { package_id: String },
    Ready(Box<DeliveryReport>),
    /// Nothing is rendered from a failed load; the view offers a retry.
    Failed {
        package_id: String,
        error: DashboardError,
    },
}

struct State {
    phase: MonitorState,
    /// Id of the newest request; older completions are discarded.
    request: u64,
    last_package: Option<String>,
}

struct Inner<B> {
    backend: Rc<B>,
    average_speed_kmh: f64,
    state: RefCell<State>,
    listeners: Listeners<MonitorState>,
}

/// Point-in-time view of one package's delivery.
pub struct DeliveryMonitor<B> {
    inner: Rc<Inner<B>>,
}

impl<B> Clone for DeliveryMonitor<B> {
    fn clone(&self) -> Self {
        DeliveryMonitor {
            inner: self.inner.clone(),
        }
    }
}

impl<B: Backend + 'static> DeliveryMonitor<B> {
    pub fn new(backend: Rc<B>, average_speed_kmh: f64) -> Self {
        DeliveryMonitor {
            inner: Rc::new(Inner {
                backend,
                average_speed_kmh,
                state: RefCell::new(State {
                    phase: MonitorState::Idle,
                    request: 0,
                    last_package: None,
                }),
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.inner.state.borrow().phase.clone()
    }

    pub fn subscribe(&self, callback: impl Fn(&MonitorState) + 'static) -> Subscription {
        self.inner.listeners.subscribe(callback)
    }

    fn set_phase(&self, request: u64, phase: MonitorState) -> bool {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.request != request {
                return false;
            }
            state.phase = phase;
        }
        let snapshot = self.state();
        self.inner.listeners.emit(&snapshot);
        true
    }

    /// Fetch telemetry for `package_id` and derive its metrics.
    pub async fn load(&self, package_id: &str) -> Result<DeliveryReport> {
        let package_id = package_id.trim().to_string();
        let request = {
            let mut state = self.inner.state.borrow_mut();
            state.request += 1;
            state.last_package = Some(package_id.clone());
            state.request
        };

        if package_id.is_empty() {
            let error = DashboardError::Validation("No package data provided".to_string());
            self.set_phase(
                request,
                MonitorState::Failed {
                    package_id,
                    error: error.clone(),
                },
            );
            return Err(error);
        }

        self.set_phase(
            request,
            MonitorState::Loading {
                package_id: package_id.clone(),
            },
        );
        let backend = self.inner.backend.clone();
        match backend.package_telemetry(&package_id).await {
            Ok(telemetry) => {
                let metrics = DeliveryMetrics::derive(&telemetry, self.inner.average_speed_kmh);
                let report = DeliveryReport { telemetry, metrics };
                if self.set_phase(request, MonitorState::Ready(Box::new(report.clone()))) {
                    info!(%package_id, "package telemetry loaded");
                } else {
                    debug!(%package_id, "stale telemetry response dropped");
                }
                Ok(report)
            }
            Err(error) => {
                warn!(%package_id, error = %error, "package telemetry failed");
                self.set_phase(
                    request,
                    MonitorState::Failed {
                        package_id,
                        error: error.clone(),
                    },
                );
                Err(error)
            }
        }
    }

    /// Load the most recently requested package again.
    pub async fn retry(&self) -> Result<DeliveryReport> {
        let last = self.inner.state.borrow().last_package.clone();
        match last {
            Some(id) => self.load(&id).await,
            None => Err(DashboardError::Validation(
                "No package data provided".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use chrono::{TimeZone, Utc};
    use dronedash_shared::models::{DeliveryStatus, GeoPoint};
    use std::time::Duration;
    use tokio::task::LocalSet;

    fn telemetry(status: DeliveryStatus) -> PackageTelemetry {
        let dispatch = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        PackageTelemetry {
            package_id: "PKG-1".to_string(),
            tracking_code: Some("TRK-1".to_string()),
            warehouse_name: Some("Central".to_string()),
            source_location: GeoPoint::new(0.0, 0.0),
            destination_location: GeoPoint::new(0.0, 1.0),
            last_known_location: GeoPoint::new(0.0, 0.5),
            dispatch_time: Some(dispatch),
            last_update_time: Some(dispatch + chrono::Duration::minutes(30)),
            current_status: status,
            destination_address: None,
            assigned_drone_id: Some("D-1".to_string()),
            weight_kg: Some(1.2),
        }
    }

    #[test]
    fn test_metrics_midway() {
        let m = DeliveryMetrics::derive(&telemetry(DeliveryStatus::InTransit), 45.0);
        assert!((m.progress.0 - 50.0).abs() < 0.05);
        assert_eq!(m.total_distance.unwrap().to_string(), "111.19 km");
        assert_eq!(display_or_unavailable(&m.remaining_distance), "55.60 km");
        // 55.6 km at 45 km/h
        assert_eq!(display_or_unavailable(&m.eta), "1h 14m");
        assert_eq!(display_or_unavailable(&m.average_speed), "111.2 km/h");
        assert_eq!(display_or_unavailable(&m.flight_duration), "30 min");
        assert_eq!(m.status_text, "En Route");
    }

    #[test]
    fn test_metrics_respect_configured_speed() {
        let m = DeliveryMetrics::derive(&telemetry(DeliveryStatus::InTransit), 90.0);
        assert_eq!(display_or_unavailable(&m.eta), "37 min");
    }

    #[test]
    fn test_metrics_delivered_has_no_eta() {
        let m = DeliveryMetrics::derive(&telemetry(DeliveryStatus::Delivered), 45.0);
        assert_eq!(display_or_unavailable(&m.eta), UNAVAILABLE);
        assert_eq!(m.status_text, "Completed");
    }

    #[test]
    fn test_metrics_without_position() {
        let mut t = telemetry(DeliveryStatus::Pending);
        t.last_known_location = None;
        t.last_update_time = None;
        let m = DeliveryMetrics::derive(&t, 45.0);
        assert_eq!(m.progress, Percent(0.0));
        assert!(m.eta.is_none());
        assert!(m.remaining_distance.is_none());
        assert!(m.average_speed.is_none());
        assert!(m.flight_duration.is_none());
        assert!(m.total_distance.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_ready_then_failure_and_retry() {
        LocalSet::new()
            .run_until(async {
                let backend = Rc::new(FakeBackend::new());
                backend.seed_telemetry(telemetry(DeliveryStatus::Dispatched));
                let monitor = DeliveryMonitor::new(backend.clone(), 45.0);

                let report = monitor.load("PKG-1").await.unwrap();
                assert_eq!(report.metrics.status_text, "In Flight");
                assert!(matches!(monitor.state(), MonitorState::Ready(_)));

                backend.fail_next("package_telemetry");
                assert!(monitor.load("PKG-1").await.is_err());
                assert!(matches!(monitor.state(), MonitorState::Failed { .. }));

                monitor.retry().await.unwrap();
                assert!(matches!(monitor.state(), MonitorState::Ready(_)));
                assert_eq!(backend.calls("package_telemetry"), 3);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_id_fails_without_fetching() {
        LocalSet::new()
            .run_until(async {
                let backend = Rc::new(FakeBackend::new());
                let monitor = DeliveryMonitor::new(backend.clone(), 45.0);
                let err = monitor.load("   ").await.unwrap_err();
                assert_eq!(err.to_string(), "No package data provided");
                assert_eq!(backend.calls("package_telemetry"), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_load_does_not_overwrite_newer() {
        LocalSet::new()
            .run_until(async {
                let backend = Rc::new(FakeBackend::new());
                backend.seed_telemetry(telemetry(DeliveryStatus::InTransit));
                backend.delay("package_telemetry", Duration::from_secs(1));
                let monitor = DeliveryMonitor::new(backend.clone(), 45.0);

                let first = tokio::task::spawn_local({
                    let monitor = monitor.clone();
                    async move { monitor.load("PKG-1").await }
                });
                tokio::task::yield_now().await;
                // A newer request for an unknown package supersedes the first.
                let second = monitor.load("PKG-404").await;
                assert!(second.is_err());
                assert!(first.await.unwrap().is_ok());
                match monitor.state() {
                    MonitorState::Failed { package_id, .. } => assert_eq!(package_id, "PKG-404"),
                    other => panic!("unexpected {:?}", other),
                }
            })
            .await;
    }
}
