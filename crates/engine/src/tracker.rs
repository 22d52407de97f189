use std::cell::RefCell;
use std::rc::{Rc, Weak};

use dronedash_shared::models::GeoPoint;
use tracing::{debug, info, warn};

use crate::error::GeolocationError;
use crate::events::{Listeners, Subscription};
use crate::map_sync::Viewport;
use crate::notify::NotificationCenter;

#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    Position(GeoPoint),
    Error(GeolocationError),
}

pub type LocationSink = Rc<dyn Fn(LocationEvent)>;

/// Handle of a running position watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchId(pub i32);

/// A continuous device-position feed, such as `navigator.geolocation`.
pub trait LocationSource {
    /// Start delivering events to `sink` until [`clear_watch`](Self::clear_watch).
    /// Implementations may call `sink` before returning.
    fn watch(&self, sink: LocationSink) -> Result<WatchId, GeolocationError>;
    fn clear_watch(&self, id: WatchId);
}

/// Owns a watch and clears it when dropped, so every way out of tracking
/// releases it exactly once.
struct WatchGuard {
    source: Rc<dyn LocationSource>,
    id: WatchId,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        debug!(id = self.id.0, "clearing location watch");
        self.source.clear_watch(self.id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    Stopped,
    /// `watch` has been called but has not returned yet.
    Starting,
    Tracking,
}

/// Snapshot of the live location for the view.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveLocationState {
    pub position: Option<GeoPoint>,
    pub tracking: bool,
}

struct State {
    phase: TrackerPhase,
    position: Option<GeoPoint>,
    guard: Option<WatchGuard>,
    /// Bumped on every start and stop; events from older sessions are dropped.
    session: u64,
    fixes: u64,
    /// Events delivered while `watch` was still running.
    early: Vec<LocationEvent>,
}

struct Inner {
    source: Rc<dyn LocationSource>,
    viewport: Rc<dyn Viewport>,
    notifier: NotificationCenter,
    tracking_zoom: u8,
    state: RefCell<State>,
    listeners: Listeners<LiveLocationState>,
}

/// Follows the device position and keeps the map centered on it.
///
/// The first fix of a session zooms to `tracking_zoom`; later fixes only pan.
/// Any source error ends the session and surfaces a categorized message.
#[derive(Clone)]
pub struct LiveLocationTracker {
    inner: Rc<Inner>,
}

impl LiveLocationTracker {
    pub fn new(
        source: Rc<dyn LocationSource>,
        viewport: Rc<dyn Viewport>,
        notifier: NotificationCenter,
        tracking_zoom: u8,
    ) -> Self {
        LiveLocationTracker {
            inner: Rc::new(Inner {
                source,
                viewport,
                notifier,
                tracking_zoom,
                state: RefCell::new(State {
                    phase: TrackerPhase::Stopped,
                    position: None,
                    guard: None,
                    session: 0,
                    fixes: 0,
                    early: Vec::new(),
                }),
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn phase(&self) -> TrackerPhase {
        self.inner.state.borrow().phase
    }

    pub fn is_tracking(&self) -> bool {
        self.phase() != TrackerPhase::Stopped
    }

    pub fn snapshot(&self) -> LiveLocationState {
        let state = self.inner.state.borrow();
        LiveLocationState {
            position: state.position,
            tracking: state.phase != TrackerPhase::Stopped,
        }
    }

    pub fn subscribe(&self, callback: impl Fn(&LiveLocationState) + 'static) -> Subscription {
        self.inner.listeners.subscribe(callback)
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.inner.listeners.emit(&snapshot);
    }

    /// Begin following the device. A no-op while already tracking.
    pub fn start(&self) -> Result<(), GeolocationError> {
        let session = {
            let mut state = self.inner.state.borrow_mut();
            if state.phase != TrackerPhase::Stopped {
                debug!("start ignored, already tracking");
                return Ok(());
            }
            state.session += 1;
            state.phase = TrackerPhase::Starting;
            state.fixes = 0;
            state.early.clear();
            state.session
        };

        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let sink: LocationSink = Rc::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                LiveLocationTracker { inner }.on_event(session, event);
            }
        });

        let source = self.inner.source.clone();
        match source.watch(sink) {
            Ok(id) => {
                let early = {
                    let mut state = self.inner.state.borrow_mut();
                    let guard = WatchGuard { source, id };
                    if state.session != session {
                        // Stopped from inside `watch`.
                        drop(state);
                        drop(guard);
                        debug!(id = id.0, "watch released, stopped while starting");
                        return Ok(());
                    }
                    state.guard = Some(guard);
                    state.phase = TrackerPhase::Tracking;
                    std::mem::take(&mut state.early)
                };
                info!(id = id.0, "location tracking started");
                self.publish();
                for event in early {
                    self.on_event(session, event);
                }
                Ok(())
            }
            Err(e) => {
                self.inner.state.borrow_mut().phase = TrackerPhase::Stopped;
                warn!(error = %e, "location watch refused");
                self.inner.notifier.error(e.to_string());
                self.publish();
                Err(e)
            }
        }
    }

    /// Stop following. Releases the watch; a no-op when already stopped.
    pub fn stop(&self) {
        let guard = {
            let mut state = self.inner.state.borrow_mut();
            if state.phase == TrackerPhase::Stopped {
                return;
            }
            state.session += 1;
            state.phase = TrackerPhase::Stopped;
            state.position = None;
            state.early.clear();
            state.guard.take()
        };
        drop(guard);
        info!("location tracking stopped");
        self.publish();
    }

    fn on_event(&self, session: u64, event: LocationEvent) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.session != session {
                return;
            }
            if state.phase == TrackerPhase::Starting {
                state.early.push(event);
                return;
            }
        }

        match event {
            LocationEvent::Position(position) => {
                let first = {
                    let mut state = self.inner.state.borrow_mut();
                    state.position = Some(position);
                    state.fixes += 1;
                    state.fixes == 1
                };
                let zoom = first.then_some(self.inner.tracking_zoom);
                self.inner.viewport.focus(position, zoom);
                self.publish();
            }
            LocationEvent::Error(error) => {
                let guard = {
                    let mut state = self.inner.state.borrow_mut();
                    state.session += 1;
                    state.phase = TrackerPhase::Stopped;
                    state.guard.take()
                };
                drop(guard);
                warn!(error = %error, "location tracking failed");
                self.inner.notifier.error(error.to_string());
                self.publish();
            }
        }
    }
}
