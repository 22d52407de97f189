use std::cell::RefCell;
use std::collections::HashMap;

use dronedash_engine::tracker::{LocationSink, WatchId};
use dronedash_engine::{GeolocationError, LocationEvent, LocationSource};
use dronedash_shared::models::GeoPoint;
use tracing::debug;
use wasm_bindgen::prelude::*;
use web_sys::{Geolocation, GeolocationPosition, GeolocationPositionError, PositionOptions};

const WATCH_TIMEOUT_MS: u32 = 15_000;
const MAX_FIX_AGE_MS: u32 = 60_000;

struct WatchCallbacks {
    _on_position: Closure<dyn FnMut(GeolocationPosition)>,
    _on_error: Closure<dyn FnMut(GeolocationPositionError)>,
}

/// `navigator.geolocation` as a [`LocationSource`].
#[derive(Default)]
pub struct BrowserLocation {
    watches: RefCell<HashMap<i32, WatchCallbacks>>,
}

fn geolocation() -> Result<Geolocation, GeolocationError> {
    web_sys::window()
        .ok_or(GeolocationError::Unsupported)?
        .navigator()
        .geolocation()
        .map_err(|_| GeolocationError::Unsupported)
}

impl LocationSource for BrowserLocation {
    fn watch(&self, sink: LocationSink) -> Result<WatchId, GeolocationError> {
        let geo = geolocation()?;

        let position_sink = sink.clone();
        let on_position = Closure::<dyn FnMut(GeolocationPosition)>::new(move |pos: GeolocationPosition| {
            let coords = pos.coords();
            let event = match GeoPoint::new(coords.latitude(), coords.longitude()) {
                Some(point) => LocationEvent::Position(point),
                None => LocationEvent::Error(GeolocationError::PositionUnavailable),
            };
            position_sink(event);
        });
        let on_error = Closure::<dyn FnMut(GeolocationPositionError)>::new(move |err: GeolocationPositionError| {
            sink(LocationEvent::Error(GeolocationError::from_code(err.code(), &err.message())));
        });

        let options = PositionOptions::new();
        options.set_enable_high_accuracy(true);
        options.set_timeout(WATCH_TIMEOUT_MS);
        options.set_maximum_age(MAX_FIX_AGE_MS);

        let id = geo
            .watch_position_with_error_callback_and_options(
                on_position.as_ref().unchecked_ref(),
                Some(on_error.as_ref().unchecked_ref()),
                &options,
            );

        self.watches.borrow_mut().insert(
            id,
            WatchCallbacks {
                _on_position: on_position,
                _on_error: on_error,
            },
        );
        Ok(WatchId(id))
    }

    fn clear_watch(&self, id: WatchId) {
        if let Ok(geo) = geolocation() {
            geo.clear_watch(id.0);
        }
        // The watch may be cleared from inside its own callback; free the
        // closures once that callback has returned.
        let retired = self.watches.borrow_mut().remove(&id.0);
        wasm_bindgen_futures::spawn_local(async move {
            drop(retired);
        });
        debug!(id = id.0, "geolocation watch cleared");
    }
}
