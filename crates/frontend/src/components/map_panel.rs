use std::rc::Rc;
use std::time::Duration;

use dioxus::prelude::*;
use tracing::{debug, warn};

use crate::leaflet::{self, LeafletSurface};
use crate::Services;

const MAP_CONTAINER: &str = "fleet-map";
/// Leaflet arrives through an async script tag; wait up to 15 s for it.
const LOAD_CHECK_INTERVAL: Duration = Duration::from_millis(100);
const LOAD_CHECKS: u32 = 150;

/// Hosts the Leaflet map. The map engine owns the markers; this component only
/// attaches a surface once Leaflet is available and detaches it on unmount.
#[component]
pub fn MapPanel() -> Element {
    let Services(dashboard) = use_context::<Services>();

    let detach = dashboard.clone();
    use_drop(move || detach.map().detach());

    rsx! {
        div { class: "map-panel",
            div {
                id: MAP_CONTAINER,
                class: "map",
                onmounted: move |_| {
                    let dashboard = dashboard.clone();
                    spawn(async move {
                        let mut checks = 0;
                        while !leaflet::is_loaded() {
                            checks += 1;
                            if checks > LOAD_CHECKS {
                                warn!("leaflet never loaded");
                                dashboard.notifier().error("The map library failed to load.");
                                return;
                            }
                            gloo_timers::future::sleep(LOAD_CHECK_INTERVAL).await;
                        }
                        if dashboard.map().is_attached() {
                            return;
                        }
                        match LeafletSurface::mount(MAP_CONTAINER) {
                            Ok(surface) => {
                                debug!(checks, "leaflet ready");
                                dashboard.map().attach(Rc::new(surface));
                            }
                            Err(e) => {
                                warn!(error = ?e, "leaflet map could not be created");
                                dashboard.notifier().error("The map could not be created.");
                            }
                        }
                    });
                },
            }
        }
    }
}
