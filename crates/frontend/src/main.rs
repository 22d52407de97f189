mod components;
mod geolocation;
mod leaflet;
mod pages;
mod runtime;
mod settings;

use std::rc::Rc;

use dioxus::prelude::*;
use dronedash_engine::{Dashboard, HttpBackend};

use geolocation::BrowserLocation;
use runtime::WasmRuntime;

#[derive(Routable, Clone, PartialEq)]
enum Route {
    #[route("/")]
    Home {},
    #[route("/monitor/:package_id")]
    Monitor { package_id: String },
}

/// Engine services shared by every page.
#[derive(Clone)]
pub struct Services(pub Rc<Dashboard<HttpBackend>>);

#[component]
fn Home() -> Element {
    rsx! {
        pages::dashboard::DashboardPage {}
    }
}

#[component]
fn Monitor(package_id: String) -> Element {
    rsx! {
        pages::monitor::MonitorPage { package_id }
    }
}

const CSS: Asset = asset!("/assets/main.css");
const FAVICON: Asset = asset!("/assets/favicon.svg");
const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";

#[allow(non_snake_case)]
fn App() -> Element {
    use_context_provider(|| {
        let config = settings::load_config();
        let backend = Rc::new(HttpBackend::new(config.clone()));
        Services(Rc::new(Dashboard::new(
            backend,
            Rc::new(WasmRuntime),
            Rc::new(BrowserLocation::default()),
            config,
        )))
    });

    rsx! {
        document::Link { rel: "icon", r#type: "image/svg+xml", href: FAVICON }
        document::Stylesheet { href: LEAFLET_CSS }
        document::Script { src: LEAFLET_JS }
        document::Stylesheet { href: CSS }
        Router::<Route> {}
    }
}

fn main() {
    launch(App);
}
