//! Leaflet bindings and the [`MapSurface`] the dashboard map draws on.
//!
//! Leaflet itself is loaded from a `<script>` tag; these externs only cover
//! the handful of calls the marker layer needs.

use std::cell::RefCell;
use std::rc::Rc;

use dronedash_engine::map_sync::MarkerIcon;
use dronedash_engine::{EntityKey, MapSurface, MarkerSpec};
use dronedash_shared::models::GeoPoint;
use js_sys::{Array, Object, Reflect};
use wasm_bindgen::prelude::*;

const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const TILE_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";

#[wasm_bindgen]
extern "C" {
    type LeafletMap;

    #[wasm_bindgen(catch, js_namespace = L, js_name = map)]
    fn new_map(container_id: &str) -> Result<LeafletMap, JsValue>;

    #[wasm_bindgen(method, js_name = setView)]
    fn set_view(this: &LeafletMap, center: &Array, zoom: u8);

    #[wasm_bindgen(method, js_name = panTo)]
    fn pan_to(this: &LeafletMap, center: &Array);

    #[wasm_bindgen(method)]
    fn remove(this: &LeafletMap);

    type TileLayer;

    #[wasm_bindgen(js_namespace = L, js_name = tileLayer)]
    fn tile_layer(url: &str, options: &Object) -> TileLayer;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_tiles_to(this: &TileLayer, map: &LeafletMap);

    type LayerGroup;

    #[wasm_bindgen(js_namespace = L, js_name = layerGroup)]
    fn layer_group() -> LayerGroup;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_group_to(this: &LayerGroup, map: &LeafletMap);

    #[wasm_bindgen(method, js_name = clearLayers)]
    fn clear_layers(this: &LayerGroup);

    #[wasm_bindgen(method, js_name = addLayer)]
    fn add_layer(this: &LayerGroup, marker: &Marker);

    type Marker;

    #[wasm_bindgen(js_namespace = L, js_name = marker)]
    fn marker(position: &Array, options: &Object) -> Marker;

    #[wasm_bindgen(method, js_name = bindPopup)]
    fn bind_popup(this: &Marker, html: &str);

    #[wasm_bindgen(method, js_name = bindTooltip)]
    fn bind_tooltip(this: &Marker, text: &str, options: &Object);

    #[wasm_bindgen(method)]
    fn on(this: &Marker, event: &str, handler: &js_sys::Function);

    type DivIcon;

    #[wasm_bindgen(js_namespace = L, js_name = divIcon)]
    fn div_icon(options: &Object) -> DivIcon;
}

fn lat_lng(p: GeoPoint) -> Array {
    Array::of2(&JsValue::from_f64(p.lat()), &JsValue::from_f64(p.lng()))
}

fn options(entries: &[(&str, JsValue)]) -> Object {
    let obj = Object::new();
    for (key, value) in entries {
        let _ = Reflect::set(&obj, &JsValue::from_str(key), value);
    }
    obj
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn icon_class(icon: MarkerIcon) -> &'static str {
    match icon {
        MarkerIcon::Terminal => "marker marker-terminal",
        MarkerIcon::InactiveTerminal => "marker marker-terminal inactive",
        MarkerIcon::Warehouse => "marker marker-warehouse",
    }
}

/// A Leaflet map mounted into a DOM element, with one layer group holding
/// every entity marker.
pub struct LeafletSurface {
    map: LeafletMap,
    layer: LayerGroup,
    /// Click handlers must outlive their markers on the JS side.
    handlers: RefCell<Vec<Closure<dyn FnMut()>>>,
}

/// Whether the Leaflet script has finished loading and defined `L`.
pub fn is_loaded() -> bool {
    Reflect::has(&js_sys::global(), &JsValue::from_str("L")).unwrap_or(false)
}

impl LeafletSurface {
    pub fn mount(container_id: &str) -> Result<Self, JsValue> {
        let map = new_map(container_id)?;
        tile_layer(
            TILE_URL,
            &options(&[
                ("attribution", JsValue::from_str(TILE_ATTRIBUTION)),
                ("maxZoom", JsValue::from_f64(19.0)),
            ]),
        )
        .add_tiles_to(&map);
        let layer = layer_group();
        layer.add_group_to(&map);
        Ok(LeafletSurface {
            map,
            layer,
            handlers: RefCell::new(Vec::new()),
        })
    }
}

impl Drop for LeafletSurface {
    fn drop(&mut self) {
        self.layer.clear_layers();
        self.map.remove();
    }
}

impl MapSurface for LeafletSurface {
    fn clear_markers(&self) {
        self.layer.clear_layers();
        self.handlers.borrow_mut().clear();
    }

    fn add_marker(&self, desc: &MarkerSpec, on_click: Rc<dyn Fn(EntityKey)>) {
        let icon = div_icon(&options(&[
            ("className", JsValue::from_str(icon_class(desc.icon))),
            ("iconSize", Array::of2(&JsValue::from_f64(18.0), &JsValue::from_f64(18.0)).into()),
        ]));
        let marker = marker(&lat_lng(desc.position), &options(&[("icon", icon.into())]));

        let popup = desc
            .popup_lines
            .iter()
            .map(|line| escape_html(line))
            .collect::<Vec<_>>()
            .join("<br>");
        marker.bind_popup(&format!("<strong>{}</strong><br>{}", escape_html(&desc.label), popup));
        marker.bind_tooltip(
            &desc.label,
            &options(&[
                ("permanent", JsValue::TRUE),
                ("direction", JsValue::from_str("top")),
            ]),
        );

        let key = desc.key;
        let handler = Closure::<dyn FnMut()>::new(move || on_click(key));
        marker.on("click", handler.as_ref().unchecked_ref());
        self.handlers.borrow_mut().push(handler);

        self.layer.add_layer(&marker);
    }

    fn set_view(&self, center: GeoPoint, zoom: u8) {
        self.map.set_view(&lat_lng(center), zoom);
    }

    fn pan_to(&self, center: GeoPoint) {
        self.map.pan_to(&lat_lng(center));
    }
}
