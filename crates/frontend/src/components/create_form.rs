use dioxus::prelude::*;
use dronedash_shared::models::{GeoPoint, NewTerminal, NewWarehouse, MAX_RACKS};

use crate::Services;

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Terminal,
    Warehouse,
}

/// Add a terminal or a warehouse at typed coordinates.
#[component]
pub fn CreateForm() -> Element {
    let Services(dashboard) = use_context::<Services>();
    let mut kind = use_signal(|| Kind::Terminal);
    let mut name = use_signal(String::new);
    let mut lat = use_signal(String::new);
    let mut lng = use_signal(String::new);
    let mut racks = use_signal(|| MAX_RACKS as u8);
    let mut control_key = use_signal(String::new);
    let mut busy = use_signal(|| false);

    let submit = move |evt: Event<FormData>| {
        evt.prevent_default();
        let Some(location) = GeoPoint::parse(&lat.read(), &lng.read()) else {
            dashboard
                .notifier()
                .warning("Latitude must be within ±90 and longitude within ±180.");
            return;
        };
        let dashboard = dashboard.clone();
        let kind = kind();
        let name_value = name();
        let total_racks = racks();
        let key = control_key();
        busy.set(true);
        spawn(async move {
            let created = match kind {
                Kind::Terminal => dashboard
                    .store()
                    .create_terminal(NewTerminal::new(&name_value, location, total_racks, &key))
                    .await
                    .is_ok(),
                Kind::Warehouse => dashboard
                    .store()
                    .create_warehouse(NewWarehouse::new(&name_value, location))
                    .await
                    .is_ok(),
            };
            if created {
                name.set(String::new());
                lat.set(String::new());
                lng.set(String::new());
                control_key.set(String::new());
                dashboard.map().center_on(location, None);
            }
            busy.set(false);
        });
    };

    rsx! {
        form { class: "panel create-form", onsubmit: submit,
            div { class: "tabs",
                button {
                    r#type: "button",
                    class: if kind() == Kind::Terminal { "tab active" } else { "tab" },
                    onclick: move |_| kind.set(Kind::Terminal),
                    "Terminal"
                }
                button {
                    r#type: "button",
                    class: if kind() == Kind::Warehouse { "tab active" } else { "tab" },
                    onclick: move |_| kind.set(Kind::Warehouse),
                    "Warehouse"
                }
            }
            input {
                r#type: "text",
                placeholder: "Name",
                value: "{name}",
                oninput: move |evt: Event<FormData>| name.set(evt.value()),
            }
            div { class: "row",
                input {
                    r#type: "text",
                    placeholder: "Latitude",
                    value: "{lat}",
                    oninput: move |evt: Event<FormData>| lat.set(evt.value()),
                }
                input {
                    r#type: "text",
                    placeholder: "Longitude",
                    value: "{lng}",
                    oninput: move |evt: Event<FormData>| lng.set(evt.value()),
                }
            }
            if kind() == Kind::Terminal {
                div { class: "row",
                    label { "Racks" }
                    select {
                        value: "{racks}",
                        onchange: move |evt: Event<FormData>| {
                            if let Ok(n) = evt.value().parse::<u8>() {
                                racks.set(n);
                            }
                        },
                        for n in 1..=MAX_RACKS {
                            option { value: "{n}", selected: n as u8 == racks(), "{n}" }
                        }
                    }
                }
                input {
                    r#type: "text",
                    placeholder: "Control key",
                    value: "{control_key}",
                    oninput: move |evt: Event<FormData>| control_key.set(evt.value()),
                }
            }
            button { r#type: "submit", disabled: busy(),
                if busy() { "Saving..." } else { "Add" }
            }
        }
    }
}
