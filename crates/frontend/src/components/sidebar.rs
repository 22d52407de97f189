use dioxus::prelude::*;
use dronedash_engine::EntityKey;

use crate::Services;

#[component]
pub fn Sidebar(revision: u64) -> Element {
    let Services(dashboard) = use_context::<Services>();
    let _ = revision;
    let mut query = use_signal(String::new);

    let results = dashboard.store().search(&query.read());

    let focus = {
        let dashboard = dashboard.clone();
        move |key: EntityKey, has_location: bool| {
            if has_location {
                dashboard.map().select(key);
            } else if let Err(e) = dashboard.editor().open(key) {
                dashboard.notifier().report("Could not open editor", &e);
            }
        }
    };

    rsx! {
        div { class: "panel",
            input {
                r#type: "search",
                placeholder: "Search terminals and warehouses...",
                value: "{query}",
                oninput: move |evt: Event<FormData>| query.set(evt.value()),
            }
        }
        div { class: "panel entity-list",
            h3 { "Terminals ({results.terminals.len()})" }
            if results.terminals.is_empty() {
                p { class: "muted", "No terminals." }
            }
            ul {
                for terminal in results.terminals {
                    li {
                        key: "t-{terminal.id}",
                        class: if terminal.active { "entity" } else { "entity inactive" },
                        onclick: {
                            let focus = focus.clone();
                            let has_location = terminal.location.is_some();
                            move |_| focus(EntityKey::Terminal(terminal.id), has_location)
                        },
                        span { class: "entity-name", "{terminal.name}" }
                        span { class: "entity-meta",
                            {format!("{}/{} racks, {}", terminal.occupied_racks(), terminal.total_racks, terminal.status())}
                        }
                    }
                }
            }
        }
        div { class: "panel entity-list",
            h3 { "Warehouses ({results.warehouses.len()})" }
            if results.warehouses.is_empty() {
                p { class: "muted", "No warehouses." }
            }
            ul {
                for warehouse in results.warehouses {
                    li {
                        key: "w-{warehouse.id}",
                        class: "entity",
                        onclick: {
                            let focus = focus.clone();
                            let has_location = warehouse.location.is_some();
                            move |_| focus(EntityKey::Warehouse(warehouse.id), has_location)
                        },
                        span { class: "entity-name", "{warehouse.name}" }
                        if let Some(location) = warehouse.location {
                            span { class: "entity-meta", "{location}" }
                        }
                    }
                }
            }
        }
    }
}
