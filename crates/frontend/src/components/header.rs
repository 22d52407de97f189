use dioxus::prelude::*;

use crate::{Route, Services};

#[component]
pub fn Header(revision: u64) -> Element {
    let Services(dashboard) = use_context::<Services>();
    let _ = revision;

    let stats = dashboard.store().stats();
    let live = dashboard.tracker().snapshot();
    let mut package_query = use_signal(String::new);
    let nav = navigator();

    let tracker = dashboard.clone();
    let toggle_tracking = move |_| {
        if tracker.tracker().is_tracking() {
            tracker.tracker().stop();
        } else {
            // Refusals are already surfaced as notifications.
            let _ = tracker.tracker().start();
        }
    };

    let notifier = dashboard.clone();
    let open_monitor = move |evt: Event<FormData>| {
        evt.prevent_default();
        let package_id = package_query.read().trim().to_string();
        if package_id.is_empty() {
            notifier.notifier().warning("Enter a package id to monitor.");
            return;
        }
        nav.push(Route::Monitor { package_id });
    };

    rsx! {
        header { class: "header",
            h1 { "Drone Delivery Dashboard" }
            div { class: "stats",
                div { class: "stat",
                    span { class: "stat-value", "{stats.total_terminals}" }
                    span { class: "stat-label", "Terminals" }
                }
                div { class: "stat",
                    span { class: "stat-value", "{stats.active_terminals}" }
                    span { class: "stat-label", "Active" }
                }
                div { class: "stat",
                    span { class: "stat-value", "{stats.total_warehouses}" }
                    span { class: "stat-label", "Warehouses" }
                }
                div { class: "stat",
                    span { class: "stat-value", "{stats.coverage_percent}%" }
                    span { class: "stat-label", "Coverage" }
                }
            }
            div { class: "header-actions",
                button {
                    class: if live.tracking { "secondary tracking" } else { "secondary" },
                    onclick: toggle_tracking,
                    if live.tracking { "Stop tracking" } else { "Track my location" }
                }
                if let Some(position) = live.position {
                    span { class: "muted", "You: {position}" }
                }
                form { class: "package-lookup", onsubmit: open_monitor,
                    input {
                        r#type: "text",
                        placeholder: "Package id...",
                        value: "{package_query}",
                        oninput: move |evt: Event<FormData>| package_query.set(evt.value()),
                    }
                    button { r#type: "submit", "Monitor" }
                }
            }
        }
    }
}
