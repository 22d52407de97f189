use std::rc::Rc;

use chrono::{DateTime, Utc};
use dioxus::prelude::*;
use dronedash_engine::monitor::{display_or_unavailable, DeliveryReport, UNAVAILABLE};
use dronedash_engine::MonitorState;

use crate::{Route, Services};

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

fn text(value: &Option<String>) -> String {
    display_or_unavailable(value)
}

#[component]
pub fn MonitorPage(package_id: String) -> Element {
    let Services(dashboard) = use_context::<Services>();
    let state = use_signal(|| MonitorState::Idle);

    let (monitor, _subscription) = use_hook(|| {
        let monitor = dashboard.monitor();
        let sub = monitor.subscribe(move |next| {
            let mut state = state;
            state.set(next.clone());
        });
        (monitor, Rc::new(sub))
    });

    let loader = monitor.clone();
    use_effect(use_reactive((&package_id,), move |(package_id,)| {
        let monitor = loader.clone();
        spawn(async move {
            let _ = monitor.load(&package_id).await;
        });
    }));

    let body = match state() {
        MonitorState::Idle => rsx! {
            p { class: "muted", "No package selected." }
        },
        MonitorState::Loading { package_id } => rsx! {
            p { class: "muted", "Loading telemetry for {package_id}..." }
        },
        MonitorState::Failed { package_id, error } => {
            let retry = monitor.clone();
            rsx! {
                div { class: "monitor-error",
                    p { "Could not load package {package_id}: {error}" }
                    button {
                        onclick: move |_| {
                            let retry = retry.clone();
                            spawn(async move {
                                let _ = retry.retry().await;
                            });
                        },
                        "Retry"
                    }
                }
            }
        }
        MonitorState::Ready(report) => rsx! {
            DeliveryView { report: *report }
        },
    };

    rsx! {
        div { class: "monitor",
            header { class: "monitor-header",
                Link { to: Route::Home {}, "← Dashboard" }
                h1 { "Package {package_id}" }
            }
            {body}
        }
    }
}

#[component]
fn DeliveryView(report: DeliveryReport) -> Element {
    let t = &report.telemetry;
    let m = &report.metrics;
    let progress = m.progress.0;
    let status = t.current_status.to_string();
    let weight = t
        .weight_kg
        .map(|w| format!("{:.2} kg", w))
        .unwrap_or_else(|| UNAVAILABLE.to_string());

    rsx! {
        section { class: "panel",
            div { class: "status-line",
                span { class: "status-badge", "{m.status_text}" }
                span { class: "muted", "{status}" }
            }
            div { class: "progress",
                div { class: "progress-fill", style: "width: {progress}%;" }
            }
            p { class: "progress-label", "{m.progress} complete" }
        }
        section { class: "panel metrics",
            h3 { "Flight" }
            dl {
                dt { "Total distance" }
                dd { {display_or_unavailable(&m.total_distance)} }
                dt { "Remaining" }
                dd { {display_or_unavailable(&m.remaining_distance)} }
                dt { "ETA" }
                dd { {display_or_unavailable(&m.eta)} }
                dt { "Average speed" }
                dd { {display_or_unavailable(&m.average_speed)} }
                dt { "Flight time" }
                dd { {display_or_unavailable(&m.flight_duration)} }
            }
        }
        section { class: "panel metrics",
            h3 { "Package" }
            dl {
                dt { "Tracking code" }
                dd { {text(&t.tracking_code)} }
                dt { "Warehouse" }
                dd { {text(&t.warehouse_name)} }
                dt { "Drone" }
                dd { {text(&t.assigned_drone_id)} }
                dt { "Destination" }
                dd { {text(&t.destination_address)} }
                dt { "Weight" }
                dd { "{weight}" }
                dt { "Source" }
                dd { {display_or_unavailable(&t.source_location)} }
                dt { "Last known position" }
                dd { {display_or_unavailable(&t.last_known_location)} }
                dt { "Destination position" }
                dd { {display_or_unavailable(&t.destination_location)} }
                dt { "Dispatched" }
                dd { {timestamp(t.dispatch_time)} }
                dt { "Last update" }
                dd { {timestamp(t.last_update_time)} }
            }
        }
    }
}
