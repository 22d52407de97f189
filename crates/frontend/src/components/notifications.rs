use dioxus::prelude::*;
use dronedash_engine::NotificationLevel;

use crate::Services;

fn level_class(level: NotificationLevel) -> &'static str {
    match level {
        NotificationLevel::Success => "toast toast-success",
        NotificationLevel::Info => "toast toast-info",
        NotificationLevel::Warning => "toast toast-warning",
        NotificationLevel::Error => "toast toast-error",
    }
}

#[component]
pub fn Notifications(revision: u64) -> Element {
    let Services(dashboard) = use_context::<Services>();
    let items = dashboard.notifier().list();
    // Engine changes reach this component only through `revision`.
    let _ = revision;

    rsx! {
        div { class: "toasts",
            for item in items {
                div {
                    key: "{item.id}",
                    class: level_class(item.level),
                    span { "{item.message}" }
                    button {
                        class: "toast-close",
                        onclick: {
                            let dashboard = dashboard.clone();
                            move |_| dashboard.notifier().dismiss(item.id)
                        },
                        "×"
                    }
                }
            }
        }
    }
}
