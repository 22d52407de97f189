use dioxus::prelude::*;

use crate::Services;

/// Deleted terminals still inside their undo window. Undo restores the newest
/// entry; dismiss drops a specific one.
#[component]
pub fn UndoBanner(revision: u64) -> Element {
    let Services(dashboard) = use_context::<Services>();
    let _ = revision;
    let pending = dashboard.store().pending_undos();

    let Some(newest) = pending.iter().rev().find(|e| !e.restoring).cloned() else {
        if pending.is_empty() {
            return rsx! {};
        }
        return rsx! {
            div { class: "undo-banner", span { class: "muted", "Restoring..." } }
        };
    };

    let undo = dashboard.clone();
    rsx! {
        div { class: "undo-banner",
            div { class: "undo-row",
                span { "Terminal \"{newest.terminal.name}\" deleted." }
                button {
                    onclick: move |_| {
                        let undo = undo.clone();
                        spawn(async move {
                            let _ = undo.store().undo().await;
                        });
                    },
                    "Undo"
                }
            }
            for entry in pending.into_iter().rev() {
                div { key: "{entry.ticket}", class: "undo-row small",
                    span { class: "muted",
                        if entry.restoring { "{entry.terminal.name} (restoring)" } else { "{entry.terminal.name}" }
                    }
                    button {
                        class: "secondary",
                        disabled: entry.restoring,
                        onclick: {
                            let dashboard = dashboard.clone();
                            move |_| dashboard.store().discard_undo(entry.ticket)
                        },
                        "Dismiss"
                    }
                }
            }
        }
    }
}
