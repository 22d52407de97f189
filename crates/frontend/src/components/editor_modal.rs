use dioxus::prelude::*;
use dronedash_engine::editor::{Assignments, Draft, EditorSession};
use dronedash_engine::{EditorState, EntityKey};
use dronedash_shared::models::{DroneAssignment, Terminal};

use crate::Services;

/// Modal over the map for the entity picked from a marker or the sidebar.
#[component]
pub fn EditorModal(revision: u64) -> Element {
    let Services(dashboard) = use_context::<Services>();
    let _ = revision;
    let state = dashboard.editor().state();

    let Some(session) = state.session().cloned() else {
        return rsx! {};
    };
    let busy = state.is_busy();
    let confirming = matches!(state, EditorState::ConfirmDelete(_));
    let error = match &state {
        EditorState::Error { message, .. } => Some(message.clone()),
        _ => None,
    };

    let editor = dashboard.clone();
    let close = move |_| editor.editor().close();

    let editor = dashboard.clone();
    let save = move |evt: Event<FormData>| {
        evt.prevent_default();
        let editor = editor.clone();
        spawn(async move {
            let _ = editor.editor().save().await;
        });
    };

    let editor = dashboard.clone();
    let request_delete = move |_| editor.editor().request_delete();
    let editor = dashboard.clone();
    let cancel_delete = move |_| editor.editor().cancel_delete();
    let editor = dashboard.clone();
    let confirm_delete = move |_| {
        let editor = editor.clone();
        spawn(async move {
            let _ = editor.editor().confirm_delete().await;
        });
    };

    rsx! {
        div { class: "modal-backdrop",
            div { class: "modal",
                header { class: "modal-header",
                    h2 { "{session.title}" }
                    button { class: "secondary", disabled: busy, onclick: close, "×" }
                }
                if let Some(message) = error {
                    p { class: "error", "{message}" }
                }
                form { onsubmit: save,
                    DraftFields { session: session.clone(), busy }
                    if confirming {
                        div { class: "confirm",
                            p { "Delete this entry?" }
                            button { r#type: "button", class: "danger", onclick: confirm_delete, "Delete" }
                            button { r#type: "button", class: "secondary", onclick: cancel_delete, "Keep" }
                        }
                    } else {
                        div { class: "modal-actions",
                            button { r#type: "submit", disabled: busy,
                                if matches!(state, EditorState::Saving(_)) { "Saving..." } else { "Save" }
                            }
                            button {
                                r#type: "button",
                                class: "danger",
                                disabled: busy,
                                onclick: request_delete,
                                if matches!(state, EditorState::Deleting(_)) { "Deleting..." } else { "Delete" }
                            }
                        }
                    }
                }
                AssignmentList { assignments: session.assignments.clone() }
            }
        }
    }
}

#[component]
fn DraftFields(session: EditorSession, busy: bool) -> Element {
    let Services(dashboard) = use_context::<Services>();

    match session.draft {
        Draft::Terminal {
            name,
            active,
            control_key,
        } => {
            let racks = match session.target {
                EntityKey::Terminal(id) => dashboard.store().terminal(id),
                _ => None,
            };
            let (on_name, on_active, on_key) = (dashboard.clone(), dashboard.clone(), dashboard.clone());
            rsx! {
                label { "Name" }
                input {
                    r#type: "text",
                    value: "{name}",
                    disabled: busy,
                    oninput: move |evt: Event<FormData>| on_name.editor().set_name(&evt.value()),
                }
                label { class: "checkbox",
                    input {
                        r#type: "checkbox",
                        checked: active,
                        disabled: busy,
                        onchange: move |evt: Event<FormData>| on_active.editor().set_active(evt.checked()),
                    }
                    "Active"
                }
                label { "Control key" }
                input {
                    r#type: "text",
                    value: "{control_key}",
                    disabled: busy,
                    oninput: move |evt: Event<FormData>| on_key.editor().set_control_key(&evt.value()),
                }
                if let Some(terminal) = racks {
                    RackTable { terminal }
                }
            }
        }
        Draft::Warehouse { name } => {
            let on_name = dashboard.clone();
            rsx! {
                label { "Name" }
                input {
                    r#type: "text",
                    value: "{name}",
                    disabled: busy,
                    oninput: move |evt: Event<FormData>| on_name.editor().set_name(&evt.value()),
                }
            }
        }
    }
}

#[component]
fn RackTable(terminal: Terminal) -> Element {
    let slots = terminal.total_racks as usize;
    rsx! {
        table { class: "racks",
            tbody {
                for (index, package) in terminal.rack_assignments.iter().take(slots).enumerate() {
                    tr { key: "{index}",
                        td { {Terminal::rack_label(index)} }
                        td {
                            if let Some(id) = package {
                                span { "{id}" }
                            } else {
                                span { class: "muted", "empty" }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn assignment_line(a: &DroneAssignment) -> String {
    let drone = a
        .drone_name
        .as_deref()
        .or(a.drone_id.as_deref())
        .unwrap_or("Unnamed drone");
    match &a.status {
        Some(status) => format!("{} ({})", drone, status),
        None => drone.to_string(),
    }
}

#[component]
fn AssignmentList(assignments: Assignments) -> Element {
    match assignments {
        Assignments::NotApplicable => rsx! {},
        Assignments::Loading => rsx! {
            p { class: "muted", "Loading drone assignments..." }
        },
        Assignments::Failed(message) => rsx! {
            p { class: "error", "Drone assignments unavailable: {message}" }
        },
        Assignments::Loaded(list) => rsx! {
            h3 { "Assigned drones ({list.len()})" }
            if list.is_empty() {
                p { class: "muted", "No drones assigned." }
            }
            ul {
                for (i, a) in list.iter().enumerate() {
                    li { key: "{i}", {assignment_line(a)} }
                }
            }
        },
    }
}
