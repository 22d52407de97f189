use std::rc::Rc;

use dioxus::prelude::*;

use crate::components::create_form::CreateForm;
use crate::components::editor_modal::EditorModal;
use crate::components::header::Header;
use crate::components::map_panel::MapPanel;
use crate::components::notifications::Notifications;
use crate::components::sidebar::Sidebar;
use crate::components::undo_banner::UndoBanner;
use crate::Services;

fn bump(mut revision: Signal<u64>) {
    *revision.write() += 1;
}

/// The fleet dashboard: map, entity lists, editor and live location.
///
/// Engine state lives outside Dioxus; every engine event bumps `revision`,
/// which re-renders the children that read from the engine.
#[component]
pub fn DashboardPage() -> Element {
    let Services(dashboard) = use_context::<Services>();
    let revision = use_signal(|| 0u64);

    let _subscriptions = use_hook(|| {
        let subs = vec![
            dashboard.store().subscribe(move |_| bump(revision)),
            dashboard.editor().subscribe(move |_| bump(revision)),
            dashboard.tracker().subscribe(move |_| bump(revision)),
            dashboard.notifier().subscribe(move |_| bump(revision)),
        ];

        let loader = dashboard.clone();
        spawn(async move {
            loader.load().await;
        });

        Rc::new(subs)
    });

    // Leaving the page ends location tracking and releases the watch.
    let tracker = dashboard.clone();
    use_drop(move || tracker.tracker().stop());

    let rev = revision();

    rsx! {
        div { class: "dashboard",
            Header { revision: rev }
            div { class: "dashboard-body",
                aside { class: "sidebar",
                    CreateForm {}
                    Sidebar { revision: rev }
                }
                MapPanel {}
            }
            UndoBanner { revision: rev }
            EditorModal { revision: rev }
            Notifications { revision: rev }
        }
    }
}
