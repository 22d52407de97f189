pub mod create_form;
pub mod editor_modal;
pub mod header;
pub mod map_panel;
pub mod notifications;
pub mod sidebar;
pub mod undo_banner;
