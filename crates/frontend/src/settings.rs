use dronedash_engine::DashboardConfig;
use tracing::warn;

/// localStorage key holding a JSON `DashboardConfig` override.
const CONFIG_KEY: &str = "dronedash.config";

/// Dashboard settings for this browser. Defaults apply when nothing is stored;
/// an empty API base falls back to the page origin, since the backend serves
/// the bundle.
pub fn load_config() -> DashboardConfig {
    let Some(window) = web_sys::window() else {
        return DashboardConfig::default();
    };

    let stored = window
        .local_storage()
        .ok()
        .flatten()
        .and_then(|s| s.get_item(CONFIG_KEY).ok().flatten());

    let mut config = match stored {
        Some(raw) => DashboardConfig::from_json(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring stored dashboard config");
            DashboardConfig::default()
        }),
        None => DashboardConfig::default(),
    };

    if config.api_base_url.is_empty() {
        if let Ok(origin) = window.location().origin() {
            config.api_base_url = origin;
        }
    }
    config
}
