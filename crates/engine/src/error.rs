use thiserror::Error;

/// Categorized browser geolocation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("Location permission denied. Please enable location access.")]
    PermissionDenied,
    #[error("Location unavailable. Check your connection.")]
    PositionUnavailable,
    #[error("Location request timed out.")]
    Timeout,
    #[error("Geolocation is not supported by this browser.")]
    Unsupported,
    #[error("Unable to get your location: {0}")]
    Other(String),
}

impl GeolocationError {
    /// Map a `GeolocationPositionError.code` (1, 2, 3) to a category.
    pub fn from_code(code: u16, message: &str) -> Self {
        match code {
            1 => GeolocationError::PermissionDenied,
            2 => GeolocationError::PositionUnavailable,
            3 => GeolocationError::Timeout,
            _ => GeolocationError::Other(message.to_string()),
        }
    }
}

fn server_message(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(m) if !m.trim().is_empty() => m.clone(),
        _ => format!("Server responded with status {}", status),
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DashboardError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),
    /// Non-2xx response; `message` is the body's `error` field when present.
    #[error("{}", server_message(.status, .message))]
    Server { status: u16, message: Option<String> },
    #[error("Unexpected data: {0}")]
    DataQuality(String),
    #[error(transparent)]
    Geolocation(#[from] GeolocationError),
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
}

impl DashboardError {
    /// Failures of the backend round trip. Local state is untouched when these occur.
    pub fn is_transient(&self) -> bool {
        matches!(self, DashboardError::Network(_) | DashboardError::Server { .. })
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geolocation_codes() {
        assert_eq!(GeolocationError::from_code(1, ""), GeolocationError::PermissionDenied);
        assert_eq!(GeolocationError::from_code(2, ""), GeolocationError::PositionUnavailable);
        assert_eq!(GeolocationError::from_code(3, ""), GeolocationError::Timeout);
        assert_eq!(
            GeolocationError::from_code(9, "odd"),
            GeolocationError::Other("odd".to_string())
        );
    }

    #[test]
    fn test_server_error_prefers_body_message() {
        let e = DashboardError::Server {
            status: 400,
            message: Some("DDT name already exists".to_string()),
        };
        assert_eq!(e.to_string(), "DDT name already exists");
        let e = DashboardError::Server {
            status: 502,
            message: None,
        };
        assert_eq!(e.to_string(), "Server responded with status 502");
        assert!(e.is_transient());
    }

    #[test]
    fn test_geolocation_converts() {
        let e: DashboardError = GeolocationError::Timeout.into();
        assert_eq!(e.to_string(), "Location request timed out.");
        assert!(!e.is_transient());
    }
}
