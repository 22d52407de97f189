use dronedash_shared::models::{
    DroneAssignment, NewTerminal, NewWarehouse, PackageTelemetry, Terminal, TerminalPatch,
    Warehouse, WarehousePatch,
};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};

/// The REST services the dashboard talks to. Implemented over HTTP in
/// production and by in-memory fakes in tests.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn list_terminals(&self) -> Result<Vec<Terminal>>;
    async fn create_terminal(&self, body: &NewTerminal) -> Result<Terminal>;
    async fn update_terminal(&self, id: i64, patch: &TerminalPatch) -> Result<Terminal>;
    async fn delete_terminal(&self, id: i64) -> Result<()>;

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>>;
    async fn create_warehouse(&self, body: &NewWarehouse) -> Result<Warehouse>;
    async fn update_warehouse(&self, id: i64, patch: &WarehousePatch) -> Result<Warehouse>;
    async fn delete_warehouse(&self, id: i64) -> Result<()>;

    async fn package_telemetry(&self, package_id: &str) -> Result<PackageTelemetry>;
    async fn drone_assignments(&self, warehouse_name: &str) -> Result<Vec<DroneAssignment>>;
}

// Legacy services answer either with the bare record or wrapped as
// `{"message": "...", "ddt": {...}}`; lists may be bare arrays or wrapped too.

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordReply<T> {
    Enveloped {
        #[serde(
            alias = "ddt",
            alias = "terminal",
            alias = "warehouse",
            alias = "package"
        )]
        record: T,
    },
    Bare(T),
}

impl<T> RecordReply<T> {
    fn into_inner(self) -> T {
        match self {
            RecordReply::Enveloped { record } | RecordReply::Bare(record) => record,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListReply<T> {
    Bare(Vec<T>),
    Enveloped {
        #[serde(
            alias = "ddts",
            alias = "terminals",
            alias = "warehouses",
            alias = "assignments"
        )]
        items: Vec<T>,
    },
}

impl<T> ListReply<T> {
    fn into_inner(self) -> Vec<T> {
        match self {
            ListReply::Bare(items) | ListReply::Enveloped { items } => items,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Pull the `error` field out of a failed response body, if there is one.
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
}

/// Decode a successful body into a single record, bare or enveloped.
pub fn decode_record<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str::<RecordReply<T>>(body)
        .map(RecordReply::into_inner)
        .map_err(|e| DashboardError::DataQuality(e.to_string()))
}

/// Decode a successful body into a list, bare or enveloped.
pub fn decode_list<T: DeserializeOwned>(body: &str) -> Result<Vec<T>> {
    serde_json::from_str::<ListReply<T>>(body)
        .map(ListReply::into_inner)
        .map_err(|e| DashboardError::DataQuality(e.to_string()))
}

/// [`Backend`] over plain JSON REST.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: DashboardConfig,
}

impl HttpBackend {
    pub fn new(config: DashboardConfig) -> Self {
        HttpBackend {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    async fn fetch(&self, request: RequestBuilder) -> Result<String> {
        let resp = request
            .send()
            .await
            .map_err(|e| DashboardError::Network(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| DashboardError::Network(e.to_string()))?;
        debug!(status = status.as_u16(), bytes = body.len(), "backend response");
        if !status.is_success() {
            return Err(DashboardError::Server {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(body)
    }

    async fn record<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        decode_record(&self.fetch(request).await?)
    }

    async fn list<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>> {
        decode_list(&self.fetch(request).await?)
    }
}

impl Backend for HttpBackend {
    async fn list_terminals(&self) -> Result<Vec<Terminal>> {
        self.list(self.client.get(self.config.terminals_url())).await
    }

    async fn create_terminal(&self, body: &NewTerminal) -> Result<Terminal> {
        self.record(self.client.post(self.config.terminals_url()).json(body))
            .await
    }

    async fn update_terminal(&self, id: i64, patch: &TerminalPatch) -> Result<Terminal> {
        self.record(self.client.put(self.config.terminal_url(id)).json(patch))
            .await
    }

    async fn delete_terminal(&self, id: i64) -> Result<()> {
        self.fetch(self.client.delete(self.config.terminal_url(id)))
            .await
            .map(|_| ())
    }

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>> {
        self.list(self.client.get(self.config.warehouses_url())).await
    }

    async fn create_warehouse(&self, body: &NewWarehouse) -> Result<Warehouse> {
        self.record(self.client.post(self.config.warehouses_url()).json(body))
            .await
    }

    async fn update_warehouse(&self, id: i64, patch: &WarehousePatch) -> Result<Warehouse> {
        self.record(self.client.put(self.config.warehouse_url(id)).json(patch))
            .await
    }

    async fn delete_warehouse(&self, id: i64) -> Result<()> {
        self.fetch(self.client.delete(self.config.warehouse_url(id)))
            .await
            .map(|_| ())
    }

    async fn package_telemetry(&self, package_id: &str) -> Result<PackageTelemetry> {
        self.record(self.client.get(self.config.telemetry_url(package_id)))
            .await
    }

    async fn drone_assignments(&self, warehouse_name: &str) -> Result<Vec<DroneAssignment>> {
        self.list(self.client.get(self.config.assignments_url(warehouse_name)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_enveloped_terminal() {
        let body = r#"{"message":"DDT added successfully","ddt":{"id":12,"name":"Pier","latitude":"1.5","longitude":"2.5","status":"Active","total_racks":2,"control_key":"k"}}"#;
        let t: Terminal = decode_record(body).unwrap();
        assert_eq!(t.id, 12);
        assert!(t.location.is_some());
    }

    #[test]
    fn test_decode_bare_terminal() {
        let body = r#"{"id":3,"name":"Bare","latitude":1.0,"longitude":2.0}"#;
        let t: Terminal = decode_record(body).unwrap();
        assert_eq!(t.id, 3);
    }

    #[test]
    fn test_decode_lists() {
        let bare: Vec<Warehouse> =
            decode_list(r#"[{"id":1,"name":"A","latitude":0,"longitude":0}]"#).unwrap();
        assert_eq!(bare.len(), 1);
        let wrapped: Vec<Warehouse> =
            decode_list(r#"{"warehouses":[{"id":1,"name":"A","latitude":0,"longitude":0}]}"#)
                .unwrap();
        assert_eq!(wrapped[0].name, "A");
    }

    #[test]
    fn test_decode_garbage_is_data_quality() {
        let err = decode_record::<Terminal>(r#"{"unexpected":true}"#).unwrap_err();
        assert!(matches!(err, DashboardError::DataQuality(_)));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":"DDT not found"}"#).as_deref(),
            Some("DDT not found")
        );
        assert_eq!(error_message("<html>oops</html>"), None);
        assert_eq!(error_message(r#"{"error":""}"#), None);
    }
}
