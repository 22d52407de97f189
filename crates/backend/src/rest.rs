use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dronedash_shared::models::{
    DroneAssignment, NewTerminal, NewWarehouse, PackageTelemetry, Terminal, TerminalPatch,
    Warehouse, WarehousePatch,
};
use serde_json::json;
use tracing::{info, warn};

use crate::storage::Storage;

/// Failure answered as `{"error": "..."}` with a matching status code.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<String> for ApiError {
    fn from(message: String) -> Self {
        warn!(error = %message, "storage failure");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// Terminals (DDTs)

pub async fn list_terminals(State(storage): State<Arc<Storage>>) -> ApiResult<Json<Vec<Terminal>>> {
    Ok(Json(storage.list_terminals()?))
}

pub async fn create_terminal(
    State(storage): State<Arc<Storage>>,
    body: Result<Json<NewTerminal>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let Json(body) = body?;
    body.validate().map_err(ApiError::bad_request)?;
    let terminal = storage.create_terminal(&body)?;
    info!(id = terminal.id, name = %terminal.name, "terminal created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "DDT added successfully", "ddt": terminal })),
    ))
}

pub async fn update_terminal(
    State(storage): State<Arc<Storage>>,
    Path(id): Path<i64>,
    patch: Result<Json<TerminalPatch>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Json(patch) = patch?;
    patch.validate().map_err(ApiError::bad_request)?;
    let terminal = storage
        .update_terminal(id, &patch)?
        .ok_or_else(|| ApiError::not_found("DDT not found"))?;
    info!(id, "terminal updated");
    Ok(Json(json!({ "message": "DDT updated successfully", "ddt": terminal })))
}

pub async fn delete_terminal(
    State(storage): State<Arc<Storage>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    if !storage.delete_terminal(id)? {
        return Err(ApiError::not_found("DDT not found"));
    }
    info!(id, "terminal deleted");
    Ok(Json(json!({ "message": "DDT deleted successfully" })))
}

// Warehouses

pub async fn list_warehouses(State(storage): State<Arc<Storage>>) -> ApiResult<Json<Vec<Warehouse>>> {
    Ok(Json(storage.list_warehouses()?))
}

pub async fn create_warehouse(
    State(storage): State<Arc<Storage>>,
    body: Result<Json<NewWarehouse>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let Json(body) = body?;
    body.validate().map_err(ApiError::bad_request)?;
    let warehouse = storage.create_warehouse(&body)?;
    info!(id = warehouse.id, name = %warehouse.name, "warehouse created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Warehouse added successfully", "warehouse": warehouse })),
    ))
}

pub async fn update_warehouse(
    State(storage): State<Arc<Storage>>,
    Path(id): Path<i64>,
    patch: Result<Json<WarehousePatch>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Json(patch) = patch?;
    patch.validate().map_err(ApiError::bad_request)?;
    let warehouse = storage
        .update_warehouse(id, &patch)?
        .ok_or_else(|| ApiError::not_found("Warehouse not found"))?;
    info!(id, "warehouse updated");
    Ok(Json(json!({ "message": "Warehouse updated successfully", "warehouse": warehouse })))
}

pub async fn delete_warehouse(
    State(storage): State<Arc<Storage>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    if !storage.delete_warehouse(id)? {
        return Err(ApiError::not_found("Warehouse not found"));
    }
    info!(id, "warehouse deleted");
    Ok(Json(json!({ "message": "Warehouse deleted successfully" })))
}

// Monitoring

pub async fn package_telemetry(
    State(storage): State<Arc<Storage>>,
    Path(package_id): Path<String>,
) -> ApiResult<Json<PackageTelemetry>> {
    storage
        .get_telemetry(&package_id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Package not found"))
}

pub async fn drone_assignments(
    State(storage): State<Arc<Storage>>,
    Path(warehouse_name): Path<String>,
) -> ApiResult<Json<Vec<DroneAssignment>>> {
    Ok(Json(storage.assignments(&warehouse_name)?))
}
