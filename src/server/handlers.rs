// HTTP handlers for the registry API

use axum::{
    extract::{ConnectInfo, FromRequest, Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;

use super::error::ApiError;
use super::AppState;
use crate::config::constants::SERVICE_NAME;
use crate::registry::{Device, TransferRequest};

/// JSON body extractor whose rejections become [`ApiError::BadRequest`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Body of `POST /api/devices/register`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub device_id: String,
    pub license_code: String,
    #[serde(default)]
    pub public_ip: String,
    pub tcp_port: u16,
    /// Accepted so clients can echo a device record back; the registry
    /// stamps its own time.
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Body of `POST /api/devices/heartbeat`.
#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub device_id: String,
}

pub async fn health_check(State(state): State<AppState>) -> Response {
    let mut response = state.pool.get();
    response.insert("status", json!("healthy"));
    response.insert("service", json!(SERVICE_NAME));
    response.insert("timestamp", json!(Utc::now().timestamp()));
    Json(&*response).into_response()
}

pub async fn handle_stats(State(state): State<AppState>) -> Response {
    Json(state.service.stats()).into_response()
}

pub async fn handle_register(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<Response, ApiError> {
    if request.device_id.trim().is_empty() || request.license_code.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "device_id and license_code are required".into(),
        ));
    }

    let device = Device::new(
        request.device_id,
        request.license_code,
        request.public_ip,
        request.tcp_port,
    );
    let observed = connect_info.map(|ConnectInfo(addr)| addr);
    let device = state.service.register_device(device, observed);

    let mut response = state.pool.get();
    response.insert("success", json!(true));
    response.insert("message", json!("Device registered successfully"));
    response.insert("device_id", json!(device.device_id));
    Ok(Json(&*response).into_response())
}

pub async fn handle_heartbeat(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<HeartbeatRequest>,
) -> Response {
    let success = state.service.device_heartbeat(&request.device_id);

    let mut response = state.pool.get();
    response.insert("success", json!(success));
    Json(&*response).into_response()
}

pub async fn handle_license_holder(
    State(state): State<AppState>,
    Path(license_code): Path<String>,
) -> Result<Response, ApiError> {
    let device = state
        .service
        .license_holder(&license_code)
        .ok_or(ApiError::LicenseNotFound)?;

    let mut response = Json(device).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=10"),
    );
    Ok(response)
}

pub async fn handle_token_transfer(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TransferRequest>,
) -> Result<Response, ApiError> {
    state.service.request_token_transfer(&request)?;

    let mut response = state.pool.get();
    response.insert("success", json!(true));
    response.insert("message", json!("Transfer request recorded"));
    Ok(Json(&*response).into_response())
}

/// Prometheus scrape endpoint.
pub async fn metrics_endpoint(State(state): State<AppState>) -> Result<Response, ApiError> {
    let metrics = state.service.metrics();
    metrics.observe_registry(&state.service.stats());
    let body = metrics
        .encode_text()
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        body,
    )
        .into_response())
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
