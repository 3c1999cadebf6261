//! Request handlers

use crate::api::{AppError, AppResult, AppState};
use crate::models::inference::AnalysisError;
use crate::types::{AnalysisResult, ConnectionRecord, ModelMetadata};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::info;
use uuid::Uuid;

/// Header a caller may use to supply its own request id
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    version: String,
    service: String,
    environment: String,
    uptime_seconds: f64,
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Red Sentinel ML API",
        "health": "/api/v1/health",
        "model_info": "/api/v1/model/info"
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = state.started_at.elapsed().as_secs_f64();

    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: state.engine.model_version(),
        service: state.engine.model_name(),
        environment: state.config.server.environment.clone(),
        uptime_seconds: (uptime * 100.0).round() / 100.0,
    })
}

pub async fn model_info(State(state): State<AppState>) -> Json<ModelMetadata> {
    Json(state.engine.model_info())
}

/// Analyze a connection record for threat patterns
pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<ConnectionRecord>, JsonRejection>,
) -> AppResult<Json<AnalysisResult>> {
    let header_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let Json(mut record) = payload.map_err(|rejection| {
        state.metrics.record_failure();
        AppError::from(rejection)
    })?;

    if record.request_id.is_empty() {
        record.request_id = header_id;
    }
    let request_id = record.request_id.clone();
    info!(request_id = %request_id, "New analysis request");

    let client_ip = client_ip(&headers, connect_info);
    let (source_ip, destination_port, protocol) = (
        record.source_ip.clone(),
        record.destination_port,
        record.protocol,
    );
    let logged_id = request_id.clone();
    tokio::spawn(async move {
        info!(
            request_id = %logged_id,
            client_ip = %client_ip,
            source_ip = %source_ip,
            destination_port,
            protocol = %protocol,
            "Analysis request received"
        );
    });

    let engine = state.engine.clone();
    let started = Instant::now();
    let task = tokio::task::spawn_blocking(move || engine.analyze(&record));
    let timeout = Duration::from_millis(state.config.server.request_timeout_ms);

    let result = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => {
            state.metrics.record_failure();
            return Err(AnalysisError::Internal {
                request_id,
                stage: "pipeline",
                message: join_err.to_string(),
            }
            .into());
        }
        Err(_) => {
            state.metrics.record_failure();
            return Err(AppError::Timeout { request_id });
        }
    };

    state.metrics.record_analysis(&result, started.elapsed());
    info!(
        request_id = %request_id,
        prediction = result.prediction,
        risk_level = %result.risk_level,
        "Analysis complete"
    );

    Ok(Json(result))
}

/// Extract the client address, preferring X-Forwarded-For
fn client_ip(headers: &HeaderMap, connect_info: Option<ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", "203.0.113.7, 10.0.0.1".parse().unwrap());
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();

        assert_eq!(client_ip(&headers, Some(ConnectInfo(addr))), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_falls_back() {
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();

        assert_eq!(client_ip(&HeaderMap::new(), Some(ConnectInfo(addr))), "127.0.0.1");
        assert_eq!(client_ip(&HeaderMap::new(), None), "unknown");
    }
}
