//! HTTP surface
//!
//! - `GET /health`
//! - `GET /parse?url=...` single URL, status per response mode
//! - `POST /parse` with `{"urls": [...]}`, always 200 when well-formed

use crate::error::ValidationError;
use crate::gateway::Gateway;
use crate::types::BatchResponse;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, USER_AGENT};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct ParseQuery {
    url: Option<String>,
}

/// Build the application router
pub fn router(gateway: Arc<Gateway>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, CACHE_CONTROL]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/parse", get(parse_handler).post(batch_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(gateway)
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "ok": true,
        "time": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

async fn parse_handler(
    State(gateway): State<Arc<Gateway>>,
    Query(query): Query<ParseQuery>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    info!(
        url = query.url.as_deref().unwrap_or_default(),
        ip = ?connect_info.map(|ConnectInfo(addr)| addr.ip()),
        user_agent = headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default(),
        "GET /parse"
    );

    match gateway.parse(query.url.as_deref()).await {
        Ok(rendered) => rendered.into_response(),
        Err(err) => {
            warn!(error = %err, "rejected parse request");
            err.into_response()
        }
    }
}

async fn batch_handler(
    State(gateway): State<Arc<Gateway>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(
            rejection @ (JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_)),
        ) => {
            warn!(error = %rejection.body_text(), "rejected batch body");
            return ValidationError::MalformedJson(rejection.body_text()).into_response();
        }
        // Content type (415) and body limit (413) keep axum's own status
        Err(rejection) => return rejection.into_response(),
    };

    match gateway.parse_batch(&payload).await {
        Ok(results) => Json(BatchResponse { results }).into_response(),
        Err(err) => {
            warn!(error = %err, "rejected batch request");
            err.into_response()
        }
    }
}
