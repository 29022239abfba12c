/*
 * Responsibility
 * - GET /health (疎通用)
 * - middleware を通さない (未認証で叩ける)
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
