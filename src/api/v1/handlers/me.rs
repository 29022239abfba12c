/*
 * Responsibility
 * - GET /me (認証済み principal の確認用)
 * - middleware → extractor の契約を end-to-end で使う唯一の protected handler
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::api::v1::extractors::AuthCtxExtractor;

pub async fn me(AuthCtxExtractor(ctx): AuthCtxExtractor) -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "user_id": ctx.user_id })))
}
