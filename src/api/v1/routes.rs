/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - Bearer が必要な範囲は app 側で middleware::bearer_auth::apply を掛ける
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::me::me;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}
