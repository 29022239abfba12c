/*
 * Responsibility
 * - middleware の公開インターフェース (re-export)
 * - pub fn bearer_auth::apply(...) など
 */
pub mod bearer_auth;
