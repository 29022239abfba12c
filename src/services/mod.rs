/*
 * Responsibility
 * - ドメインサービスの公開 (auth など)
 * - HTTP 層には依存しない
 */
pub mod auth;
