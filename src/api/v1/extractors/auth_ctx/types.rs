/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - トークンの検証ロジックは middleware/services 側の責務
 * - ここは「型（契約）」として固定化する
 */

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `user_id` は解決済みの principal id（発行元により形式が異なるため String のまま持つ）
/// - リクエスト終了とともに破棄される。永続化しない。
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub user_id: String,
}

impl AuthCtx {
    pub fn new(user_id: String) -> Self {
        Self { user_id }
    }
}
