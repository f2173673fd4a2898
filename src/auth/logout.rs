use axum::{Json, debug_handler};
use tower_sessions::Session;

use crate::AppResult;

/// Signs the caller out by discarding their session. Safe to call when
/// nobody is signed in.
#[debug_handler]
pub(crate) async fn logout(session: Session) -> AppResult<Json<serde_json::Value>> {
    session.clear().await;
    Ok(Json(serde_json::json!({ "ok": true })))
}
