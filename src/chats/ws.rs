use axum::{debug_handler, extract::{Path, State, WebSocketUpgrade}, response::Response};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppError, AppResult};

use super::registry::ConnectionRegistry;
use super::session;
use super::store::{MessageStore, SqliteMessageStore};

#[debug_handler(state = crate::AppState)]
pub async fn chat_ws(
    Path(chat_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    State(registry): State<ConnectionRegistry>,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let store = SqliteMessageStore::new(db_pool);

    // Unknown chats are rejected before the upgrade, matching the 404 the
    // REST endpoints return for them.
    if !store.chat_exists(chat_id).await? {
        return Err(AppError::not_found("Chat not found"));
    }

    Ok(ws.on_upgrade(async move |socket| {
        session::run(socket, registry, store, chat_id).await;
    }))
}
