mod crud;
mod message;
mod registry;
mod session;
mod store;
mod ws;

use axum::{Router, routing::{get, post}};

use crate::AppState;

pub use crud::Pagination;
pub use message::{InboundMessage, Message, MessagePublic, PayloadError};
pub use registry::{ConnectionId, ConnectionRegistry, Outbound};
pub use session::LoopOutcome;
pub use store::{MessageStore, SqliteMessageStore, StorageError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chats", post(crud::create_chat).get(crud::read_chats))
        .route("/chats/{chat_id}", get(crud::read_chat))
        .route("/chats/{chat_id}/messages", get(crud::read_chat_messages))
        .route("/messages", post(crud::create_message).get(crud::read_messages))
        .route("/ws/{chat_id}", get(ws::chat_ws))
}
