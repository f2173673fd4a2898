use axum::{Json, debug_handler, extract::{Path, Query, State}};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppError, AppResult};

use super::message::MessagePublic;
use super::store::{MessageStore, SqliteMessageStore};

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub offset: i64,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Mirrors the API contract: limit defaults to 100 and may not exceed it.
    pub fn limit(&self) -> AppResult<i64> {
        match self.limit {
            None => Ok(100),
            Some(limit) if (0..=100).contains(&limit) => Ok(limit),
            Some(limit) => Err(AppError::unprocessable(format!(
                "limit must be between 0 and 100, got {limit}"
            ))),
        }
    }
}

#[derive(Serialize)]
pub struct ChatPublic {
    pub id: Uuid,
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatCreate {
    pub name: Option<String>,
    pub profile_ids: Vec<Uuid>,
}

#[debug_handler]
pub async fn create_chat(
    State(db_pool): State<SqlitePool>,
    Json(ChatCreate { name, profile_ids }): Json<ChatCreate>,
) -> AppResult<Json<ChatPublic>> {
    if profile_ids.is_empty() {
        return Err(AppError::bad_request("At least one profile_id is required"));
    }

    for profile_id in &profile_ids {
        let known: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM profiles WHERE id=?")
            .bind(profile_id.to_string())
            .fetch_optional(&db_pool)
            .await?;
        if known.is_none() {
            return Err(AppError::not_found(format!(
                "Profile with id {profile_id} not found"
            )));
        }
    }

    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO chats (id,name) VALUES (?,?)")
        .bind(id.to_string())
        .bind(&name)
        .execute(&db_pool)
        .await?;

    for profile_id in &profile_ids {
        sqlx::query("INSERT INTO profile_chat_links (profile_id,chat_id) VALUES (?,?)")
            .bind(profile_id.to_string())
            .bind(id.to_string())
            .execute(&db_pool)
            .await?;
    }

    Ok(Json(ChatPublic { id, name }))
}

#[debug_handler]
pub async fn read_chats(
    State(db_pool): State<SqlitePool>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<ChatPublic>>> {
    let rows: Vec<(String, Option<String>)> =
        sqlx::query_as("SELECT id,name FROM chats LIMIT ? OFFSET ?")
            .bind(pagination.limit()?)
            .bind(pagination.offset)
            .fetch_all(&db_pool)
            .await?;

    let chats = rows
        .into_iter()
        .map(|(id, name)| Ok(ChatPublic { id: Uuid::parse_str(&id)?, name }))
        .collect::<Result<_, uuid::Error>>()
        .map_err(anyhow::Error::from)?;

    Ok(Json(chats))
}

#[debug_handler]
pub async fn read_chat(
    State(db_pool): State<SqlitePool>,
    Path(chat_id): Path<Uuid>,
) -> AppResult<Json<ChatPublic>> {
    let Some((name,)): Option<(Option<String>,)> =
        sqlx::query_as("SELECT name FROM chats WHERE id=?")
            .bind(chat_id.to_string())
            .fetch_optional(&db_pool)
            .await?
    else {
        return Err(AppError::not_found("Chat not found"));
    };

    Ok(Json(ChatPublic { id: chat_id, name }))
}

#[derive(Deserialize)]
pub struct MessageCreate {
    pub text: String,
    pub chat_id: Uuid,
    pub profile_id: Uuid,
}

#[debug_handler]
pub async fn create_message(
    State(db_pool): State<SqlitePool>,
    Json(MessageCreate { text, chat_id, profile_id }): Json<MessageCreate>,
) -> AppResult<Json<MessagePublic>> {
    let store = SqliteMessageStore::new(db_pool);
    if !store.chat_exists(chat_id).await? {
        return Err(AppError::not_found(format!(
            "Chat with id {chat_id} not found"
        )));
    }

    let message = store.create(chat_id, profile_id, text, Vec::new()).await?;
    Ok(Json(message.public()))
}

#[debug_handler]
pub async fn read_messages(
    State(db_pool): State<SqlitePool>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<MessagePublic>>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT id,text FROM messages LIMIT ? OFFSET ?")
            .bind(pagination.limit()?)
            .bind(pagination.offset)
            .fetch_all(&db_pool)
            .await?;

    rows_to_public(rows).map(Json)
}

#[debug_handler]
pub async fn read_chat_messages(
    State(db_pool): State<SqlitePool>,
    Path(chat_id): Path<Uuid>,
) -> AppResult<Json<Vec<MessagePublic>>> {
    let store = SqliteMessageStore::new(db_pool.clone());
    if !store.chat_exists(chat_id).await? {
        return Err(AppError::not_found("Chat not found"));
    }

    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT id,text FROM messages WHERE chat_id=?")
            .bind(chat_id.to_string())
            .fetch_all(&db_pool)
            .await?;

    rows_to_public(rows).map(Json)
}

fn rows_to_public(rows: Vec<(String, String)>) -> AppResult<Vec<MessagePublic>> {
    rows.into_iter()
        .map(|(id, text)| Ok(MessagePublic { id: Uuid::parse_str(&id)?, text }))
        .collect::<Result<_, uuid::Error>>()
        .map_err(|err| anyhow::Error::from(err).into())
}
