use axum::{Json, Router, debug_handler, extract::{Path, Query, State}, routing::{get, post}};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::chats::Pagination;
use crate::{AppError, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", post(create_comment))
        .route("/comments/{comment_id}", get(read_comment).delete(delete_comment))
        .route("/comments/post/{post_id}", get(read_comments_for_post))
}

#[derive(Serialize)]
pub struct CommentPublic {
    pub id: Uuid,
    pub post_id: Uuid,
    pub profile_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub text: String,
}

#[derive(Deserialize)]
pub struct CommentCreate {
    pub text: String,
    pub post_id: Uuid,
    pub profile_id: Uuid,
    pub parent_id: Option<Uuid>,
}

#[debug_handler]
pub async fn create_comment(
    State(db_pool): State<SqlitePool>,
    Json(comment): Json<CommentCreate>,
) -> AppResult<Json<CommentPublic>> {
    let post: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM posts WHERE id=?")
        .bind(comment.post_id.to_string())
        .fetch_optional(&db_pool)
        .await?;
    if post.is_none() {
        return Err(AppError::not_found("Post not found"));
    }

    let profile: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM profiles WHERE id=?")
        .bind(comment.profile_id.to_string())
        .fetch_optional(&db_pool)
        .await?;
    if profile.is_none() {
        return Err(AppError::not_found("Profile not found"));
    }

    if let Some(parent_id) = comment.parent_id {
        let parent: Option<(String,)> = sqlx::query_as("SELECT post_id FROM comments WHERE id=?")
            .bind(parent_id.to_string())
            .fetch_optional(&db_pool)
            .await?;
        let Some((parent_post_id,)) = parent else {
            return Err(AppError::not_found("Parent comment not found"));
        };
        if parent_post_id != comment.post_id.to_string() {
            return Err(AppError::bad_request(
                "Parent comment does not belong to the same post",
            ));
        }
    }

    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO comments (id,post_id,profile_id,parent_id,text) VALUES (?,?,?,?,?)")
        .bind(id.to_string())
        .bind(comment.post_id.to_string())
        .bind(comment.profile_id.to_string())
        .bind(comment.parent_id.as_ref().map(Uuid::to_string))
        .bind(&comment.text)
        .execute(&db_pool)
        .await?;

    Ok(Json(CommentPublic {
        id,
        post_id: comment.post_id,
        profile_id: comment.profile_id,
        parent_id: comment.parent_id,
        text: comment.text,
    }))
}

#[debug_handler]
pub async fn read_comment(
    State(db_pool): State<SqlitePool>,
    Path(comment_id): Path<Uuid>,
) -> AppResult<Json<CommentPublic>> {
    let row: Option<(String, String, String, Option<String>, String)> =
        sqlx::query_as("SELECT id,post_id,profile_id,parent_id,text FROM comments WHERE id=?")
            .bind(comment_id.to_string())
            .fetch_optional(&db_pool)
            .await?;

    let row = row.ok_or_else(|| AppError::not_found("Comment not found"))?;
    Ok(Json(row_to_public(row)?))
}

#[debug_handler]
pub async fn read_comments_for_post(
    State(db_pool): State<SqlitePool>,
    Path(post_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<CommentPublic>>> {
    let post: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM posts WHERE id=?")
        .bind(post_id.to_string())
        .fetch_optional(&db_pool)
        .await?;
    if post.is_none() {
        return Err(AppError::not_found("Post not found"));
    }

    let rows: Vec<(String, String, String, Option<String>, String)> = sqlx::query_as(
        "SELECT id,post_id,profile_id,parent_id,text FROM comments WHERE post_id=? LIMIT ? OFFSET ?",
    )
    .bind(post_id.to_string())
    .bind(pagination.limit()?)
    .bind(pagination.offset)
    .fetch_all(&db_pool)
    .await?;

    let comments = rows
        .into_iter()
        .map(row_to_public)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(comments))
}

#[debug_handler]
pub async fn delete_comment(
    State(db_pool): State<SqlitePool>,
    Path(comment_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM comments WHERE id=?")
        .bind(comment_id.to_string())
        .fetch_optional(&db_pool)
        .await?;
    if row.is_none() {
        return Err(AppError::not_found("Comment not found"));
    }

    sqlx::query("DELETE FROM comments WHERE id=?")
        .bind(comment_id.to_string())
        .execute(&db_pool)
        .await?;

    Ok(Json(serde_json::json!({ "ok": true })))
}

fn row_to_public(
    (id, post_id, profile_id, parent_id, text): (String, String, String, Option<String>, String),
) -> AppResult<CommentPublic> {
    Ok(CommentPublic {
        id: Uuid::parse_str(&id).map_err(anyhow::Error::from)?,
        post_id: Uuid::parse_str(&post_id).map_err(anyhow::Error::from)?,
        profile_id: Uuid::parse_str(&profile_id).map_err(anyhow::Error::from)?,
        parent_id: match parent_id {
            Some(parent_id) => Some(Uuid::parse_str(&parent_id).map_err(anyhow::Error::from)?),
            None => None,
        },
        text,
    })
}
