mod upload;

use axum::{Json, Router, debug_handler, extract::{Multipart, Path, Query, State}, routing::get};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::chats::Pagination;
use crate::config::Settings;
use crate::profiles;
use crate::{AppError, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(read_posts).post(create_post))
        .route("/posts/{post_id}", get(read_post))
}

#[derive(Debug, Serialize)]
pub struct PostPublic {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub text: Option<String>,
    pub media_urls: Vec<String>,
}

/// Multipart form: `text`, `profile_id`, and any number of `files` parts.
/// Image and video uploads are saved under the uploads directory; parts
/// with any other content type are skipped.
#[debug_handler(state = AppState)]
pub async fn create_post(
    State(db_pool): State<SqlitePool>,
    State(settings): State<Settings>,
    mut multipart: Multipart,
) -> AppResult<Json<PostPublic>> {
    let mut text: Option<String> = None;
    let mut profile_id: Option<String> = None;
    let mut media_urls = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("text") => text = Some(field.text().await?),
            Some("profile_id") => profile_id = Some(field.text().await?),
            Some("files") => {
                let filename = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);
                let data = field.bytes().await?;
                if let Some(url) = upload::save_upload(
                    &settings.uploads_dir,
                    filename.as_deref(),
                    content_type.as_deref(),
                    &data,
                )
                .await?
                {
                    media_urls.push(url);
                }
            }
            _ => {}
        }
    }

    let text = text.ok_or_else(|| AppError::unprocessable("text field is required"))?;
    let profile_id = profile_id
        .ok_or_else(|| AppError::unprocessable("profile_id field is required"))?;
    let profile_id = Uuid::parse_str(&profile_id)
        .map_err(|_| AppError::unprocessable("Invalid profile_id format"))?;

    profiles::fetch_profile(&db_pool, profile_id).await?;

    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO posts (id,profile_id,text,media_urls) VALUES (?,?,?,?)")
        .bind(id.to_string())
        .bind(profile_id.to_string())
        .bind(&text)
        .bind(serde_json::to_string(&media_urls)?)
        .execute(&db_pool)
        .await?;

    Ok(Json(PostPublic {
        id,
        profile_id,
        text: Some(text),
        media_urls,
    }))
}

#[debug_handler]
pub async fn read_posts(
    State(db_pool): State<SqlitePool>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<PostPublic>>> {
    let rows: Vec<(String, String, Option<String>, String)> =
        sqlx::query_as("SELECT id,profile_id,text,media_urls FROM posts LIMIT ? OFFSET ?")
            .bind(pagination.limit()?)
            .bind(pagination.offset)
            .fetch_all(&db_pool)
            .await?;

    let posts = rows
        .into_iter()
        .map(row_to_public)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(posts))
}

#[debug_handler]
pub async fn read_post(
    State(db_pool): State<SqlitePool>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<PostPublic>> {
    let row: Option<(String, String, Option<String>, String)> =
        sqlx::query_as("SELECT id,profile_id,text,media_urls FROM posts WHERE id=?")
            .bind(post_id.to_string())
            .fetch_optional(&db_pool)
            .await?;

    let row = row.ok_or_else(|| AppError::not_found("Post not found"))?;
    Ok(Json(row_to_public(row)?))
}

pub(crate) fn row_to_public(
    (id, profile_id, text, media_urls): (String, String, Option<String>, String),
) -> AppResult<PostPublic> {
    Ok(PostPublic {
        id: Uuid::parse_str(&id).map_err(anyhow::Error::from)?,
        profile_id: Uuid::parse_str(&profile_id).map_err(anyhow::Error::from)?,
        text,
        media_urls: serde_json::from_str(&media_urls)?,
    })
}
