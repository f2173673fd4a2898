use axum::{Json, Router, debug_handler, extract::{Path, Query, State}, routing::{get, patch}};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::chats::Pagination;
use crate::posts::{self, PostPublic};
use crate::{AppError, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profiles", get(read_profiles).post(create_profile))
        .route("/profiles/{profile_id}", patch(update_profile).get(read_profile).delete(delete_profile))
        .route("/profiles/{profile_id}/posts", get(read_profile_posts))
        .route("/users/{name}", get(read_user_by_name))
}

#[derive(Serialize, sqlx::FromRow)]
pub struct Profile {
    #[sqlx(try_from = "String")]
    pub id: ProfileId,
    pub name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub posts_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
}

/// Newtype so sqlx can decode the TEXT primary key into a Uuid via FromRow.
#[derive(Serialize)]
#[serde(transparent)]
pub struct ProfileId(pub Uuid);

impl TryFrom<String> for ProfileId {
    type Error = uuid::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Self(Uuid::parse_str(&value)?))
    }
}

#[derive(Deserialize)]
pub struct ProfileCreate {
    pub name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    #[serde(default)]
    pub posts_count: i64,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
}

#[derive(Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
}

#[debug_handler]
pub async fn create_profile(
    State(db_pool): State<SqlitePool>,
    Json(profile): Json<ProfileCreate>,
) -> AppResult<Json<Profile>> {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO profiles (id,name,bio,avatar,posts_count,followers_count,following_count) VALUES (?,?,?,?,?,?,?)")
        .bind(id.to_string())
        .bind(&profile.name)
        .bind(&profile.bio)
        .bind(&profile.avatar)
        .bind(profile.posts_count)
        .bind(profile.followers_count)
        .bind(profile.following_count)
        .execute(&db_pool)
        .await?;

    Ok(Json(Profile {
        id: ProfileId(id),
        name: profile.name,
        bio: profile.bio,
        avatar: profile.avatar,
        posts_count: profile.posts_count,
        followers_count: profile.followers_count,
        following_count: profile.following_count,
    }))
}

#[debug_handler]
pub async fn read_profiles(
    State(db_pool): State<SqlitePool>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<Profile>>> {
    let profiles = sqlx::query_as::<_, Profile>(
        "SELECT id,name,bio,avatar,posts_count,followers_count,following_count FROM profiles LIMIT ? OFFSET ?",
    )
    .bind(pagination.limit()?)
    .bind(pagination.offset)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(profiles))
}

#[debug_handler]
pub async fn read_profile(
    State(db_pool): State<SqlitePool>,
    Path(profile_id): Path<Uuid>,
) -> AppResult<Json<Profile>> {
    fetch_profile(&db_pool, profile_id).await.map(Json)
}

#[debug_handler]
pub async fn read_user_by_name(
    State(db_pool): State<SqlitePool>,
    Path(name): Path<String>,
) -> AppResult<Json<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        "SELECT id,name,bio,avatar,posts_count,followers_count,following_count FROM profiles WHERE name=?",
    )
    .bind(&name)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Profile not found"))?;

    Ok(Json(profile))
}

#[debug_handler]
pub async fn update_profile(
    State(db_pool): State<SqlitePool>,
    Path(profile_id): Path<Uuid>,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<Profile>> {
    // 404 before touching anything.
    fetch_profile(&db_pool, profile_id).await?;

    if let Some(name) = &update.name {
        sqlx::query("UPDATE profiles SET name=? WHERE id=?")
            .bind(name)
            .bind(profile_id.to_string())
            .execute(&db_pool)
            .await?;
    }

    fetch_profile(&db_pool, profile_id).await.map(Json)
}

#[debug_handler]
pub async fn delete_profile(
    State(db_pool): State<SqlitePool>,
    Path(profile_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    fetch_profile(&db_pool, profile_id).await?;

    sqlx::query("DELETE FROM profiles WHERE id=?")
        .bind(profile_id.to_string())
        .execute(&db_pool)
        .await?;

    Ok(Json(serde_json::json!({ "ok": true })))
}

#[debug_handler]
pub async fn read_profile_posts(
    State(db_pool): State<SqlitePool>,
    Path(profile_id): Path<Uuid>,
) -> AppResult<Json<Vec<PostPublic>>> {
    fetch_profile(&db_pool, profile_id).await?;

    let rows: Vec<(String, String, Option<String>, String)> =
        sqlx::query_as("SELECT id,profile_id,text,media_urls FROM posts WHERE profile_id=?")
            .bind(profile_id.to_string())
            .fetch_all(&db_pool)
            .await?;

    let posts = rows
        .into_iter()
        .map(posts::row_to_public)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(posts))
}

pub(crate) async fn fetch_profile(db_pool: &SqlitePool, profile_id: Uuid) -> AppResult<Profile> {
    sqlx::query_as::<_, Profile>(
        "SELECT id,name,bio,avatar,posts_count,followers_count,following_count FROM profiles WHERE id=?",
    )
    .bind(profile_id.to_string())
    .fetch_optional(db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Profile not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init_schema(&pool).await.unwrap();
        pool
    }

    async fn insert_profile(pool: &SqlitePool, name: &str) -> Uuid {
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO profiles (id,name) VALUES (?,?)")
            .bind(id.to_string())
            .bind(name)
            .execute(pool)
            .await
            .unwrap();
        id
    }

    async fn insert_post(pool: &SqlitePool, profile_id: Uuid, text: &str) {
        sqlx::query("INSERT INTO posts (id,profile_id,text,media_urls) VALUES (?,?,?,'[]')")
            .bind(Uuid::now_v7().to_string())
            .bind(profile_id.to_string())
            .bind(text)
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn profile_posts_lists_only_that_profiles_posts() {
        let pool = test_pool().await;
        let author = insert_profile(&pool, "author").await;
        let other = insert_profile(&pool, "other").await;
        insert_post(&pool, author, "first").await;
        insert_post(&pool, author, "second").await;
        insert_post(&pool, other, "not mine").await;

        let Json(posts) = read_profile_posts(State(pool), Path(author)).await.unwrap();

        let texts: Vec<_> = posts.iter().map(|p| p.text.as_deref().unwrap()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(posts.iter().all(|p| p.profile_id == author));
    }

    #[tokio::test]
    async fn profile_posts_is_404_for_an_unknown_profile() {
        let pool = test_pool().await;

        let err = read_profile_posts(State(pool), Path(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
