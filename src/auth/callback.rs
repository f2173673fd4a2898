use axum::{debug_handler, extract::{Query, State}, response::Redirect};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL, USER_ID};
use crate::{AppResult, AppState, GetField};

use super::client::{self, GoogleClient};

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn callback(
    Query(CallbackQuery { state, code }): Query<CallbackQuery>,
    State(db_pool): State<SqlitePool>,
    State(google): State<GoogleClient>,
    session: Session,
) -> AppResult<Redirect> {
    let state = CsrfToken::new(state.ok_or("OAuth: without state")?);
    let code = AuthorizationCode::new(code.ok_or("OAuth: without code")?);

    let Some(stored_state) = session.get::<String>(CSRF_STATE).await? else {
        return Err("no csrf_state")?;
    };
    if state.secret().as_str() != stored_state.as_str() {
        return Err("csrf tokens don't match")?;
    }

    let Some(pkce_verifier) = session.get::<String>(PKCE_VERIFIER).await? else {
        return Err("no pkce_verifier")?;
    };

    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = google
        .oauth()
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let userinfo: serde_json::Value = http_client
        .get(client::USERINFO_URL)
        .bearer_auth(token_result.access_token().secret())
        .send()
        .await?
        .json()
        .await?;

    let provider_user_id = userinfo.get_str_field("id")?;
    let email = userinfo.get_str_field("email")?;

    let tokens = TokenUpdate {
        access_token: token_result.access_token().secret().clone(),
        refresh_token: token_result.refresh_token().map(|t| t.secret().clone()),
        expires_at: token_result.expires_in().map(|expires_in| {
            (time::OffsetDateTime::now_utc() + expires_in).unix_timestamp()
        }),
        token_type: "bearer".to_owned(),
        scope: token_result
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" ")),
    };

    let user_id = upsert_user(&db_pool, &provider_user_id, &email, tokens).await?;
    session.insert(USER_ID, user_id.to_string()).await?;

    tracing::info!(%user_id, email, "signed in");

    let return_url: Option<String> = session.get(RETURN_URL).await?;
    Ok(Redirect::to(return_url.as_deref().unwrap_or("/")))
}

struct TokenUpdate {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    token_type: String,
    scope: Option<String>,
}

/// Finds or creates the user behind a Google account and records the
/// freshest tokens. Three cases: the OAuth account is already linked, the
/// email belongs to an existing user, or this is a brand-new user (which
/// also gets a profile named after the email).
async fn upsert_user(
    db_pool: &SqlitePool,
    provider_user_id: &str,
    email: &str,
    tokens: TokenUpdate,
) -> AppResult<Uuid> {
    let linked: Option<(String,)> = sqlx::query_as(
        "SELECT user_id FROM oauth_accounts WHERE oauth_provider=? AND provider_user_id=?",
    )
    .bind(client::PROVIDER)
    .bind(provider_user_id)
    .fetch_optional(db_pool)
    .await?;

    if let Some((user_id,)) = linked {
        sqlx::query(
            "UPDATE oauth_accounts SET access_token=?, refresh_token=?, expires_at=? WHERE oauth_provider=? AND provider_user_id=?",
        )
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(tokens.expires_at)
        .bind(client::PROVIDER)
        .bind(provider_user_id)
        .execute(db_pool)
        .await?;

        return Ok(Uuid::parse_str(&user_id).map_err(anyhow::Error::from)?);
    }

    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email=?")
        .bind(email)
        .fetch_optional(db_pool)
        .await?;

    let user_id = match existing {
        Some((user_id,)) => {
            tracing::info!(email, "linking google account to existing user");
            Uuid::parse_str(&user_id).map_err(anyhow::Error::from)?
        }
        None => {
            let profile_id = Uuid::now_v7();
            sqlx::query("INSERT INTO profiles (id,name) VALUES (?,?)")
                .bind(profile_id.to_string())
                .bind(email)
                .execute(db_pool)
                .await?;

            let user_id = Uuid::now_v7();
            sqlx::query("INSERT INTO users (id,email,is_active,profile_id) VALUES (?,?,1,?)")
                .bind(user_id.to_string())
                .bind(email)
                .bind(profile_id.to_string())
                .execute(db_pool)
                .await?;

            tracing::info!(email, "created new user");
            user_id
        }
    };

    sqlx::query(
        "INSERT INTO oauth_accounts (id,user_id,oauth_provider,provider_user_id,access_token,refresh_token,expires_at,token_type,scope) VALUES (?,?,?,?,?,?,?,?,?)",
    )
    .bind(Uuid::now_v7().to_string())
    .bind(user_id.to_string())
    .bind(client::PROVIDER)
    .bind(provider_user_id)
    .bind(&tokens.access_token)
    .bind(&tokens.refresh_token)
    .bind(tokens.expires_at)
    .bind(&tokens.token_type)
    .bind(&tokens.scope)
    .execute(db_pool)
    .await?;

    Ok(user_id)
}
