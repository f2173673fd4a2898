use axum::{debug_handler, extract::{Query, State}, response::Redirect};
use oauth2::{CsrfToken, PkceCodeChallenge, Scope};
use serde::Deserialize;
use tower_sessions::Session;

use crate::session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL};
use crate::{AppResult, AppState};

use super::GoogleClient;

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) return_url: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    State(google): State<GoogleClient>,
    session: Session,
) -> AppResult<Redirect> {
    let (pkce_code_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (authorize_url, csrf_state) = google
        .oauth()
        .authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new("openid".to_string()))
        .add_scope(Scope::new("email".to_string()))
        .add_scope(Scope::new("profile".to_string()))
        .set_pkce_challenge(pkce_code_challenge)
        .url();

    session.insert(CSRF_STATE, csrf_state.secret()).await?;
    session.insert(PKCE_VERIFIER, pkce_verifier.secret()).await?;
    if let Some(return_url) = return_url {
        session.insert(RETURN_URL, return_url).await?;
    }

    Ok(Redirect::to(authorize_url.as_str()))
}
