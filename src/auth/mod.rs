mod callback;
mod client;
mod login;
mod logout;

use axum::{Router, routing::get};

use crate::AppState;

pub use client::GoogleClient;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login/google", get(login::login))
        .route("/auth/callback/google", get(callback::callback))
        .route("/auth/logout", get(logout::logout))
}
