use axum::{Json, Router, debug_handler, extract::State, routing::get};
use bapi::chats::ConnectionRegistry;
use bapi::config::Settings;
use bapi::{AppResult, AppState, auth, chats, comments, db, posts, profiles};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(&settings.database_url)
        .await?;
    db::init_schema(&db_pool).await?;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(
            settings.session_expire_hours,
        )));

    let app_state = AppState {
        db_pool,
        google: auth::GoogleClient::new(&settings)?,
        registry: ConnectionRegistry::new(),
        settings: settings.clone(),
    };

    let app = Router::new()
        .route("/", get(index))
        .merge(auth::router())
        .merge(profiles::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(chats::router())
        .nest_service("/uploads", ServeDir::new(&settings.uploads_dir))
        .with_state(app_state)
        .layer(session_layer)
        .layer(CorsLayer::permissive());

    tracing::info!("{} listening on {}", settings.app_name, settings.bind_addr);
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[debug_handler(state = AppState)]
async fn index(State(settings): State<Settings>) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(serde_json::json!({ "app": settings.app_name })))
}
