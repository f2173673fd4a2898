use sqlx::SqlitePool;

/// Creates every table the backend relies on. Idempotent; runs at startup
/// so a fresh database file works out of the box.
pub async fn init_schema(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            bio TEXT,
            avatar TEXT,
            posts_count INTEGER NOT NULL DEFAULT 0,
            followers_count INTEGER NOT NULL DEFAULT 0,
            following_count INTEGER NOT NULL DEFAULT 0
        )",
        "CREATE TABLE IF NOT EXISTS chats (
            id TEXT PRIMARY KEY,
            name TEXT
        )",
        "CREATE TABLE IF NOT EXISTS profile_chat_links (
            profile_id TEXT NOT NULL,
            chat_id TEXT NOT NULL,
            PRIMARY KEY (profile_id, chat_id)
        )",
        "CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            chat_id TEXT NOT NULL,
            profile_id TEXT NOT NULL,
            text TEXT NOT NULL,
            media_file_ids TEXT NOT NULL DEFAULT '[]'
        )",
        "CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            profile_id TEXT NOT NULL,
            text TEXT,
            media_urls TEXT NOT NULL DEFAULT '[]'
        )",
        "CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL,
            profile_id TEXT NOT NULL,
            parent_id TEXT,
            text TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            is_active INTEGER NOT NULL DEFAULT 1,
            profile_id TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS oauth_accounts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            oauth_provider TEXT NOT NULL,
            provider_user_id TEXT NOT NULL,
            access_token TEXT,
            refresh_token TEXT,
            expires_at INTEGER,
            token_type TEXT,
            scope TEXT,
            UNIQUE (oauth_provider, provider_user_id)
        )",
    ];

    for statement in statements {
        sqlx::query(statement).execute(db_pool).await?;
    }

    Ok(())
}
