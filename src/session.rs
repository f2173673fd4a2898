pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const USER_ID: &str = "user_id";
pub const RETURN_URL: &str = "return_url";
