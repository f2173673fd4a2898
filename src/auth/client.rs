use oauth2::{AuthUrl, ClientId, ClientSecret, RedirectUrl, TokenUrl, basic::BasicClient};

use crate::config::Settings;

type ConfiguredClient = oauth2::Client<oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>, oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardTokenIntrospectionResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardRevocableToken, oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>, oauth2::EndpointSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointSet>;

pub const PROVIDER: &str = "google";
pub const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Google OAuth client configured for the authorization-code + PKCE flow.
#[derive(Clone)]
pub struct GoogleClient {
    inner: ConfiguredClient,
}

impl GoogleClient {
    pub fn new(settings: &Settings) -> anyhow::Result<GoogleClient> {
        let client_id = ClientId::new(settings.google_client_id.clone());
        let client_secret = ClientSecret::new(settings.google_client_secret.clone());

        let auth_url = AuthUrl::new("https://accounts.google.com/o/oauth2/auth".to_string())?;
        let token_url = TokenUrl::new("https://oauth2.googleapis.com/token".to_string())?;
        let redirect_url = RedirectUrl::new(settings.google_redirect_uri.clone())?;

        Ok(GoogleClient {
            inner: BasicClient::new(client_id)
                .set_client_secret(client_secret)
                .set_auth_uri(auth_url)
                .set_token_uri(token_url)
                .set_redirect_uri(redirect_url),
        })
    }

    pub fn oauth(&self) -> &ConfiguredClient {
        &self.inner
    }
}
