use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, RedirectUrl, RevocationUrl, TokenUrl};

use crate::app_state::AppConfig;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_REVOCATION_URL: &str = "https://oauth2.googleapis.com/revoke";

/// Generates an oauth client for Google.
pub fn oauth_client(config: &AppConfig) -> BasicClient {
    BasicClient::new(
        ClientId::new(config.google_client_id.clone()),
        Some(ClientSecret::new(config.google_client_secret.clone())),
        AuthUrl::new(GOOGLE_AUTH_URL.to_string()).unwrap(),
        Some(TokenUrl::new(GOOGLE_TOKEN_URL.to_string()).unwrap()),
    )
    // Set the URL the user will be redirected to after the authorization process.
    .set_redirect_uri(
        RedirectUrl::new(format!("{}/auth/google/callback", config.public_url)).unwrap(),
    )
    .set_revocation_uri(RevocationUrl::new(GOOGLE_REVOCATION_URL.to_string()).unwrap())
}
