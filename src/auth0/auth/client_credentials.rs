//! Authorize using the client credentials flow.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::error;

use crate::auth0::utils::{check_status, endpoint, InvalidBaseUrl, ServerError};

use super::TOKEN_SAFETY_MARGIN;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("server: {0}")]
    Server(#[from] ServerError),
    #[error(transparent)]
    Url(#[from] InvalidBaseUrl),
}

pub struct ClientCredentials {
    pub client: reqwest::Client,
    /// Tenant origin, e.g. `https://tenant.eu.auth0.com/`.
    pub base_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub audience: String,
    /// Space separated; omitted from the request when empty.
    pub scope: String,
}

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    scope: &'a str,
}

impl ClientCredentials {
    /// Perform the client credentials flow.
    pub async fn perform(&self) -> Result<AuthResponse, Error> {
        let url = endpoint(&self.base_url, ["oauth", "token"])?;

        let params = AuthRequest {
            grant_type: "client_credentials",
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            audience: &self.audience,
            scope: &self.scope,
        };

        let res = self.client.post(url).json(&params).send().await?;
        let res = check_status(res).await.inspect_err(|err| {
            error!(
                message = "Token exchange rejected",
                status = err.status_code,
                body = %err.body,
            );
        })?;
        let login_response = res.json().await?;
        Ok(login_response)
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    /// The requested access token.
    access_token: String,
    /// The amount of time that an access token is valid (in seconds).
    expires_in: u64,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub access_token: String,
    pub expires_at: Instant,
}

impl Token {
    /// Build a token fetched at `fetched_at`, expiring [`TOKEN_SAFETY_MARGIN`]
    /// ahead of what the provider announced.
    pub fn from_response(auth: AuthResponse, fetched_at: Instant) -> Self {
        let AuthResponse {
            access_token,
            expires_in,
        } = auth;
        let expires_in =
            std::time::Duration::from_secs(expires_in).saturating_sub(TOKEN_SAFETY_MARGIN);
        Self {
            access_token,
            expires_at: fetched_at + expires_in,
        }
    }
}

impl From<AuthResponse> for Token {
    fn from(auth: AuthResponse) -> Self {
        Self::from_response(auth, Instant::now())
    }
}

#[async_trait::async_trait]
impl super::TokenProvider for ClientCredentials {
    type Token = Token;
    type Error = Error;

    async fn get_auth_token(&self) -> Result<Self::Token, Self::Error> {
        let auth_response = self.perform().await?;
        let token = auth_response.into();
        Ok(token)
    }
}

impl super::Token for Token {
    fn access_token(&self) -> &str {
        self.access_token.as_str()
    }
}

impl super::ExpiringToken for Token {
    fn expires_at(&self) -> Instant {
        self.expires_at
    }
}
