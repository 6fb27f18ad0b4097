//! Authorization logic.

pub mod client_credentials;
pub mod token_manager;

/// Safety margin subtracted from the provider's `expires_in` so a token is
/// never handed out right before it lapses mid-flight.
pub const TOKEN_SAFETY_MARGIN: std::time::Duration = std::time::Duration::from_secs(300);

#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    type Token: Token;
    type Error: Send + Sync;

    async fn get_auth_token(&self) -> Result<Self::Token, Self::Error>;
}

pub trait Token: Send {
    fn access_token(&self) -> &str;
}

pub trait ExpiringToken: Token {
    fn expires_at(&self) -> tokio::time::Instant;
}
