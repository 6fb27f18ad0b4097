pub mod api;
pub mod auth0;
pub mod config;
pub mod core;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    auth0::auth::{client_credentials::ClientCredentials, token_manager::TokenManager},
    config::Config,
    core::Core,
};

/// Upper bound for a single call to Auth0, token exchange included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Install the global subscriber; `RUST_LOG` wins over `default_level`.
pub fn setup_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

/// Wire the token cache and management client for `config`.
pub fn build_core(config: &Config) -> Result<Core, reqwest::Error> {
    build_core_with_timeout(config, REQUEST_TIMEOUT)
}

pub fn build_core_with_timeout(
    config: &Config,
    timeout: Duration,
) -> Result<Core, reqwest::Error> {
    let reqwest_client = reqwest::Client::builder().timeout(timeout).build()?;

    let auth_provider = ClientCredentials {
        client: reqwest_client.clone(),
        base_url: config.base_url.clone(),
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
        audience: config.audience.clone(),
        scope: config.scope.clone(),
    };
    let auth_provider = TokenManager::new(auth_provider);

    let provider = auth0::Provider {
        client: reqwest_client,
        base_url: config.base_url.clone(),
        auth_token_provider: auth_provider,
    };

    Ok(Core::new(provider))
}

/// Router with every route and middleware mounted.
pub fn app(core: Core) -> axum::Router {
    api::http::rest::routes(Arc::new(core))
}
