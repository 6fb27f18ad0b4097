use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod application;

pub type ClientId = String;
pub type ClientIdRef = str;

/// Everything the HTTP layer needs from the identity provider.
#[async_trait::async_trait]
pub trait Management: Send + Sync {
    /// Current bearer token for the management API.
    async fn access_token(&self) -> Result<String, Error>;

    async fn create_application(&self, application: Value) -> Result<Value, Error>;
    async fn get_application(&self, id: &ClientIdRef) -> Result<Value, Error>;
    async fn list_applications(&self, params: &ListParams) -> Result<Value, Error>;
    async fn update_application(&self, id: &ClientIdRef, changes: Value) -> Result<Value, Error>;
    async fn delete_application(&self, id: &ClientIdRef) -> Result<(), Error>;

    /// `query` is an already encoded query string, forwarded as is.
    async fn list_users(&self, query: &str) -> Result<Value, Error>;
    async fn list_roles(&self) -> Result<Value, Error>;
    async fn list_connections(&self) -> Result<Value, Error>;
}

pub struct Core {
    pub management: Box<dyn Management>,
}

impl Core {
    pub fn new(management: impl Management + 'static) -> Self {
        Self {
            management: Box::new(management),
        }
    }

    pub fn management(&self) -> &dyn Management {
        self.management.as_ref()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The client credentials exchange failed. `status` is the token
    /// endpoint's status when it answered at all.
    #[error("failed to authenticate with Auth0: {message}")]
    Auth { status: Option<u16>, message: String },
    /// The management API answered with a non-2xx status.
    #[error("Auth0 API responded with {status}")]
    Upstream { status: u16, body: Value },
    /// No response was received.
    #[error("Auth0 API request failed: {0}")]
    Transport(String),
}

/// Human readable message out of an Auth0 error body: `message` for the
/// management API, `error_description` or `error` for the token endpoint.
pub fn error_message(body: &Value) -> Option<&str> {
    match body {
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("error_description"))
            .or_else(|| map.get("error"))
            .and_then(Value::as_str),
        Value::String(text) if !text.is_empty() => Some(text),
        _ => None,
    }
}

pub const DEFAULT_PAGE: &str = "0";
pub const DEFAULT_PER_PAGE: &str = "50";

/// Paging for the application list. Values stay strings so whatever the
/// caller sent reaches Auth0, which does the validating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_page")]
    pub page: String,
    #[serde(default = "default_per_page")]
    pub per_page: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_totals: Option<String>,
}

fn default_page() -> String {
    DEFAULT_PAGE.to_owned()
}

fn default_per_page() -> String {
    DEFAULT_PER_PAGE.to_owned()
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
            include_totals: None,
        }
    }
}
