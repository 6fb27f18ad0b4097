//! Auth0 management API client.

use reqwest::{Method, Url};
use serde_json::Value;
use tracing::{debug, error};

use self::{
    auth::Token,
    utils::{check_status, endpoint, parse_body, InvalidBaseUrl, ServerError},
};
use crate::core::{self, ClientIdRef, ListParams};

pub mod auth;
mod utils;

/// Path prefix of the management API under the tenant origin.
const API_PREFIX: [&str; 2] = ["api", "v2"];

pub struct Provider<AuthTokenProvider> {
    pub client: reqwest::Client,
    pub base_url: Url,
    pub auth_token_provider: AuthTokenProvider,
}

#[derive(Debug, thiserror::Error)]
pub enum Error<AuthError> {
    #[error("auth: {0}")]
    Auth(#[source] AuthError),
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("server: {0}")]
    Server(#[from] ServerError),
    #[error(transparent)]
    Url(#[from] InvalidBaseUrl),
}

impl<AuthTokenProvider> Provider<AuthTokenProvider>
where
    AuthTokenProvider: auth::TokenProvider,
{
    fn build_url(
        &self,
        path: &[&str],
        query: Option<&str>,
    ) -> Result<Url, Error<AuthTokenProvider::Error>> {
        let mut url = endpoint(&self.base_url, API_PREFIX.iter().chain(path).copied())?;
        url.set_query(query.filter(|query| !query.is_empty()));
        Ok(url)
    }

    fn build_request(
        &self,
        auth_token: &str,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<reqwest::Request, Error<AuthTokenProvider::Error>> {
        let builder = self
            .client
            .request(method.clone(), url)
            .bearer_auth(auth_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        let builder = match body {
            Some(body) if method == Method::POST || method == Method::PATCH => builder.json(body),
            _ => builder,
        };

        builder.build().map_err(Error::Reqwest)
    }

    async fn get_auth_token(&self) -> Result<String, Error<AuthTokenProvider::Error>> {
        let token = self
            .auth_token_provider
            .get_auth_token()
            .await
            .map_err(Error::Auth)?;
        Ok(token.access_token().to_owned())
    }

    /// Call the management API. `path` is split into segments, each of
    /// which is percent-encoded; `body` is only sent with POST and PATCH.
    pub async fn request(
        &self,
        method: Method,
        path: &[&str],
        query: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Value, Error<AuthTokenProvider::Error>> {
        let auth_token = self.get_auth_token().await?;
        let url = self.build_url(path, query)?;
        debug!(message = "Calling management API", %method, %url);

        let request = self.build_request(&auth_token, method, url, body)?;
        let res = self.exec(request).await?;
        Self::parse_json(res).await
    }

    async fn exec(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, Error<AuthTokenProvider::Error>> {
        let method = request.method().clone();
        let url = request.url().clone();
        let res = self.client.execute(request).await.map_err(Error::Reqwest)?;
        let res = check_status(res).await.inspect_err(|err| {
            error!(
                message = "Management API error",
                %method,
                %url,
                status = err.status_code,
                body = %err.body,
            );
        })?;
        Ok(res)
    }

    /// Empty bodies (204 on delete) come back as `null`.
    async fn parse_json(
        res: reqwest::Response,
    ) -> Result<Value, Error<AuthTokenProvider::Error>> {
        let text = res.text().await.map_err(Error::Reqwest)?;
        Ok(parse_body(&text))
    }
}

#[async_trait::async_trait]
impl<AuthTokenProvider> core::Management for Provider<AuthTokenProvider>
where
    AuthTokenProvider: auth::TokenProvider,
    <AuthTokenProvider as auth::TokenProvider>::Error: Into<core::Error>,
{
    async fn access_token(&self) -> Result<String, core::Error> {
        let token = self.get_auth_token().await?;
        Ok(token)
    }

    async fn create_application(&self, application: Value) -> Result<Value, core::Error> {
        let body = core::application::with_defaults(application);
        let created = self
            .request(Method::POST, &["clients"], None, Some(&body))
            .await?;
        Ok(created)
    }

    async fn get_application(&self, id: &ClientIdRef) -> Result<Value, core::Error> {
        let application = self.request(Method::GET, &["clients", id], None, None).await?;
        Ok(application)
    }

    async fn list_applications(&self, params: &ListParams) -> Result<Value, core::Error> {
        let query = serde_urlencoded::to_string(params)
            .map_err(|err| core::Error::Transport(err.to_string()))?;
        let applications = self
            .request(Method::GET, &["clients"], Some(&query), None)
            .await?;
        Ok(applications)
    }

    async fn update_application(
        &self,
        id: &ClientIdRef,
        changes: Value,
    ) -> Result<Value, core::Error> {
        let updated = self
            .request(Method::PATCH, &["clients", id], None, Some(&changes))
            .await?;
        Ok(updated)
    }

    async fn delete_application(&self, id: &ClientIdRef) -> Result<(), core::Error> {
        self.request(Method::DELETE, &["clients", id], None, None)
            .await?;
        Ok(())
    }

    async fn list_users(&self, query: &str) -> Result<Value, core::Error> {
        let users = self
            .request(Method::GET, &["users"], Some(query), None)
            .await?;
        Ok(users)
    }

    async fn list_roles(&self) -> Result<Value, core::Error> {
        let roles = self.request(Method::GET, &["roles"], None, None).await?;
        Ok(roles)
    }

    async fn list_connections(&self) -> Result<Value, core::Error> {
        let connections = self.request(Method::GET, &["connections"], None, None).await?;
        Ok(connections)
    }
}

impl<AuthError> From<Error<AuthError>> for core::Error
where
    AuthError: Into<core::Error>,
{
    fn from(err: Error<AuthError>) -> Self {
        match err {
            Error::Auth(err) => err.into(),
            Error::Server(ServerError { status_code, body }) => core::Error::Upstream {
                status: status_code,
                body,
            },
            Error::Reqwest(err) => core::Error::Transport(err.to_string()),
            Error::Url(err) => core::Error::Transport(err.to_string()),
        }
    }
}

impl From<auth::client_credentials::Error> for core::Error {
    fn from(err: auth::client_credentials::Error) -> Self {
        use auth::client_credentials::Error;

        match err {
            Error::Server(err) => core::Error::Auth {
                status: Some(err.status_code),
                message: err.message().unwrap_or("token request rejected").to_owned(),
            },
            Error::Reqwest(err) => core::Error::Auth {
                status: err.status().map(|status| status.as_u16()),
                message: err.to_string(),
            },
            Error::Url(err) => core::Error::Auth {
                status: None,
                message: err.to_string(),
            },
        }
    }
}

impl<RenewalError> From<auth::token_manager::Error<RenewalError>> for core::Error
where
    RenewalError: Into<core::Error>,
{
    fn from(err: auth::token_manager::Error<RenewalError>) -> Self {
        match err {
            auth::token_manager::Error::Provider(err) => err.into(),
        }
    }
}
