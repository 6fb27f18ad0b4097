use reqwest::Url;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[error("base url {0} cannot have path segments appended")]
pub struct InvalidBaseUrl(pub String);

/// Append percent-encoded path segments to `base`.
pub fn endpoint<'a, I>(base: &Url, segments: I) -> Result<Url, InvalidBaseUrl>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[derive(Debug, thiserror::Error)]
#[error("{status_code} status code")]
pub struct ServerError {
    pub status_code: u16,
    /// Response body, parsed as JSON when possible and kept as a string otherwise.
    pub body: Value,
}

impl ServerError {
    /// Human readable message taken from the body, if the provider sent one.
    pub fn message(&self) -> Option<&str> {
        crate::core::error_message(&self.body)
    }
}

/// Pass successful responses through, turn everything else into a
/// [`ServerError`] carrying the upstream body.
pub async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, ServerError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let text = res.text().await.unwrap_or_default();
    Err(ServerError {
        status_code: status.as_u16(),
        body: parse_body(&text),
    })
}

/// Parse a body as JSON; an empty body is `null` and anything unparseable is
/// kept verbatim as a JSON string.
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}
