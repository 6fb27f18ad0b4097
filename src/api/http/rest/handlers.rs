use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, OriginalUri, Path, Query, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::info;

use super::error::ApiError;
use crate::core::{ClientId, Core, ListParams};

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "auth0-management-api",
        "timestamp": now(),
    }))
}

pub async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::not_found(uri.path())
}

pub async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::method_not_allowed(&method, uri.path())
}

/// Read a create/update body. JSON and form-encoded bodies are accepted, an
/// empty body is `{}`. Form fields are forwarded as strings.
fn read_body(headers: &HeaderMap, body: &Bytes, path: &str) -> ApiResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase());

    match content_type.as_deref() {
        Some("application/x-www-form-urlencoded") => {
            let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
                .map_err(|err| ApiError::bad_request(err.to_string(), path))?;
            let fields = fields
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect::<Map<_, _>>();
            Ok(Value::Object(fields))
        }
        Some(json) if json == "application/json" || json.ends_with("+json") => {
            serde_json::from_slice(body).map_err(|err| {
                let reason = format!("Failed to parse the request body as JSON: {err}");
                ApiError::bad_request(reason, path)
            })
        }
        other => Err(ApiError::unsupported_media_type(other.unwrap_or("none"), path)),
    }
}

pub async fn get_token(
    State(core): State<Arc<Core>>,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Json<TokenResponse>> {
    let access_token = core
        .management()
        .access_token()
        .await
        .map_err(|err| ApiError::from_core(err, uri.path()))?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer",
    }))
}

pub async fn create_application(
    State(core): State<Arc<Core>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = read_body(&headers, &body, uri.path())?;
    let created = core
        .management()
        .create_application(body)
        .await
        .map_err(|err| ApiError::from_core(err, uri.path()))?;
    info!(
        message = "Application created",
        client_id = created.get("client_id").and_then(|id| id.as_str()),
    );
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_application(
    State(core): State<Arc<Core>>,
    OriginalUri(uri): OriginalUri,
    Path(client_id): Path<ClientId>,
) -> ApiResult<Json<Value>> {
    let application = core
        .management()
        .get_application(&client_id)
        .await
        .map_err(|err| ApiError::from_core(err, uri.path()))?;
    Ok(Json(application))
}

pub async fn list_applications(
    State(core): State<Arc<Core>>,
    OriginalUri(uri): OriginalUri,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) =
        params.map_err(|rejection| ApiError::bad_request(rejection.body_text(), uri.path()))?;
    let applications = core
        .management()
        .list_applications(&params)
        .await
        .map_err(|err| ApiError::from_core(err, uri.path()))?;
    Ok(Json(applications))
}

pub async fn update_application(
    State(core): State<Arc<Core>>,
    OriginalUri(uri): OriginalUri,
    Path(client_id): Path<ClientId>,
    headers: HeaderMap,
    changes: Bytes,
) -> ApiResult<Json<Value>> {
    let changes = read_body(&headers, &changes, uri.path())?;
    let updated = core
        .management()
        .update_application(&client_id, changes)
        .await
        .map_err(|err| ApiError::from_core(err, uri.path()))?;
    Ok(Json(updated))
}

pub async fn delete_application(
    State(core): State<Arc<Core>>,
    OriginalUri(uri): OriginalUri,
    Path(client_id): Path<ClientId>,
) -> ApiResult<Json<Value>> {
    core.management()
        .delete_application(&client_id)
        .await
        .map_err(|err| ApiError::from_core(err, uri.path()))?;
    info!(message = "Application deleted", client_id = %client_id);
    Ok(Json(json!({
        "message": format!("Application {client_id} deleted successfully"),
        "client_id": client_id,
    })))
}

pub async fn list_users(
    State(core): State<Arc<Core>>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<Value>> {
    let users = core
        .management()
        .list_users(query.as_deref().unwrap_or_default())
        .await
        .map_err(|err| ApiError::from_core(err, uri.path()))?;
    Ok(Json(users))
}

pub async fn list_roles(
    State(core): State<Arc<Core>>,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Json<Value>> {
    let roles = core
        .management()
        .list_roles()
        .await
        .map_err(|err| ApiError::from_core(err, uri.path()))?;
    Ok(Json(roles))
}

pub async fn list_connections(
    State(core): State<Arc<Core>>,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Json<Value>> {
    let connections = core
        .management()
        .list_connections()
        .await
        .map_err(|err| ApiError::from_core(err, uri.path()))?;
    Ok(Json(connections))
}
