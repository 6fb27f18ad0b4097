//! JSON routes in front of the management API.

mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    http::{HeaderName, HeaderValue},
    routing::get,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::core::Core;

pub use self::error::ApiError;

pub const BASE_PATH: &str = "/api/auth0";

/// Added to every response unless a handler already set them.
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("content-security-policy", "default-src 'self'; frame-ancestors 'self'; object-src 'none'"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

pub fn routes(core: Arc<Core>) -> Router {
    let api = Router::new()
        .route("/token", get(handlers::get_token))
        .route(
            "/applications",
            get(handlers::list_applications).post(handlers::create_application),
        )
        .route(
            "/applications/{client_id}",
            get(handlers::get_application)
                .patch(handlers::update_application)
                .delete(handlers::delete_application),
        )
        .route("/users", get(handlers::list_users))
        .route("/roles", get(handlers::list_roles))
        .route("/connections", get(handlers::list_connections))
        .method_not_allowed_fallback(handlers::method_not_allowed);

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .nest(BASE_PATH, api)
        .fallback(handlers::not_found)
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    for &(name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }

    router.with_state(core)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::core::{self, ClientIdRef, ListParams, Management};

    /// Records what the handlers asked for; fails every call when `fail_with` is set.
    #[derive(Default)]
    struct FakeManagement {
        calls: Mutex<Vec<(String, Value)>>,
        fail_with: Option<(u16, Value)>,
        panics: bool,
    }

    impl FakeManagement {
        fn record(&self, op: &str, arg: Value) -> Result<(), core::Error> {
            assert!(!self.panics, "management backend blew up");
            self.calls.lock().unwrap().push((op.to_owned(), arg));
            match &self.fail_with {
                Some((status, body)) => Err(core::Error::Upstream {
                    status: *status,
                    body: body.clone(),
                }),
                None => Ok(()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Management for Arc<FakeManagement> {
        async fn access_token(&self) -> Result<String, core::Error> {
            self.record("access_token", Value::Null)?;
            Ok("tok".into())
        }

        async fn create_application(&self, application: Value) -> Result<Value, core::Error> {
            self.record("create", application.clone())?;
            Ok(json!({"client_id": "new", "name": application["name"]}))
        }

        async fn get_application(&self, id: &ClientIdRef) -> Result<Value, core::Error> {
            self.record("get", json!(id))?;
            Ok(json!({"client_id": id}))
        }

        async fn list_applications(&self, params: &ListParams) -> Result<Value, core::Error> {
            self.record("list", serde_json::to_value(params).unwrap())?;
            Ok(json!([]))
        }

        async fn update_application(
            &self,
            id: &ClientIdRef,
            changes: Value,
        ) -> Result<Value, core::Error> {
            self.record("update", json!({"id": id, "changes": changes}))?;
            Ok(json!({"client_id": id}))
        }

        async fn delete_application(&self, id: &ClientIdRef) -> Result<(), core::Error> {
            self.record("delete", json!(id))
        }

        async fn list_users(&self, query: &str) -> Result<Value, core::Error> {
            self.record("users", json!(query))?;
            Ok(json!([]))
        }

        async fn list_roles(&self) -> Result<Value, core::Error> {
            self.record("roles", Value::Null)?;
            Ok(json!([]))
        }

        async fn list_connections(&self) -> Result<Value, core::Error> {
            self.record("connections", Value::Null)?;
            Ok(json!([]))
        }
    }

    fn app(fake: &Arc<FakeManagement>) -> Router {
        routes(Arc::new(Core::new(Arc::clone(fake))))
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let fake = Arc::new(FakeManagement::default());
        let (status, body) = send(app(&fake), get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn token_is_returned_as_bearer() {
        let fake = Arc::new(FakeManagement::default());
        let (status, body) = send(app(&fake), get("/api/auth0/token")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"access_token": "tok", "token_type": "Bearer"}));
    }

    #[tokio::test]
    async fn create_returns_201() {
        let fake = Arc::new(FakeManagement::default());
        let request = Request::post("/api/auth0/applications")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"x"}"#))
            .unwrap();

        let (status, body) = send(app(&fake), request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["client_id"], "new");
        assert_eq!(
            fake.calls.lock().unwrap()[0],
            ("create".to_owned(), json!({"name": "x"}))
        );
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_in_error_shape() {
        let fake = Arc::new(FakeManagement::default());
        let request = Request::post("/api/auth0/applications")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send(app(&fake), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["path"], "/api/auth0/applications");
        assert!(fake.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_defaults_paging() {
        let fake = Arc::new(FakeManagement::default());
        let (status, _) = send(app(&fake), get("/api/auth0/applications")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            fake.calls.lock().unwrap()[0],
            ("list".to_owned(), json!({"page": "0", "per_page": "50"}))
        );
    }

    #[tokio::test]
    async fn list_forwards_paging_unvalidated() {
        let fake = Arc::new(FakeManagement::default());
        let (status, _) = send(
            app(&fake),
            get("/api/auth0/applications?page=-1&per_page=abc&include_totals=true"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            fake.calls.lock().unwrap()[0],
            (
                "list".to_owned(),
                json!({"page": "-1", "per_page": "abc", "include_totals": "true"})
            )
        );
    }

    #[tokio::test]
    async fn create_accepts_form_body() {
        let fake = Arc::new(FakeManagement::default());
        let request = Request::post("/api/auth0/applications")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("name=web+app&app_type=spa"))
            .unwrap();

        let (status, _) = send(app(&fake), request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            fake.calls.lock().unwrap()[0],
            ("create".to_owned(), json!({"name": "web app", "app_type": "spa"}))
        );
    }

    #[tokio::test]
    async fn create_without_body_sends_empty_object() {
        let fake = Arc::new(FakeManagement::default());
        let request = Request::post("/api/auth0/applications")
            .body(Body::empty())
            .unwrap();

        let (status, _) = send(app(&fake), request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(fake.calls.lock().unwrap()[0], ("create".to_owned(), json!({})));
    }

    #[tokio::test]
    async fn unsupported_body_type_is_415() {
        let fake = Arc::new(FakeManagement::default());
        let request = Request::patch("/api/auth0/applications/abc")
            .header("content-type", "text/plain")
            .body(Body::from("name=x"))
            .unwrap();

        let (status, body) = send(app(&fake), request).await;

        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["success"], false);
        assert_eq!(body["status"], 415);
        assert!(fake.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_passes_id_and_body() {
        let fake = Arc::new(FakeManagement::default());
        let request = Request::patch("/api/auth0/applications/abc")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"renamed"}"#))
            .unwrap();

        let (status, _) = send(app(&fake), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            fake.calls.lock().unwrap()[0],
            (
                "update".to_owned(),
                json!({"id": "abc", "changes": {"name": "renamed"}})
            )
        );
    }

    #[tokio::test]
    async fn delete_confirms() {
        let fake = Arc::new(FakeManagement::default());
        let request = Request::delete("/api/auth0/applications/abc")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app(&fake), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["client_id"], "abc");
        assert!(body["message"].as_str().unwrap().contains("abc"));
    }

    #[tokio::test]
    async fn upstream_conflict_on_delete_is_relayed() {
        let upstream = json!({"statusCode": 409, "error": "Conflict", "message": "Client is in use"});
        let fake = Arc::new(FakeManagement {
            fail_with: Some((409, upstream.clone())),
            ..Default::default()
        });
        let request = Request::delete("/api/auth0/applications/abc")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app(&fake), request).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["status"], 409);
        assert_eq!(body["message"], "Client is in use");
        assert_eq!(body["details"], upstream);
        assert_eq!(body["path"], "/api/auth0/applications/abc");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn users_query_is_forwarded_verbatim() {
        let fake = Arc::new(FakeManagement::default());
        let (status, _) = send(app(&fake), get("/api/auth0/users?q=name%3Ax&per_page=5")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            fake.calls.lock().unwrap()[0],
            ("users".to_owned(), json!("q=name%3Ax&per_page=5"))
        );
    }

    #[tokio::test]
    async fn roles_and_connections_are_listed() {
        let fake = Arc::new(FakeManagement::default());
        let (roles, _) = send(app(&fake), get("/api/auth0/roles")).await;
        let (connections, _) = send(app(&fake), get("/api/auth0/connections")).await;

        assert_eq!(roles, StatusCode::OK);
        assert_eq!(connections, StatusCode::OK);
        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls[0].0, "roles");
        assert_eq!(calls[1].0, "connections");
    }

    #[tokio::test]
    async fn unknown_route_is_404_with_requested_url() {
        let fake = Arc::new(FakeManagement::default());
        let (status, body) = send(app(&fake), get("/api/auth0/unknown")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["requestedUrl"], "/api/auth0/unknown");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn wrong_method_is_405_in_error_shape() {
        let fake = Arc::new(FakeManagement::default());
        let request = Request::put("/api/auth0/applications/abc")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app(&fake), request).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["success"], false);
        assert_eq!(body["status"], 405);
        assert_eq!(body["path"], "/api/auth0/applications/abc");
        assert_eq!(body["requestedUrl"], "/api/auth0/applications/abc");
        assert!(fake.calls.lock().unwrap().is_empty());

        let request = Request::post("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app(&fake), request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["status"], 405);
    }

    #[tokio::test]
    async fn handler_panic_becomes_500() {
        let fake = Arc::new(FakeManagement {
            panics: true,
            ..Default::default()
        });

        let (status, body) = send(app(&fake), get("/api/auth0/roles")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["status"], 500);
        assert_eq!(body["message"], "Internal Server Error");
    }

    #[tokio::test]
    async fn responses_carry_security_headers() {
        let fake = Arc::new(FakeManagement::default());
        for uri in ["/health", "/api/auth0/unknown"] {
            let response = app(&fake).oneshot(get(uri)).await.unwrap();
            let headers = response.headers();

            assert_eq!(headers["x-content-type-options"], "nosniff");
            assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
            assert_eq!(
                headers["strict-transport-security"],
                "max-age=31536000; includeSubDomains"
            );
            assert_eq!(headers["referrer-policy"], "no-referrer");
            assert_eq!(headers["x-dns-prefetch-control"], "off");
        }
    }
}
