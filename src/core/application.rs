//! Defaults applied to applications created through the proxy.

use serde_json::{json, Map, Value};

pub const DEFAULT_APP_TYPE: &str = "regular_web";
pub const DEFAULT_GRANT_TYPES: [&str; 2] = ["authorization_code", "refresh_token"];
pub const DEFAULT_JWT_ALG: &str = "RS256";
pub const DEFAULT_JWT_LIFETIME_SECS: u64 = 36000;

fn defaults() -> Map<String, Value> {
    let mut jwt_configuration = Map::new();
    jwt_configuration.insert("alg".into(), DEFAULT_JWT_ALG.into());
    jwt_configuration.insert("lifetime_in_seconds".into(), DEFAULT_JWT_LIFETIME_SECS.into());

    let mut fields = Map::new();
    fields.insert("app_type".into(), DEFAULT_APP_TYPE.into());
    fields.insert("grant_types".into(), json!(DEFAULT_GRANT_TYPES));
    fields.insert("jwt_configuration".into(), Value::Object(jwt_configuration));
    fields
}

/// Fill in absent fields of a create request. Fields present in `body` are
/// never touched, `jwt_configuration` is filled key by key.
///
/// Anything other than a JSON object is returned unchanged and left for the
/// provider to reject.
pub fn with_defaults(body: Value) -> Value {
    let Value::Object(mut fields) = body else {
        return body;
    };
    for (key, default) in defaults() {
        match (fields.get_mut(&key), default) {
            (None, default) => {
                fields.insert(key, default);
            }
            (Some(Value::Object(present)), Value::Object(nested)) => {
                for (nested_key, nested_default) in nested {
                    present.entry(nested_key).or_insert(nested_default);
                }
            }
            (Some(_), _) => {}
        }
    }
    Value::Object(fields)
}
