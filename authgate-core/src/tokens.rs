use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;
use crate::profile::Profile;

/// The tokens returned by a token exchange.
///
/// `scope` is always a single space separated string, whatever shape the provider used.
/// Fields the provider returned that are not modelled here are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    /// The access token used for API requests. For OAuth1 this is the `oauth_token`.
    pub access_token: String,
    /// The type of token (usually "Bearer")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// The refresh token used to obtain new access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// The OIDC ID Token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Unix timestamp (seconds) at which the access token expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// The scopes granted by the user
    #[serde(
        default,
        deserialize_with = "deserialize_scope",
        skip_serializing_if = "Option::is_none"
    )]
    pub scope: Option<String>,
    /// Provider specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenSet {
    /// Build a token set from a raw token endpoint response.
    ///
    /// A relative `expires_in` is converted to an absolute `expires_at` and an array
    /// `scope` is joined with single spaces.
    pub fn from_response(mut response: Value) -> Result<Self, ClientError> {
        if let Some(object) = response.as_object_mut() {
            if !object.contains_key("expires_at") {
                if let Some(expires_in) = object.remove("expires_in").and_then(|v| as_seconds(&v))
                {
                    let expires_at = chrono::Utc::now()
                        .timestamp()
                        .checked_add(expires_in)
                        .ok_or_else(|| ClientError::Protocol("expires_in out of range".into()))?;
                    object.insert("expires_at".to_string(), Value::from(expires_at));
                }
            }
        }
        Ok(serde_json::from_value(response)?)
    }

    /// Decode the claims of the ID token.
    ///
    /// The signature is not checked here; call this only on tokens the identity client has
    /// already validated.
    pub fn claims(&self) -> Result<Profile, ClientError> {
        let id_token = self
            .id_token
            .as_deref()
            .ok_or_else(|| ClientError::Validation("id_token not present in TokenSet".into()))?;
        decode_jwt_payload(id_token)
    }

    /// The OAuth1 token secret, if this token set came from a legacy exchange.
    pub fn token_secret(&self) -> Option<&str> {
        self.extra.get("oauth_token_secret").and_then(Value::as_str)
    }
}

/// Decode the payload segment of a compact JWT without verifying it.
pub fn decode_jwt_payload(token: &str) -> Result<Profile, ClientError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| ClientError::Validation("JWT is not in compact form".into()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ClientError::Validation(format!("JWT payload is not base64url: {e}")))?;
    let claims: Value = serde_json::from_slice(&bytes)?;
    match claims {
        Value::Object(claims) => Ok(claims),
        _ => Err(ClientError::Validation("JWT payload is not an object".into())),
    }
}

fn as_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Join a scope array into a single space separated string.
pub fn join_scope(scope: &[Value]) -> String {
    scope
        .iter()
        .map(|s| match s {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn deserialize_scope<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(scope)) => Some(scope),
        Some(Value::Array(scope)) => Some(join_scope(&scope)),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scope_array_is_joined() {
        let tokens = TokenSet::from_response(json!({
            "access_token": "at",
            "scope": ["openid", "email", "profile"],
        }))
        .unwrap();
        assert_eq!(tokens.scope.as_deref(), Some("openid email profile"));
    }

    #[test]
    fn test_scope_string_is_unchanged() {
        let tokens = TokenSet::from_response(json!({
            "access_token": "at",
            "scope": "openid  email",
        }))
        .unwrap();
        assert_eq!(tokens.scope.as_deref(), Some("openid  email"));
    }

    #[test]
    fn test_expires_in_becomes_expires_at() {
        let before = chrono::Utc::now().timestamp();
        let tokens = TokenSet::from_response(json!({
            "access_token": "at",
            "expires_in": 3600,
            "token_type": "Bearer",
        }))
        .unwrap();
        let expires_at = tokens.expires_at.unwrap();
        assert!(expires_at >= before + 3600);
        assert!(!tokens.extra.contains_key("expires_in"));
    }

    #[test]
    fn test_expires_in_out_of_range_is_rejected() {
        for expires_in in [json!(i64::MAX), json!(1e30)] {
            let result = TokenSet::from_response(json!({
                "access_token": "at",
                "expires_in": expires_in,
            }));
            assert!(matches!(result, Err(ClientError::Protocol(_))));
        }
    }

    #[test]
    fn test_unknown_fields_are_kept() {
        let tokens = TokenSet::from_response(json!({
            "access_token": "at",
            "refresh_token_expires_in": 100,
            "x_user_id": "u-1",
        }))
        .unwrap();
        assert_eq!(tokens.extra["x_user_id"], json!("u-1"));
        assert_eq!(tokens.extra["refresh_token_expires_in"], json!(100));
    }

    #[test]
    fn test_missing_access_token_is_an_error() {
        assert!(TokenSet::from_response(json!({ "token_type": "Bearer" })).is_err());
    }

    #[test]
    fn test_claims_are_decoded() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"42","email":"a@b.com"}"#);
        let tokens = TokenSet {
            access_token: "at".into(),
            id_token: Some(format!("eyJhbGciOiJub25lIn0.{payload}.sig")),
            ..Default::default()
        };
        let claims = tokens.claims().unwrap();
        assert_eq!(claims["sub"], json!("42"));
    }

    #[test]
    fn test_claims_without_id_token() {
        let tokens = TokenSet {
            access_token: "at".into(),
            ..Default::default()
        };
        assert!(matches!(tokens.claims(), Err(ClientError::Validation(_))));
    }
}
