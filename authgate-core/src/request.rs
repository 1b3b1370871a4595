use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The inbound redirect from the identity provider.
///
/// Every value in here is untrusted input.
#[derive(Debug, Clone)]
pub struct CallbackRequest {
    /// HTTP method of the callback. `POST` for `response_mode=form_post`.
    pub method: Method,
    /// Query string parameters.
    pub query: HashMap<String, String>,
    /// Form body parameters.
    pub body: HashMap<String, String>,
    /// Incoming cookies.
    pub cookies: HashMap<String, String>,
}

impl Default for CallbackRequest {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl CallbackRequest {
    /// An empty callback request with the given method.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            query: HashMap::new(),
            body: HashMap::new(),
            cookies: HashMap::new(),
        }
    }

    /// Build a request from the HTTP request parts and an optional form body.
    pub fn from_parts(parts: &http::request::Parts, body: Option<&[u8]>) -> Self {
        let mut request = Self::new(parts.method.clone());
        if let Some(query) = parts.uri.query() {
            request.query = parse_form(query.as_bytes());
        }
        if let Some(body) = body {
            request.body = parse_form(body);
        }
        for header in parts.headers.get_all(http::header::COOKIE) {
            let Ok(header) = header.to_str() else {
                continue;
            };
            for cookie in ::cookie::Cookie::split_parse(header).flatten() {
                request
                    .cookies
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }
        request
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a form body parameter.
    pub fn body(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    /// Add an incoming cookie.
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Read a callback parameter.
    ///
    /// `POST` callbacks read the body first and `GET` callbacks the query first; the other
    /// source is used as a fallback.
    pub fn param(&self, name: &str) -> Option<&str> {
        let (primary, fallback) = if self.method == Method::POST {
            (&self.body, &self.query)
        } else {
            (&self.query, &self.body)
        };
        primary
            .get(name)
            .or_else(|| fallback.get(name))
            .map(String::as_str)
    }

    /// The error the provider echoed back, if any.
    pub fn provider_error(&self) -> Option<ProviderErrorParams> {
        let code = self.param("error")?.to_string();
        Some(ProviderErrorParams {
            code,
            description: self.param("error_description").map(str::to_string),
            uri: self.param("error_uri").map(str::to_string),
        })
    }

    /// Read a cookie.
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// All callback parameters, with the primary source taking precedence.
    pub fn params(&self) -> BTreeMap<String, String> {
        let (primary, fallback) = if self.method == Method::POST {
            (&self.body, &self.query)
        } else {
            (&self.query, &self.body)
        };
        let mut params: BTreeMap<String, String> = fallback.clone().into_iter().collect();
        params.extend(primary.clone());
        params
    }
}

fn parse_form(input: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(input).into_owned().collect()
}

/// An error echoed back by the provider on the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderErrorParams {
    /// The OAuth error code.
    pub code: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional link to a human readable page.
    pub uri: Option<String>,
}

/// The authorization response parameters used by the token exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParams {
    /// The authorization code.
    pub code: Option<String>,
    /// The returned `state`.
    pub state: Option<String>,
    /// The `iss` authorization response parameter (RFC 9207).
    pub iss: Option<String>,
    /// Everything else the provider sent.
    pub extra: BTreeMap<String, String>,
}

impl CallbackParams {
    /// Extract the authorization response parameters from a callback request.
    pub fn from_request(request: &CallbackRequest) -> Self {
        let mut extra = request.params();
        Self {
            code: extra.remove("code"),
            state: extra.remove("state"),
            iss: extra.remove("iss"),
            extra,
        }
    }
}

/// The anti-forgery values recovered from verified cookies.
///
/// An absent field is not enforced for this provider or flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationChecks {
    /// Expected `state`.
    pub state: Option<String>,
    /// Expected ID token `nonce`.
    pub nonce: Option<String>,
    /// PKCE code verifier to send with the token request.
    pub code_verifier: Option<String>,
}

impl VerificationChecks {
    /// Whether no check is enforced.
    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.nonce.is_none() && self.code_verifier.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_reads_query_first() {
        let request = CallbackRequest::new(Method::GET)
            .query("code", "from-query")
            .body("code", "from-body")
            .body("state", "s");
        assert_eq!(request.param("code"), Some("from-query"));
        assert_eq!(request.param("state"), Some("s"));
    }

    #[test]
    fn test_post_reads_body_first() {
        let request = CallbackRequest::new(Method::POST)
            .query("code", "from-query")
            .body("code", "from-body");
        assert_eq!(request.param("code"), Some("from-body"));
    }

    #[test]
    fn test_provider_error_from_body() {
        let request = CallbackRequest::new(Method::GET)
            .body("error", "access_denied")
            .body("error_description", "The user denied access");
        let error = request.provider_error().unwrap();
        assert_eq!(error.code, "access_denied");
        assert_eq!(error.description.as_deref(), Some("The user denied access"));
        assert_eq!(error.uri, None);
    }

    #[test]
    fn test_no_provider_error() {
        let request = CallbackRequest::new(Method::GET).query("code", "abc");
        assert!(request.provider_error().is_none());
    }

    #[test]
    fn test_from_parts() {
        let request = http::Request::builder()
            .method(Method::GET)
            .uri("/auth/callback/google?code=abc%20def&state=xyz")
            .header(http::header::COOKIE, "authgate.state=s1; authgate.nonce=n1")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();
        let request = CallbackRequest::from_parts(&parts, None);

        assert_eq!(request.param("code"), Some("abc def"));
        assert_eq!(request.param("state"), Some("xyz"));
        assert_eq!(request.get_cookie("authgate.state"), Some("s1"));
        assert_eq!(request.get_cookie("authgate.nonce"), Some("n1"));
    }

    #[test]
    fn test_from_parts_cookie_headers() {
        let request = http::Request::builder()
            .uri("/auth/callback/acme")
            .header(http::header::COOKIE, "authgate.state=s1;;  broken; theme=dark")
            .header(http::header::COOKIE, "authgate.pkce.code_verifier=v.1.sig")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();
        let request = CallbackRequest::from_parts(&parts, None);

        assert_eq!(request.get_cookie("authgate.state"), Some("s1"));
        assert_eq!(request.get_cookie("theme"), Some("dark"));
        assert_eq!(request.get_cookie("authgate.pkce.code_verifier"), Some("v.1.sig"));
        assert_eq!(request.get_cookie("broken"), None);
    }

    #[test]
    fn test_callback_params() {
        let request = CallbackRequest::new(Method::POST)
            .body("code", "abc")
            .body("state", "xyz")
            .body("session_state", "ss")
            .query("iss", "https://issuer.example.com");
        let params = CallbackParams::from_request(&request);

        assert_eq!(params.code.as_deref(), Some("abc"));
        assert_eq!(params.state.as_deref(), Some("xyz"));
        assert_eq!(params.iss.as_deref(), Some("https://issuer.example.com"));
        assert_eq!(params.extra.get("session_state").map(String::as_str), Some("ss"));
    }
}
