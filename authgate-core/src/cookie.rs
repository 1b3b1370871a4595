use serde::{Deserialize, Serialize};

/// Controls whether a cookie is sent with cross-site requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    /// The cookie is sent with "safe" cross-site requests (e.g., following a link).
    Lax,
    /// The cookie is only sent for same-site requests.
    Strict,
    /// The cookie is sent with all requests, including cross-site. Requires `Secure`.
    None,
}

/// Attributes attached to a cookie descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieOptions {
    /// The path for which the cookie is valid.
    pub path: String,
    /// The `SameSite` attribute for the cookie.
    pub same_site: SameSite,
    /// Whether the cookie should only be sent over HTTPS.
    pub secure: bool,
    /// Whether the cookie should be inaccessible to client-side scripts.
    pub http_only: bool,
    /// Lifetime in seconds. `Some(0)` instructs the browser to drop the cookie.
    pub max_age: Option<i64>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            same_site: SameSite::Lax,
            secure: false,
            http_only: true,
            max_age: Some(15 * 60),
        }
    }
}

/// An instruction for the caller to set or clear a browser cookie.
///
/// The callback never touches a cookie store itself; it only returns these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value. Empty for clearing cookies.
    pub value: String,
    /// Cookie attributes.
    pub options: CookieOptions,
}

impl Cookie {
    /// Build a descriptor that removes the cookie `name` from the browser.
    pub fn clear(name: impl Into<String>, options: &CookieOptions) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            options: CookieOptions {
                max_age: Some(0),
                ..options.clone()
            },
        }
    }

    /// Whether this descriptor removes the cookie.
    pub fn is_removal(&self) -> bool {
        self.options.max_age == Some(0)
    }
}

/// The anti-forgery checks carried in cookies between login and callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Anti-CSRF `state` value.
    State,
    /// OIDC `nonce` bound into the ID token.
    Nonce,
    /// PKCE code verifier.
    Pkce,
}

impl CheckKind {
    /// Every check kind, in the order cookies are consumed.
    pub const ALL: [CheckKind; 3] = [CheckKind::State, CheckKind::Nonce, CheckKind::Pkce];

    /// A short label used in logs and signatures.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::State => "state",
            CheckKind::Nonce => "nonce",
            CheckKind::Pkce => "pkce",
        }
    }
}

/// Names and attributes of the check cookies.
///
/// Cookie names are configuration driven and shared by every provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Name of the `state` cookie.
    pub state: String,
    /// Name of the `nonce` cookie.
    pub nonce: String,
    /// Name of the PKCE code verifier cookie.
    pub pkce_code_verifier: String,
    /// Attributes shared by the check cookies.
    pub options: CookieOptions,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self::with_prefix("")
    }
}

impl CookieConfig {
    /// Cookie names using the `__Secure-` prefix, for deployments served over HTTPS.
    pub fn secure() -> Self {
        let mut config = Self::with_prefix("__Secure-");
        config.options.secure = true;
        config
    }

    fn with_prefix(prefix: &str) -> Self {
        Self {
            state: format!("{prefix}authgate.state"),
            nonce: format!("{prefix}authgate.nonce"),
            pkce_code_verifier: format!("{prefix}authgate.pkce.code_verifier"),
            options: CookieOptions::default(),
        }
    }

    /// The configured cookie name for a check.
    pub fn name(&self, kind: CheckKind) -> &str {
        match kind {
            CheckKind::State => &self.state,
            CheckKind::Nonce => &self.nonce,
            CheckKind::Pkce => &self.pkce_code_verifier,
        }
    }
}

/// A check cookie whose value was successfully verified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedCheck {
    /// The plaintext check value.
    pub value: String,
    /// A descriptor clearing the consumed cookie.
    pub cookie: Cookie,
}

/// The outcome of verifying one check cookie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckCookie {
    /// No cookie was sent.
    Absent,
    /// A cookie was sent but is tampered, malformed or expired.
    Invalid(String),
    /// The cookie verified.
    Verified(VerifiedCheck),
}

/// Verifies and decodes the raw value of a check cookie.
///
/// Implementations own the cryptography and expiry policy. An invalid value must never
/// be reported as [`CheckCookie::Verified`].
pub trait CookieVerifier: Send + Sync {
    /// Verify the raw cookie value for `kind`, sent under `name`.
    fn verify(
        &self,
        kind: CheckKind,
        name: &str,
        raw: Option<&str>,
        options: &CookieOptions,
    ) -> CheckCookie;
}
