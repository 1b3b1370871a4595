use crate::cookie::{CheckCookie, CheckKind, Cookie, CookieOptions, CookieVerifier, VerifiedCheck};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// A [`CookieVerifier`] for HMAC-SHA256 signed, expiring check cookies.
///
/// Sealed values have the shape `base64url(value).expires_at.base64url(signature)`, where
/// the signature covers the check kind, the encoded value and the expiry. A value sealed
/// for one check kind never verifies as another.
#[derive(Clone)]
pub struct SignedCookieVerifier {
    secret: Vec<u8>,
    ttl: chrono::Duration,
}

impl SignedCookieVerifier {
    /// Create a verifier with the given secret and a 15 minute lifetime.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            ttl: chrono::Duration::minutes(15),
        }
    }

    /// Set the lifetime of sealed values.
    pub fn with_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Seal a check value for storage in a cookie.
    pub fn seal(&self, kind: CheckKind, value: &str) -> String {
        let expires_at = (chrono::Utc::now() + self.ttl).timestamp();
        self.seal_with_expiry(kind, value, expires_at)
    }

    fn seal_with_expiry(&self, kind: CheckKind, value: &str, expires_at: i64) -> String {
        let payload = format!("{}.{}", URL_SAFE_NO_PAD.encode(value), expires_at);
        let signature = URL_SAFE_NO_PAD.encode(self.mac(kind, &payload).finalize().into_bytes());
        format!("{payload}.{signature}")
    }

    fn mac(&self, kind: CheckKind, payload: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(kind.as_str().as_bytes());
        mac.update(b"|");
        mac.update(payload.as_bytes());
        mac
    }

    fn open(&self, kind: CheckKind, sealed: &str) -> Result<String, String> {
        let (payload, signature) = sealed
            .rsplit_once('.')
            .ok_or_else(|| "malformed cookie value".to_string())?;
        let (encoded, expires_at) = payload
            .split_once('.')
            .ok_or_else(|| "malformed cookie value".to_string())?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| "malformed signature".to_string())?;
        self.mac(kind, payload)
            .verify_slice(&signature)
            .map_err(|_| "signature mismatch".to_string())?;

        let expires_at: i64 = expires_at
            .parse()
            .map_err(|_| "malformed expiry".to_string())?;
        if expires_at <= chrono::Utc::now().timestamp() {
            return Err("cookie expired".to_string());
        }

        let value = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| "malformed value".to_string())?;
        String::from_utf8(value).map_err(|_| "value is not valid UTF-8".to_string())
    }
}

impl CookieVerifier for SignedCookieVerifier {
    fn verify(
        &self,
        kind: CheckKind,
        name: &str,
        raw: Option<&str>,
        options: &CookieOptions,
    ) -> CheckCookie {
        let Some(raw) = raw else {
            return CheckCookie::Absent;
        };
        match self.open(kind, raw) {
            Ok(value) => CheckCookie::Verified(VerifiedCheck {
                value,
                cookie: Cookie::clear(name, options),
            }),
            Err(reason) => CheckCookie::Invalid(reason),
        }
    }
}

impl std::fmt::Debug for SignedCookieVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedCookieVerifier")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
