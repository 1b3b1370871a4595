use authgate_core::{
    CallbackRequest, CheckCookie, CheckKind, Cookie, CookieConfig, CookieVerifier,
    ProviderConfig, VerificationChecks,
};
use log::{debug, warn};

/// The checks recovered from the request cookies, and the cookies to clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedChecks {
    /// The checks to enforce during the token exchange.
    pub checks: VerificationChecks,
    /// Clearing descriptors for every check cookie that verified.
    pub cookies: Vec<Cookie>,
}

/// Reads the state, nonce and PKCE cookies of a modern callback.
///
/// A cookie that verifies is always cleared, even when its check is not enforced, so a
/// consumed value can never be replayed. A cookie that fails verification is neither
/// enforced nor cleared.
pub struct AntiForgeryVerifier<'a> {
    config: &'a CookieConfig,
    verifier: &'a dyn CookieVerifier,
}

impl<'a> AntiForgeryVerifier<'a> {
    /// Create a verifier over the given cookie configuration.
    pub fn new(config: &'a CookieConfig, verifier: &'a dyn CookieVerifier) -> Self {
        Self { config, verifier }
    }

    /// Verify the check cookies of `request` for `provider`.
    pub fn verify(&self, provider: &ProviderConfig, request: &CallbackRequest) -> VerifiedChecks {
        let mut verified = VerifiedChecks::default();

        for kind in CheckKind::ALL {
            if !provider.uses_check(kind) {
                continue;
            }
            let name = self.config.name(kind);
            let raw = request.get_cookie(name);

            let check = match self.verifier.verify(kind, name, raw, &self.config.options) {
                CheckCookie::Absent => {
                    debug!("[CHECKS] provider={} {} cookie not present", provider.id, kind.as_str());
                    continue;
                }
                CheckCookie::Invalid(reason) => {
                    warn!(
                        "[CHECKS] provider={} ignoring invalid {} cookie: {}",
                        provider.id,
                        kind.as_str(),
                        reason
                    );
                    continue;
                }
                CheckCookie::Verified(check) => check,
            };

            verified.cookies.push(check.cookie);
            match kind {
                CheckKind::State => verified.checks.state = Some(check.value),
                CheckKind::Pkce => verified.checks.code_verifier = Some(check.value),
                CheckKind::Nonce if provider.id_token => verified.checks.nonce = Some(check.value),
                CheckKind::Nonce => {
                    debug!(
                        "[CHECKS] provider={} does not issue ID tokens, nonce cleared but not enforced",
                        provider.id
                    );
                }
            }
        }

        verified
    }
}
