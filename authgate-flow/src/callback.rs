use authgate_core::{
    Account, CallbackError, CallbackRequest, ClientError, Cookie, CookieConfig, CookieVerifier,
    IdentityClient, LegacyOAuthClient, Profile, ProfileOutcome, Protocol, ProviderConfig,
    UserProfile,
};
use log::{debug, error};
use std::sync::Arc;

use crate::checks::AntiForgeryVerifier;
use crate::exchange::TokenExchangeStrategy;
use crate::legacy::LegacyExchange;
use crate::normalize::ProfileNormalizer;
use crate::userinfo::ProfileResolutionStrategy;

/// The result of a callback that passed every protocol check.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackResult {
    /// The normalized profile and account, or why none could be derived.
    pub outcome: ProfileOutcome,
    /// The raw profile as returned by the provider.
    pub raw_profile: Profile,
    /// Cookies the caller must apply to the response.
    pub cookies: Vec<Cookie>,
}

impl CallbackResult {
    /// The normalized profile, if one was resolved.
    pub fn profile(&self) -> Option<&UserProfile> {
        self.outcome.profile()
    }

    /// The account, if one was resolved.
    pub fn account(&self) -> Option<&Account> {
        self.outcome.account()
    }
}

/// Handles the redirect back from an identity provider.
///
/// One instance can be shared by every provider and every concurrent request; all request
/// state lives on the stack of [`OAuthCallback::handle`].
pub struct OAuthCallback {
    identity: Arc<dyn IdentityClient>,
    legacy: Option<Arc<dyn LegacyOAuthClient>>,
    verifier: Arc<dyn CookieVerifier>,
    cookies: CookieConfig,
}

/// The protocol branch of one callback, chosen once from the provider version.
enum CallbackFlow<'a> {
    Legacy(LegacyExchange<'a>),
    Modern {
        exchange: TokenExchangeStrategy,
        resolution: ProfileResolutionStrategy,
    },
}

impl OAuthCallback {
    /// Create a new [`OAuthCallbackBuilder`] with the identity client and cookie verifier.
    pub fn builder(
        identity: Arc<dyn IdentityClient>,
        verifier: Arc<dyn CookieVerifier>,
    ) -> OAuthCallbackBuilder {
        OAuthCallbackBuilder {
            identity,
            legacy: None,
            verifier,
            cookies: CookieConfig::default(),
        }
    }

    /// The cookie configuration used for check cookies.
    pub fn cookie_config(&self) -> &CookieConfig {
        &self.cookies
    }

    /// Verify the callback, exchange the grant and resolve the profile.
    ///
    /// Provider errors are rejected before any cookie is read or request is made. The
    /// cookie list is only returned with a completed result, never partially.
    pub async fn handle(
        &self,
        provider: &ProviderConfig,
        request: &CallbackRequest,
    ) -> Result<CallbackResult, CallbackError> {
        if let Some(denied) = request.provider_error() {
            error!(
                "[OAUTH_CALLBACK_ERROR] provider={} error={} description={:?}",
                provider.id, denied.code, denied.description
            );
            return Err(CallbackError::ProviderDenied {
                code: denied.code,
                description: denied.description,
            });
        }

        match self.select(provider)? {
            CallbackFlow::Legacy(exchange) => {
                self.legacy_callback(exchange, provider, request).await
            }
            CallbackFlow::Modern {
                exchange,
                resolution,
            } => {
                self.modern_callback(exchange, resolution, provider, request)
                    .await
            }
        }
    }

    fn select(&self, provider: &ProviderConfig) -> Result<CallbackFlow<'_>, CallbackError> {
        match provider.protocol() {
            Protocol::Legacy => {
                let client = self.legacy.as_deref().ok_or_else(|| {
                    CallbackError::Configuration(format!(
                        "provider {} uses OAuth 1.0 but no OAuth1 client is configured",
                        provider.id
                    ))
                })?;
                if provider.profile_url.is_none() {
                    return Err(CallbackError::Configuration(format!(
                        "provider {} has no profile URL",
                        provider.id
                    )));
                }
                Ok(CallbackFlow::Legacy(LegacyExchange::new(client)))
            }
            Protocol::Modern => {
                let resolution = ProfileResolutionStrategy::select(provider);
                if matches!(resolution, ProfileResolutionStrategy::Userinfo)
                    && provider.userinfo.is_none()
                {
                    return Err(CallbackError::Configuration(format!(
                        "provider {} has neither ID tokens nor a userinfo endpoint",
                        provider.id
                    )));
                }
                Ok(CallbackFlow::Modern {
                    exchange: TokenExchangeStrategy::select(provider),
                    resolution,
                })
            }
        }
    }

    async fn legacy_callback(
        &self,
        exchange: LegacyExchange<'_>,
        provider: &ProviderConfig,
        request: &CallbackRequest,
    ) -> Result<CallbackResult, CallbackError> {
        let tokens = exchange
            .exchange(provider, request)
            .await
            .map_err(|e| handler_error(provider, e, CallbackError::TokenExchange))?;
        let raw_profile = exchange
            .profile(provider, &tokens)
            .await
            .map_err(|e| handler_error(provider, e, CallbackError::TokenExchange))?;

        let outcome = ProfileNormalizer::new(provider)
            .normalize(&raw_profile, &tokens)
            .await;
        Ok(CallbackResult {
            outcome,
            raw_profile,
            cookies: Vec::new(),
        })
    }

    async fn modern_callback(
        &self,
        exchange: TokenExchangeStrategy,
        resolution: ProfileResolutionStrategy,
        provider: &ProviderConfig,
        request: &CallbackRequest,
    ) -> Result<CallbackResult, CallbackError> {
        let verified = AntiForgeryVerifier::new(&self.cookies, self.verifier.as_ref())
            .verify(provider, request);
        debug!(
            "[CHECKS] provider={} state={} nonce={} pkce={}",
            provider.id,
            verified.checks.state.is_some(),
            verified.checks.nonce.is_some(),
            verified.checks.code_verifier.is_some()
        );

        let identity = self.identity.as_ref();
        let params = identity
            .callback_params(request)
            .map_err(|e| handler_error(provider, e, CallbackError::CallbackExchange))?;

        let tokens = exchange
            .exchange(provider, identity, &params, &verified.checks)
            .await
            .map_err(|e| handler_error(provider, e, CallbackError::CallbackExchange))?;
        debug!(
            "[OAUTH_CALLBACK_RESPONSE] provider={} token_type={:?} scope={:?} id_token={}",
            provider.id,
            tokens.token_type,
            tokens.scope,
            tokens.id_token.is_some()
        );

        let raw_profile = resolution
            .resolve(provider, identity, &tokens)
            .await
            .map_err(|e| handler_error(provider, e, CallbackError::CallbackExchange))?;

        let outcome = ProfileNormalizer::new(provider)
            .normalize(&raw_profile, &tokens)
            .await;
        Ok(CallbackResult {
            outcome,
            raw_profile,
            cookies: verified.cookies,
        })
    }
}

fn handler_error(
    provider: &ProviderConfig,
    error: ClientError,
    wrap: fn(ClientError) -> CallbackError,
) -> CallbackError {
    error!(
        "[OAUTH_CALLBACK_HANDLER_ERROR] provider={} {}",
        provider.id, error
    );
    wrap(error)
}

/// A builder for [`OAuthCallback`].
pub struct OAuthCallbackBuilder {
    identity: Arc<dyn IdentityClient>,
    legacy: Option<Arc<dyn LegacyOAuthClient>>,
    verifier: Arc<dyn CookieVerifier>,
    cookies: CookieConfig,
}

impl OAuthCallbackBuilder {
    /// Set the OAuth1 client, required for providers with a `1.x` version.
    pub fn legacy_client(mut self, client: Arc<dyn LegacyOAuthClient>) -> Self {
        self.legacy = Some(client);
        self
    }

    /// Set the check cookie names and attributes.
    pub fn cookie_config(mut self, config: CookieConfig) -> Self {
        self.cookies = config;
        self
    }

    /// Build the [`OAuthCallback`].
    pub fn build(self) -> OAuthCallback {
        OAuthCallback {
            identity: self.identity,
            legacy: self.legacy,
            verifier: self.verifier,
            cookies: self.cookies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{id_token_with, FakeIdentityClient, FakeLegacyClient, RecordingVerifier};
    use authgate_core::{
        CheckKind, Endpoint, MapperError, ProfileFailure, ProviderKind, SignedCookieVerifier,
        TokenSet,
    };
    use serde_json::{json, Value};

    const SECRET: &str = "cookie-secret";

    fn signer() -> SignedCookieVerifier {
        SignedCookieVerifier::new(SECRET)
    }

    fn oidc_provider() -> ProviderConfig {
        ProviderConfig::builder("acme")
            .kind(ProviderKind::Oidc)
            .client("client-id", "client-secret")
            .callback_url("https://app.example.com/auth/callback/acme")
            .build()
    }

    fn oidc_tokens() -> TokenSet {
        TokenSet {
            access_token: "access-token".into(),
            id_token: Some(id_token_with(json!({ "sub": "42", "email": "A@B.com" }))),
            scope: Some("openid email".into()),
            ..Default::default()
        }
    }

    fn with_check_cookies(request: CallbackRequest) -> CallbackRequest {
        let config = CookieConfig::default();
        let signer = signer();
        request
            .cookie(&config.state, signer.seal(CheckKind::State, "state-1"))
            .cookie(&config.nonce, signer.seal(CheckKind::Nonce, "nonce-1"))
            .cookie(
                &config.pkce_code_verifier,
                signer.seal(CheckKind::Pkce, "verifier-1"),
            )
    }

    fn callback(identity: Arc<FakeIdentityClient>) -> OAuthCallback {
        OAuthCallback::builder(identity, Arc::new(signer())).build()
    }

    #[tokio::test]
    async fn test_oidc_callback_end_to_end() {
        let identity = Arc::new(FakeIdentityClient::default().with_tokens(oidc_tokens()));
        let request = with_check_cookies(
            CallbackRequest::default()
                .query("code", "auth-code")
                .query("state", "state-1"),
        );

        let result = callback(identity.clone())
            .handle(&oidc_provider(), &request)
            .await
            .unwrap();

        let profile = result.profile().unwrap();
        assert_eq!(profile.id, "42");
        assert_eq!(profile.email.as_deref(), Some("a@b.com"));

        let account = result.account().unwrap();
        assert_eq!(account.provider, "acme");
        assert_eq!(account.kind, ProviderKind::Oidc);
        assert_eq!(account.provider_account_id, "42");
        assert_eq!(account.tokens, oidc_tokens());

        let cookies: Vec<_> = result.cookies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            cookies,
            vec!["authgate.state", "authgate.nonce", "authgate.pkce.code_verifier"]
        );
        assert!(result.cookies.iter().all(Cookie::is_removal));

        assert_eq!(identity.calls(), vec!["oidc_callback"]);
        let checks = identity.last_checks().unwrap();
        assert_eq!(checks.state.as_deref(), Some("state-1"));
        assert_eq!(checks.nonce.as_deref(), Some("nonce-1"));
        assert_eq!(checks.code_verifier.as_deref(), Some("verifier-1"));
        assert_eq!(result.raw_profile["sub"], json!("42"));
    }

    #[tokio::test]
    async fn test_provider_error_fails_before_anything_else() {
        let identity = Arc::new(FakeIdentityClient::default());
        let verifier = Arc::new(RecordingVerifier::new(signer()));
        let callback = OAuthCallback::builder(identity.clone(), verifier.clone()).build();
        let request = with_check_cookies(
            CallbackRequest::default()
                .query("error", "access_denied")
                .query("error_description", "User cancelled"),
        );

        let error = callback.handle(&oidc_provider(), &request).await.unwrap_err();

        match error {
            CallbackError::ProviderDenied { code, description } => {
                assert_eq!(code, "access_denied");
                assert_eq!(description.as_deref(), Some("User cancelled"));
            }
            other => panic!("expected ProviderDenied, got {other:?}"),
        }
        assert!(verifier.seen().is_empty());
        assert!(identity.calls().is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_in_post_body() {
        let identity = Arc::new(FakeIdentityClient::default());
        let request = CallbackRequest::new(http::Method::POST).body("error", "server_error");

        let error = callback(identity.clone())
            .handle(&oidc_provider(), &request)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), "OAuthCallbackError");
        assert!(identity.calls().is_empty());
    }

    #[tokio::test]
    async fn test_oauth1_reads_no_cookies() {
        let identity = Arc::new(FakeIdentityClient::default());
        let legacy = Arc::new(FakeLegacyClient::new(json!({ "id_str": "12", "screen_name": "jack" })));
        let verifier = Arc::new(RecordingVerifier::new(signer()));
        let callback = OAuthCallback::builder(identity.clone(), verifier.clone())
            .legacy_client(legacy.clone())
            .build();
        let provider = ProviderConfig::builder("twitter")
            .version("1.0A")
            .profile_url("https://api.twitter.example/1.1/account/verify_credentials.json")
            .profile(|p: &Profile, _: &TokenSet| -> Result<Value, MapperError> {
                Ok(json!({ "id": p["id_str"], "name": p["screen_name"] }))
            })
            .build();
        let request = with_check_cookies(
            CallbackRequest::default()
                .query("oauth_token", "request-token")
                .query("oauth_verifier", "verifier"),
        );

        let result = callback.handle(&provider, &request).await.unwrap();

        assert!(result.cookies.is_empty());
        assert!(verifier.seen().is_empty());
        assert!(identity.calls().is_empty());
        assert_eq!(legacy.calls(), vec!["access_token", "get"]);

        let account = result.account().unwrap();
        assert_eq!(account.kind, ProviderKind::OAuth);
        assert_eq!(account.provider_account_id, "12");
        assert_eq!(account.tokens.access_token, "access-for-request-token");
        assert_eq!(account.tokens.token_secret(), Some("secret-for-verifier"));
    }

    #[tokio::test]
    async fn test_oauth1_profile_string_is_parsed() {
        let identity = Arc::new(FakeIdentityClient::default());
        let legacy = Arc::new(FakeLegacyClient::new(json!(
            r#"{"id": 12, "email": "Jack@Example.com"}"#
        )));
        let callback = OAuthCallback::builder(identity, Arc::new(signer()))
            .legacy_client(legacy)
            .build();
        let provider = ProviderConfig::builder("legacy")
            .version("1.0")
            .profile_url("https://legacy.example/profile")
            .profile(|p: &Profile, _: &TokenSet| -> Result<Value, MapperError> {
                Ok(Value::Object(p.clone()))
            })
            .build();
        let request = CallbackRequest::default()
            .query("oauth_token", "t")
            .query("oauth_verifier", "v");

        let result = callback.handle(&provider, &request).await.unwrap();

        assert_eq!(result.raw_profile["id"], json!(12));
        let profile = result.profile().unwrap();
        assert_eq!(profile.id, "12");
        assert_eq!(profile.email.as_deref(), Some("jack@example.com"));
    }

    #[tokio::test]
    async fn test_oauth1_without_client_is_a_configuration_error() {
        let identity = Arc::new(FakeIdentityClient::default());
        let provider = ProviderConfig::builder("twitter")
            .version("1.0A")
            .profile_url("https://api.twitter.example/me")
            .build();

        let error = callback(identity)
            .handle(&provider, &CallbackRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(error, CallbackError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_missing_id_is_a_successful_result_without_profile() {
        let identity = Arc::new(
            FakeIdentityClient::default().with_userinfo(json!({ "login": "octocat" })),
        );
        let provider = ProviderConfig::builder("github")
            .userinfo("https://api.github.example/user")
            .profile(|p: &Profile, _: &TokenSet| -> Result<Value, MapperError> {
                Ok(json!({ "name": p["login"] }))
            })
            .build();
        let request = CallbackRequest::default().query("code", "c");

        let result = callback(identity).handle(&provider, &request).await.unwrap();

        assert_eq!(result.outcome, ProfileOutcome::Unusable(ProfileFailure::MissingId));
        assert!(result.profile().is_none());
        assert!(result.account().is_none());
        assert_eq!(result.raw_profile["login"], json!("octocat"));
    }

    #[tokio::test]
    async fn test_mapper_error_is_a_successful_result_without_profile() {
        let identity = Arc::new(FakeIdentityClient::default().with_userinfo(json!({ "id": 1 })));
        let provider = ProviderConfig::builder("quirky")
            .userinfo("https://quirky.example/me")
            .profile(|_: &Profile, _: &TokenSet| -> Result<Value, MapperError> {
                Err("boom".into())
            })
            .build();
        let request = with_check_cookies(CallbackRequest::default().query("code", "c"));

        let result = callback(identity).handle(&provider, &request).await.unwrap();

        assert!(matches!(
            result.outcome,
            ProfileOutcome::Unusable(ProfileFailure::Mapping(_))
        ));
        assert_eq!(result.cookies.len(), 3);
    }

    #[tokio::test]
    async fn test_exchange_failure_is_fatal() {
        let identity = Arc::new(FakeIdentityClient::default().failing());
        let request = with_check_cookies(CallbackRequest::default().query("code", "c"));

        let error = callback(identity.clone())
            .handle(&oidc_provider(), &request)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            CallbackError::CallbackExchange(ClientError::Protocol(_))
        ));
        assert_eq!(error.kind(), "OAuthCallbackExchangeError");
        assert_eq!(identity.calls(), vec!["oidc_callback"]);
    }

    #[tokio::test]
    async fn test_profile_fetch_failure_is_fatal() {
        let identity = Arc::new(FakeIdentityClient::default());
        let provider = ProviderConfig::builder("github")
            .userinfo(Endpoint::new("https://api.github.example/user"))
            .build();
        let request = CallbackRequest::default().query("code", "c");

        let error = callback(identity.clone())
            .handle(&provider, &request)
            .await
            .unwrap_err();

        assert!(matches!(error, CallbackError::CallbackExchange(_)));
        assert_eq!(identity.calls(), vec!["oauth_callback", "userinfo"]);
    }

    #[tokio::test]
    async fn test_oauth2_without_userinfo_is_a_configuration_error() {
        let identity = Arc::new(FakeIdentityClient::default());
        let provider = ProviderConfig::builder("incomplete").build();

        let error = callback(identity.clone())
            .handle(&provider, &CallbackRequest::default().query("code", "c"))
            .await
            .unwrap_err();

        assert!(matches!(error, CallbackError::Configuration(_)));
        assert!(identity.calls().is_empty());
    }

    #[tokio::test]
    async fn test_nonce_not_enforced_for_oauth2_but_cleared() {
        let identity = Arc::new(FakeIdentityClient::default().with_userinfo(json!({ "id": 5 })));
        let provider = ProviderConfig::builder("github")
            .userinfo("https://api.github.example/user")
            .profile(|p: &Profile, _: &TokenSet| -> Result<Value, MapperError> {
                Ok(Value::Object(p.clone()))
            })
            .build();
        let request = with_check_cookies(CallbackRequest::default().query("code", "c"));

        let result = callback(identity.clone())
            .handle(&provider, &request)
            .await
            .unwrap();

        assert_eq!(identity.last_checks().unwrap().nonce, None);
        assert!(result.cookies.iter().any(|c| c.name == "authgate.nonce"));
        assert_eq!(result.account().unwrap().provider_account_id, "5");
    }
}
