use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::client::IdentityClient;
use crate::cookie::CheckKind;
use crate::error::ClientError;
use crate::profile::{Profile, ProfileMapper, StandardClaimsMapper};
use crate::request::{CallbackParams, VerificationChecks};
use crate::tokens::TokenSet;

/// The protocol family of a provider, recorded on the resulting account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OAuth 1.0a or OAuth 2.0.
    OAuth,
    /// OpenID Connect.
    Oidc,
}

/// The protocol a callback is handled with, selected from the provider version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    /// OAuth 1.0a: request token and verifier, signed requests, no cookie checks.
    Legacy,
    /// OAuth 2.0 and OpenID Connect.
    Modern,
}

impl Protocol {
    /// Select the protocol for a declared version such as `"1.0A"` or `"2.0"`.
    pub fn from_version(version: &str) -> Self {
        if version.trim().starts_with("1.") {
            Protocol::Legacy
        } else {
            Protocol::Modern
        }
    }
}

/// How the client authenticates at the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    /// Credentials in the form body.
    #[default]
    ClientSecretPost,
    /// Credentials in an HTTP Basic `Authorization` header.
    ClientSecretBasic,
}

/// A provider URL with statically configured query parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// The endpoint URL.
    pub url: String,
    /// Extra query parameters sent with every request.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl Endpoint {
    /// An endpoint without extra parameters.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a static query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// The URL with the static parameters appended to its query.
    pub fn to_url(&self) -> Result<url::Url, ClientError> {
        let mut url = url::Url::parse(&self.url)
            .map_err(|e| ClientError::Protocol(format!("Invalid endpoint URL {}: {e}", self.url)))?;
        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.params.iter());
        }
        Ok(url)
    }
}

/// Arguments passed to a custom token request.
pub struct TokenRequestContext<'a> {
    /// The provider being called back.
    pub provider: &'a ProviderConfig,
    /// The parsed callback parameters.
    pub params: &'a CallbackParams,
    /// The verified anti-forgery checks.
    pub checks: &'a VerificationChecks,
    /// The identity client, for providers that only tweak the standard exchange.
    pub client: &'a dyn IdentityClient,
}

/// Replaces the standard token exchange for providers with a non-standard token response.
#[async_trait]
pub trait TokenRequest: Send + Sync {
    /// Exchange the grant and return the raw token payload.
    async fn request(&self, ctx: TokenRequestContext<'_>) -> Result<Value, ClientError>;
}

/// Arguments passed to a custom userinfo request.
pub struct UserinfoContext<'a> {
    /// The provider being called back.
    pub provider: &'a ProviderConfig,
    /// The tokens obtained by the exchange.
    pub tokens: &'a TokenSet,
    /// The identity client.
    pub client: &'a dyn IdentityClient,
}

/// Replaces the standard profile retrieval.
#[async_trait]
pub trait UserinfoRequest: Send + Sync {
    /// Fetch the raw profile.
    async fn request(&self, ctx: UserinfoContext<'_>) -> Result<Profile, ClientError>;
}

/// Configuration of one identity provider.
///
/// Built with [`ProviderConfig::builder`]. Read-only once built and shared between
/// concurrent callbacks.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Provider identifier, used as `Account::provider`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Protocol family.
    pub kind: ProviderKind,
    /// Declared protocol version, e.g. `"2.0"` or `"1.0A"`.
    pub version: String,
    /// Whether the provider issues ID tokens.
    pub id_token: bool,
    /// OAuth client id (consumer key for OAuth1).
    pub client_id: String,
    /// OAuth client secret (consumer secret for OAuth1).
    pub client_secret: String,
    /// The redirect URI registered with the provider.
    pub callback_url: String,
    /// Expected `iss` of ID tokens.
    pub issuer: Option<String>,
    /// Token endpoint.
    pub token: Option<Endpoint>,
    /// Userinfo endpoint.
    pub userinfo: Option<Endpoint>,
    /// JWKS URI used to validate ID tokens.
    pub jwks_uri: Option<String>,
    /// OAuth1 access token URL.
    pub access_token_url: Option<String>,
    /// OAuth1 profile URL.
    pub profile_url: Option<String>,
    /// Token endpoint client authentication.
    pub client_auth_method: ClientAuthMethod,
    /// The anti-forgery checks this provider takes part in.
    pub checks: Vec<CheckKind>,
    /// Custom token exchange.
    pub token_request: Option<Arc<dyn TokenRequest>>,
    /// Custom profile retrieval.
    pub userinfo_request: Option<Arc<dyn UserinfoRequest>>,
    /// Maps the raw profile to a profile candidate.
    pub profile: Arc<dyn ProfileMapper>,
}

impl ProviderConfig {
    /// Start building a provider with the given identifier.
    pub fn builder(id: impl Into<String>) -> ProviderConfigBuilder {
        ProviderConfigBuilder::new(id)
    }

    /// The protocol this provider's callbacks are handled with.
    pub fn protocol(&self) -> Protocol {
        Protocol::from_version(&self.version)
    }

    /// Whether the provider takes part in the given check.
    pub fn uses_check(&self, kind: CheckKind) -> bool {
        self.checks.contains(&kind)
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("version", &self.version)
            .field("id_token", &self.id_token)
            .field("client_id", &self.client_id)
            .field("callback_url", &self.callback_url)
            .field("issuer", &self.issuer)
            .field("token", &self.token)
            .field("userinfo", &self.userinfo)
            .field("checks", &self.checks)
            .field("token_request", &self.token_request.is_some())
            .field("userinfo_request", &self.userinfo_request.is_some())
            .finish_non_exhaustive()
    }
}

/// A builder for [`ProviderConfig`].
pub struct ProviderConfigBuilder {
    config: ProviderConfig,
    id_token: Option<bool>,
}

impl ProviderConfigBuilder {
    fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            config: ProviderConfig {
                name: id.clone(),
                id,
                kind: ProviderKind::OAuth,
                version: "2.0".to_string(),
                id_token: false,
                client_id: String::new(),
                client_secret: String::new(),
                callback_url: String::new(),
                issuer: None,
                token: None,
                userinfo: None,
                jwks_uri: None,
                access_token_url: None,
                profile_url: None,
                client_auth_method: ClientAuthMethod::default(),
                checks: CheckKind::ALL.to_vec(),
                token_request: None,
                userinfo_request: None,
                profile: Arc::new(StandardClaimsMapper),
            },
            id_token: None,
        }
    }

    /// Set the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the protocol family. OIDC providers issue ID tokens unless told otherwise.
    pub fn kind(mut self, kind: ProviderKind) -> Self {
        self.config.kind = kind;
        self
    }

    /// Set the declared protocol version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.config.version = version.into();
        self
    }

    /// Override whether the provider issues ID tokens.
    pub fn id_token(mut self, id_token: bool) -> Self {
        self.id_token = Some(id_token);
        self
    }

    /// Set the client credentials.
    pub fn client(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.config.client_id = client_id.into();
        self.config.client_secret = client_secret.into();
        self
    }

    /// Set the redirect URI registered with the provider.
    pub fn callback_url(mut self, callback_url: impl Into<String>) -> Self {
        self.config.callback_url = callback_url.into();
        self
    }

    /// Set the expected ID token issuer.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config.issuer = Some(issuer.into());
        self
    }

    /// Set the token endpoint.
    pub fn token(mut self, endpoint: impl Into<Endpoint>) -> Self {
        self.config.token = Some(endpoint.into());
        self
    }

    /// Set the userinfo endpoint.
    pub fn userinfo(mut self, endpoint: impl Into<Endpoint>) -> Self {
        self.config.userinfo = Some(endpoint.into());
        self
    }

    /// Set the JWKS URI.
    pub fn jwks_uri(mut self, jwks_uri: impl Into<String>) -> Self {
        self.config.jwks_uri = Some(jwks_uri.into());
        self
    }

    /// Set the OAuth1 access token URL.
    pub fn access_token_url(mut self, url: impl Into<String>) -> Self {
        self.config.access_token_url = Some(url.into());
        self
    }

    /// Set the OAuth1 profile URL.
    pub fn profile_url(mut self, url: impl Into<String>) -> Self {
        self.config.profile_url = Some(url.into());
        self
    }

    /// Set the token endpoint client authentication method.
    pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
        self.config.client_auth_method = method;
        self
    }

    /// Set the anti-forgery checks the provider takes part in.
    pub fn checks(mut self, checks: impl IntoIterator<Item = CheckKind>) -> Self {
        self.config.checks = checks.into_iter().collect();
        self
    }

    /// Replace the standard token exchange.
    pub fn token_request(mut self, request: impl TokenRequest + 'static) -> Self {
        self.config.token_request = Some(Arc::new(request));
        self
    }

    /// Replace the standard profile retrieval.
    pub fn userinfo_request(mut self, request: impl UserinfoRequest + 'static) -> Self {
        self.config.userinfo_request = Some(Arc::new(request));
        self
    }

    /// Set the profile mapping function.
    pub fn profile(mut self, mapper: impl ProfileMapper + 'static) -> Self {
        self.config.profile = Arc::new(mapper);
        self
    }

    /// Build the [`ProviderConfig`].
    pub fn build(self) -> ProviderConfig {
        let mut config = self.config;
        config.id_token = self
            .id_token
            .unwrap_or(config.kind == ProviderKind::Oidc);
        config
    }
}

impl From<&str> for Endpoint {
    fn from(url: &str) -> Self {
        Endpoint::new(url)
    }
}

impl From<String> for Endpoint {
    fn from(url: String) -> Self {
        Endpoint::new(url)
    }
}
