use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::ClientError;
use crate::profile::Profile;
use crate::provider::ProviderConfig;
use crate::request::{CallbackParams, CallbackRequest, VerificationChecks};
use crate::tokens::TokenSet;

/// The OAuth2/OIDC wire client used by modern callbacks.
///
/// Implementations own request signing, token endpoint parsing and ID token validation.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Parse the authorization response parameters of a callback.
    fn callback_params(&self, request: &CallbackRequest) -> Result<CallbackParams, ClientError> {
        Ok(CallbackParams::from_request(request))
    }

    /// Exchange the authorization code and validate the returned ID token, including its
    /// `nonce` when one is enforced.
    async fn oidc_callback(
        &self,
        provider: &ProviderConfig,
        params: &CallbackParams,
        checks: &VerificationChecks,
    ) -> Result<TokenSet, ClientError>;

    /// Exchange the authorization code without ID token validation.
    async fn oauth_callback(
        &self,
        provider: &ProviderConfig,
        params: &CallbackParams,
        checks: &VerificationChecks,
    ) -> Result<TokenSet, ClientError>;

    /// Fetch the userinfo endpoint with the access token and extra query parameters.
    async fn userinfo(
        &self,
        provider: &ProviderConfig,
        access_token: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Profile, ClientError>;
}

/// The OAuth 1.0a wire client used by legacy callbacks.
#[async_trait]
pub trait LegacyOAuthClient: Send + Sync {
    /// Exchange the request token and verifier for an access token and token secret.
    async fn access_token(
        &self,
        provider: &ProviderConfig,
        oauth_token: &str,
        oauth_verifier: &str,
    ) -> Result<TokenSet, ClientError>;

    /// Perform a signed GET. The body is returned as sent: a JSON value or a raw string.
    async fn get(
        &self,
        provider: &ProviderConfig,
        url: &str,
        oauth_token: &str,
        oauth_token_secret: &str,
    ) -> Result<Value, ClientError>;
}
