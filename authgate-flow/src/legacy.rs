use authgate_core::{
    CallbackRequest, ClientError, LegacyOAuthClient, Profile, ProviderConfig, TokenSet,
};
use log::debug;
use serde_json::Value;

/// The OAuth 1.0a half of the callback.
///
/// OAuth1 requests are signed, so no state, nonce or PKCE cookie is read here.
pub struct LegacyExchange<'a> {
    client: &'a dyn LegacyOAuthClient,
}

impl<'a> LegacyExchange<'a> {
    /// Create an exchange driving the given OAuth1 client.
    pub fn new(client: &'a dyn LegacyOAuthClient) -> Self {
        Self { client }
    }

    /// Exchange the `oauth_token` and `oauth_verifier` of the callback for an access token.
    pub async fn exchange(
        &self,
        provider: &ProviderConfig,
        request: &CallbackRequest,
    ) -> Result<TokenSet, ClientError> {
        let oauth_token = request
            .param("oauth_token")
            .ok_or_else(|| ClientError::Protocol("callback is missing oauth_token".into()))?;
        let oauth_verifier = request
            .param("oauth_verifier")
            .ok_or_else(|| ClientError::Protocol("callback is missing oauth_verifier".into()))?;

        debug!("[OAUTH_CALLBACK] provider={} exchanging OAuth1 request token", provider.id);
        self.client
            .access_token(provider, oauth_token, oauth_verifier)
            .await
    }

    /// Fetch the profile with a signed GET to the provider's profile URL.
    pub async fn profile(
        &self,
        provider: &ProviderConfig,
        tokens: &TokenSet,
    ) -> Result<Profile, ClientError> {
        let url = provider.profile_url.as_deref().ok_or_else(|| {
            ClientError::Protocol(format!("provider {} has no profile URL", provider.id))
        })?;
        let secret = tokens.token_secret().ok_or_else(|| {
            ClientError::Protocol("access token response is missing oauth_token_secret".into())
        })?;

        debug!("[GET_PROFILE] provider={} fetching OAuth1 profile", provider.id);
        let body = self
            .client
            .get(provider, url, &tokens.access_token, secret)
            .await?;
        parse_profile(body)
    }
}

/// Some OAuth1 providers send the profile as a JSON encoded string.
fn parse_profile(body: Value) -> Result<Profile, ClientError> {
    let body = match body {
        Value::String(raw) => serde_json::from_str(&raw)?,
        other => other,
    };
    match body {
        Value::Object(profile) => Ok(profile),
        _ => Err(ClientError::Protocol("profile response is not an object".into())),
    }
}
