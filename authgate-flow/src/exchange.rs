use authgate_core::{
    CallbackParams, ClientError, IdentityClient, ProviderConfig, TokenRequest,
    TokenRequestContext, TokenSet, VerificationChecks,
};
use log::debug;
use std::sync::Arc;

/// How a modern callback turns its authorization code into tokens.
#[derive(Clone)]
pub enum TokenExchangeStrategy {
    /// The provider supplies its own token request.
    ///
    /// Its payload keeps its fields and values, but goes through the same normalization as
    /// every token response: an array `scope` is joined and `expires_in` becomes `expires_at`.
    Custom(Arc<dyn TokenRequest>),
    /// Standard OIDC code exchange with ID token validation.
    IdToken,
    /// Plain OAuth2 code exchange.
    Opaque,
}

impl TokenExchangeStrategy {
    /// Select the strategy for a provider, in priority order: custom, ID token, opaque.
    pub fn select(provider: &ProviderConfig) -> Self {
        if let Some(request) = &provider.token_request {
            TokenExchangeStrategy::Custom(request.clone())
        } else if provider.id_token {
            TokenExchangeStrategy::IdToken
        } else {
            TokenExchangeStrategy::Opaque
        }
    }

    /// A short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            TokenExchangeStrategy::Custom(_) => "custom",
            TokenExchangeStrategy::IdToken => "id_token",
            TokenExchangeStrategy::Opaque => "opaque",
        }
    }

    /// Exchange the authorization grant, enforcing `checks`.
    pub async fn exchange(
        &self,
        provider: &ProviderConfig,
        client: &dyn IdentityClient,
        params: &CallbackParams,
        checks: &VerificationChecks,
    ) -> Result<TokenSet, ClientError> {
        debug!(
            "[OAUTH_CALLBACK] provider={} exchanging code with {} strategy",
            provider.id,
            self.name()
        );
        match self {
            TokenExchangeStrategy::Custom(request) => {
                let response = request
                    .request(TokenRequestContext {
                        provider,
                        params,
                        checks,
                        client,
                    })
                    .await?;
                TokenSet::from_response(response)
            }
            TokenExchangeStrategy::IdToken => client.oidc_callback(provider, params, checks).await,
            TokenExchangeStrategy::Opaque => client.oauth_callback(provider, params, checks).await,
        }
    }
}

impl std::fmt::Debug for TokenExchangeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
