use authgate_core::{
    ClientError, IdentityClient, Profile, ProviderConfig, TokenSet, UserinfoContext,
    UserinfoRequest,
};
use log::debug;
use std::sync::Arc;

/// How a modern callback obtains the raw profile once it holds tokens.
#[derive(Clone)]
pub enum ProfileResolutionStrategy {
    /// The provider supplies its own userinfo request.
    Custom(Arc<dyn UserinfoRequest>),
    /// The validated ID token claims are the profile; no network call.
    IdTokenClaims,
    /// Fetch the userinfo endpoint with the access token.
    Userinfo,
}

impl ProfileResolutionStrategy {
    /// Select the strategy for a provider, in priority order: custom, ID token, userinfo.
    pub fn select(provider: &ProviderConfig) -> Self {
        if let Some(request) = &provider.userinfo_request {
            ProfileResolutionStrategy::Custom(request.clone())
        } else if provider.id_token {
            ProfileResolutionStrategy::IdTokenClaims
        } else {
            ProfileResolutionStrategy::Userinfo
        }
    }

    /// A short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ProfileResolutionStrategy::Custom(_) => "custom",
            ProfileResolutionStrategy::IdTokenClaims => "id_token",
            ProfileResolutionStrategy::Userinfo => "userinfo",
        }
    }

    /// Obtain the raw profile for `tokens`.
    pub async fn resolve(
        &self,
        provider: &ProviderConfig,
        client: &dyn IdentityClient,
        tokens: &TokenSet,
    ) -> Result<Profile, ClientError> {
        debug!(
            "[GET_PROFILE] provider={} resolving profile with {} strategy",
            provider.id,
            self.name()
        );
        match self {
            ProfileResolutionStrategy::Custom(request) => {
                request
                    .request(UserinfoContext {
                        provider,
                        tokens,
                        client,
                    })
                    .await
            }
            ProfileResolutionStrategy::IdTokenClaims => tokens.claims(),
            ProfileResolutionStrategy::Userinfo => {
                let endpoint = provider.userinfo.as_ref().ok_or_else(|| {
                    ClientError::Protocol(format!(
                        "provider {} has no userinfo endpoint",
                        provider.id
                    ))
                })?;
                client
                    .userinfo(provider, &tokens.access_token, &endpoint.params)
                    .await
            }
        }
    }
}

impl std::fmt::Debug for ProfileResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
