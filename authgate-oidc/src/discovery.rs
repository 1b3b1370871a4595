use authgate_core::{ClientError, ProviderConfigBuilder, ProviderKind};
use serde::{Deserialize, Serialize};

/// The subset of OpenID Provider metadata used by callbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier.
    pub issuer: String,
    /// Authorization endpoint.
    pub authorization_endpoint: String,
    /// Token endpoint.
    pub token_endpoint: String,
    /// Userinfo endpoint.
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    /// JWKS URI.
    pub jwks_uri: String,
    /// Supported scopes.
    #[serde(default)]
    pub scopes_supported: Option<Vec<String>>,
    /// Supported token endpoint authentication methods.
    #[serde(default)]
    pub token_endpoint_auth_methods_supported: Option<Vec<String>>,
}

impl ProviderMetadata {
    /// Fetch metadata from the issuer URL (appends `/.well-known/openid-configuration`).
    pub async fn discover(issuer_url: &str, client: &reqwest::Client) -> Result<Self, ClientError> {
        let url = format!(
            "{}/.well-known/openid-configuration",
            issuer_url.trim_end_matches('/')
        );
        let response = client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Protocol(format!(
                "discovery at {url} returned {}",
                response.status()
            )));
        }
        Ok(response.json::<ProviderMetadata>().await?)
    }

    /// Copy the discovered endpoints onto a provider under construction.
    pub fn configure(&self, builder: ProviderConfigBuilder) -> ProviderConfigBuilder {
        let builder = builder
            .kind(ProviderKind::Oidc)
            .issuer(self.issuer.clone())
            .token(self.token_endpoint.clone())
            .jwks_uri(self.jwks_uri.clone());
        match &self.userinfo_endpoint {
            Some(userinfo) => builder.userinfo(userinfo.clone()),
            None => builder,
        }
    }
}

/// Fetches metadata from the issuer URL.
pub async fn discover(issuer_url: &str, client: &reqwest::Client) -> Result<ProviderMetadata, ClientError> {
    ProviderMetadata::discover(issuer_url, client).await
}
