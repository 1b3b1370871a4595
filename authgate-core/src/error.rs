use thiserror::Error;

/// Errors raised by the identity, token and OAuth1 client collaborators.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request to the provider could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider response could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// The provider answered with an OAuth error body or an unexpected status.
    #[error("Protocol error: {0}")]
    Protocol(String),
    /// A state, nonce, PKCE or ID token check failed.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors that abort an OAuth callback.
///
/// Callers should treat every variant as "deny login". Profile shape problems are not
/// errors: they surface as [`crate::profile::ProfileOutcome::Unusable`].
#[derive(Debug, Error)]
pub enum CallbackError {
    /// The provider redirected back with an `error` parameter.
    #[error("Provider denied the authorization request: {code}")]
    ProviderDenied {
        /// The OAuth error code, e.g. `access_denied`.
        code: String,
        /// The optional human readable description sent by the provider.
        description: Option<String>,
    },
    /// The OAuth1 access token exchange or profile request failed.
    #[error("Token exchange error: {0}")]
    TokenExchange(#[source] ClientError),
    /// The OAuth2/OIDC exchange, its anti-forgery checks or the profile fetch failed.
    #[error("Callback exchange error: {0}")]
    CallbackExchange(#[source] ClientError),
    /// The provider configuration lacks something this callback needs.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CallbackError {
    /// The stable error kind name, suitable for redirect query parameters.
    pub fn kind(&self) -> &'static str {
        match self {
            CallbackError::ProviderDenied { .. } => "OAuthCallbackError",
            CallbackError::TokenExchange(_) => "OAuthTokenExchangeError",
            CallbackError::CallbackExchange(_) => "OAuthCallbackExchangeError",
            CallbackError::Configuration(_) => "OAuthConfigurationError",
        }
    }
}

/// Reasons a successfully exchanged callback produced no usable profile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileFailure {
    /// The mapped profile has no `id`, or an empty one.
    #[error("Missing profile id")]
    MissingId,
    /// The provider's profile mapping function failed.
    #[error("Profile mapping failed: {0}")]
    Mapping(String),
}
