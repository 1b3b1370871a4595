//! # Authgate
//!
//! Handles the redirect back from an identity provider after an OAuth 1.0a, OAuth 2.0 or
//! OpenID Connect authorization and turns it into a verified token set, a canonical user
//! profile and a linked account.
//!
//! ## Features
//!
//! - `flow` (default): the callback orchestrator, [`flow::OAuthCallback`].
//! - `oidc`: the `reqwest` identity client, [`oidc::HttpIdentityClient`].
//! - `full`: everything above.
//!
//! ## Example
//!
//! ```rust,ignore
//! use authgate::prelude::*;
//! use std::sync::Arc;
//!
//! let callback = OAuthCallback::builder(
//!     Arc::new(HttpIdentityClient::new()),
//!     Arc::new(SignedCookieVerifier::new(secret)),
//! )
//! .cookie_config(CookieConfig::secure())
//! .build();
//!
//! let result = callback.handle(&provider, &CallbackRequest::from_parts(&parts, Some(&body))).await?;
//! for cookie in &result.cookies {
//!     // write cookie to the response
//! }
//! ```

#![warn(missing_docs)]

pub use authgate_core::*;

/// The callback orchestrator and its strategies.
#[cfg(feature = "flow")]
pub use authgate_flow as flow;

/// The HTTP OAuth2/OpenID Connect client.
#[cfg(feature = "oidc")]
pub use authgate_oidc as oidc;

/// Commonly used types.
pub mod prelude {
    pub use authgate_core::{
        Account, CallbackError, CallbackRequest, CookieConfig, ProfileOutcome, ProviderConfig,
        ProviderKind, SignedCookieVerifier, TokenSet, UserProfile,
    };

    #[cfg(feature = "flow")]
    pub use authgate_flow::{CallbackResult, OAuthCallback};

    #[cfg(feature = "oidc")]
    pub use authgate_oidc::{HttpIdentityClient, ProviderMetadata};
}
