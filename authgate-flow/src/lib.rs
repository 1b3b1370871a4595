//! # Authgate Flow
//!
//! `authgate-flow` handles the redirect back from an identity provider: it rejects provider
//! errors, verifies the anti-forgery cookies, exchanges the grant for tokens, resolves the
//! profile and normalizes it into an account.
//!
//! ## Key Components
//!
//! - **[`OAuthCallback`]**: The entry point. Selects the OAuth1 or OAuth2/OIDC branch once.
//! - **[`AntiForgeryVerifier`]**: Reads the state, nonce and PKCE cookies.
//! - **[`TokenExchangeStrategy`]**: Custom, ID token or opaque code exchange.
//! - **[`ProfileResolutionStrategy`]**: Custom, ID token claims or userinfo profile retrieval.
//! - **[`ProfileNormalizer`]**: Maps the raw profile and contains provider-side shape errors.
//! - **[`LegacyExchange`]**: OAuth 1.0a access token exchange and profile fetch.

#![warn(missing_docs)]

/// The callback entry point.
pub mod callback;
/// Anti-forgery cookie verification.
pub mod checks;
/// Authorization code exchange strategies.
pub mod exchange;
/// The OAuth 1.0a branch.
pub mod legacy;
/// Profile normalization.
pub mod normalize;
/// Raw profile retrieval strategies.
pub mod userinfo;

#[cfg(test)]
mod testing;

pub use callback::{CallbackResult, OAuthCallback, OAuthCallbackBuilder};
pub use checks::{AntiForgeryVerifier, VerifiedChecks};
pub use exchange::TokenExchangeStrategy;
pub use legacy::LegacyExchange;
pub use normalize::ProfileNormalizer;
pub use userinfo::ProfileResolutionStrategy;
