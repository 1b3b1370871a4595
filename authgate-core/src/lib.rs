//! # Authgate Core
//!
//! `authgate-core` provides the types and collaborator traits used to handle the redirect
//! back from an identity provider after an OAuth1, OAuth2 or OpenID Connect authorization.
//!
//! ## Key Components
//!
//! - **[`CallbackRequest`]**: The untrusted inbound callback (query, body, method, cookies).
//! - **[`ProviderConfig`]**: Provider capabilities, endpoints and optional strategy hooks.
//! - **[`TokenSet`]**, **[`UserProfile`]**, **[`Account`]**: The data produced by a callback.
//! - **[`IdentityClient`]** and **[`LegacyOAuthClient`]**: The wire clients a callback drives.
//! - **[`CookieVerifier`]**: Verifies the state, nonce and PKCE cookies.
//! - **[`CallbackError`]**: The errors that abort a callback.

#![warn(missing_docs)]

/// Identity and OAuth1 client traits.
pub mod client;
/// Cookie descriptors, check cookie configuration and verification.
pub mod cookie;
/// Errors that can occur while handling a callback.
pub mod error;
/// Raw and canonical profiles, accounts and profile mapping.
pub mod profile;
/// Provider configuration and strategy hooks.
pub mod provider;
/// The inbound callback request and its parsed parameters.
pub mod request;
/// HMAC signed check cookies.
pub mod signed;
/// Token sets returned by token exchanges.
pub mod tokens;

pub use client::{IdentityClient, LegacyOAuthClient};
pub use cookie::{
    CheckCookie, CheckKind, Cookie, CookieConfig, CookieOptions, CookieVerifier, SameSite,
    VerifiedCheck,
};
pub use error::{CallbackError, ClientError, ProfileFailure};
pub use profile::{
    Account, MapperError, Profile, ProfileMapper, ProfileOutcome, StandardClaimsMapper,
    UserProfile,
};
pub use provider::{
    ClientAuthMethod, Endpoint, Protocol, ProviderConfig, ProviderConfigBuilder, ProviderKind,
    TokenRequest, TokenRequestContext, UserinfoContext, UserinfoRequest,
};
pub use request::{CallbackParams, CallbackRequest, ProviderErrorParams, VerificationChecks};
pub use signed::SignedCookieVerifier;
pub use tokens::TokenSet;
