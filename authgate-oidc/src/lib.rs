//! # Authgate OIDC
//!
//! `authgate-oidc` is the `reqwest`-backed wire client for OAuth2 and OpenID Connect
//! callbacks.
//!
//! ## Key Components
//!
//! - **[`HttpIdentityClient`]**: Implements [`authgate_core::IdentityClient`]: the code grant,
//!   ID token validation and userinfo requests.
//! - **[`ProviderMetadata`]**: OpenID Provider discovery.
//! - **[`JwksCache`]**: Caches provider signing keys.

#![warn(missing_docs)]

/// The HTTP identity client.
pub mod client;
/// OpenID Provider discovery.
pub mod discovery;
/// JSON Web Key Sets and their cache.
pub mod jwks;

pub use client::HttpIdentityClient;
pub use discovery::{discover, ProviderMetadata};
pub use jwks::{Jwk, Jwks, JwksCache};
