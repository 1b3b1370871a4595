use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProfileFailure;
use crate::provider::ProviderKind;
use crate::tokens::TokenSet;

/// The raw, provider specific profile. Untyped until mapped.
pub type Profile = Map<String, Value>;

/// Errors returned by a profile mapping function.
pub type MapperError = Box<dyn std::error::Error + Send + Sync>;

/// The canonical user profile produced from a provider profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The provider side user id, as a string. Never empty.
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Lower-cased email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Any other field returned by the mapping function.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The canonical account record linking a user to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The provider identifier (e.g., "github").
    pub provider: String,
    /// The protocol family of the provider.
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    /// The user's id at the provider.
    #[serde(rename = "providerAccountId")]
    pub provider_account_id: String,
    /// The tokens obtained during the callback.
    #[serde(flatten)]
    pub tokens: TokenSet,
}

/// The profile half of a callback result.
///
/// `Unusable` is a soft failure: the protocol exchange succeeded but no identity could be
/// derived, so the caller should route to a recovery or sign-up page rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileOutcome {
    /// A usable profile and its account.
    Resolved {
        /// The normalized profile.
        profile: UserProfile,
        /// The account built from the profile id and tokens.
        account: Account,
    },
    /// No usable profile was obtained.
    Unusable(ProfileFailure),
}

impl ProfileOutcome {
    /// The profile, if one was resolved.
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            ProfileOutcome::Resolved { profile, .. } => Some(profile),
            ProfileOutcome::Unusable(_) => None,
        }
    }

    /// The account, if one was resolved.
    pub fn account(&self) -> Option<&Account> {
        match self {
            ProfileOutcome::Resolved { account, .. } => Some(account),
            ProfileOutcome::Unusable(_) => None,
        }
    }
}

/// Maps a raw provider profile to a profile candidate.
///
/// The returned value should be an object with at least an `id`. Errors are contained by
/// the callback and reported as [`ProfileOutcome::Unusable`].
#[async_trait]
pub trait ProfileMapper: Send + Sync {
    /// Map the raw profile, with access to the tokens it was obtained with.
    async fn map_profile(&self, profile: &Profile, tokens: &TokenSet) -> Result<Value, MapperError>;
}

#[async_trait]
impl<F> ProfileMapper for F
where
    F: Fn(&Profile, &TokenSet) -> Result<Value, MapperError> + Send + Sync,
{
    async fn map_profile(&self, profile: &Profile, tokens: &TokenSet) -> Result<Value, MapperError> {
        (self)(profile, tokens)
    }
}

/// Maps standard OpenID Connect claims: `sub` to `id`, `picture` to `image`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardClaimsMapper;

#[async_trait]
impl ProfileMapper for StandardClaimsMapper {
    async fn map_profile(&self, profile: &Profile, _tokens: &TokenSet) -> Result<Value, MapperError> {
        let mut mapped = Map::new();
        let fields = [("sub", "id"), ("name", "name"), ("email", "email"), ("picture", "image")];
        for (claim, field) in fields {
            if let Some(value) = profile.get(claim) {
                mapped.insert(field.to_string(), value.clone());
            }
        }
        Ok(Value::Object(mapped))
    }
}

/// The string form of a profile id. Strings are used as-is, numbers are formatted.
pub fn stringify_id(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
