use authgate_core::profile::stringify_id;
use authgate_core::{
    Account, Profile, ProfileFailure, ProfileOutcome, ProviderConfig, TokenSet, UserProfile,
};
use log::{debug, error};
use serde_json::{Map, Value};

/// Maps a raw profile to the canonical profile and account.
///
/// Failures here are contained: a mapping function that errors, returns something other
/// than an object, or omits the `id` yields [`ProfileOutcome::Unusable`] and is logged.
pub struct ProfileNormalizer<'a> {
    provider: &'a ProviderConfig,
}

impl<'a> ProfileNormalizer<'a> {
    /// Create a normalizer for the given provider.
    pub fn new(provider: &'a ProviderConfig) -> Self {
        Self { provider }
    }

    /// Run the provider's mapping function and build the account.
    pub async fn normalize(&self, raw: &Profile, tokens: &TokenSet) -> ProfileOutcome {
        let provider = self.provider;
        debug!("[PROFILE_DATA] provider={} raw profile: {:?}", provider.id, raw);

        let mapped = match provider.profile.map_profile(raw, tokens).await {
            Ok(mapped) => mapped,
            Err(e) => return self.unusable(ProfileFailure::Mapping(e.to_string())),
        };

        let Value::Object(mut mapped) = mapped else {
            return self.unusable(ProfileFailure::Mapping(
                "profile mapping did not return an object".into(),
            ));
        };

        let Some(id) = mapped
            .remove("id")
            .as_ref()
            .and_then(stringify_id)
            .filter(|id| !id.is_empty())
        else {
            return self.unusable(ProfileFailure::MissingId);
        };

        let profile = UserProfile {
            id: id.clone(),
            name: take_string(&mut mapped, "name"),
            email: take_string(&mut mapped, "email").map(|email| email.to_lowercase()),
            image: take_string(&mut mapped, "image"),
            extra: mapped,
        };

        ProfileOutcome::Resolved {
            profile,
            account: Account {
                provider: provider.id.clone(),
                kind: provider.kind,
                provider_account_id: id,
                tokens: tokens.clone(),
            },
        }
    }

    fn unusable(&self, failure: ProfileFailure) -> ProfileOutcome {
        error!(
            "[OAUTH_PARSE_PROFILE_ERROR] provider={} {}",
            self.provider.id, failure
        );
        ProfileOutcome::Unusable(failure)
    }
}

/// Remove a string field. Values of any other type are left in place with the extra fields.
fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(value)) => Some(value),
        Some(Value::Null) | None => None,
        Some(other) => {
            fields.insert(key.to_string(), other);
            None
        }
    }
}
