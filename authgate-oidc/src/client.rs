use async_trait::async_trait;
use authgate_core::{
    CallbackParams, ClientAuthMethod, ClientError, Endpoint, IdentityClient, Profile,
    ProviderConfig, TokenSet, VerificationChecks,
};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use log::debug;
use reqwest::header::ACCEPT;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::jwks::JwksCache;

/// [`IdentityClient`] backed by `reqwest` and `jsonwebtoken`.
///
/// Performs the authorization code grant against the provider's token endpoint,
/// validates ID tokens (HMAC with the client secret, or RSA keys from the JWKS URI)
/// and fetches userinfo with the access token as bearer credential.
pub struct HttpIdentityClient {
    http_client: reqwest::Client,
    jwks: JwksCache,
    leeway: u64,
}

impl Default for HttpIdentityClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpIdentityClient {
    /// Create a client with a fresh `reqwest::Client`.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Create a client sharing an existing `reqwest::Client`.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self {
            jwks: JwksCache::new(http_client.clone()),
            http_client,
            leeway: 60,
        }
    }

    /// Clock skew tolerated when checking `exp`, in seconds.
    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }

    fn check_response(
        &self,
        provider: &ProviderConfig,
        params: &CallbackParams,
        checks: &VerificationChecks,
    ) -> Result<String, ClientError> {
        match (&params.state, &checks.state) {
            (Some(_), None) => {
                return Err(ClientError::Validation(
                    "state present in response but no state check is enforced".into(),
                ))
            }
            (None, Some(_)) => {
                return Err(ClientError::Validation("state missing from response".into()))
            }
            (Some(received), Some(expected)) if received != expected => {
                return Err(ClientError::Validation("state mismatch".into()))
            }
            _ => {}
        }

        if let (Some(iss), Some(issuer)) = (&params.iss, &provider.issuer) {
            if iss != issuer {
                return Err(ClientError::Validation(format!(
                    "iss mismatch, expected {issuer}, got {iss}"
                )));
            }
        }

        params
            .code
            .clone()
            .ok_or_else(|| ClientError::Validation("code missing from response".into()))
    }

    async fn token_request(
        &self,
        provider: &ProviderConfig,
        params: &CallbackParams,
        checks: &VerificationChecks,
    ) -> Result<TokenSet, ClientError> {
        let code = self.check_response(provider, params, checks)?;
        let endpoint = provider.token.as_ref().ok_or_else(|| {
            ClientError::Protocol(format!("provider {} has no token endpoint", provider.id))
        })?;

        let mut form = BTreeMap::new();
        form.insert("grant_type", "authorization_code".to_string());
        form.insert("code", code);
        form.insert("redirect_uri", provider.callback_url.clone());
        if let Some(verifier) = &checks.code_verifier {
            form.insert("code_verifier", verifier.clone());
        }

        let mut request = self.http_client.post(endpoint.to_url()?);
        match provider.client_auth_method {
            ClientAuthMethod::ClientSecretPost => {
                form.insert("client_id", provider.client_id.clone());
                form.insert("client_secret", provider.client_secret.clone());
            }
            ClientAuthMethod::ClientSecretBasic => {
                request = request.basic_auth(&provider.client_id, Some(&provider.client_secret));
            }
        }

        debug!("token request to {} for provider {}", endpoint.url, provider.id);
        let response = request
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        let body: Value = serde_json::from_str(&response.text().await?).unwrap_or(Value::Null);

        if let Some(error) = body.get("error").and_then(Value::as_str) {
            let description = body
                .get("error_description")
                .and_then(Value::as_str)
                .map(|d| format!(": {d}"))
                .unwrap_or_default();
            return Err(ClientError::Protocol(format!("{error}{description}")));
        }
        if !status.is_success() {
            return Err(ClientError::Protocol(format!(
                "token endpoint returned {status}"
            )));
        }

        TokenSet::from_response(body)
    }

    /// Validate an ID token's signature, `iss`, `aud` and `exp`, and compare its nonce.
    pub async fn validate_id_token(
        &self,
        provider: &ProviderConfig,
        id_token: &str,
        nonce: Option<&str>,
    ) -> Result<Map<String, Value>, ClientError> {
        let header = decode_header(id_token)
            .map_err(|e| ClientError::Validation(format!("Invalid ID Token header: {e}")))?;

        let key = match header.alg {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                if provider.client_secret.is_empty() {
                    return Err(ClientError::Validation(format!(
                        "provider {} has no client secret to verify {:?} ID tokens",
                        provider.id, header.alg
                    )));
                }
                DecodingKey::from_secret(provider.client_secret.as_bytes())
            }
            _ => {
                let jwks_uri = provider.jwks_uri.as_deref().ok_or_else(|| {
                    ClientError::Validation(format!(
                        "provider {} has no jwks_uri to verify {:?} ID tokens",
                        provider.id, header.alg
                    ))
                })?;
                self.jwks
                    .get_key(jwks_uri, header.kid.as_deref())
                    .await?
                    .ok_or_else(|| {
                        ClientError::Validation("No matching key found in JWKS".to_string())
                    })?
                    .to_decoding_key()?
            }
        };

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.leeway;
        validation.set_audience(std::slice::from_ref(&provider.client_id));
        if let Some(issuer) = &provider.issuer {
            validation.set_issuer(std::slice::from_ref(issuer));
        }
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        let claims = decode::<Map<String, Value>>(id_token, &key, &validation)
            .map_err(|e| ClientError::Validation(format!("ID Token validation failed: {e}")))?
            .claims;

        let claimed = claims.get("nonce").and_then(Value::as_str);
        if claimed != nonce {
            return Err(ClientError::Validation(format!(
                "nonce mismatch, expected {nonce:?}, got {claimed:?}"
            )));
        }

        Ok(claims)
    }
}

#[async_trait]
impl IdentityClient for HttpIdentityClient {
    async fn oidc_callback(
        &self,
        provider: &ProviderConfig,
        params: &CallbackParams,
        checks: &VerificationChecks,
    ) -> Result<TokenSet, ClientError> {
        let tokens = self.token_request(provider, params, checks).await?;
        let id_token = tokens
            .id_token
            .as_deref()
            .ok_or_else(|| ClientError::Validation("id_token not present in TokenSet".into()))?;
        self.validate_id_token(provider, id_token, checks.nonce.as_deref())
            .await?;
        Ok(tokens)
    }

    async fn oauth_callback(
        &self,
        provider: &ProviderConfig,
        params: &CallbackParams,
        checks: &VerificationChecks,
    ) -> Result<TokenSet, ClientError> {
        self.token_request(provider, params, checks).await
    }

    async fn userinfo(
        &self,
        provider: &ProviderConfig,
        access_token: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Profile, ClientError> {
        let endpoint = provider.userinfo.as_ref().ok_or_else(|| {
            ClientError::Protocol(format!("provider {} has no userinfo endpoint", provider.id))
        })?;
        let url = Endpoint {
            url: endpoint.url.clone(),
            params: params.clone(),
        }
        .to_url()?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::Protocol(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }

        match response.json::<Value>().await? {
            Value::Object(profile) => Ok(profile),
            _ => Err(ClientError::Protocol(
                "userinfo response is not a JSON object".into(),
            )),
        }
    }
}
