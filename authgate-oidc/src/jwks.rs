use authgate_core::ClientError;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// A single JSON Web Key.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key id.
    pub kid: Option<String>,
    /// Key type, e.g. `RSA`.
    pub kty: String,
    /// Intended algorithm.
    pub alg: Option<String>,
    /// RSA modulus.
    pub n: Option<String>,
    /// RSA exponent.
    pub e: Option<String>,
}

impl Jwk {
    /// Build a decoding key from the RSA components.
    pub fn to_decoding_key(&self) -> Result<DecodingKey, ClientError> {
        if self.kty != "RSA" {
            return Err(ClientError::Validation(format!(
                "unsupported JWK key type {}",
                self.kty
            )));
        }

        let n = self
            .n
            .as_ref()
            .ok_or_else(|| ClientError::Validation("Missing 'n' component in JWK".to_string()))?;
        let e = self
            .e
            .as_ref()
            .ok_or_else(|| ClientError::Validation("Missing 'e' component in JWK".to_string()))?;

        DecodingKey::from_rsa_components(n, e)
            .map_err(|e| ClientError::Validation(format!("invalid JWK: {e}")))
    }
}

/// A JSON Web Key Set.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    /// The keys in the set.
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Fetch a key set.
    pub async fn fetch(jwks_uri: &str, client: &reqwest::Client) -> Result<Self, ClientError> {
        let response = client.get(jwks_uri).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Protocol(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }
        Ok(response.json::<Jwks>().await?)
    }

    /// Find a key by id. Without an id, the first key is used.
    pub fn find_key(&self, kid: Option<&str>) -> Option<&Jwk> {
        match kid {
            Some(id) => self.keys.iter().find(|k| k.kid.as_deref() == Some(id)),
            None => self.keys.first(),
        }
    }
}

/// Caches key sets per JWKS URI.
pub struct JwksCache {
    http_client: reqwest::Client,
    sets: RwLock<HashMap<String, (Jwks, Instant)>>,
    ttl: Duration,
}

impl JwksCache {
    /// Create a cache with a one hour TTL.
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            sets: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(3600),
        }
    }

    /// Set how long a fetched key set is trusted.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The key set at `jwks_uri`, from cache while fresh.
    pub async fn get_jwks(&self, jwks_uri: &str) -> Result<Jwks, ClientError> {
        {
            let read_guard = self.sets.read().await;
            if let Some((jwks, last_updated)) = read_guard.get(jwks_uri) {
                if last_updated.elapsed() < self.ttl {
                    return Ok(jwks.clone());
                }
            }
        }

        self.refresh(jwks_uri).await
    }

    /// Find a key, refetching the set once when the key id is unknown.
    pub async fn get_key(&self, jwks_uri: &str, kid: Option<&str>) -> Result<Option<Jwk>, ClientError> {
        let jwks = self.get_jwks(jwks_uri).await?;
        if let Some(key) = jwks.find_key(kid) {
            return Ok(Some(key.clone()));
        }

        // Unknown kid: the provider may have rotated its keys.
        let jwks = self.refresh(jwks_uri).await?;
        Ok(jwks.find_key(kid).cloned())
    }

    /// Refetch the key set at `jwks_uri`.
    pub async fn refresh(&self, jwks_uri: &str) -> Result<Jwks, ClientError> {
        let mut write_guard = self.sets.write().await;
        let jwks = Jwks::fetch(jwks_uri, &self.http_client).await?;
        write_guard.insert(jwks_uri.to_string(), (jwks.clone(), Instant::now()));
        Ok(jwks)
    }
}
