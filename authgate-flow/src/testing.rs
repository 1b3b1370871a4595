//! Fake collaborators shared by the flow tests.

use async_trait::async_trait;
use authgate_core::{
    CallbackParams, CheckCookie, CheckKind, ClientError, CookieOptions, CookieVerifier,
    IdentityClient, LegacyOAuthClient, Profile, ProviderConfig, TokenSet, VerificationChecks,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// An unsigned compact JWT carrying `claims`.
pub fn id_token_with(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

#[derive(Default)]
pub struct FakeIdentityClient {
    calls: Mutex<Vec<&'static str>>,
    checks: Mutex<Option<VerificationChecks>>,
    userinfo_params: Mutex<Option<BTreeMap<String, String>>>,
    tokens: Option<TokenSet>,
    userinfo: Option<Value>,
    fail_exchange: bool,
}

impl FakeIdentityClient {
    pub fn with_tokens(mut self, tokens: TokenSet) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_userinfo(mut self, profile: Value) -> Self {
        self.userinfo = Some(profile);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_exchange = true;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_checks(&self) -> Option<VerificationChecks> {
        self.checks.lock().unwrap().clone()
    }

    pub fn last_userinfo_params(&self) -> Option<BTreeMap<String, String>> {
        self.userinfo_params.lock().unwrap().clone()
    }

    fn exchange(
        &self,
        call: &'static str,
        checks: &VerificationChecks,
    ) -> Result<TokenSet, ClientError> {
        self.calls.lock().unwrap().push(call);
        *self.checks.lock().unwrap() = Some(checks.clone());
        if self.fail_exchange {
            return Err(ClientError::Protocol("invalid_grant".into()));
        }
        Ok(self.tokens.clone().unwrap_or_else(|| TokenSet {
            access_token: "access-token".into(),
            ..Default::default()
        }))
    }
}

#[async_trait]
impl IdentityClient for FakeIdentityClient {
    async fn oidc_callback(
        &self,
        _provider: &ProviderConfig,
        _params: &CallbackParams,
        checks: &VerificationChecks,
    ) -> Result<TokenSet, ClientError> {
        self.exchange("oidc_callback", checks)
    }

    async fn oauth_callback(
        &self,
        _provider: &ProviderConfig,
        _params: &CallbackParams,
        checks: &VerificationChecks,
    ) -> Result<TokenSet, ClientError> {
        self.exchange("oauth_callback", checks)
    }

    async fn userinfo(
        &self,
        _provider: &ProviderConfig,
        _access_token: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Profile, ClientError> {
        self.calls.lock().unwrap().push("userinfo");
        *self.userinfo_params.lock().unwrap() = Some(params.clone());
        match &self.userinfo {
            Some(Value::Object(profile)) => Ok(profile.clone()),
            _ => Err(ClientError::Protocol("userinfo unavailable".into())),
        }
    }
}

pub struct FakeLegacyClient {
    profile: Value,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeLegacyClient {
    pub fn new(profile: Value) -> Self {
        Self {
            profile,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LegacyOAuthClient for FakeLegacyClient {
    async fn access_token(
        &self,
        _provider: &ProviderConfig,
        oauth_token: &str,
        oauth_verifier: &str,
    ) -> Result<TokenSet, ClientError> {
        self.calls.lock().unwrap().push("access_token");
        TokenSet::from_response(json!({
            "access_token": format!("access-for-{oauth_token}"),
            "oauth_token_secret": format!("secret-for-{oauth_verifier}"),
        }))
    }

    async fn get(
        &self,
        _provider: &ProviderConfig,
        _url: &str,
        _oauth_token: &str,
        _oauth_token_secret: &str,
    ) -> Result<Value, ClientError> {
        self.calls.lock().unwrap().push("get");
        Ok(self.profile.clone())
    }
}

/// Wraps a verifier and records which check kinds were looked up.
pub struct RecordingVerifier<V> {
    inner: V,
    seen: Mutex<Vec<CheckKind>>,
}

impl<V> RecordingVerifier<V> {
    pub fn new(inner: V) -> Self {
        Self {
            inner,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<CheckKind> {
        self.seen.lock().unwrap().clone()
    }
}

impl<V: CookieVerifier> CookieVerifier for RecordingVerifier<V> {
    fn verify(
        &self,
        kind: CheckKind,
        name: &str,
        raw: Option<&str>,
        options: &CookieOptions,
    ) -> CheckCookie {
        self.seen.lock().unwrap().push(kind);
        self.inner.verify(kind, name, raw, options)
    }
}
