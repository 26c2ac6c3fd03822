//! JWT validation against the configured OIDC issuer.
//!
//! Signature verification is delegated to `jsonwebtoken`; this module owns
//! the trust contract: keys come from the issuer's JWKS document, are
//! cached by `kid`, and are refreshed when a token arrives signed with an
//! unknown key. The [`TokenVerifier`] trait is the seam the auth filter
//! depends on, so tests can substitute a static verifier.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use portico_core::Principal;

/// Authentication failures. All of them surface as 401 to the client.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token signed with unknown key '{0}'")]
    UnknownKey(String),

    #[error("failed to fetch JWKS: {0}")]
    KeyFetch(String),
}

/// Validates a bearer token and produces the request principal.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError>;
}

/// One key entry in a JWKS document.
#[derive(Debug, Deserialize)]
struct JwkEntry {
    #[serde(default)]
    kty: String,
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

/// A JWKS document as served by the issuer.
#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<JwkEntry>,
}

/// JWKS-backed verifier for RS256 tokens.
pub struct JwksVerifier {
    issuer: String,
    jwks_url: String,
    client: reqwest::Client,
    keys: RwLock<HashMap<String, DecodingKey>>,
    /// Refreshes are rate limited so a flood of bad-kid tokens cannot hammer
    /// the issuer.
    last_refresh: Mutex<Option<Instant>>,
    refresh_cooldown: Duration,
}

impl JwksVerifier {
    /// Create a verifier for the given issuer.
    ///
    /// `jwks_url` is the full URL of the JWKS document. Keys are fetched
    /// lazily on first use and refreshed when an unknown `kid` appears.
    pub fn new(issuer: impl Into<String>, jwks_url: impl Into<String>) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        Ok(Self {
            issuer: issuer.into(),
            jwks_url: jwks_url.into(),
            client,
            keys: RwLock::new(HashMap::new()),
            last_refresh: Mutex::new(None),
            refresh_cooldown: Duration::from_secs(30),
        })
    }

    /// Fetch the JWKS document and swap the key table.
    async fn refresh_keys(&self) -> Result<(), AuthError> {
        {
            let mut last = self.last_refresh.lock();
            if let Some(at) = *last
                && at.elapsed() < self.refresh_cooldown
            {
                return Ok(());
            }
            *last = Some(Instant::now());
        }

        let doc: JwksDocument = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        let mut table = HashMap::new();
        for entry in doc.keys {
            let (Some(kid), Some(n), Some(e)) = (entry.kid, entry.n, entry.e) else {
                continue;
            };
            if entry.kty != "RSA" {
                continue;
            }
            match DecodingKey::from_rsa_components(&n, &e) {
                Ok(key) => {
                    table.insert(kid, key);
                }
                Err(err) => {
                    warn!(kid = %kid, error = %err, "skipping unusable JWK entry");
                }
            }
        }

        debug!(keys = table.len(), url = %self.jwks_url, "JWKS refreshed");
        *self.keys.write() = table;
        Ok(())
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.keys.read().get(kid) {
            return Ok(key.clone());
        }

        self.refresh_keys().await?;

        self.keys
            .read()
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKey(kid.to_owned()))
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::Invalid(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::Invalid("token header missing kid".into()))?;

        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_aud = false;

        let data = decode::<serde_json::Map<String, serde_json::Value>>(token, &key, &validation)
            .map_err(|e| AuthError::Invalid(e.to_string()))?;

        Ok(principal_from_claims(&data.claims))
    }
}

/// Build a [`Principal`] from validated claims.
///
/// Username comes from `preferred_username` falling back to `sub`; roles
/// from a top-level `roles` array or the Keycloak-style
/// `realm_access.roles`.
#[must_use]
pub fn principal_from_claims(claims: &serde_json::Map<String, serde_json::Value>) -> Principal {
    let username = claims
        .get("preferred_username")
        .or_else(|| claims.get("sub"))
        .and_then(|v| v.as_str())
        .unwrap_or("anonymous")
        .to_owned();

    let roles_value = claims
        .get("roles")
        .or_else(|| claims.get("realm_access").and_then(|ra| ra.get("roles")));

    let roles = roles_value
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|r| r.as_str())
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let mut principal = Principal::new(username, roles);
    principal.claims = claims.clone().into_iter().collect();
    principal
}

/// Verifier backed by a fixed token table. Test helper.
#[derive(Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Principal>,
}

impl StaticTokenVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }

    #[must_use]
    pub fn into_arc(self) -> Arc<dyn TokenVerifier> {
        Arc::new(self)
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::Invalid("unknown token".into()))
    }
}
