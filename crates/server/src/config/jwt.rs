use serde::Deserialize;

/// JWT validation settings.
#[derive(Debug, Deserialize)]
pub struct JwtConfig {
    /// OIDC issuer URL; the `iss` claim must match exactly.
    #[serde(default = "default_issuer")]
    pub issuer_url: String,

    /// Full JWKS URL. When unset, the Keycloak-style default
    /// `{issuer_url}/protocol/openid-connect/certs` is used.
    #[serde(default)]
    pub jwks_url: Option<String>,

    /// Paths that bypass authentication. These are also the only paths the
    /// IP rate limiter applies to.
    #[serde(default = "default_unauthenticated_paths")]
    pub unauthenticated_paths: Vec<String>,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer_url: default_issuer(),
            jwks_url: None,
            unauthenticated_paths: default_unauthenticated_paths(),
        }
    }
}

impl JwtConfig {
    /// The effective JWKS URL.
    #[must_use]
    pub fn effective_jwks_url(&self) -> String {
        self.jwks_url.clone().unwrap_or_else(|| {
            format!(
                "{}/protocol/openid-connect/certs",
                self.issuer_url.trim_end_matches('/')
            )
        })
    }
}

fn default_issuer() -> String {
    "http://127.0.0.1:8180/realms/platform".to_owned()
}

fn default_unauthenticated_paths() -> Vec<String> {
    vec![
        "/control/bootstrap".to_owned(),
        "/control/ui-bootstrap".to_owned(),
        "/control/tenants/slug-map".to_owned(),
    ]
}
