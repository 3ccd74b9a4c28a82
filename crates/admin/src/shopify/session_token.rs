//! Session token verification for embedded requests.
//!
//! App Bridge signs a short-lived HS256 JWT with the app's API secret and
//! sends it with every request from the embedded admin. The token's `dest`
//! claim names the shop the merchant is working in.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::is_valid_shop_domain;

/// Clock skew tolerated on `exp` and `nbf`, in seconds.
const LEEWAY_SECS: u64 = 5;

/// Errors verifying a session token.
#[derive(Debug, Error)]
pub enum SessionTokenError {
    /// Signature, expiry, audience or structure is invalid.
    #[error("Invalid session token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    /// `iss` and `dest` point at different shops.
    #[error("Session token issuer does not match destination")]
    IssuerMismatch,

    /// `dest` is not a shop domain.
    #[error("Session token destination is not a valid shop: {0}")]
    InvalidShop(String),
}

/// Claims carried by a Shopify session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokenClaims {
    /// Shop admin URL, e.g. `https://demo.myshopify.com/admin`.
    pub iss: String,
    /// Shop URL, e.g. `https://demo.myshopify.com`.
    pub dest: String,
    /// The app's API key.
    pub aud: String,
    /// Shopify user ID.
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub sid: Option<String>,
}

/// Verifies session tokens for one app.
#[derive(Clone)]
pub struct SessionTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionTokenVerifier {
    /// Create a verifier for tokens addressed to `api_key`.
    #[must_use]
    pub fn new(api_key: &str, api_secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[api_key]);
        validation.set_required_spec_claims(&["exp", "nbf", "aud"]);
        validation.validate_nbf = true;
        validation.leeway = LEEWAY_SECS;

        Self {
            key: DecodingKey::from_secret(api_secret.expose_secret().as_bytes()),
            validation,
        }
    }

    /// Verify a token and return the shop domain it was issued for.
    ///
    /// # Errors
    ///
    /// Returns a `SessionTokenError` if the token is invalid, expired, meant
    /// for another app, or does not name a valid shop.
    pub fn verify(&self, token: &str) -> Result<(String, SessionTokenClaims), SessionTokenError> {
        let claims = decode::<SessionTokenClaims>(token, &self.key, &self.validation)?.claims;

        let dest_host = host_of(&claims.dest)
            .ok_or_else(|| SessionTokenError::InvalidShop(claims.dest.clone()))?;
        let iss_host = host_of(&claims.iss).ok_or(SessionTokenError::IssuerMismatch)?;
        if dest_host != iss_host {
            return Err(SessionTokenError::IssuerMismatch);
        }
        if !is_valid_shop_domain(&dest_host) {
            return Err(SessionTokenError::InvalidShop(dest_host));
        }

        Ok((dest_host, claims))
    }
}

impl std::fmt::Debug for SessionTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenVerifier")
            .field("key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;

    const API_KEY: &str = "test-api-key";
    const API_SECRET: &str = "test-api-secret-with-enough-entropy-9f8e7d";

    fn claims(shop: &str) -> SessionTokenClaims {
        let now = chrono::Utc::now().timestamp();
        SessionTokenClaims {
            iss: format!("https://{shop}/admin"),
            dest: format!("https://{shop}"),
            aud: API_KEY.to_string(),
            sub: Some("42".to_string()),
            exp: now + 60,
            nbf: now - 10,
            iat: now - 10,
            jti: Some("jti-1".to_string()),
            sid: Some("sid-1".to_string()),
        }
    }

    fn sign(claims: &SessionTokenClaims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encoding should succeed")
    }

    fn verifier() -> SessionTokenVerifier {
        SessionTokenVerifier::new(API_KEY, &SecretString::from(API_SECRET))
    }

    #[test]
    fn test_valid_token_yields_shop() {
        let token = sign(&claims("demo.myshopify.com"), API_SECRET);
        let (shop, claims) = verifier().verify(&token).expect("valid token");
        assert_eq!(shop, "demo.myshopify.com");
        assert_eq!(claims.sub.as_deref(), Some("42"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = sign(&claims("demo.myshopify.com"), "some-other-secret");
        assert!(matches!(verifier().verify(&token), Err(SessionTokenError::Invalid(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut expired = claims("demo.myshopify.com");
        expired.exp = chrono::Utc::now().timestamp() - 300;
        let token = sign(&expired, API_SECRET);
        assert!(matches!(verifier().verify(&token), Err(SessionTokenError::Invalid(_))));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let mut other = claims("demo.myshopify.com");
        other.aud = "another-app".to_string();
        let token = sign(&other, API_SECRET);
        assert!(matches!(verifier().verify(&token), Err(SessionTokenError::Invalid(_))));
    }

    #[test]
    fn test_not_yet_valid_token_rejected() {
        let mut early = claims("demo.myshopify.com");
        early.nbf = chrono::Utc::now().timestamp() + 300;
        let token = sign(&early, API_SECRET);
        assert!(matches!(verifier().verify(&token), Err(SessionTokenError::Invalid(_))));
    }

    #[test]
    fn test_issuer_mismatch_rejected() {
        let mut mismatched = claims("demo.myshopify.com");
        mismatched.iss = "https://other.myshopify.com/admin".to_string();
        let token = sign(&mismatched, API_SECRET);
        assert!(matches!(
            verifier().verify(&token),
            Err(SessionTokenError::IssuerMismatch)
        ));
    }

    #[test]
    fn test_non_shop_destination_rejected() {
        let token = sign(&claims("evil.example.com"), API_SECRET);
        assert!(matches!(
            verifier().verify(&token),
            Err(SessionTokenError::InvalidShop(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(verifier().verify("not.a.jwt").is_err());
    }
}
