//! Role token verification
//!
//! A role token is an RS256-signed JWT carrying [`RoleClaims`]. `exp` is
//! optional (absent means the token never expires) and `jti` identifies the
//! token for revocation.

use crate::error::TokenError;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Typed payload of a role token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleClaims {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

/// Result of verifying a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenVerification {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TokenVerification {
    fn from_result(result: Result<RoleClaims, TokenError>) -> Self {
        match result {
            Ok(claims) => Self {
                valid: true,
                role: Some(claims.role),
                error: None,
            },
            Err(e) => Self {
                valid: false,
                role: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Verifies role tokens against one RSA public key
pub struct RoleTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl RoleTokenVerifier {
    /// Create a verifier from a PEM-encoded RSA public key
    pub fn new(public_key_pem: &str) -> Result<Self, TokenError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims::<&str>(&[]);
        validation.validate_aud = false;

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Verify signature, expiry and revocation, returning the claims
    pub fn verify_claims(
        &self,
        token: &[u8],
        revoked: &[String],
    ) -> Result<RoleClaims, TokenError> {
        let token = std::str::from_utf8(token).map_err(|_| TokenError::Encoding)?.trim();

        let data = decode::<RoleClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;
        let claims = data.claims;

        if let Some(jti) = &claims.jti
            && revoked.iter().any(|r| r == jti)
        {
            return Err(TokenError::Revoked(jti.clone()));
        }
        if claims.role.is_empty() {
            return Err(TokenError::Invalid("empty role claim".to_string()));
        }

        debug!(role = %claims.role, "Role token verified");
        Ok(claims)
    }

    /// Verify a token, folding any failure into the result
    pub fn verify(&self, token: &[u8], revoked: &[String]) -> TokenVerification {
        TokenVerification::from_result(self.verify_claims(token, revoked))
    }
}
