//! Bearer credential issued by the registry
//!
//! The registry signs its tokens and verifies them on every request; the
//! client only needs to read its own identity out of the payload, so claims
//! are decoded without signature or expiry checks.

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

use callsync_call_core::UserId;

use crate::error::{ClientError, Result};

/// Claims carried by a registry-issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    pub sub: String,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub exp: Option<u64>,
    #[serde(default)]
    pub iat: Option<u64>,
}

/// Bearer token attached to every registry request
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Decode the token payload
    pub fn claims(&self) -> Result<CredentialClaims> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<CredentialClaims>(&self.token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|e| ClientError::InvalidCredential(e.to_string()))
    }

    /// The user this credential authenticates
    pub fn user_id(&self) -> Result<UserId> {
        self.claims().map(|c| c.user_id)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("token", &"<redacted>").finish()
    }
}
