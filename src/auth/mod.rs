use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::scope::{Principal, Role};

/// Token claims issued by the authentication service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<Uuid>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: Uuid, role: Role, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub,
            role: role.as_str().to_string(),
            tenant_id: None,
            organization_id: None,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn in_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn in_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }
}

impl TryFrom<Claims> for Principal {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let role: Role = claims.role.parse().map_err(JwtError::InvalidClaims)?;
        if role == Role::Anonymous {
            return Err(JwtError::InvalidClaims("token cannot carry the anonymous role".to_string()));
        }
        let mut principal = Principal::new(claims.sub, role);
        principal.tenant_id = claims.tenant_id;
        principal.organization_id = claims.organization_id;
        Ok(principal)
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Invalid JWT claims: {0}")]
    InvalidClaims(String),
}

/// HMAC key pair derived from the configured secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    configured: bool,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            configured: !secret.is_empty(),
        }
    }

    pub fn generate(&self, claims: &Claims) -> Result<String, JwtError> {
        if !self.configured {
            return Err(JwtError::InvalidSecret);
        }
        encode(&Header::default(), claims, &self.encoding).map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        if !self.configured {
            return Err(JwtError::InvalidSecret);
        }
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| JwtError::InvalidToken(e.to_string()))
    }

    /// Validate a token and turn its claims into a principal
    pub fn principal(&self, token: &str) -> Result<Principal, JwtError> {
        Principal::try_from(self.validate(token)?)
    }
}
