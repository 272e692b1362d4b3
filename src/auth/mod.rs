//! Scoped bearer tokens.
//!
//! Every token is bound to exactly one domain: the system domain or a single
//! trust. A token is only honoured on requests that resolved to that same
//! domain, which keeps system operators off trust hosts and trust staff off
//! the system host and each other's hosts.

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::tenant::TenantContext;

const TRUST_SCOPE_PREFIX: &str = "trust:";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("JWT secret not configured")]
    SecretMissing,

    #[error("Missing Authorization header")]
    Missing,

    #[error("{0}")]
    Malformed(String),

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Cross-domain access denied")]
    ScopeMismatch,

    #[error("Role {0} may not perform this operation")]
    InsufficientRole(Role),
}

/// Domain a token is valid for. Serialized as `system` or `trust:<code>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TokenScope {
    System,
    Trust(String),
}

impl TokenScope {
    /// Scope a request context demands
    pub fn for_context(context: &TenantContext) -> Self {
        match context {
            TenantContext::System => TokenScope::System,
            TenantContext::Trust(trust) => TokenScope::Trust(trust.trust_code.to_ascii_lowercase()),
        }
    }

    /// Whether this scope grants access to the context; trust codes compare
    /// case-insensitively
    pub fn covers(&self, context: &TenantContext) -> bool {
        match (self, context) {
            (TokenScope::System, TenantContext::System) => true,
            (TokenScope::Trust(code), TenantContext::Trust(trust)) => {
                code.eq_ignore_ascii_case(&trust.trust_code)
            }
            _ => false,
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenScope::System => f.write_str("system"),
            TokenScope::Trust(code) => write!(f, "{}{}", TRUST_SCOPE_PREFIX, code),
        }
    }
}

impl TryFrom<String> for TokenScope {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "system" {
            return Ok(TokenScope::System);
        }
        match value.strip_prefix(TRUST_SCOPE_PREFIX) {
            Some(code) if !code.is_empty() => Ok(TokenScope::Trust(code.to_ascii_lowercase())),
            _ => Err(format!("invalid token scope '{}'", value)),
        }
    }
}

impl From<TokenScope> for String {
    fn from(scope: TokenScope) -> Self {
        scope.to_string()
    }
}

impl std::str::FromStr for TokenScope {
    type Err = String;

    /// Accepts `system`, `trust:<code>`, or a bare trust code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("scope cannot be empty".to_string());
        }
        if s == "system" || s.starts_with(TRUST_SCOPE_PREFIX) {
            return TokenScope::try_from(s.to_string());
        }
        Ok(TokenScope::Trust(s.to_ascii_lowercase()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SystemAdmin,
    TrustAdmin,
    Staff,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::SystemAdmin => "SYSTEM_ADMIN",
            Role::TrustAdmin => "TRUST_ADMIN",
            Role::Staff => "STAFF",
        })
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SYSTEM_ADMIN" => Ok(Role::SystemAdmin),
            "TRUST_ADMIN" => Ok(Role::TrustAdmin),
            "STAFF" => Ok(Role::Staff),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub scope: TokenScope,
    pub role: Role,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    pub fn new(
        sub: impl Into<String>,
        scope: TokenScope,
        role: Role,
        security: &SecurityConfig,
    ) -> Result<Self, TokenError> {
        let hours = i64::try_from(security.jwt_expiry_hours)
            .map_err(|_| TokenError::Invalid("token lifetime out of range".to_string()))?;
        Self::with_expiry(sub, scope, role, security, hours)
    }

    /// Claims expiring `expiry_hours` from now; lifetimes past chrono's
    /// range are rejected rather than wrapped
    pub fn with_expiry(
        sub: impl Into<String>,
        scope: TokenScope,
        role: Role,
        security: &SecurityConfig,
        expiry_hours: i64,
    ) -> Result<Self, TokenError> {
        let now = Utc::now();
        let exp = Duration::try_hours(expiry_hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| TokenError::Invalid("token lifetime out of range".to_string()))?;

        Ok(Self {
            sub: sub.into(),
            scope,
            role,
            iss: security.jwt_issuer.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        })
    }
}

pub fn generate_token(claims: &Claims, security: &SecurityConfig) -> Result<String, TokenError> {
    if security.jwt_secret.is_empty() {
        return Err(TokenError::SecretMissing);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| TokenError::Invalid(e.to_string()))
}

pub fn validate_token(token: &str, security: &SecurityConfig) -> Result<Claims, TokenError> {
    if security.jwt_secret.is_empty() {
        return Err(TokenError::SecretMissing);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[security.jwt_issuer.as_str()]);

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| TokenError::Invalid(e.to_string()))
}

/// Reject tokens issued for a different domain than the request resolved to
pub fn authorize(claims: &Claims, context: &TenantContext) -> Result<(), TokenError> {
    if !claims.scope.covers(context) {
        return Err(TokenError::ScopeMismatch);
    }
    // A trust token can never carry the platform role
    if matches!(claims.scope, TokenScope::Trust(_)) && claims.role == Role::SystemAdmin {
        return Err(TokenError::InsufficientRole(claims.role));
    }
    Ok(())
}

/// Extract the bearer token from an Authorization header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, TokenError> {
    let value = header.ok_or(TokenError::Missing)?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| TokenError::Malformed("Authorization header must use Bearer token format".to_string()))?
        .trim();
    if token.is_empty() {
        return Err(TokenError::Malformed("Empty JWT token".to_string()));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::testing::trust_fixture;
    use crate::database::TrustStatus;

    fn security() -> SecurityConfig {
        AppConfig::development().security
    }

    fn trust_context(code: &str) -> TenantContext {
        TenantContext::Trust(trust_fixture(1, code, TrustStatus::Active))
    }

    #[test]
    fn token_roundtrip() {
        let security = security();
        let claims = Claims::new("sysadmin", TokenScope::System, Role::SystemAdmin, &security).unwrap();
        let token = generate_token(&claims, &security).unwrap();

        let decoded = validate_token(&token, &security).unwrap();
        assert_eq!(decoded.sub, "sysadmin");
        assert_eq!(decoded.scope, TokenScope::System);
        assert_eq!(decoded.role, Role::SystemAdmin);
    }

    #[test]
    fn wrong_secret_and_issuer_are_rejected() {
        let security = security();
        let claims = Claims::new("a", TokenScope::System, Role::SystemAdmin, &security).unwrap();
        let token = generate_token(&claims, &security).unwrap();

        let mut other = security.clone();
        other.jwt_secret = "another-secret".into();
        assert!(matches!(validate_token(&token, &other), Err(TokenError::Invalid(_))));

        let mut other = security.clone();
        other.jwt_issuer = "someone-else".into();
        assert!(matches!(validate_token(&token, &other), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let security = security();
        let claims = Claims::with_expiry("a", TokenScope::System, Role::SystemAdmin, &security, -2).unwrap();
        let token = generate_token(&claims, &security).unwrap();
        assert!(matches!(validate_token(&token, &security), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let mut security = security();
        security.jwt_secret.clear();
        let claims = Claims::new("a", TokenScope::System, Role::SystemAdmin, &security).unwrap();
        assert_eq!(generate_token(&claims, &security), Err(TokenError::SecretMissing));
    }

    #[test]
    fn scope_serializes_as_tagged_string() {
        let scope = TokenScope::Trust("demo".into());
        assert_eq!(serde_json::to_value(&scope).unwrap(), "trust:demo");
        let parsed: TokenScope = serde_json::from_value("system".into()).unwrap();
        assert_eq!(parsed, TokenScope::System);
        assert!(serde_json::from_value::<TokenScope>("trust:".into()).is_err());
    }

    #[test]
    fn scope_parses_bare_codes() {
        assert_eq!("demo".parse::<TokenScope>().unwrap(), TokenScope::Trust("demo".into()));
        assert_eq!("trust:system".parse::<TokenScope>().unwrap(), TokenScope::Trust("system".into()));
        assert_eq!("system".parse::<TokenScope>().unwrap(), TokenScope::System);
    }

    #[test]
    fn system_token_is_blocked_on_trust_host() {
        let claims = Claims::new("sysadmin", TokenScope::System, Role::SystemAdmin, &security()).unwrap();
        assert_eq!(authorize(&claims, &trust_context("demo")), Err(TokenError::ScopeMismatch));
        assert_eq!(authorize(&claims, &TenantContext::System), Ok(()));
    }

    #[test]
    fn trust_token_is_blocked_elsewhere() {
        let claims = Claims::new(
            "admin@demo.school",
            TokenScope::Trust("demo".into()),
            Role::TrustAdmin,
            &security(),
        )
        .unwrap();
        assert_eq!(authorize(&claims, &trust_context("demo")), Ok(()));
        assert_eq!(authorize(&claims, &trust_context("maroon")), Err(TokenError::ScopeMismatch));
        assert_eq!(authorize(&claims, &TenantContext::System), Err(TokenError::ScopeMismatch));
    }

    #[test]
    fn trust_named_system_cannot_borrow_system_tokens() {
        let claims = Claims::new("sysadmin", TokenScope::System, Role::SystemAdmin, &security()).unwrap();
        assert_eq!(authorize(&claims, &trust_context("system")), Err(TokenError::ScopeMismatch));
    }

    #[test]
    fn trust_scope_cannot_hold_platform_role() {
        let claims = Claims::new("x", TokenScope::Trust("demo".into()), Role::SystemAdmin, &security()).unwrap();
        assert_eq!(
            authorize(&claims, &trust_context("demo")),
            Err(TokenError::InsufficientRole(Role::SystemAdmin))
        );
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(None), Err(TokenError::Missing));
        assert!(matches!(bearer_token(Some("Basic abc")), Err(TokenError::Malformed(_))));
        assert!(matches!(bearer_token(Some("Bearer   ")), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn out_of_range_lifetime_is_an_error() {
        let security = security();
        let result =
            Claims::with_expiry("a", TokenScope::System, Role::SystemAdmin, &security, 9_999_999_999_999);
        assert!(matches!(result, Err(TokenError::Invalid(_))));

        let mut security = security;
        security.jwt_expiry_hours = u64::MAX;
        assert!(Claims::new("a", TokenScope::System, Role::SystemAdmin, &security).is_err());
    }

    #[test]
    fn scope_codes_are_case_insensitive() {
        assert_eq!("Demo".parse::<TokenScope>().unwrap(), TokenScope::Trust("demo".into()));
        assert_eq!("trust:DEMO".parse::<TokenScope>().unwrap(), TokenScope::Trust("demo".into()));

        let claims = Claims::new(
            "staff@demo.school",
            "Demo".parse().unwrap(),
            Role::Staff,
            &security(),
        )
        .unwrap();
        assert_eq!(authorize(&claims, &trust_context("demo")), Ok(()));
        assert_eq!(authorize(&claims, &trust_context("DEMO")), Ok(()));
        assert_eq!(authorize(&claims, &trust_context("maroon")), Err(TokenError::ScopeMismatch));
    }
}
