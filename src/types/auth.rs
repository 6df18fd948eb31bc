use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Purpose tag embedded in every token's claims. A token presented for a
/// purpose other than the one it was issued for must be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    Access,
    Refresh,
    EmailConfirmation,
}

impl std::fmt::Display for TokenScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenScope::Access => write!(f, "access"),
            TokenScope::Refresh => write!(f, "refresh"),
            TokenScope::EmailConfirmation => write!(f, "email_confirmation"),
        }
    }
}

impl std::str::FromStr for TokenScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenScope::Access),
            "refresh" => Ok(TokenScope::Refresh),
            "email_confirmation" => Ok(TokenScope::EmailConfirmation),
            _ => Err(format!("unknown token scope: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Email of the user the token authenticates.
    pub sub: String,
    pub scope: TokenScope,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(email: &str, scope: TokenScope, duration_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: email.to_string(),
            scope,
            iat: now,
            exp: now + duration_secs,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl TokenPair {
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn scope_round_trips_through_strings() {
        for scope in [TokenScope::Access, TokenScope::Refresh, TokenScope::EmailConfirmation] {
            assert_eq!(TokenScope::from_str(&scope.to_string()).unwrap(), scope);
        }
        assert!(TokenScope::from_str("admin").is_err());
    }

    #[test]
    fn scope_serializes_as_snake_case() {
        let json = serde_json::to_string(&TokenScope::EmailConfirmation).unwrap();
        assert_eq!(json, "\"email_confirmation\"");
    }

    #[test]
    fn claims_carry_expiry_window() {
        let claims = Claims::new("a@b.com", TokenScope::Access, 900);
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(claims.sub, "a@b.com");
    }

    #[test]
    fn token_pair_is_bearer() {
        let pair = TokenPair::new("a".into(), "r".into(), 900);
        assert_eq!(pair.token_type, "bearer");
    }
}
