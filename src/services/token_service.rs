use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};

use crate::config::AppConfig;
use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{Claims, TokenPair, TokenScope};

/// Issues and verifies the three token kinds (access, refresh, email
/// confirmation). All are HS256 JWTs over `{sub, scope, iat, exp}`; only the
/// scope tag and the TTL differ per kind.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: i64,
    refresh_ttl: i64,
    email_ttl: i64,
}

impl TokenService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: config.jwt_access_ttl,
            refresh_ttl: config.jwt_refresh_ttl,
            email_ttl: config.jwt_email_token_ttl,
        }
    }

    fn create(&self, email: &str, scope: TokenScope, ttl_secs: i64) -> Result<String, AppError> {
        let claims = Claims::new(email, scope, ttl_secs);
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))
    }

    pub fn create_access_token(&self, email: &str) -> Result<String, AppError> {
        self.create(email, TokenScope::Access, self.access_ttl)
    }

    pub fn create_refresh_token(&self, email: &str) -> Result<String, AppError> {
        self.create(email, TokenScope::Refresh, self.refresh_ttl)
    }

    pub fn create_email_token(&self, email: &str) -> Result<String, AppError> {
        self.create(email, TokenScope::EmailConfirmation, self.email_ttl)
    }

    /// Verify signature and expiry, then the scope tag. A token decoded with
    /// the wrong expected scope always fails.
    pub fn decode(&self, token: &str, expected: TokenScope) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::new(ErrorCode::TokenExpired, "token has expired")
                }
                _ => AppError::new(ErrorCode::TokenInvalid, format!("invalid token: {e}")),
            }
        })?;

        if data.claims.scope != expected {
            return Err(AppError::new(
                ErrorCode::TokenScopeMismatch,
                format!("expected a {expected} token, got {}", data.claims.scope),
            ));
        }

        Ok(data.claims)
    }

    /// Access + refresh pair, plus the hash under which the refresh token is
    /// stored on the user row.
    pub fn create_token_pair(&self, email: &str) -> Result<(TokenPair, String), AppError> {
        let access_token = self.create_access_token(email)?;
        let refresh_token = self.create_refresh_token(email)?;
        let refresh_hash = hash_token(&refresh_token);
        let pair = TokenPair::new(access_token, refresh_token, self.access_ttl);
        Ok((pair, refresh_hash))
    }
}

/// SHA-256 hex digest. Refresh tokens are stored hashed so a leaked users
/// table does not yield usable bearer credentials.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    fn service() -> TokenService {
        let config = AppConfig {
            jwt_secret: "test-secret".into(),
            ..test_config()
        };
        TokenService::new(&config)
    }

    fn test_config() -> AppConfig {
        AppConfig {
            port: 0,
            database_url: String::new(),
            redis_url: String::new(),
            base_url: String::new(),
            jwt_secret: "test-secret".into(),
            jwt_access_ttl: 900,
            jwt_refresh_ttl: 604800,
            jwt_email_token_ttl: 86400,
            user_cache_ttl: 300,
            contacts_rate_limit: 2,
            contacts_rate_window: 5,
            resend_api_key: String::new(),
            from_email: String::new(),
            image_host_url: String::new(),
            image_host_api_key: String::new(),
        }
    }

    fn error_code(err: AppError) -> ErrorCode {
        match err {
            AppError::Known { code, .. } => code,
            other => panic!("unexpected error variant: {other}"),
        }
    }

    #[test]
    fn each_kind_decodes_with_its_own_scope() {
        let svc = service();
        let access = svc.create_access_token("a@b.com").unwrap();
        let refresh = svc.create_refresh_token("a@b.com").unwrap();
        let email = svc.create_email_token("a@b.com").unwrap();

        assert_eq!(svc.decode(&access, TokenScope::Access).unwrap().sub, "a@b.com");
        assert_eq!(svc.decode(&refresh, TokenScope::Refresh).unwrap().sub, "a@b.com");
        assert_eq!(
            svc.decode(&email, TokenScope::EmailConfirmation).unwrap().sub,
            "a@b.com"
        );
    }

    #[test]
    fn wrong_scope_always_fails() {
        let svc = service();
        let access = svc.create_access_token("a@b.com").unwrap();
        let refresh = svc.create_refresh_token("a@b.com").unwrap();
        let email = svc.create_email_token("a@b.com").unwrap();

        for (token, wrong) in [
            (&access, TokenScope::Refresh),
            (&access, TokenScope::EmailConfirmation),
            (&refresh, TokenScope::Access),
            (&email, TokenScope::Access),
            (&email, TokenScope::Refresh),
        ] {
            let err = svc.decode(token, wrong).unwrap_err();
            assert_eq!(error_code(err), ErrorCode::TokenScopeMismatch);
        }
    }

    #[test]
    fn expired_token_fails_even_with_valid_signature() {
        let svc = service();
        // Past the 60s default leeway.
        let stale = svc.create("a@b.com", TokenScope::Access, -120).unwrap();
        let err = svc.decode(&stale, TokenScope::Access).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::TokenExpired);
    }

    #[test]
    fn garbage_and_tampered_tokens_fail() {
        let svc = service();
        let err = svc.decode("not-a-token", TokenScope::Access).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::TokenInvalid);

        let mut token = svc.create_access_token("a@b.com").unwrap();
        token.push('x');
        let err = svc.decode(&token, TokenScope::Access).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::TokenInvalid);
    }

    #[test]
    fn foreign_secret_fails() {
        let svc = service();
        let other = TokenService::new(&AppConfig {
            jwt_secret: "different-secret".into(),
            ..test_config()
        });
        let token = other.create_access_token("a@b.com").unwrap();
        let err = svc.decode(&token, TokenScope::Access).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::TokenInvalid);
    }

    #[test]
    fn token_pair_stores_hash_of_refresh_token() {
        let svc = service();
        let (pair, stored_hash) = svc.create_token_pair("a@b.com").unwrap();
        assert_eq!(hash_token(&pair.refresh_token), stored_hash);
        assert_ne!(pair.refresh_token, stored_hash);
        assert_eq!(stored_hash.len(), 64);
    }
}
