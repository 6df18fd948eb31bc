use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::errors::{AppError, ErrorCode};

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one number"));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one letter"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_succeeds() {
        let hash = hash_password("secret-pass1").unwrap();
        assert!(verify_password("secret-pass1", &hash).unwrap());
    }

    #[test]
    fn verify_rejects_other_password() {
        let hash = hash_password("secret-pass1").unwrap();
        assert!(!verify_password("secret-pass2", &hash).unwrap());
    }

    #[test]
    fn hash_is_salted_per_call() {
        let first = hash_password("secret-pass1").unwrap();
        let second = hash_password("secret-pass1").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("secret-pass1", &second).unwrap());
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let hash = hash_password("secret-pass1").unwrap();
        assert!(!hash.contains("secret-pass1"));
    }

    #[test]
    fn weak_passwords_are_rejected() {
        assert!(validate_password("short1").is_err());
        assert!(validate_password("lettersonly").is_err());
        assert!(validate_password("12345678901").is_err());
        assert!(validate_password("letters123").is_ok());
    }
}
