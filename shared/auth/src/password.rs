use bcrypt::{hash, verify};
use workup_common::AppError;

const HASH_COST: u32 = 10;

pub struct PasswordService;

impl PasswordService {
    pub fn hash_password(password: &str) -> Result<String, AppError> {
        hash(password, HASH_COST)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
        verify(password, hash)
            .map_err(|e| AppError::Internal(format!("Failed to verify password: {}", e)))
    }

    pub fn validate_password(password: Option<&str>) -> Result<&str, AppError> {
        match password {
            Some(password) if !password.is_empty() => Ok(password),
            _ => Err(AppError::Validation("Password is required".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hashed = PasswordService::hash_password("s3cret-pass").unwrap();
        assert_ne!(hashed, "s3cret-pass");
        assert!(PasswordService::verify_password("s3cret-pass", &hashed).unwrap());
        assert!(!PasswordService::verify_password("wrong", &hashed).unwrap());
    }

    #[test]
    fn requires_a_password() {
        assert!(PasswordService::validate_password(None).is_err());
        assert!(PasswordService::validate_password(Some("")).is_err());
        assert_eq!(PasswordService::validate_password(Some("x")).unwrap(), "x");
    }
}
