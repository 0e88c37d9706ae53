use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use workup_common::{AppError, JwtConfig, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String, // users.id
    pub email: String,
    pub artisan_id: Option<i32>,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    pub fn new(
        user_id: i32,
        email: String,
        artisan_id: Option<i32>,
        role: UserRole,
        config: &JwtConfig,
    ) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(config.expiration_hours as i64);

        Self {
            sub: user_id.to_string(),
            email,
            artisan_id,
            role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
        }
    }

    pub fn user_id(&self) -> Result<i32, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::Authentication("Invalid user ID in token".to_string()))
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_issuer(&[config.issuer.as_str()]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_ref()),
            decoding_key: DecodingKey::from_secret(config.secret.as_ref()),
            validation,
        }
    }

    pub fn generate_token(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str, issuer: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            expiration_hours: 1,
            issuer: issuer.to_string(),
        }
    }

    #[test]
    fn round_trips_session_claims() {
        let config = config("test-secret", "workup");
        let service = JwtService::new(&config);
        let claims = Claims::new(42, "ada@example.com".into(), Some(7), UserRole::User, &config);

        let token = service.generate_token(&claims).unwrap();
        let decoded = service.validate_token(&token).unwrap();

        assert_eq!(decoded, claims);
        assert_eq!(decoded.user_id().unwrap(), 42);
        assert_eq!(decoded.artisan_id, Some(7));
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let issuing = config("secret-a", "workup");
        let token = JwtService::new(&issuing)
            .generate_token(&Claims::new(1, "a@b.c".into(), None, UserRole::User, &issuing))
            .unwrap();

        let err = JwtService::new(&config("secret-b", "workup"))
            .validate_token(&token)
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[test]
    fn rejects_foreign_issuer() {
        let foreign = config("shared", "someone-else");
        let token = JwtService::new(&foreign)
            .generate_token(&Claims::new(1, "a@b.c".into(), None, UserRole::User, &foreign))
            .unwrap();

        assert!(JwtService::new(&config("shared", "workup")).validate_token(&token).is_err());
    }

    #[test]
    fn rejects_expired_tokens() {
        let config = config("test-secret", "workup");
        let service = JwtService::new(&config);
        let mut claims = Claims::new(1, "a@b.c".into(), None, UserRole::User, &config);
        claims.exp = Utc::now().timestamp() - 3600;

        let token = service.generate_token(&claims).unwrap();
        assert!(service.validate_token(&token).is_err());
    }
}
