use chrono::{Duration, Utc};
use sqlx::PgPool;

use workup_auth::{Claims, JwtService, PasswordService};
use workup_common::{AppError, JwtConfig, UserRole};
use workup_database::User;

use crate::domain::validate_request;
use crate::models::{SessionView, SigninRequest, SigninResponse, SignupRequest};
use crate::services::AppState;

const EMAIL_TAKEN: &str = "Email already exists";

pub struct AccountService {
    db_pool: PgPool,
    jwt_service: JwtService,
    jwt_config: JwtConfig,
}

impl AccountService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            jwt_service: state.jwt_service.clone(),
            jwt_config: state.config.jwt.clone(),
        }
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<User, AppError> {
        let password = PasswordService::validate_password(request.password.as_deref())?;
        validate_request(&request)?;

        let email = request.email.trim().to_lowercase();

        let existing = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&email)
            .fetch_one(&self.db_pool)
            .await?;

        if existing {
            return Err(AppError::Validation(EMAIL_TAKEN.to_string()));
        }

        let hashed_password = PasswordService::hash_password(password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, first_name, last_name, password)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&email)
        .bind(request.first_name.trim())
        .bind(request.last_name.trim())
        .bind(&hashed_password)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| match AppError::on_unique_violation(e, EMAIL_TAKEN) {
            // A concurrent signup won the race; report it like the pre-check does
            AppError::Conflict(msg) => AppError::Validation(msg),
            other => other,
        })?;

        tracing::info!("User registered: {} ({})", user.id, user.email);
        Ok(user)
    }

    pub async fn signin(&self, request: SigninRequest) -> Result<SigninResponse, AppError> {
        let invalid = || AppError::Authentication("Invalid email or password".to_string());

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(request.email.trim().to_lowercase())
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(invalid)?;

        if !PasswordService::verify_password(&request.password, &user.password)? {
            return Err(invalid());
        }

        let claims = Claims::new(
            user.id,
            user.email.clone(),
            user.artisanid,
            UserRole::parse(&user.role),
            &self.jwt_config,
        );
        let token = self.jwt_service.generate_token(&claims)?;
        let session = self.session(user.id).await?;

        tracing::info!("User logged in: {}", user.id);

        Ok(SigninResponse {
            message: "Login successful".to_string(),
            user,
            token,
            expires_at: Utc::now() + Duration::hours(self.jwt_config.expiration_hours as i64),
            session,
        })
    }

    pub async fn session(&self, user_id: i32) -> Result<SessionView, AppError> {
        sqlx::query_as::<_, SessionView>(
            r#"
            SELECT u.id AS user_id, u.email, u.first_name, u.last_name,
                   a.id AS artisan_id, a.id IS NOT NULL AS is_artisan, a.coins
            FROM users u
            LEFT JOIN artisans a ON a.id = u.artisanid
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// The user's current artisan link, read fresh. Session tokens only carry
    /// the link as it was at sign-in.
    pub async fn linked_artisan(&self, user_id: i32) -> Result<Option<i32>, AppError> {
        let linked = sqlx::query_scalar::<_, Option<i32>>("SELECT artisanid FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(linked.flatten())
    }
}
