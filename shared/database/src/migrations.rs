use sqlx::{migrate::Migrate, PgPool};
use workup_auth::PasswordService;
use workup_common::AppError;

pub struct MigrationRunner {
    pool: PgPool,
}

impl MigrationRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_all_migrations(&self) -> Result<(), AppError> {
        tracing::info!("Starting database migrations...");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;

        tracing::info!("All migrations completed successfully");
        Ok(())
    }

    pub async fn check_migration_status(&self) -> Result<MigrationStatus, AppError> {
        let migrator = sqlx::migrate!("./migrations");

        let mut conn = self.pool.acquire().await?;
        conn.ensure_migrations_table()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read migrations table: {}", e)))?;
        let applied = conn
            .list_applied_migrations()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to list migrations: {}", e)))?;

        let total_migrations = migrator.migrations.len();
        let applied_count = applied.len();
        let pending_count = total_migrations.saturating_sub(applied_count);

        Ok(MigrationStatus {
            total: total_migrations,
            applied: applied_count,
            pending: pending_count,
            is_up_to_date: pending_count == 0,
        })
    }

    /// Inserts a demo client and a demo artisan (with a linked login) unless
    /// their accounts already exist.
    pub async fn seed_demo_data(&self) -> Result<(), AppError> {
        let client_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind("client@workup.ng")
        .fetch_one(&self.pool)
        .await?;

        if !client_exists {
            let password = PasswordService::hash_password("client123!")?;
            sqlx::query(
                "INSERT INTO users (email, first_name, last_name, password) VALUES ($1, $2, $3, $4)",
            )
            .bind("client@workup.ng")
            .bind("Demo")
            .bind("Client")
            .bind(password)
            .execute(&self.pool)
            .await?;

            tracing::info!("Demo client created");
        }

        let artisan_user_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind("artisan@workup.ng")
        .fetch_one(&self.pool)
        .await?;

        if !artisan_user_exists {
            let mut tx = self.pool.begin().await?;

            let artisan_id: i32 = sqlx::query_scalar(
                r#"
                INSERT INTO artisans (firstname, lastname, phone, city, skill, experience, bio, email)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id
                "#,
            )
            .bind("Demo")
            .bind("Electrician")
            .bind("+2348000000000")
            .bind("Lagos")
            .bind("Electrician")
            .bind("5 years")
            .bind("House wiring and repairs")
            .bind("artisan@workup.ng")
            .fetch_one(&mut *tx)
            .await?;

            let password = PasswordService::hash_password("artisan123!")?;
            sqlx::query(
                r#"
                INSERT INTO users (email, first_name, last_name, password, artisanid)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind("artisan@workup.ng")
            .bind("Demo")
            .bind("Electrician")
            .bind(password)
            .bind(artisan_id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            tracing::info!("Demo artisan {} created", artisan_id);
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct MigrationStatus {
    pub total: usize,
    pub applied: usize,
    pub pending: usize,
    pub is_up_to_date: bool,
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Migrations: {}/{} applied, {} pending",
            self.applied, self.total, self.pending
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_reports_counts() {
        let status = MigrationStatus {
            total: 3,
            applied: 2,
            pending: 1,
            is_up_to_date: false,
        };
        assert_eq!(status.to_string(), "Migrations: 2/3 applied, 1 pending");
    }
}
