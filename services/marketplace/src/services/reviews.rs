use sqlx::PgPool;

use workup_common::AppError;
use workup_database::{Deal, Review};

use crate::domain::{check_review_eligibility, require_id, validate_review_input, ALREADY_REVIEWED};
use crate::models::CreateReviewRequest;
use crate::services::AppState;

pub struct ReviewService {
    db_pool: PgPool,
}

impl ReviewService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    pub async fn create_review(&self, request: CreateReviewRequest) -> Result<Review, AppError> {
        let artisan_id = require_id(request.artisan_id, "artisanId")?;
        let user_id = require_id(request.user_id, "userId")?;
        let deal_id = require_id(request.deal_id, "dealId")?;
        let (rating, comment) = validate_review_input(request.rating, request.comment.as_deref())?;

        let mut tx = self.db_pool.begin().await?;

        let deal = sqlx::query_as::<_, Deal>("SELECT * FROM deals WHERE id = $1 AND artisan_id = $2 FOR UPDATE")
            .bind(deal_id)
            .bind(artisan_id)
            .fetch_optional(&mut *tx)
            .await?;

        let has_job_posting = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM job_postings WHERE deal_id = $1)")
            .bind(deal_id)
            .fetch_one(&mut *tx)
            .await?;

        let has_review = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM reviews WHERE deal_id = $1)")
            .bind(deal_id)
            .fetch_one(&mut *tx)
            .await?;

        if let Err(err) = check_review_eligibility(deal.as_ref(), user_id, has_job_posting, has_review) {
            tracing::warn!("Review of deal {} by user {} rejected: {}", deal_id, user_id, err);
            return Err(err);
        }

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (artisan_id, user_id, deal_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(artisan_id)
        .bind(user_id)
        .bind(deal_id)
        .bind(rating)
        .bind(&comment)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::on_unique_violation(e, ALREADY_REVIEWED))?;

        tx.commit().await?;

        tracing::info!("Review {} submitted for artisan {}", review.id, artisan_id);
        Ok(review)
    }
}
