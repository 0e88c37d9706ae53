use sqlx::PgPool;

use workup_common::{AppError, CoinChargeReason, CoinPolicy};
use workup_database::{Deal, JobPosting};

use crate::domain::{require_id, validate_request};
use crate::models::{ConfirmDealRequest, ConfirmDealResponse, CreateJobPostingRequest};
use crate::services::coins::{self, LedgerEntry};
use crate::services::AppState;

pub struct DealService {
    db_pool: PgPool,
    coin_policy: CoinPolicy,
}

impl DealService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            coin_policy: state.config.coins,
        }
    }

    /// Records a deal and charges the artisan's confirmation fee in the same
    /// transaction. A user may hold only one unreviewed deal per artisan.
    pub async fn confirm_deal(&self, request: ConfirmDealRequest) -> Result<ConfirmDealResponse, AppError> {
        let user_id = require_id(request.user_id, "userId")?;
        let artisan_id = require_id(request.artisan_id, "artisanId")?;

        let mut tx = self.db_pool.begin().await?;

        let user_artisan_id = sqlx::query_scalar::<_, Option<i32>>("SELECT artisanid FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let mut coins_remaining = coins::lock_balance(&mut tx, artisan_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Artisan not found".to_string()))?;

        if user_artisan_id == Some(artisan_id) {
            return Err(AppError::Validation("You cannot confirm a deal with yourself".to_string()));
        }

        let open_deal = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM deals d
                WHERE d.user_id = $1 AND d.artisan_id = $2
                  AND NOT EXISTS (SELECT 1 FROM reviews r WHERE r.deal_id = d.id)
            )
            "#,
        )
        .bind(user_id)
        .bind(artisan_id)
        .fetch_one(&mut *tx)
        .await?;

        if open_deal {
            return Err(AppError::Conflict(
                "A deal with this artisan is already in progress".to_string(),
            ));
        }

        let fee = self.coin_policy.deal_confirmation_fee;
        if fee > 0 {
            coins_remaining = coins::deduct(&mut tx, artisan_id, fee).await?;
        }

        let deal = sqlx::query_as::<_, Deal>(
            "INSERT INTO deals (user_id, artisan_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(artisan_id)
        .fetch_one(&mut *tx)
        .await?;

        if fee > 0 {
            coins::record(
                &mut tx,
                LedgerEntry {
                    artisan_id,
                    amount: -fee,
                    balance_after: coins_remaining,
                    reason: CoinChargeReason::DealConfirmation,
                    reference_id: Some(deal.id),
                    counterparty_id: Some(user_id),
                },
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!("Deal {} confirmed between user {} and artisan {}", deal.id, user_id, artisan_id);
        Ok(ConfirmDealResponse { deal, coins_remaining })
    }

    pub async fn create_job_posting(
        &self,
        artisan_id: i32,
        request: CreateJobPostingRequest,
    ) -> Result<JobPosting, AppError> {
        let deal_id = require_id(request.deal_id, "dealId")?;
        validate_request(&request)?;

        let description = request.description.trim();
        if description.is_empty() {
            return Err(AppError::Validation("description is required".to_string()));
        }

        let deal = sqlx::query_as::<_, Deal>("SELECT * FROM deals WHERE id = $1")
            .bind(deal_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Deal not found".to_string()))?;

        if deal.artisan_id != artisan_id {
            return Err(AppError::Authorization(
                "Deal does not belong to this artisan".to_string(),
            ));
        }

        let posting = sqlx::query_as::<_, JobPosting>(
            r#"
            INSERT INTO job_postings (artisan_id, deal_id, description, image)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(artisan_id)
        .bind(deal_id)
        .bind(description)
        .bind(&request.image)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!("Job posting {} uploaded for deal {}", posting.id, deal_id);
        Ok(posting)
    }
}
