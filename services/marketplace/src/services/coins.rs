use sqlx::{PgConnection, PgPool};

use workup_common::{AppError, CoinChargeReason};
use workup_database::CoinTransaction;

use crate::domain::INSUFFICIENT_COINS;
use crate::models::CoinBalanceResponse;

/// Locks the artisan row for the rest of the transaction and returns its balance.
pub async fn lock_balance(conn: &mut PgConnection, artisan_id: i32) -> Result<Option<i32>, AppError> {
    let coins = sqlx::query_scalar::<_, i32>("SELECT coins FROM artisans WHERE id = $1 FOR UPDATE")
        .bind(artisan_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(coins)
}

/// Deducts `amount` only if the balance covers it. Returns the new balance.
pub async fn deduct(conn: &mut PgConnection, artisan_id: i32, amount: i32) -> Result<i32, AppError> {
    let balance = sqlx::query_scalar::<_, i32>(
        "UPDATE artisans SET coins = coins - $2 WHERE id = $1 AND coins >= $2 RETURNING coins",
    )
    .bind(artisan_id)
    .bind(amount)
    .fetch_optional(&mut *conn)
    .await?;

    balance.ok_or_else(|| {
        tracing::warn!("Artisan {} cannot cover a {} coin charge", artisan_id, amount);
        AppError::InsufficientBalance(INSUFFICIENT_COINS.to_string())
    })
}

pub struct LedgerEntry {
    pub artisan_id: i32,
    pub amount: i32,
    pub balance_after: i32,
    pub reason: CoinChargeReason,
    pub reference_id: Option<i32>,
    pub counterparty_id: Option<i32>,
}

pub async fn record(conn: &mut PgConnection, entry: LedgerEntry) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO coin_transactions (artisan_id, amount, balance_after, reason, reference_id, counterparty_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(entry.artisan_id)
    .bind(entry.amount)
    .bind(entry.balance_after)
    .bind(entry.reason.as_str())
    .bind(entry.reference_id)
    .bind(entry.counterparty_id)
    .execute(&mut *conn)
    .await?;

    tracing::info!(
        "Charged artisan {} {} coins for {} (balance {})",
        entry.artisan_id,
        -entry.amount,
        entry.reason.as_str(),
        entry.balance_after
    );
    Ok(())
}

pub async fn balance_with_history(db_pool: &PgPool, artisan_id: i32) -> Result<CoinBalanceResponse, AppError> {
    let coins = sqlx::query_scalar::<_, i32>("SELECT coins FROM artisans WHERE id = $1")
        .bind(artisan_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Artisan not found".to_string()))?;

    let transactions = sqlx::query_as::<_, CoinTransaction>(
        "SELECT * FROM coin_transactions WHERE artisan_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(artisan_id)
    .fetch_all(db_pool)
    .await?;

    Ok(CoinBalanceResponse {
        artisan_id,
        coins,
        transactions,
    })
}
