use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use workup_common::{AppError, CoinChargeReason, CoinPolicy};
use workup_database::Message;

use crate::domain::{first_message_fee, message_content, require_id};
use crate::models::{ConversationSummary, MarkAsReadRequest, MarkAsReadResponse, SendMessageRequest};
use crate::services::coins::{self, LedgerEntry};
use crate::services::AppState;
use crate::stream::{MessageHub, StreamEvent};

#[derive(Clone)]
pub struct MessageService {
    db_pool: PgPool,
    coin_policy: CoinPolicy,
    hub: MessageHub,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    id: i32,
    sender_id: i32,
    receiver_id: i32,
    content: String,
    timestamp: DateTime<Utc>,
    read: bool,
    other_user_id: i32,
    resolved_user_id: Option<i32>,
    other_first_name: Option<String>,
    other_last_name: Option<String>,
    other_artisan_id: Option<i32>,
    unread_count: i64,
}

impl SummaryRow {
    /// `None` when the counterparty no longer resolves to a user.
    fn into_summary(self) -> Option<ConversationSummary> {
        self.resolved_user_id?;
        Some(ConversationSummary {
            other_user_id: self.other_user_id,
            first_name: self.other_first_name.unwrap_or_default(),
            last_name: self.other_last_name.unwrap_or_default(),
            artisan_id: self.other_artisan_id,
            last_message: Message {
                id: self.id,
                sender_id: self.sender_id,
                receiver_id: self.receiver_id,
                content: self.content,
                timestamp: self.timestamp,
                read: self.read,
            },
            unread_count: self.unread_count,
        })
    }
}

impl MessageService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            coin_policy: state.config.coins,
            hub: state.hub.clone(),
        }
    }

    /// Stores a message. An artisan's first message to a receiver costs
    /// `first_message_fee` coins; the balance lock, the prior-message count,
    /// the deduction and the insert share one transaction so the fee is
    /// charged at most once even under concurrent sends.
    pub async fn send_message(&self, request: SendMessageRequest) -> Result<Message, AppError> {
        let sender_id = require_id(request.sender_id, "sender_id")?;
        let receiver_id = require_id(request.receiver_id, "receiver_id")?;
        let content = message_content(request.content.as_ref())?;

        let mut tx = self.db_pool.begin().await?;

        let sender_artisan_id = sqlx::query_scalar::<_, Option<i32>>("SELECT artisanid FROM users WHERE id = $1")
            .bind(sender_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Sender not found".to_string()))?;

        let receiver_exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(receiver_id)
            .fetch_one(&mut *tx)
            .await?;
        if !receiver_exists {
            return Err(AppError::NotFound("Receiver not found".to_string()));
        }

        let mut charge = None;
        if let Some(artisan_id) = sender_artisan_id.filter(|_| self.coin_policy.first_message_fee > 0) {
            // Serializes concurrent sends by this artisan until commit
            if coins::lock_balance(&mut tx, artisan_id).await?.is_some() {
                let prior_messages = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM messages WHERE sender_id = $1 AND receiver_id = $2",
                )
                .bind(sender_id)
                .bind(receiver_id)
                .fetch_one(&mut *tx)
                .await?;

                if let Some(fee) = first_message_fee(Some(artisan_id), prior_messages, self.coin_policy.first_message_fee) {
                    let balance_after = coins::deduct(&mut tx, artisan_id, fee).await?;
                    charge = Some((artisan_id, fee, balance_after));
                }
            }
        }

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (sender_id, receiver_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, sender_id, receiver_id, content, timestamp, read
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(&content)
        .fetch_one(&mut *tx)
        .await?;

        if let Some((artisan_id, fee, balance_after)) = charge {
            coins::record(
                &mut tx,
                LedgerEntry {
                    artisan_id,
                    amount: -fee,
                    balance_after,
                    reason: CoinChargeReason::FirstMessage,
                    reference_id: Some(message.id),
                    counterparty_id: Some(receiver_id),
                },
            )
            .await?;
        }

        tx.commit().await?;

        self.hub.publish(
            receiver_id,
            StreamEvent::NewMessage {
                message: message.clone(),
            },
        );

        Ok(message)
    }

    /// Full thread between two users, oldest first.
    pub async fn get_conversation(&self, user_id: i32, other_user_id: i32) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, content, timestamp, read
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(other_user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(messages)
    }

    /// One row per counterparty: the latest message of the pair and how many
    /// messages from that counterparty `user_id` has not read yet.
    pub async fn get_conversation_summary(&self, user_id: i32) -> Result<Vec<ConversationSummary>, AppError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            WITH latest AS (
                SELECT DISTINCT ON (LEAST(sender_id, receiver_id), GREATEST(sender_id, receiver_id))
                    id, sender_id, receiver_id, content, timestamp, read,
                    CASE WHEN sender_id = $1 THEN receiver_id ELSE sender_id END AS other_user_id
                FROM messages
                WHERE sender_id = $1 OR receiver_id = $1
                ORDER BY LEAST(sender_id, receiver_id), GREATEST(sender_id, receiver_id),
                         timestamp DESC, id DESC
            )
            SELECT l.id, l.sender_id, l.receiver_id, l.content, l.timestamp, l.read, l.other_user_id,
                   u.id AS resolved_user_id,
                   u.first_name AS other_first_name,
                   u.last_name AS other_last_name,
                   u.artisanid AS other_artisan_id,
                   (SELECT COUNT(*) FROM messages m
                     WHERE m.sender_id = l.other_user_id
                       AND m.receiver_id = $1
                       AND m.read = FALSE) AS unread_count
            FROM latest l
            LEFT JOIN users u ON u.id = l.other_user_id
            ORDER BY l.timestamp DESC, l.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().filter_map(SummaryRow::into_summary).collect())
    }

    /// Marks everything `sender_id` sent to `receiver_id` as read. Repeating
    /// the call updates nothing.
    pub async fn mark_as_read(&self, request: MarkAsReadRequest) -> Result<MarkAsReadResponse, AppError> {
        let sender_id = require_id(request.sender_id, "sender_id")?;
        let receiver_id = require_id(request.receiver_id, "receiver_id")?;

        let messages = sqlx::query_as::<_, Message>(
            r#"
            UPDATE messages SET read = TRUE
            WHERE sender_id = $1 AND receiver_id = $2 AND read = FALSE
            RETURNING id, sender_id, receiver_id, content, timestamp, read
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_all(&self.db_pool)
        .await?;

        let updated = messages.len() as u64;
        if updated > 0 {
            self.hub.publish(
                sender_id,
                StreamEvent::MessagesRead {
                    reader_id: receiver_id,
                    count: updated,
                },
            );
        }

        Ok(MarkAsReadResponse { updated, messages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(resolved: Option<i32>) -> SummaryRow {
        SummaryRow {
            id: 10,
            sender_id: 1,
            receiver_id: 2,
            content: "Hello".to_string(),
            timestamp: Utc::now(),
            read: false,
            other_user_id: 2,
            resolved_user_id: resolved,
            other_first_name: Some("Chidi".to_string()),
            other_last_name: None,
            other_artisan_id: Some(4),
            unread_count: 3,
        }
    }

    #[test]
    fn unresolved_counterparties_are_dropped() {
        assert!(row(None).into_summary().is_none());

        let summary = row(Some(2)).into_summary().unwrap();
        assert_eq!(summary.other_user_id, 2);
        assert_eq!(summary.first_name, "Chidi");
        assert_eq!(summary.last_name, "");
        assert_eq!(summary.artisan_id, Some(4));
        assert_eq!(summary.last_message.content, "Hello");
        assert_eq!(summary.unread_count, 3);
    }
}
