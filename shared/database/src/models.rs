use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing, default)]
    pub password: String, // bcrypt hash
    pub artisanid: Option<i32>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Artisan {
    pub id: i32,
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub city: String,
    pub address: Option<String>,
    pub skill: String,
    pub experience: Option<String>,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
    pub certificate: Option<String>,
    pub reference: Option<String>,
    pub email: Option<String>,
    pub portfolio: Vec<String>, // PostgreSQL text array
    pub coins: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Message {
    pub id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Deal {
    pub id: i32,
    pub user_id: i32,
    pub artisan_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPosting {
    pub id: i32,
    pub artisan_id: i32,
    pub deal_id: i32,
    pub description: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: i32,
    pub artisan_id: i32,
    pub user_id: i32,
    pub deal_id: i32,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CoinTransaction {
    pub id: i32,
    pub artisan_id: i32,
    pub amount: i32,
    pub balance_after: i32,
    pub reason: String,
    pub reference_id: Option<i32>,
    pub counterparty_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}
