use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use workup_database::{Artisan, CoinTransaction, Deal, JobPosting, Message, Review, User};

// Accounts

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(email(message = "A valid email is required"))]
    pub email: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SigninRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SigninResponse {
    pub message: String,
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub session: SessionView,
}

/// Session state a client needs between requests, always read fresh.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct SessionView {
    pub user_id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub artisan_id: Option<i32>,
    pub is_artisan: bool,
    pub coins: Option<i32>,
}

// Artisans

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterArtisanRequest {
    #[serde(default, alias = "userId")]
    pub user_id: Option<i32>,

    #[serde(default)]
    #[validate(length(min = 1, message = "firstname is required"))]
    pub firstname: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "lastname is required"))]
    pub lastname: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,

    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,

    #[serde(default)]
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,

    pub address: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "skill is required"))]
    pub skill: String,

    pub experience: Option<String>,
    pub bio: Option<String>,
    #[serde(alias = "profilePic")]
    pub profile_pic: Option<String>,
    pub certificate: Option<String>,
    pub reference: Option<String>,

    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,

    #[serde(default)]
    pub portfolio: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateArtisanRequest {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub skill: Option<String>,
    pub experience: Option<String>,
    pub bio: Option<String>,
    #[serde(alias = "profilePic")]
    pub profile_pic: Option<String>,
    pub certificate: Option<String>,
    pub reference: Option<String>,
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
    pub portfolio: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterArtisanResponse {
    pub message: String,
    pub data: Artisan,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArtisanSearchQuery {
    /// Skill to match, e.g. "plumber".
    pub artisan: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArtisanProfile {
    #[serde(flatten)]
    pub artisan: Artisan,
    pub deals: Vec<DealView>,
    pub job_postings: Vec<JobPosting>,
    pub reviews: Vec<ReviewView>,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct DealView {
    pub id: i32,
    pub user_id: i32,
    pub artisan_id: i32,
    pub created_at: DateTime<Utc>,
    pub first_name: String,
    pub last_name: String,
    pub reviewed: bool,
    #[sqlx(skip)]
    pub job_posting: Option<JobPosting>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ReviewView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub review: Review,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CoinBalanceResponse {
    pub artisan_id: i32,
    pub coins: i32,
    pub transactions: Vec<CoinTransaction>,
}

// Messages

/// Fields stay loosely typed so malformed input maps to a 400 with a useful message.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: Option<i32>,
    pub receiver_id: Option<i32>,
    pub content: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAsReadRequest {
    pub sender_id: Option<i32>,
    pub receiver_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAsReadResponse {
    pub updated: u64,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub other_user_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub artisan_id: Option<i32>,
    pub last_message: Message,
    pub unread_count: i64,
}

// Deals, job postings and reviews

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmDealRequest {
    #[serde(alias = "user_id")]
    pub user_id: Option<i32>,
    #[serde(alias = "artisan_id")]
    pub artisan_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmDealResponse {
    pub deal: Deal,
    pub coins_remaining: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobPostingRequest {
    #[serde(alias = "deal_id")]
    pub deal_id: Option<i32>,

    #[serde(default)]
    #[validate(length(min = 1, max = 5000, message = "description is required"))]
    pub description: String,

    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    #[serde(alias = "artisan_id")]
    pub artisan_id: Option<i32>,
    #[serde(alias = "user_id")]
    pub user_id: Option<i32>,
    #[serde(alias = "deal_id")]
    pub deal_id: Option<i32>,
    pub rating: Option<i32>,
    pub comment: Option<String>,
}
