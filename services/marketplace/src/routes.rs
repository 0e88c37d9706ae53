use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::handlers;
use crate::services::AppState;
use crate::stream;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Accounts
        .route("/signup", post(handlers::signup))
        .route("/signin", post(handlers::signin))
        .route("/session", get(handlers::get_session))

        // Artisans
        .route("/register-artisan", post(handlers::register_artisan))
        .route("/artisan/:id", get(handlers::get_artisan).put(handlers::update_artisan))
        .route("/artisan/:id/coins", get(handlers::get_coin_balance))
        .route("/artisan/:id/job-postings", post(handlers::create_job_posting))
        .route("/api/artisans", get(handlers::search_artisans))

        // Messages
        .route("/api/messages", post(handlers::send_message))
        .route(
            "/api/messages/conversations/:user_id/:other_user_id",
            get(handlers::get_conversation),
        )
        .route(
            "/api/messages/conversations-summary/:user_id",
            get(handlers::get_conversation_summary),
        )
        .route("/api/messages/mark-as-read", patch(handlers::mark_as_read))
        .route("/api/messages/stream/:user_id", get(stream::stream_messages))

        // Deals and reviews
        .route("/confirm-deal", post(handlers::confirm_deal))
        .route("/reviews", post(handlers::create_review))
}
