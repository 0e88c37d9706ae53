pub mod accounts;
pub mod artisans;
pub mod coins;
pub mod deals;
pub mod messages;
pub mod reviews;

use axum::extract::FromRef;
use sqlx::PgPool;
use workup_auth::JwtService;

use crate::config::AppConfig;
use crate::stream::MessageHub;

pub use accounts::AccountService;
pub use artisans::ArtisanService;
pub use deals::DealService;
pub use messages::MessageService;
pub use reviews::ReviewService;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: JwtService,
    pub hub: MessageHub,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db_pool: PgPool, config: AppConfig) -> Self {
        Self {
            db_pool,
            jwt_service: JwtService::new(&config.jwt),
            hub: MessageHub::new(config.stream.channel_capacity),
            config,
        }
    }
}

impl FromRef<AppState> for JwtService {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_service.clone()
    }
}
