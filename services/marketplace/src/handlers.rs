use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Path, Query, Request, State},
    response::Json,
};
use serde::de::DeserializeOwned;

use workup_auth::{Claims, OptionalClaims};
use workup_common::{ApiResponse, AppError};
use workup_database::{Artisan, JobPosting, Message, Review};

use crate::domain::{parse_id, require_id};
use crate::models::*;
use crate::services::{
    AccountService, AppState, ArtisanService, DealService, MessageService, ReviewService,
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// JSON body extractor whose rejections use the API envelope with a 400.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| AppError::Validation(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Rejects the request when a session is present but its user is not
/// currently linked to `artisan_id`.
async fn ensure_session_artisan(
    state: &AppState,
    session: &OptionalClaims,
    artisan_id: i32,
) -> Result<(), AppError> {
    let Some(user_id) = session.user_id()? else {
        return Ok(());
    };

    if AccountService::new(state).linked_artisan(user_id).await? != Some(artisan_id) {
        return Err(AppError::Authorization(
            "Session does not belong to this artisan".to_string(),
        ));
    }
    Ok(())
}

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("Work Up marketplace is healthy".to_string()))
}

// Accounts

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> ApiResult<SignupResponse> {
    let user = AccountService::new(&state).signup(request).await?;
    ok(SignupResponse {
        message: "User added".to_string(),
        user,
    })
}

pub async fn signin(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SigninRequest>,
) -> ApiResult<SigninResponse> {
    ok(AccountService::new(&state).signin(request).await?)
}

pub async fn get_session(State(state): State<AppState>, claims: Claims) -> ApiResult<SessionView> {
    ok(AccountService::new(&state).session(claims.user_id()?).await?)
}

// Artisans

pub async fn register_artisan(
    State(state): State<AppState>,
    session: OptionalClaims,
    ApiJson(request): ApiJson<RegisterArtisanRequest>,
) -> ApiResult<RegisterArtisanResponse> {
    if let Some(user_id) = request.user_id {
        session.ensure_user(user_id)?;
    }

    let artisan = ArtisanService::new(&state).register(request).await?;
    ok(RegisterArtisanResponse {
        message: "Registration successful".to_string(),
        data: artisan,
    })
}

pub async fn get_artisan(
    State(state): State<AppState>,
    Path(artisan_id): Path<String>,
) -> ApiResult<ArtisanProfile> {
    let artisan_id = parse_id(&artisan_id, "artisan id")?;
    ok(ArtisanService::new(&state).get_profile(artisan_id).await?)
}

pub async fn update_artisan(
    State(state): State<AppState>,
    Path(artisan_id): Path<String>,
    session: OptionalClaims,
    ApiJson(request): ApiJson<UpdateArtisanRequest>,
) -> ApiResult<Artisan> {
    let artisan_id = parse_id(&artisan_id, "artisan id")?;
    ensure_session_artisan(&state, &session, artisan_id).await?;
    ok(ArtisanService::new(&state).update(artisan_id, request).await?)
}

pub async fn get_coin_balance(
    State(state): State<AppState>,
    Path(artisan_id): Path<String>,
) -> ApiResult<CoinBalanceResponse> {
    let artisan_id = parse_id(&artisan_id, "artisan id")?;
    ok(ArtisanService::new(&state).coin_balance(artisan_id).await?)
}

pub async fn create_job_posting(
    State(state): State<AppState>,
    Path(artisan_id): Path<String>,
    session: OptionalClaims,
    ApiJson(request): ApiJson<CreateJobPostingRequest>,
) -> ApiResult<JobPosting> {
    let artisan_id = parse_id(&artisan_id, "artisan id")?;
    ensure_session_artisan(&state, &session, artisan_id).await?;
    ok(DealService::new(&state).create_job_posting(artisan_id, request).await?)
}

pub async fn search_artisans(
    State(state): State<AppState>,
    Query(query): Query<ArtisanSearchQuery>,
) -> ApiResult<Vec<Artisan>> {
    ok(ArtisanService::new(&state).search(query).await?)
}

// Messages

pub async fn send_message(
    State(state): State<AppState>,
    session: OptionalClaims,
    ApiJson(request): ApiJson<SendMessageRequest>,
) -> ApiResult<Message> {
    session.ensure_user(require_id(request.sender_id, "sender_id")?)?;
    ok(MessageService::new(&state).send_message(request).await?)
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path((user_id, other_user_id)): Path<(String, String)>,
) -> ApiResult<Vec<Message>> {
    let user_id = parse_id(&user_id, "user id")?;
    let other_user_id = parse_id(&other_user_id, "user id")?;
    ok(MessageService::new(&state).get_conversation(user_id, other_user_id).await?)
}

pub async fn get_conversation_summary(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<ConversationSummary>> {
    let user_id = parse_id(&user_id, "user id")?;
    ok(MessageService::new(&state).get_conversation_summary(user_id).await?)
}

pub async fn mark_as_read(
    State(state): State<AppState>,
    session: OptionalClaims,
    ApiJson(request): ApiJson<MarkAsReadRequest>,
) -> ApiResult<MarkAsReadResponse> {
    session.ensure_user(require_id(request.receiver_id, "receiver_id")?)?;
    ok(MessageService::new(&state).mark_as_read(request).await?)
}

// Deals and reviews

pub async fn confirm_deal(
    State(state): State<AppState>,
    session: OptionalClaims,
    ApiJson(request): ApiJson<ConfirmDealRequest>,
) -> ApiResult<ConfirmDealResponse> {
    session.ensure_user(require_id(request.user_id, "userId")?)?;
    ok(DealService::new(&state).confirm_deal(request).await?)
}

pub async fn create_review(
    State(state): State<AppState>,
    session: OptionalClaims,
    ApiJson(request): ApiJson<CreateReviewRequest>,
) -> ApiResult<Review> {
    session.ensure_user(require_id(request.user_id, "userId")?)?;
    ok(ReviewService::new(&state).create_review(request).await?)
}
