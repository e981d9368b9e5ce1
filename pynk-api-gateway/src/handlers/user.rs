use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    routing::{get, post},
};
use pynk_proto::user_service::{GetUserByTelegramPayload, UpsertUserPayload};
use tracing::instrument;

use crate::error::{ApiError, ApiJson, FieldError};
use crate::models::*;
use crate::validation::{LANGUAGES, is_valid_email, non_blank};

use super::{AppState, timestamp};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/by-telegram", get(get_by_telegram))
        .route("/users/register", post(register))
}

#[utoipa::path(
    get,
    path = "/users/by-telegram",
    responses(
        (status = 200, description = "Profile with order stats, or null when unknown", body = UserProfileResponse),
        (status = 400, description = "Missing userId", body = ApiErrorResponse),
    ),
    params(("userId" = String, Query, description = "Telegram user id")),
    tag = "users"
)]
#[instrument(skip(state))]
pub async fn get_by_telegram(
    State(state): State<AppState>,
    Query(query): Query<TelegramUserQuery>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let telegram_user_id = non_blank(query.user_id.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Missing userId".into()))?;
    let mut user_client = state.user_client.clone();

    let request = tonic::Request::new(GetUserByTelegramPayload { telegram_user_id });
    let profile = user_client
        .get_user_by_telegram(request)
        .await?
        .into_inner()
        .profile;

    let user = profile.and_then(|profile| {
        let user = profile.user?;
        Some(UserProfileView {
            telegram_user_id: user.telegram_user_id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            email: user.email,
            language: user.language_code,
            orders_count: profile.orders_count,
            last_order_id: profile.last_order_code,
            last_order_timestamp: timestamp(profile.last_order_at),
        })
    });

    Ok(Json(UserProfileResponse { ok: true, user }))
}

#[utoipa::path(
    post,
    path = "/users/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "Profile stored", body = RegisterUserResponse),
        (status = 400, description = "Invalid payload", body = ApiErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterUserRequest>,
) -> Result<Json<RegisterUserResponse>, ApiError> {
    if payload
        .action
        .as_deref()
        .is_some_and(|action| action != "registerUser")
    {
        return Err(ApiError::BadRequest("Invalid action".into()));
    }

    let mut errors = Vec::new();
    let telegram_user_id = payload
        .telegram_user_id
        .map(|id| id.as_text())
        .filter(|id| !id.is_empty());
    if telegram_user_id.is_none() {
        errors.push(FieldError::new("telegramUserId", "is required"));
    }
    let email = non_blank(payload.email.as_deref());
    if email.as_deref().is_some_and(|e| !is_valid_email(e)) {
        errors.push(FieldError::new("email", "must be a valid email address"));
    }
    let language = non_blank(payload.language.as_deref());
    if language
        .as_deref()
        .is_some_and(|l| !LANGUAGES.contains(&l))
    {
        errors.push(FieldError::new("language", "must be en or de"));
    }
    let Some(telegram_user_id) = telegram_user_id.filter(|_| errors.is_empty()) else {
        return Err(ApiError::Validation(errors));
    };

    let mut user_client = state.user_client.clone();
    let request = tonic::Request::new(UpsertUserPayload {
        telegram_user_id,
        first_name: non_blank(payload.first_name.as_deref()),
        last_name: non_blank(payload.last_name.as_deref()),
        username: non_blank(payload.username.as_deref()),
        phone: non_blank(payload.phone.as_deref()),
        email,
        language_code: language,
        chat_id: None,
    });
    let user = user_client.upsert_user(request).await?.into_inner();

    Ok(Json(RegisterUserResponse {
        ok: true,
        user: RegisteredUser {
            id: user.id,
            telegram_user_id: user.telegram_user_id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            email: user.email,
            language: user.language_code,
        },
    }))
}
