use axum::{
    Router,
    extract::State,
    http::header,
    response::{IntoResponse, Json},
    routing::post,
};
use pynk_proto::auth_service::VerifyLoginCodePayload;
use tracing::instrument;

use crate::error::{ApiError, ApiJson};
use crate::models::*;

use super::{ADMIN_COOKIE, AppState};

const CODE_LENGTH: usize = 6;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/auth/request", post(request_code))
        .route("/admin/auth/verify", post(verify_code))
}

fn session_cookie(token: &str, max_age: i64) -> String {
    format!("{ADMIN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}")
}

#[utoipa::path(
    post,
    path = "/admin/auth/request",
    responses(
        (status = 200, description = "A login code was sent to the kitchen chat", body = AckResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(state))]
pub async fn request_code(State(state): State<AppState>) -> Result<Json<AckResponse>, ApiError> {
    let mut auth_client = state.auth_client.clone();
    auth_client.request_login_code(tonic::Request::new(())).await?;
    Ok(Json(AckResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/admin/auth/verify",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Token issued; also set as the admin_auth cookie", body = VerifyCodeResponse),
        (status = 400, description = "Malformed code", body = ApiErrorResponse),
        (status = 401, description = "Code invalid or expired", body = ApiErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn verify_code(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let code = payload
        .code
        .map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| c.chars().count() == CODE_LENGTH)
        .ok_or_else(|| ApiError::BadRequest("Invalid code".into()))?;
    let mut auth_client = state.auth_client.clone();

    let token = auth_client
        .verify_login_code(tonic::Request::new(VerifyLoginCodePayload { code }))
        .await
        .map_err(|status| match status.code() {
            tonic::Code::Unauthenticated | tonic::Code::InvalidArgument => {
                ApiError::Unauthorized("Code invalid or expired".into())
            }
            _ => ApiError::from(status),
        })?
        .into_inner();

    let cookie = session_cookie(&token.access_token, token.expires_in);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(VerifyCodeResponse {
            ok: true,
            token_type: token.token_type,
            access_token: token.access_token,
            expires_in: token.expires_in,
        }),
    ))
}
