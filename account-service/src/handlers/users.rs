use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use service_core::observability::extract_request_id;

use crate::{
    dtos::RegisterUserRequest,
    models::UserResponse,
    services::RequestContext,
    utils::{Password, ValidatedJson},
    AppState,
};

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<RegisterUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = RequestContext::from_request_id(extract_request_id(&headers));

    let user = state
        .service
        .register_user(&ctx, &req.name, &req.email, Password::new(req.password))
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}
