use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::checkout::{
        CheckoutHistoryResponse, CheckoutRequest, CheckoutResponse, CheckoutSessionDto,
    },
    middleware::AuthUser,
    AppState,
};

pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    req.validate()?;

    let session = state
        .checkout
        .checkout(&user.user_id, &req.payment_method)
        .await?;

    Ok(Json(CheckoutResponse {
        success: true,
        message: Some("Checkout completed successfully".to_string()),
        checkout_session: CheckoutSessionDto::from(&session),
    }))
}

pub async fn get_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<String>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let session = state
        .checkout
        .get_session(&user.user_id, &session_id)
        .await?;

    Ok(Json(CheckoutResponse {
        success: true,
        message: None,
        checkout_session: CheckoutSessionDto::from(&session),
    }))
}

pub async fn history(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CheckoutHistoryResponse>, AppError> {
    let sessions = state.checkout.history(&user.user_id).await?;

    Ok(Json(CheckoutHistoryResponse {
        success: true,
        count: sessions.len(),
        checkout_sessions: sessions.iter().map(CheckoutSessionDto::from).collect(),
    }))
}
