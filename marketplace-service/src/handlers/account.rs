use axum::{extract::State, Json};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::account::{GrantCapabilityRequest, GrantCapabilityResponse},
    middleware::AuthUser,
    models::Role,
    AppState,
};

pub async fn grant_capability(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<GrantCapabilityRequest>,
) -> Result<Json<GrantCapabilityResponse>, AppError> {
    req.validate()?;
    let role: Role = req.capability.parse().map_err(AppError::bad_request)?;
    if role == Role::User {
        return Err(AppError::bad_request("Every account already holds the user role"));
    }

    let account = state.accounts.grant_capability(&user.user_id, role).await?;

    tracing::info!(user_id = %account.id, capability = %role, "Capability granted");

    Ok(Json(GrantCapabilityResponse {
        success: true,
        message: format!("{} capability granted", role),
        user: account.into(),
    }))
}
