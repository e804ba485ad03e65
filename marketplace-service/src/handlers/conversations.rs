use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::{
    dtos::conversation::{ConversationDto, ConversationListResponse},
    middleware::AuthUser,
    AppState,
};

pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ConversationListResponse>, AppError> {
    let conversations = state.store.list_conversations(&user.user_id).await?;

    Ok(Json(ConversationListResponse {
        success: true,
        count: conversations.len(),
        conversations: conversations
            .into_iter()
            .map(ConversationDto::from)
            .collect(),
    }))
}
