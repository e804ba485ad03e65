use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::{
    dtos::wallet::{WalletResponse, WalletTransactionDto, WalletTransactionsResponse},
    middleware::AuthUser,
    AppState,
};

pub async fn get_wallet(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<WalletResponse>, AppError> {
    let info = state.ledger.wallet_info(&user.user_id).await?;

    Ok(Json(WalletResponse {
        success: true,
        wallet: info.into(),
    }))
}

pub async fn transactions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<WalletTransactionsResponse>, AppError> {
    let transactions = state.ledger.transactions(&user.user_id).await?;

    Ok(Json(WalletTransactionsResponse {
        success: true,
        count: transactions.len(),
        transactions: transactions
            .into_iter()
            .map(WalletTransactionDto::from)
            .collect(),
    }))
}
