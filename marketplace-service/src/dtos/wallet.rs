use super::rfc3339;
use crate::models::{TransactionSource, TransactionType, WalletTransaction};
use crate::services::ledger::WalletInfo;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDto {
    pub balance: Decimal,
    pub pending_payouts: Decimal,
    pub total_earned: Decimal,
    pub total_paid_out: Decimal,
    pub last_updated: String,
    /// Whether the snapshot agrees with a replay of the ledger.
    pub consistent: bool,
}

impl From<WalletInfo> for WalletDto {
    fn from(info: WalletInfo) -> Self {
        Self {
            balance: info.wallet.balance,
            pending_payouts: info.wallet.pending_payouts,
            total_earned: info.wallet.total_earned,
            total_paid_out: info.wallet.total_paid_out,
            last_updated: rfc3339(info.wallet.last_updated),
            consistent: info.consistent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub success: bool,
    pub wallet: WalletDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransactionDto {
    pub id: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub source: TransactionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_booking: Option<String>,
    pub timestamp: String,
}

impl From<WalletTransaction> for WalletTransactionDto {
    fn from(tx: WalletTransaction) -> Self {
        Self {
            id: tx.id,
            amount: tx.amount,
            tx_type: tx.tx_type,
            source: tx.source,
            linked_booking: tx.linked_booking,
            timestamp: rfc3339(tx.timestamp),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WalletTransactionsResponse {
    pub success: bool,
    pub count: usize,
    pub transactions: Vec<WalletTransactionDto>,
}
