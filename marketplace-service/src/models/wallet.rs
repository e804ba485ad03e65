//! Wallet snapshot and ledger entry models.

use mongodb::bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of most recent ledger entry ids remembered on the snapshot. The
/// window only has to cover entries folded in but not yet marked `applied`
/// on the ledger; the durable record is the entry's own marker.
pub const APPLIED_ENTRY_WINDOW: usize = 256;

/// Denormalized balance snapshot embedded in the account record.
///
/// Invariant once the ledger is fully applied:
/// `balance + pending_payouts == total_earned - total_paid_out`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub balance: Decimal,
    pub pending_payouts: Decimal,
    pub total_earned: Decimal,
    pub total_paid_out: Decimal,
    pub last_updated: DateTime,
    /// Ledger entries already folded into this snapshot, oldest first.
    #[serde(default)]
    pub applied_entries: VecDeque<String>,
}

impl Default for Wallet {
    fn default() -> Self {
        Self {
            balance: Decimal::ZERO,
            pending_payouts: Decimal::ZERO,
            total_earned: Decimal::ZERO,
            total_paid_out: Decimal::ZERO,
            last_updated: DateTime::now(),
            applied_entries: VecDeque::new(),
        }
    }
}

impl Wallet {
    pub fn has_applied(&self, entry_id: &str) -> bool {
        self.applied_entries.iter().any(|e| e == entry_id)
    }

    /// Folds a delta into the snapshot. Returns `false` without touching the
    /// snapshot when `entry_id` was already applied.
    pub fn apply(&mut self, delta: &WalletDelta, entry_id: &str) -> bool {
        if self.has_applied(entry_id) {
            return false;
        }
        self.balance += delta.balance;
        self.pending_payouts += delta.pending;
        self.total_earned += delta.earned;
        self.total_paid_out += delta.paid_out;
        self.last_updated = DateTime::now();

        self.applied_entries.push_back(entry_id.to_string());
        while self.applied_entries.len() > APPLIED_ENTRY_WINDOW {
            self.applied_entries.pop_front();
        }
        true
    }

    pub fn is_consistent(&self) -> bool {
        self.balance + self.pending_payouts == self.total_earned - self.total_paid_out
    }

    /// Snapshot figures only, for comparing against a ledger replay.
    pub fn same_figures(&self, other: &Wallet) -> bool {
        self.balance == other.balance
            && self.pending_payouts == other.pending_payouts
            && self.total_earned == other.total_earned
            && self.total_paid_out == other.total_paid_out
    }
}

/// Change to the four snapshot figures caused by one ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WalletDelta {
    pub balance: Decimal,
    pub pending: Decimal,
    pub earned: Decimal,
    pub paid_out: Decimal,
}

impl WalletDelta {
    /// Earning held until the booking is paid out.
    pub fn pending_earning(amount: Decimal) -> Self {
        Self {
            pending: amount,
            earned: amount,
            ..Default::default()
        }
    }

    /// Moves a held earning into the spendable balance.
    pub fn release_pending(amount: Decimal) -> Self {
        Self {
            balance: amount,
            pending: -amount,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    InfluencerPost,
    Refund,
    Admin,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InfluencerPost => "influencer_post",
            Self::Refund => "refund",
            Self::Admin => "admin",
        }
    }
}

/// Append-only ledger entry. The id is deterministic for settlement postings,
/// so a replayed step finds the entry it already wrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub source: TransactionSource,
    pub linked_booking: Option<String>,
    /// Effect on the snapshot, kept for replay.
    pub delta: WalletDelta,
    pub timestamp: DateTime,
    /// Set once the entry has been folded into the owner's snapshot.
    #[serde(default)]
    pub applied: bool,
}

/// Recomputes a snapshot from scratch by folding ledger entries in order.
pub fn replay<'a>(entries: impl IntoIterator<Item = &'a WalletTransaction>) -> Wallet {
    let mut wallet = Wallet::default();
    for entry in entries {
        wallet.balance += entry.delta.balance;
        wallet.pending_payouts += entry.delta.pending;
        wallet.total_earned += entry.delta.earned;
        wallet.total_paid_out += entry.delta.paid_out;
    }
    wallet
}
