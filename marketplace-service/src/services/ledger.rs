//! Wallet ledger: append-only transaction log plus the denormalized
//! snapshot embedded in each account.
//!
//! A posting is written to the log first, folded into the snapshot second,
//! and marked `applied` on the log last. An entry marked `applied` is never
//! folded again. Before a new entry is folded, every earlier unmarked entry
//! of the same owner is completed, so an entry folded but not yet marked is
//! still inside the snapshot's recent-entry window when it is checked.

use super::metrics;
use super::store::MarketplaceStore;
use crate::models::wallet::replay;
use crate::models::{TransactionSource, TransactionType, Wallet, WalletDelta, WalletTransaction};
use mongodb::bson::DateTime;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;

/// Attempts at the account compare-and-swap before reporting a conflict.
const MAX_SNAPSHOT_RETRIES: usize = 5;

/// One ledger entry to record.
#[derive(Debug, Clone)]
pub struct Posting {
    pub entry_id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub tx_type: TransactionType,
    pub source: TransactionSource,
    pub linked_booking: Option<String>,
    pub delta: WalletDelta,
}

impl Posting {
    /// Earning credited to an influencer when a booking is created; held
    /// in pending payouts.
    pub fn booking_earning(entry_id: String, influencer_id: &str, booking_id: &str, amount: Decimal) -> Self {
        Self {
            entry_id,
            user_id: influencer_id.to_string(),
            amount,
            tx_type: TransactionType::Credit,
            source: TransactionSource::InfluencerPost,
            linked_booking: Some(booking_id.to_string()),
            delta: WalletDelta::pending_earning(amount),
        }
    }

    /// Release of a held earning into the balance once the booking is paid.
    pub fn booking_payout(entry_id: String, influencer_id: &str, booking_id: &str, amount: Decimal) -> Self {
        Self {
            entry_id,
            user_id: influencer_id.to_string(),
            amount,
            tx_type: TransactionType::Credit,
            source: TransactionSource::InfluencerPost,
            linked_booking: Some(booking_id.to_string()),
            delta: WalletDelta::release_pending(amount),
        }
    }
}

/// Wallet snapshot with the result of replaying the ledger against it.
#[derive(Debug, Clone)]
pub struct WalletInfo {
    pub wallet: Wallet,
    pub consistent: bool,
}

#[derive(Clone)]
pub struct WalletLedger {
    store: Arc<dyn MarketplaceStore>,
}

impl WalletLedger {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    /// Appends the entry to the log. Returns the stored entry, which is the
    /// earlier one if this entry id was already posted.
    pub async fn post(&self, posting: &Posting) -> Result<WalletTransaction, AppError> {
        let tx = WalletTransaction {
            id: posting.entry_id.clone(),
            user_id: posting.user_id.clone(),
            amount: posting.amount,
            tx_type: posting.tx_type,
            source: posting.source,
            linked_booking: posting.linked_booking.clone(),
            delta: posting.delta,
            timestamp: DateTime::now(),
            applied: false,
        };

        if self.store.insert_transaction(&tx).await? {
            return Ok(tx);
        }
        self.store
            .find_transaction(&tx.id)
            .await?
            .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Ledger entry {} vanished", tx.id)))
    }

    /// Folds `delta` into the account's snapshot under the version counter.
    /// Returns `false` when the entry was already applied.
    pub async fn apply_delta(
        &self,
        user_id: &str,
        delta: &WalletDelta,
        entry_id: &str,
    ) -> Result<bool, AppError> {
        for attempt in 1..=MAX_SNAPSHOT_RETRIES {
            let mut account = self
                .store
                .find_account(user_id)
                .await?
                .ok_or_else(|| AppError::not_found("Wallet owner not found"))?;

            let expected = account.version;
            if !account.wallet.apply(delta, entry_id) {
                return Ok(false);
            }
            account.version += 1;

            if self.store.replace_account(&account, expected).await? {
                return Ok(true);
            }
            tracing::debug!(user_id, entry_id, attempt, "Wallet snapshot changed concurrently, retrying");
        }

        Err(AppError::conflict("Wallet is being updated concurrently"))
    }

    /// Posts an entry and applies it to the snapshot.
    pub async fn record(&self, posting: &Posting) -> Result<WalletTransaction, AppError> {
        let mut tx = self.post(posting).await?;
        if tx.applied {
            tracing::info!(entry_id = %tx.id, "Wallet posting already applied");
            return Ok(tx);
        }

        let applied = self.apply_unapplied(&posting.user_id, &tx.id).await?;
        tx.applied = true;

        if applied {
            metrics::record_wallet_posting(posting.source.as_str());
            tracing::info!(
                user_id = %posting.user_id,
                entry_id = %tx.id,
                amount = %tx.amount,
                booking_id = ?posting.linked_booking,
                "Wallet posting applied"
            );
        } else {
            tracing::info!(entry_id = %tx.id, "Wallet posting already applied");
        }
        Ok(tx)
    }

    /// Folds and marks every unmarked entry of the owner, oldest first.
    /// Returns whether `entry_id` was folded by this call.
    async fn apply_unapplied(&self, user_id: &str, entry_id: &str) -> Result<bool, AppError> {
        let mut applied_target = false;
        for entry in self.store.list_unapplied_transactions(user_id).await? {
            let applied = self.apply_delta(user_id, &entry.delta, &entry.id).await?;
            self.store.mark_transaction_applied(&entry.id).await?;

            if entry.id == entry_id {
                applied_target = applied;
            } else if applied {
                tracing::warn!(user_id, entry_id = %entry.id, "Completed interrupted wallet posting");
            }
        }
        Ok(applied_target)
    }

    pub async fn wallet_info(&self, user_id: &str) -> Result<WalletInfo, AppError> {
        let account = self
            .store
            .find_account(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        let entries = self.store.list_transactions(user_id).await?;

        // list is newest first; replay oldest first
        let replayed = replay(entries.iter().rev());
        let consistent = replayed.same_figures(&account.wallet) && account.wallet.is_consistent();
        if !consistent {
            tracing::warn!(
                user_id,
                balance = %account.wallet.balance,
                replayed_balance = %replayed.balance,
                pending = %account.wallet.pending_payouts,
                replayed_pending = %replayed.pending_payouts,
                "Wallet snapshot drifted from ledger"
            );
        }

        Ok(WalletInfo {
            wallet: account.wallet,
            consistent,
        })
    }

    /// Newest first.
    pub async fn transactions(&self, user_id: &str) -> Result<Vec<WalletTransaction>, AppError> {
        self.store.list_transactions(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::wallet::APPLIED_ENTRY_WINDOW;
    use crate::models::{Account, Role, RoleSet};
    use crate::services::memory::InMemoryStore;
    use crate::services::store::{AccountStore, LedgerStore};

    async fn setup() -> (Arc<InMemoryStore>, WalletLedger, Account) {
        let store = Arc::new(InMemoryStore::new());
        let influencer = Account::new("Mira", RoleSet::new([Role::Influencer]));
        store.insert_account(&influencer).await.unwrap();
        let ledger = WalletLedger::new(store.clone());
        (store, ledger, influencer)
    }

    #[tokio::test]
    async fn recording_twice_applies_once() {
        let (store, ledger, influencer) = setup().await;
        let posting =
            Posting::booking_earning("b1:earning".into(), &influencer.id, "b1", Decimal::from(1000));

        ledger.record(&posting).await.unwrap();
        ledger.record(&posting).await.unwrap();

        let info = ledger.wallet_info(&influencer.id).await.unwrap();
        assert_eq!(info.wallet.pending_payouts, Decimal::from(1000));
        assert_eq!(info.wallet.total_earned, Decimal::from(1000));
        assert_eq!(info.wallet.balance, Decimal::ZERO);
        assert!(info.consistent);
        assert_eq!(store.list_transactions(&influencer.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn interrupted_posting_is_completed_on_retry() {
        let (_store, ledger, influencer) = setup().await;
        let posting =
            Posting::booking_earning("b2:earning".into(), &influencer.id, "b2", Decimal::from(400));

        // log written, snapshot not yet updated
        ledger.post(&posting).await.unwrap();
        let info = ledger.wallet_info(&influencer.id).await.unwrap();
        assert!(!info.consistent);

        ledger.record(&posting).await.unwrap();
        let info = ledger.wallet_info(&influencer.id).await.unwrap();
        assert!(info.consistent);
        assert_eq!(info.wallet.pending_payouts, Decimal::from(400));
    }

    async fn record_small_earnings(ledger: &WalletLedger, owner: &str, count: usize) {
        for n in 1..=count {
            let booking = format!("b{}", n);
            let earning =
                Posting::booking_earning(format!("{}:earning", booking), owner, &booking, Decimal::ONE);
            ledger.record(&earning).await.unwrap();
        }
    }

    #[tokio::test]
    async fn reposting_an_old_entry_after_a_long_history_applies_once() {
        let (_store, ledger, influencer) = setup().await;
        let amount = Decimal::from(1000);
        let earning = Posting::booking_earning("b0:earning".into(), &influencer.id, "b0", amount);
        let payout = Posting::booking_payout("b0:payout".into(), &influencer.id, "b0", amount);
        ledger.record(&earning).await.unwrap();
        ledger.record(&payout).await.unwrap();

        let later = APPLIED_ENTRY_WINDOW + 10;
        record_small_earnings(&ledger, &influencer.id, later).await;

        ledger.record(&payout).await.unwrap();

        let info = ledger.wallet_info(&influencer.id).await.unwrap();
        assert_eq!(info.wallet.balance, amount);
        assert_eq!(info.wallet.pending_payouts, Decimal::from(later as i64));
        assert!(info.consistent);
    }

    #[tokio::test]
    async fn entry_folded_before_its_marker_is_not_folded_again() {
        let (store, ledger, influencer) = setup().await;
        let earning =
            Posting::booking_earning("b0:earning".into(), &influencer.id, "b0", Decimal::from(1000));

        // snapshot written, applied marker never set
        let tx = ledger.post(&earning).await.unwrap();
        assert!(ledger.apply_delta(&influencer.id, &tx.delta, &tx.id).await.unwrap());

        let later = APPLIED_ENTRY_WINDOW + 10;
        record_small_earnings(&ledger, &influencer.id, later).await;
        assert!(store.find_transaction("b0:earning").await.unwrap().unwrap().applied);

        ledger.record(&earning).await.unwrap();

        let info = ledger.wallet_info(&influencer.id).await.unwrap();
        assert_eq!(info.wallet.pending_payouts, Decimal::from(1000 + later as i64));
        assert!(info.consistent);
    }

    #[tokio::test]
    async fn unknown_owner_is_not_found() {
        let (_store, ledger, _) = setup().await;
        let posting = Posting::booking_payout("x".into(), "nobody", "b", Decimal::ONE);
        let err = ledger.record(&posting).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
