use async_trait::async_trait;
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Approved { transaction_id: String },
    Declined { reason: String },
}

/// Charges the buyer for a checkout session.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// `reference` is the checkout session id and must make the charge
    /// idempotent on the gateway side.
    async fn charge(
        &self,
        reference: &str,
        amount: Decimal,
        currency: &str,
        method: &str,
    ) -> Result<PaymentOutcome, AppError>;
}

/// Gateway used in place of a real processor: every charge is approved.
#[derive(Debug, Default, Clone)]
pub struct SimulatedGateway;

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(
        &self,
        reference: &str,
        amount: Decimal,
        currency: &str,
        method: &str,
    ) -> Result<PaymentOutcome, AppError> {
        tracing::debug!(reference, %amount, currency, method, "Simulated charge approved");
        Ok(PaymentOutcome::Approved {
            transaction_id: format!("txn_{}", Uuid::new_v4().simple()),
        })
    }
}

/// Gateway that declines every charge.
#[derive(Debug, Clone)]
pub struct DecliningGateway {
    pub reason: String,
}

#[async_trait]
impl PaymentGateway for DecliningGateway {
    async fn charge(
        &self,
        _reference: &str,
        _amount: Decimal,
        _currency: &str,
        _method: &str,
    ) -> Result<PaymentOutcome, AppError> {
        Ok(PaymentOutcome::Declined {
            reason: self.reason.clone(),
        })
    }
}
