//! Payment gateway integration.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use shopline_commerce::payment::{GatewaySession, GatewayVerdict, Payment};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway rejected the payment: {0}")]
    Rejected(String),

    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// A hosted payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted payment session for a payment.
    async fn initiate(&self, payment: &Payment) -> Result<GatewaySession, GatewayError>;

    /// Ask the provider how a transaction ended.
    async fn verify(&self, transaction_id: &str) -> Result<GatewayVerdict, GatewayError>;
}

/// In-process gateway for development and tests.
///
/// Transaction ids are derived from the payment id. Every session it opened
/// verifies as paid unless a verdict was set with [`SandboxGateway::set_verdict`];
/// transactions it never opened verify as failed.
#[derive(Debug)]
pub struct SandboxGateway {
    redirect_base_url: String,
    verdicts: Mutex<HashMap<String, GatewayVerdict>>,
}

impl SandboxGateway {
    pub fn new(redirect_base_url: impl Into<String>) -> Self {
        Self {
            redirect_base_url: redirect_base_url.into(),
            verdicts: Mutex::new(HashMap::new()),
        }
    }

    /// Transaction id the sandbox assigns to a payment.
    pub fn transaction_id(payment: &Payment) -> String {
        format!("sbx_{}", payment.id)
    }

    /// Force the outcome of a transaction.
    pub fn set_verdict(&self, transaction_id: &str, verdict: GatewayVerdict) {
        if let Ok(mut verdicts) = self.verdicts.lock() {
            verdicts.insert(transaction_id.to_string(), verdict);
        }
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn initiate(&self, payment: &Payment) -> Result<GatewaySession, GatewayError> {
        if payment.amount.amount_cents <= 0 {
            return Err(GatewayError::Rejected("amount must be positive".to_string()));
        }
        let transaction_id = Self::transaction_id(payment);
        let mut verdicts = self
            .verdicts
            .lock()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        verdicts
            .entry(transaction_id.clone())
            .or_insert(GatewayVerdict::Paid);
        debug!(transaction_id = %transaction_id, "sandbox session opened");

        Ok(GatewaySession {
            redirect_url: format!(
                "{}/{}",
                self.redirect_base_url.trim_end_matches('/'),
                transaction_id
            ),
            transaction_id,
        })
    }

    async fn verify(&self, transaction_id: &str) -> Result<GatewayVerdict, GatewayError> {
        let verdicts = self
            .verdicts
            .lock()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(verdicts
            .get(transaction_id)
            .copied()
            .unwrap_or(GatewayVerdict::Failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopline_commerce::ids::{OrderId, PaymentId, UserId};
    use shopline_commerce::payment::{PaymentMethod, PaymentStatus};
    use shopline_commerce::{Currency, Money};

    fn payment(cents: i64) -> Payment {
        Payment {
            id: PaymentId::new("64b7f0c2a1b2c3d4e5f60718"),
            order_id: OrderId::generate(),
            user_id: UserId::generate(),
            method: PaymentMethod::Online,
            amount: Money::new(cents, Currency::BDT),
            status: PaymentStatus::Pending,
            transaction_id: None,
            redirect_url: None,
            created_at: 0,
            updated_at: 0,
            paid_at: None,
        }
    }

    #[tokio::test]
    async fn test_sandbox_session_is_deterministic() {
        let gateway = SandboxGateway::new("https://pay.example/");
        let session = gateway.initiate(&payment(1000)).await.unwrap();
        assert_eq!(session.transaction_id, "sbx_64b7f0c2a1b2c3d4e5f60718");
        assert_eq!(
            session.redirect_url,
            "https://pay.example/sbx_64b7f0c2a1b2c3d4e5f60718"
        );
        assert_eq!(
            gateway.verify(&session.transaction_id).await.unwrap(),
            GatewayVerdict::Paid
        );
    }

    #[tokio::test]
    async fn test_sandbox_verdicts() {
        let gateway = SandboxGateway::new("https://pay.example");
        let session = gateway.initiate(&payment(1000)).await.unwrap();
        gateway.set_verdict(&session.transaction_id, GatewayVerdict::Failed);
        assert_eq!(
            gateway.verify(&session.transaction_id).await.unwrap(),
            GatewayVerdict::Failed
        );
        assert_eq!(
            gateway.verify("sbx_unknown").await.unwrap(),
            GatewayVerdict::Failed
        );
    }

    #[tokio::test]
    async fn test_sandbox_rejects_zero_amount() {
        let gateway = SandboxGateway::new("https://pay.example");
        assert!(gateway.initiate(&payment(0)).await.is_err());
    }
}
