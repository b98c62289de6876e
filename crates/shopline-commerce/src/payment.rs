//! Payments against orders.

use crate::checkout::Order;
use crate::error::CommerceError;
use crate::ids::{OrderId, PaymentId, UserId};
use crate::money::Money;
use crate::util::now;
use serde::{Deserialize, Serialize};
use shopline_db::Document;

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cod,
    /// Hosted payment page.
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Online => "online",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

/// A gateway's answer about a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayVerdict {
    Paid,
    Failed,
    Pending,
}

/// What a gateway returns when a payment is started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewaySession {
    pub transaction_id: String,
    /// Hosted page the customer is sent to.
    pub redirect_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub method: PaymentMethod,
    pub amount: Money,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub redirect_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub paid_at: Option<i64>,
}

impl Document for Payment {
    const COLLECTION: &'static str = "payments";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Payment {
    /// Start a payment for an order's grand total.
    pub fn for_order(order: &Order) -> Result<Self, CommerceError> {
        if order.status == crate::checkout::OrderStatus::Cancelled {
            return Err(CommerceError::NotAllowed(format!(
                "order {} is cancelled",
                order.order_number
            )));
        }
        if order.is_paid() {
            return Err(CommerceError::NotAllowed(format!(
                "order {} is already paid",
                order.order_number
            )));
        }
        let now = now();
        Ok(Self {
            id: PaymentId::generate(),
            order_id: order.id.clone(),
            user_id: order.user_id.clone(),
            method: order.payment_method,
            amount: order.grand_total,
            status: PaymentStatus::Pending,
            transaction_id: None,
            redirect_url: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
        })
    }

    pub fn attach_session(&mut self, session: GatewaySession) {
        self.transaction_id = Some(session.transaction_id);
        self.redirect_url = Some(session.redirect_url);
        self.updated_at = now();
    }

    /// Apply a gateway verdict. Returns true if the payment changed.
    ///
    /// Settled payments ignore further verdicts, so repeated callbacks are
    /// harmless.
    pub fn settle(&mut self, verdict: GatewayVerdict) -> bool {
        if self.status != PaymentStatus::Pending {
            return false;
        }
        let now = now();
        match verdict {
            GatewayVerdict::Paid => {
                self.status = PaymentStatus::Paid;
                self.paid_at = Some(now);
            }
            GatewayVerdict::Failed => self.status = PaymentStatus::Failed,
            GatewayVerdict::Pending => return false,
        }
        self.updated_at = now;
        true
    }

    /// Record cash collected for a cash-on-delivery payment.
    pub fn collect_cash(&mut self) -> Result<(), CommerceError> {
        if self.method != PaymentMethod::Cod {
            return Err(CommerceError::NotAllowed(
                "only cash-on-delivery payments can be collected".to_string(),
            ));
        }
        if !self.settle(GatewayVerdict::Paid) {
            return Err(CommerceError::NotAllowed(format!(
                "payment is already {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    pub fn refund(&mut self) {
        if self.status == PaymentStatus::Paid {
            self.status = PaymentStatus::Refunded;
            self.updated_at = now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{Address, NewOrder, OrderLine, ShippingPolicy};
    use crate::ids::{LocationId, ProductId, VariantId};
    use crate::money::Currency;

    fn order(method: PaymentMethod) -> Order {
        Order::place(
            NewOrder {
                user_id: UserId::new("u"),
                email: "u@example.com".to_string(),
                lines: vec![OrderLine {
                    product_id: ProductId::new("p"),
                    variant_id: VariantId::new("v"),
                    sku: "S".to_string(),
                    name: "N".to_string(),
                    variant_name: "Default".to_string(),
                    quantity: 1,
                    unit_price: Money::new(1000, Currency::BDT),
                    total_price: Money::new(1000, Currency::BDT),
                    preorder: true,
                    allocations: vec![],
                }],
                shipping_address: Address {
                    name: "U".to_string(),
                    phone: "017".to_string(),
                    line1: "L".to_string(),
                    city: "Dhaka".to_string(),
                    country: "Bangladesh".to_string(),
                    ..Default::default()
                },
                payment_method: method,
                fulfillment_location: LocationId::new("l"),
                note: None,
            },
            &ShippingPolicy::new(Currency::BDT, 100, 0),
        )
        .unwrap()
    }

    #[test]
    fn test_payment_amount_is_grand_total() {
        let payment = Payment::for_order(&order(PaymentMethod::Online)).unwrap();
        assert_eq!(payment.amount.amount_cents, 1100);
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[test]
    fn test_paid_or_cancelled_order_rejected() {
        let mut paid = order(PaymentMethod::Online);
        paid.mark_paid();
        assert!(Payment::for_order(&paid).is_err());

        let mut cancelled = order(PaymentMethod::Online);
        cancelled.cancel().unwrap();
        assert!(Payment::for_order(&cancelled).is_err());
    }

    #[test]
    fn test_settle_is_idempotent() {
        let mut payment = Payment::for_order(&order(PaymentMethod::Online)).unwrap();
        assert!(!payment.settle(GatewayVerdict::Pending));
        assert!(payment.settle(GatewayVerdict::Paid));
        assert!(!payment.settle(GatewayVerdict::Paid));
        assert!(!payment.settle(GatewayVerdict::Failed));
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert!(payment.paid_at.is_some());
    }

    #[test]
    fn test_collect_cash() {
        let mut online = Payment::for_order(&order(PaymentMethod::Online)).unwrap();
        assert!(online.collect_cash().is_err());

        let mut cod = Payment::for_order(&order(PaymentMethod::Cod)).unwrap();
        cod.collect_cash().unwrap();
        assert_eq!(cod.status, PaymentStatus::Paid);
        assert!(cod.collect_cash().is_err());

        cod.refund();
        assert_eq!(cod.status, PaymentStatus::Refunded);
    }
}
