//! Order types.

use crate::cart::LineItem;
use crate::checkout::{Address, ShippingPolicy};
use crate::error::CommerceError;
use crate::ids::{LocationId, OrderId, ProductId, UserId, VariantId};
use crate::inventory::LotAllocation;
use crate::money::{Currency, Money};
use crate::payment::PaymentMethod;
use crate::util::{document_number, now};
use serde::{Deserialize, Serialize};
use shopline_db::Document;

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order placed, awaiting confirmation.
    #[default]
    Pending,
    /// Order confirmed (paid online or accepted by staff).
    Confirmed,
    /// Order being prepared.
    Processing,
    /// Order handed to the courier.
    Shipped,
    /// Order delivered.
    Delivered,
    /// Order cancelled.
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Check if order can be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing
        )
    }

    /// The status that follows this one in fulfilment, if any.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Processing),
            OrderStatus::Processing => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        if to == OrderStatus::Cancelled {
            return self.can_cancel();
        }
        self.next() == Some(to)
    }
}

/// Financial/payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FinancialStatus {
    /// Payment pending.
    #[default]
    Pending,
    /// Payment captured/completed.
    Paid,
    /// Paid and then cancelled; money is owed back.
    Refunded,
}

impl FinancialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinancialStatus::Pending => "pending",
            FinancialStatus::Paid => "paid",
            FinancialStatus::Refunded => "refunded",
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Human-readable order number.
    pub order_number: String,
    pub user_id: UserId,
    /// Customer email.
    pub email: String,
    /// Items in the order.
    pub lines: Vec<OrderLine>,
    /// Shipping address.
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    /// Sum of line totals.
    pub subtotal: Money,
    pub shipping_fee: Money,
    /// Grand total charged.
    pub grand_total: Money,
    /// Order currency.
    pub currency: Currency,
    /// Order status.
    pub status: OrderStatus,
    /// Payment status.
    pub financial_status: FinancialStatus,
    /// Location stock was taken from.
    pub fulfillment_location: LocationId,
    /// Customer note.
    pub note: Option<String>,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
    /// Unix timestamp when cancelled (if applicable).
    pub cancelled_at: Option<i64>,
}

impl Document for Order {
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

/// Everything needed to place an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub email: String,
    pub lines: Vec<OrderLine>,
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub fulfillment_location: LocationId,
    pub note: Option<String>,
}

/// Checkout request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: Address,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub note: Option<String>,
}

impl Order {
    /// Place an order, pricing it with the shipping policy.
    pub fn place(input: NewOrder, shipping: &ShippingPolicy) -> Result<Self, CommerceError> {
        if input.lines.is_empty() {
            return Err(CommerceError::ValidationError(
                "an order needs at least one line".to_string(),
            ));
        }
        let currency = shipping.flat_fee.currency;
        let subtotal = Money::try_sum(input.lines.iter().map(|l| &l.total_price), currency)
            .ok_or(CommerceError::Overflow)?;
        let shipping_fee = shipping.fee_for(&subtotal);
        let grand_total = subtotal
            .try_add(&shipping_fee)
            .ok_or(CommerceError::Overflow)?;
        let shipping_address = input.shipping_address.validated()?;
        let now = now();

        Ok(Self {
            id: OrderId::generate(),
            order_number: document_number("ORD"),
            user_id: input.user_id,
            email: input.email,
            lines: input.lines,
            shipping_address,
            payment_method: input.payment_method,
            subtotal,
            shipping_fee,
            grand_total,
            currency,
            status: OrderStatus::Pending,
            financial_status: FinancialStatus::Pending,
            fulfillment_location: input.fulfillment_location,
            note: input.note.filter(|n| !n.trim().is_empty()),
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        })
    }

    /// Get total item count.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|i| i.quantity).sum()
    }

    /// Check if order is paid.
    pub fn is_paid(&self) -> bool {
        self.financial_status == FinancialStatus::Paid
    }

    pub fn has_preorder_lines(&self) -> bool {
        self.lines.iter().any(|l| l.preorder)
    }

    /// Move along the status machine. Cancelling goes through [`Order::cancel`].
    pub fn transition(&mut self, to: OrderStatus) -> Result<(), CommerceError> {
        if to == OrderStatus::Cancelled || !self.status.can_transition_to(to) {
            return Err(CommerceError::InvalidStatusTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        self.status = to;
        self.updated_at = now();
        Ok(())
    }

    /// Cancel the order. Stock restoration is the caller's job.
    pub fn cancel(&mut self) -> Result<(), CommerceError> {
        if !self.status.can_cancel() {
            return Err(CommerceError::InvalidStatusTransition {
                from: self.status.as_str().to_string(),
                to: OrderStatus::Cancelled.as_str().to_string(),
            });
        }
        let now = now();
        self.status = OrderStatus::Cancelled;
        if self.financial_status == FinancialStatus::Paid {
            self.financial_status = FinancialStatus::Refunded;
        }
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Record a successful payment. A pending order becomes confirmed.
    pub fn mark_paid(&mut self) {
        self.financial_status = FinancialStatus::Paid;
        if self.status == OrderStatus::Pending {
            self.status = OrderStatus::Confirmed;
        }
        self.updated_at = now();
    }
}

/// A line item in an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub product_id: ProductId,
    /// Variant ID.
    pub variant_id: VariantId,
    /// SKU at time of order.
    pub sku: String,
    /// Product name at time of order.
    pub name: String,
    pub variant_name: String,
    /// Quantity ordered.
    pub quantity: i64,
    /// Unit price at time of order.
    pub unit_price: Money,
    /// Total price for this line.
    pub total_price: Money,
    /// Not backed by stock at checkout.
    pub preorder: bool,
    /// Lots the units were taken from. Empty for pre-orders.
    pub allocations: Vec<LotAllocation>,
}

impl OrderLine {
    /// Snapshot a cart line.
    pub fn from_cart_item(item: &LineItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            variant_id: item.variant_id.clone(),
            sku: item.sku.clone(),
            name: item.product_name.clone(),
            variant_name: item.variant_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
            preorder: item.preorder,
            allocations: Vec::new(),
        }
    }

    pub fn allocated_quantity(&self) -> i64 {
        self.allocations.iter().map(|a| a.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::LotId;

    fn line(qty: i64, cents: i64) -> OrderLine {
        OrderLine {
            product_id: ProductId::new("p"),
            variant_id: VariantId::new("v"),
            sku: "SKU".to_string(),
            name: "Shirt".to_string(),
            variant_name: "M".to_string(),
            quantity: qty,
            unit_price: Money::new(cents, Currency::BDT),
            total_price: Money::new(cents * qty, Currency::BDT),
            preorder: false,
            allocations: vec![LotAllocation {
                lot_id: LotId::new("lot"),
                quantity: qty,
                unit_cost: Money::new(cents / 2, Currency::BDT),
                received_at: 0,
            }],
        }
    }

    fn new_order(lines: Vec<OrderLine>) -> NewOrder {
        NewOrder {
            user_id: UserId::new("u1"),
            email: "buyer@example.com".to_string(),
            lines,
            shipping_address: Address {
                name: "Buyer".to_string(),
                phone: "01700000000".to_string(),
                line1: "Road 1".to_string(),
                line2: None,
                area: None,
                city: "Dhaka".to_string(),
                postal_code: None,
                country: "Bangladesh".to_string(),
            },
            payment_method: PaymentMethod::Cod,
            fulfillment_location: LocationId::new("loc"),
            note: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_place_order_totals() {
        let policy = ShippingPolicy::new(Currency::BDT, 6000, 100000);
        let order = Order::place(new_order(vec![line(2, 10000), line(1, 5000)]), &policy).unwrap();

        assert!(order.order_number.starts_with("ORD-"));
        assert_eq!(order.subtotal.amount_cents, 25000);
        assert_eq!(order.shipping_fee.amount_cents, 6000);
        assert_eq!(order.grand_total.amount_cents, 31000);
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.note.is_none());
        assert_eq!(order.lines[0].allocated_quantity(), 2);
    }

    #[test]
    fn test_place_order_free_shipping() {
        let policy = ShippingPolicy::new(Currency::BDT, 6000, 20000);
        let order = Order::place(new_order(vec![line(2, 10000)]), &policy).unwrap();
        assert!(order.shipping_fee.is_zero());
        assert_eq!(order.grand_total.amount_cents, 20000);
    }

    #[test]
    fn test_empty_order_rejected() {
        let policy = ShippingPolicy::new(Currency::BDT, 6000, 0);
        assert!(Order::place(new_order(vec![]), &policy).is_err());
    }

    #[test]
    fn test_order_status_can_cancel() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Confirmed.can_cancel());
        assert!(OrderStatus::Processing.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
    }

    #[test]
    fn test_status_machine() {
        let policy = ShippingPolicy::new(Currency::BDT, 0, 0);
        let mut order = Order::place(new_order(vec![line(1, 100)]), &policy).unwrap();

        assert!(order.transition(OrderStatus::Shipped).is_err());
        for next in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            order.transition(next).unwrap();
        }
        assert!(order.status.is_terminal());
        assert!(matches!(
            order.cancel(),
            Err(CommerceError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_transition_refuses_cancel() {
        let policy = ShippingPolicy::new(Currency::BDT, 0, 0);
        let mut order = Order::place(new_order(vec![line(1, 100)]), &policy).unwrap();
        assert!(order.transition(OrderStatus::Cancelled).is_err());
        order.cancel().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.cancelled_at.is_some());
    }

    #[test]
    fn test_mark_paid_confirms_pending() {
        let policy = ShippingPolicy::new(Currency::BDT, 0, 0);
        let mut order = Order::place(new_order(vec![line(1, 100)]), &policy).unwrap();
        order.mark_paid();
        assert!(order.is_paid());
        assert_eq!(order.status, OrderStatus::Confirmed);

        order.cancel().unwrap();
        assert_eq!(order.financial_status, FinancialStatus::Refunded);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(OrderStatus::parse("Shipped"), Some(OrderStatus::Shipped));
        assert_eq!(OrderStatus::parse("lost"), None);
    }
}
