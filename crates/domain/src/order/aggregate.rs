//! Order entity.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{CustomerId, Money, OrderError, OrderItem, OrderStatus};

/// Order aggregate root.
///
/// Identity, customer, items and total are fixed when the order is created.
/// Only the status (and `updated_at` with it) changes afterwards, and only
/// along the edges of [`OrderStatus`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    order_id: OrderId,
    customer_id: CustomerId,
    items: Vec<OrderItem>,

    /// Computed once in [`Order::with_id`].
    total_amount: Money,

    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates an order with a freshly generated identifier.
    pub fn new(customer_id: impl Into<CustomerId>, items: Vec<OrderItem>) -> Result<Self, OrderError> {
        Self::with_id(OrderId::new(), customer_id, items)
    }

    /// Creates an order with a caller-chosen identifier.
    pub fn with_id(
        order_id: OrderId,
        customer_id: impl Into<CustomerId>,
        items: Vec<OrderItem>,
    ) -> Result<Self, OrderError> {
        let customer_id = customer_id.into();
        if customer_id.is_blank() {
            return Err(OrderError::CustomerIdRequired);
        }
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        for item in &items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id.to_string(),
                    quantity: item.quantity,
                });
            }
            if !item.unit_price.is_positive() {
                return Err(OrderError::InvalidPrice {
                    product_id: item.product_id.to_string(),
                    price: item.unit_price,
                });
            }
        }

        let total_amount = items
            .iter()
            .try_fold(Money::zero(), |total, item| item.line_total()?.checked_add(total))
            .ok_or(OrderError::AmountOverflow)?;
        let now = Utc::now();

        Ok(Self {
            order_id,
            customer_id,
            items,
            total_amount,
            status: OrderStatus::Created,
            created_at: now,
            updated_at: now,
        })
    }

    /// Moves the order to `next`, stamping `updated_at` with the current time.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        self.transition_at(next, Utc::now())
    }

    /// Moves the order to `next` as of `at`. Used when replaying a recorded
    /// transition so the original timestamp is preserved.
    pub fn transition_at(&mut self, next: OrderStatus, at: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }

    /// Returns true if the order is at `status` or has moved past it.
    pub fn has_reached(&self, status: OrderStatus) -> bool {
        self.status == status || self.status.rank() > status.rank()
    }
}

// Query methods
impl Order {
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn customer_id(&self) -> &CustomerId {
        &self.customer_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<OrderItem> {
        vec![
            OrderItem::new("P1", "Widget", Money::from_dollars(10), 2),
            OrderItem::new("P2", "Gadget", Money::from_dollars(5), 1),
        ]
    }

    #[test]
    fn test_new_order_totals_items() {
        let order = Order::new("cust-1", items()).unwrap();
        assert_eq!(order.total_amount(), Money::from_dollars(25));
        assert_eq!(order.status(), OrderStatus::Created);
        assert_eq!(order.created_at(), order.updated_at());
        assert_eq!(order.items().len(), 2);
        assert_eq!(order.items()[0].product_id.as_str(), "P1");
    }

    #[test]
    fn test_blank_customer_rejected() {
        assert_eq!(
            Order::new("", items()).unwrap_err(),
            OrderError::CustomerIdRequired
        );
    }

    #[test]
    fn test_empty_items_rejected() {
        assert_eq!(Order::new("cust-1", vec![]).unwrap_err(), OrderError::NoItems);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let result = Order::new(
            "cust-1",
            vec![OrderItem::new("P1", "Widget", Money::from_dollars(1), 0)],
        );
        assert!(matches!(result, Err(OrderError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let result = Order::new(
            "cust-1",
            vec![OrderItem::new("P1", "Widget", Money::zero(), 1)],
        );
        assert!(matches!(result, Err(OrderError::InvalidPrice { .. })));
    }

    #[test]
    fn test_line_total_overflow_rejected() {
        let result = Order::new(
            "cust-1",
            vec![OrderItem::new("P1", "Widget", Money::from_cents(i64::MAX), 2)],
        );
        assert_eq!(result.unwrap_err(), OrderError::AmountOverflow);
    }

    #[test]
    fn test_order_total_overflow_rejected() {
        let result = Order::new(
            "cust-1",
            vec![
                OrderItem::new("P1", "Widget", Money::from_cents(i64::MAX - 10), 1),
                OrderItem::new("P2", "Gadget", Money::from_cents(11), 1),
            ],
        );
        assert_eq!(result.unwrap_err(), OrderError::AmountOverflow);
    }

    #[test]
    fn test_transition_updates_timestamp() {
        let mut order = Order::new("cust-1", items()).unwrap();
        let later = order.updated_at() + chrono::Duration::seconds(5);

        order.transition_at(OrderStatus::Checking, later).unwrap();

        assert_eq!(order.status(), OrderStatus::Checking);
        assert_eq!(order.updated_at(), later);
        assert!(order.created_at() < order.updated_at());
    }

    #[test]
    fn test_invalid_transition_leaves_order_untouched() {
        let mut order = Order::new("cust-1", items()).unwrap();
        let before = order.clone();

        let err = order.transition_to(OrderStatus::Processing).unwrap_err();

        assert_eq!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Created,
                to: OrderStatus::Processing,
            }
        );
        assert_eq!(order, before);
    }

    #[test]
    fn test_has_reached() {
        let mut order = Order::new("cust-1", items()).unwrap();
        order.transition_to(OrderStatus::Checking).unwrap();
        order.transition_to(OrderStatus::Processing).unwrap();

        assert!(order.has_reached(OrderStatus::Checking));
        assert!(order.has_reached(OrderStatus::Processing));
        assert!(!order.has_reached(OrderStatus::Notifying));

        order.transition_to(OrderStatus::Cancelled).unwrap();
        assert!(order.has_reached(OrderStatus::Notifying));
        assert!(order.is_terminal());
    }
}
