//! Integration tests for the Order entity.
//!
//! These tests walk orders through every path of the status DAG and check
//! that the frozen parts of an order never change along the way.

use domain::{CustomerId, Money, Order, OrderError, OrderItem, OrderStatus};

fn sample_items() -> Vec<OrderItem> {
    vec![
        OrderItem::new("P1", "Widget", Money::from_dollars(10), 2),
        OrderItem::new("P2", "Gadget", Money::from_dollars(5), 1),
    ]
}

fn walk(order: &mut Order, path: &[OrderStatus]) {
    for next in path {
        order.transition_to(*next).unwrap();
    }
}

mod lifecycle {
    use super::*;

    #[test]
    fn completed_path() {
        let mut order = Order::new("cust-1", sample_items()).unwrap();
        walk(
            &mut order,
            &[
                OrderStatus::Checking,
                OrderStatus::Processing,
                OrderStatus::Notifying,
                OrderStatus::Completed,
            ],
        );
        assert_eq!(order.status(), OrderStatus::Completed);
        assert!(order.is_terminal());
    }

    #[test]
    fn failed_during_checking() {
        let mut order = Order::new("cust-1", sample_items()).unwrap();
        walk(&mut order, &[OrderStatus::Checking, OrderStatus::Failed]);
        assert_eq!(order.status(), OrderStatus::Failed);
    }

    #[test]
    fn failed_during_payment() {
        let mut order = Order::new("cust-1", sample_items()).unwrap();
        walk(
            &mut order,
            &[
                OrderStatus::Checking,
                OrderStatus::Processing,
                OrderStatus::Failed,
            ],
        );
        assert_eq!(order.status(), OrderStatus::Failed);
    }

    #[test]
    fn cancelled_during_payment() {
        let mut order = Order::new("cust-1", sample_items()).unwrap();
        walk(
            &mut order,
            &[
                OrderStatus::Checking,
                OrderStatus::Processing,
                OrderStatus::Cancelled,
            ],
        );
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }
}

mod invariants {
    use super::*;

    #[test]
    fn terminal_orders_reject_every_transition() {
        let terminal_paths: [&[OrderStatus]; 3] = [
            &[
                OrderStatus::Checking,
                OrderStatus::Processing,
                OrderStatus::Notifying,
                OrderStatus::Completed,
            ],
            &[OrderStatus::Checking, OrderStatus::Failed],
            &[
                OrderStatus::Checking,
                OrderStatus::Processing,
                OrderStatus::Cancelled,
            ],
        ];

        for path in terminal_paths {
            let mut order = Order::new("cust-1", sample_items()).unwrap();
            walk(&mut order, path);
            let terminal = order.status();

            for next in [
                OrderStatus::Created,
                OrderStatus::Checking,
                OrderStatus::Processing,
                OrderStatus::Notifying,
                OrderStatus::Completed,
                OrderStatus::Failed,
                OrderStatus::Cancelled,
            ] {
                let result = order.transition_to(next);
                assert!(
                    matches!(result, Err(OrderError::InvalidTransition { .. })),
                    "{terminal} -> {next} must be rejected"
                );
                assert_eq!(order.status(), terminal);
            }
        }
    }

    #[test]
    fn left_statuses_are_never_revisited() {
        let mut order = Order::new("cust-1", sample_items()).unwrap();
        walk(&mut order, &[OrderStatus::Checking, OrderStatus::Processing]);

        assert!(order.transition_to(OrderStatus::Created).is_err());
        assert!(order.transition_to(OrderStatus::Checking).is_err());

        order.transition_to(OrderStatus::Notifying).unwrap();
        assert!(order.transition_to(OrderStatus::Processing).is_err());
    }

    #[test]
    fn items_and_total_survive_the_lifecycle() {
        let items = sample_items();
        let expected_total = items
            .iter()
            .map(|item| item.line_total().unwrap())
            .fold(Money::zero(), |total, line| total.checked_add(line).unwrap());
        let mut order = Order::new("cust-1", items.clone()).unwrap();

        walk(
            &mut order,
            &[
                OrderStatus::Checking,
                OrderStatus::Processing,
                OrderStatus::Notifying,
                OrderStatus::Completed,
            ],
        );

        assert_eq!(order.items(), items.as_slice());
        assert_eq!(order.total_amount(), expected_total);
        assert_eq!(order.total_amount(), Money::from_dollars(25));
        assert_eq!(order.customer_id(), &CustomerId::new("cust-1"));
    }

    #[test]
    fn total_matches_sum_of_lines() {
        for count in 1..=8u32 {
            let items: Vec<_> = (1..=count)
                .map(|i| OrderItem::new(format!("P{i}"), "Item", Money::from_cents(i64::from(i) * 37), i))
                .collect();
            let expected: i64 = (1..=i64::from(count)).map(|i| i * 37 * i).sum();

            let order = Order::new("cust-1", items).unwrap();
            assert_eq!(order.total_amount().cents(), expected);
        }
    }

    #[test]
    fn snapshot_serialization_keeps_status_and_items() {
        let mut order = Order::new("cust-1", sample_items()).unwrap();
        order.transition_to(OrderStatus::Checking).unwrap();

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "Checking");
        assert_eq!(json["total_amount"], 2500);

        let restored: Order = serde_json::from_value(json).unwrap();
        assert_eq!(restored, order);
    }
}
