use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::{Money, Order, OrderItem, OrderStatus};

fn make_items(count: usize) -> Vec<OrderItem> {
    (0..count)
        .map(|i| {
            OrderItem::new(
                format!("SKU-{i:04}"),
                format!("Benchmark Widget {i}"),
                Money::from_cents(100 + i as i64),
                (i % 5 + 1) as u32,
            )
        })
        .collect()
}

fn bench_create_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("domain/create_order");
    for size in [1usize, 10, 100] {
        let items = make_items(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, items| {
            b.iter(|| Order::new("cust-bench", items.clone()).unwrap());
        });
    }
    group.finish();
}

fn bench_happy_path_transitions(c: &mut Criterion) {
    let order = Order::new("cust-bench", make_items(3)).unwrap();

    c.bench_function("domain/happy_path_transitions", |b| {
        b.iter(|| {
            let mut order = order.clone();
            for next in [
                OrderStatus::Checking,
                OrderStatus::Processing,
                OrderStatus::Notifying,
                OrderStatus::Completed,
            ] {
                order.transition_to(next).unwrap();
            }
            order
        });
    });
}

criterion_group!(benches, bench_create_order, bench_happy_path_transitions);
criterion_main!(benches);
