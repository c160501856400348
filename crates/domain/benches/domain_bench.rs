use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    AddOrderLine, CreateOrder, CustomerId, EventSourced, Money, Order, OrderLine, OrderService,
    ProductId,
};
use event_store::{InMemoryEventStore, StreamId};

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/create_order", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = OrderService::new(InMemoryEventStore::new());
                let cmd = CreateOrder::for_customer(CustomerId::new());
                service.create_order(cmd).await.unwrap();
            });
        });
    });
}

fn bench_add_line(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = OrderService::new(InMemoryEventStore::new());
    let cmd = CreateOrder::for_customer(CustomerId::new());
    let order_id = cmd.order_id;
    rt.block_on(service.create_order(cmd)).unwrap();

    c.bench_function("domain/add_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .add_line(AddOrderLine::new(
                        order_id,
                        ProductId::new(),
                        1,
                        Money::usd(100),
                    ))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_replay_100_lines(c: &mut Criterion) {
    let lines: Vec<OrderLine> = (0..100)
        .map(|_| OrderLine::new(ProductId::new(), 2, Money::usd(1000)))
        .collect();
    let history = Order::default()
        .place(StreamId::new(), CustomerId::new(), &lines)
        .unwrap();

    c.bench_function("domain/replay_100_lines", |b| {
        b.iter(|| EventSourced::<Order>::from_history(history.clone()).unwrap());
    });
}

criterion_group!(
    benches,
    bench_create_order,
    bench_add_line,
    bench_replay_100_lines
);
criterion_main!(benches);
