use criterion::{Criterion, criterion_group, criterion_main};
use event_store::{EventData, EventStore, InMemoryEventStore, StreamId, Version};

fn make_event() -> EventData {
    let payload = concat!(
        r#"{"order_id":"00000000-0000-0000-0000-000000000001","#,
        r#""product_id":"00000000-0000-0000-0000-000000000002","#,
        r#""quantity":2,"unit_price":1000,"currency":"USD"}"#,
    );
    EventData::new("sales.orders.OrderLineAdded", payload.as_bytes().to_vec())
}

fn bench_append_single_event(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("event_store/append_single_event", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                store
                    .append_to_stream(StreamId::new(), Version::initial(), vec![make_event()], None)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_append_batch_10(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("event_store/append_batch_10", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                let events: Vec<EventData> = (0..10).map(|_| make_event()).collect();
                store
                    .append_to_stream(StreamId::new(), Version::initial(), events, None)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_read_stream_100(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let stream_id = StreamId::new();

    rt.block_on(async {
        let events: Vec<EventData> = (0..100).map(|_| make_event()).collect();
        store
            .append_to_stream(stream_id, Version::initial(), events, None)
            .await
            .unwrap();
    });

    c.bench_function("event_store/read_stream_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.read_stream(stream_id).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_append_single_event,
    bench_append_batch_10,
    bench_read_stream_100
);
criterion_main!(benches);
