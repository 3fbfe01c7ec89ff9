use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::pricing::{LinePricing, price_line, summarize};
use domain::{
    Caller, CartLine, Checkout, CustomerId, CustomerSnapshot, InMemoryCatalog, Money,
    OrderService, TaxRate, VoucherCatalog,
};
use event_store::{InMemoryEventStore, Inventory};

fn lines(count: usize) -> Vec<LinePricing> {
    (0..count)
        .map(|i| {
            LinePricing::new(
                Money::new(99_999 + i as i64 * 1_337),
                TaxRate::from_percent([5, 8, 10][i % 3]).unwrap(),
                (i % 4 + 1) as u32,
            )
        })
        .collect()
}

fn bench_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("pricing/summarize");
    for count in [1, 10, 100] {
        let lines = lines(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &lines, |b, lines| {
            b.iter(|| summarize(black_box(lines), Money::new(1_000)).unwrap());
        });
    }
    group.finish();
}

fn bench_price_line(c: &mut Criterion) {
    let line = lines(1)[0];
    c.bench_function("pricing/price_line", |b| {
        b.iter(|| price_line(black_box(&line)).unwrap());
    });
}

fn bench_voucher_resolve(c: &mut Criterion) {
    let catalog = VoucherCatalog::standard();
    c.bench_function("pricing/resolve_voucher", |b| {
        b.iter(|| {
            catalog
                .resolve(black_box("  sale10 "), Money::new(400_000))
                .unwrap()
        });
    });
}

fn bench_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let catalog = InMemoryCatalog::new();
    rt.block_on(async {
        catalog
            .upsert_category("tops", TaxRate::from_percent(10).unwrap())
            .await;
        catalog
            .upsert_product("TEE-01", "Cotton tee", "tops", Money::new(150_000))
            .await;
        store.set_stock("TEE-01", u32::MAX).await.unwrap();
    });
    let service = OrderService::new(store, Arc::new(catalog));
    let customer_id = CustomerId::new();
    let caller = Caller::Customer(customer_id);

    c.bench_function("pricing/checkout_in_memory", |b| {
        b.iter(|| {
            rt.block_on(async {
                let cmd = Checkout::new(
                    CustomerSnapshot::individual(customer_id, "Bench", "b@x.io", "1", "Hanoi"),
                    vec![CartLine::new("TEE-01", 1)],
                )
                .with_voucher("SALE10");
                service.checkout(&caller, cmd).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_summarize,
    bench_price_line,
    bench_voucher_resolve,
    bench_checkout,
);
criterion_main!(benches);
