use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{NaiveDate, Utc};
use depotscore_core::{DepotId, InvoiceId};
use depotscore_engine::{EngineLocks, MonthlyAggregator};
use depotscore_infra::{InMemoryInvoiceStore, InvoiceStore};
use depotscore_scoring::{
    Invoice, InvoiceDraft, PeriodScore, YearMonth, redistribute_score, score_from_amount,
};
use std::sync::Arc;

fn seeded_month(invoice_count: u32) -> (Arc<InMemoryInvoiceStore>, DepotId, YearMonth) {
    let store = InMemoryInvoiceStore::arc();
    let depot_id = DepotId::new();
    let month = YearMonth::new(2024, 3).unwrap();

    for n in 0..invoice_count {
        let on = NaiveDate::from_ymd_opt(2024, 3, 1 + n % 31).unwrap();
        let invoice = Invoice::create(
            InvoiceId::new(),
            InvoiceDraft {
                invoice_no: format!("BENCH-{n}"),
                depot_id,
                date: Some(on),
                phone: None,
                address: None,
                amount: 250_000 + u64::from(n) * 37_000,
            },
            on,
            Utc::now(),
        )
        .unwrap();
        store.save(invoice).unwrap();
    }

    (store, depot_id, month)
}

fn bench_score_rules(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_rules");

    group.bench_function("period_score_from_total", |b| {
        b.iter(|| PeriodScore::from_total(black_box(123_456_789)))
    });

    group.bench_function("redistribute_share", |b| {
        let total = 48_000_000;
        let score = score_from_amount(total);
        b.iter(|| redistribute_score(black_box(score), black_box(1_750_000), black_box(total)))
    });

    group.finish();
}

fn bench_month_recalculation(c: &mut Criterion) {
    let mut group = c.benchmark_group("month_recalculation");

    for invoice_count in [1u32, 10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(u64::from(*invoice_count)));
        group.bench_with_input(
            BenchmarkId::new("recalculate_month", invoice_count),
            invoice_count,
            |b, &invoice_count| {
                let (store, depot_id, month) = seeded_month(invoice_count);
                let aggregator = MonthlyAggregator::new(store, Arc::new(EngineLocks::new()));
                b.iter(|| {
                    aggregator
                        .recalculate_month(black_box(depot_id), black_box(month))
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_score_rules, bench_month_recalculation);
criterion_main!(benches);
