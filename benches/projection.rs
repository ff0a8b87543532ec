use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use feature_stats::projector::ResultTree;
use feature_stats::query::{AggregationRequest, StatisticRecord};
use feature_stats::service::{FeatureService, InMemoryFeatureTable};
use feature_stats::types::{
    DatasetSchema, FieldDescriptor, FieldType, FieldValue, OrderBySpec, StatisticDefinition,
    StatisticKind,
};

fn create_records(count: usize) -> Vec<StatisticRecord> {
    (0..count)
        .map(|i| {
            StatisticRecord::new()
                .with_group("SUB_REGION", format!("Region {}", i % 9))
                .with_group("STATE_NAME", format!("State {}", i))
                .with_statistic("POP2007(Sum)", i as f64 * 1000.0)
                .with_statistic("POP07_SQMI(Average)", i as f64 * 0.5)
        })
        .collect()
}

fn create_table(count: usize) -> InMemoryFeatureTable {
    let schema = DatasetSchema::new(
        "Counties",
        vec![
            FieldDescriptor::new("STATE_NAME", FieldType::Text),
            FieldDescriptor::new("POP2007", FieldType::Int32),
        ],
    );
    let features = (0..count)
        .map(|i| {
            HashMap::from([
                ("STATE_NAME".to_string(), FieldValue::from(format!("State {}", i % 50))),
                ("POP2007".to_string(), FieldValue::Integer(i as i64)),
            ])
        })
        .collect();
    InMemoryFeatureTable::new(schema, features)
}

fn bench_projection(c: &mut Criterion) {
    let group_by = vec!["SUB_REGION".to_string(), "STATE_NAME".to_string()];

    let mut group = c.benchmark_group("projection");

    for size in [100, 1000, 10000].iter() {
        let records = create_records(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut tree = ResultTree::new();
                tree.replace(records.clone(), &group_by);
                black_box(tree.render_text())
            });
        });
    }

    group.finish();
}

fn bench_grouped_statistics(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let request = AggregationRequest::new(
        vec![
            StatisticDefinition::new("POP2007", StatisticKind::Sum),
            StatisticDefinition::new("POP2007", StatisticKind::StandardDeviation),
        ],
        vec!["STATE_NAME".to_string()],
        vec![OrderBySpec::ascending("STATE_NAME")],
    )
    .unwrap();

    let mut group = c.benchmark_group("grouped_statistics");

    for size in [1000, 10000, 100000].iter() {
        let table = create_table(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                rt.block_on(async { black_box(table.query_statistics(&request).await.unwrap()) })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_projection, bench_grouped_statistics);
criterion_main!(benches);
