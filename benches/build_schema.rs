use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use criterion::{Criterion, criterion_group, criterion_main};
use schemagen::{
    builder::build,
    config::InferenceConfig,
    generator::SchemaGenerator,
    table::{Column, Table},
};
use tempfile::TempDir;

fn generate_orders_table(rows: usize) -> Table {
    let statuses = ["shipped", "pending", "processing"];
    Table::new(vec![
        Column::from_integers("id", 0..rows as i64),
        Column::from_strings("status", (0..rows).map(|i| statuses[i % 3])),
        Column::from_strings(
            "ordered_at",
            (0..rows).map(|i| format!("2024-01-{:02}", (i % 28) + 1)),
        ),
        Column::from_strings("customer", (0..rows).map(|i| format!("cust-{i:06}"))),
    ])
}

fn generate_orders_csv(rows: usize) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv_path = temp_dir.path().join("orders.csv");
    let mut file = File::create(&csv_path).expect("create csv");
    writeln!(file, "id,amount,status,ordered_at").expect("header");
    for i in 0..rows {
        let amount = (i % 997) as f64 * 1.25;
        let day = (i % 28) + 1;
        writeln!(file, "{i},{amount},{},2024-01-{day:02}", i % 5).expect("row");
    }
    (temp_dir, csv_path)
}

fn bench_build_schema(c: &mut Criterion) {
    let table = generate_orders_table(20_000);
    let config = InferenceConfig::default();
    let (_dir, csv_path) = generate_orders_csv(20_000);
    let generator = SchemaGenerator::default();

    let mut group = c.benchmark_group("schema_inference");
    group.sample_size(20);
    group.bench_function("build_in_memory", |b| {
        b.iter(|| build(&table, &config).expect("build"))
    });
    group.bench_function("generate_from_csv", |b| {
        b.iter(|| generator.generate(&csv_path).expect("generate"))
    });
    group.finish();
}

criterion_group!(benches, bench_build_schema);
criterion_main!(benches);
