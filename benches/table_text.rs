//! Benchmarks for the Markdown table codec.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use data_preview::table_text::{decode, encode, TableTextOptions};

fn sample_csv(rows: usize) -> String {
    let mut out = String::from("id,name,city,score\n");
    for i in 0..rows {
        out.push_str(&format!("{i},user_{i},\"City, {}\",{}.5\n", i % 17, i % 100));
    }
    out
}

fn sample_document(tables: usize, rows: usize) -> String {
    let table = encode(&sample_csv(rows), &TableTextOptions::default()).unwrap_or_default();
    let mut doc = String::new();
    for t in 0..tables {
        doc.push_str(&format!("# Section {t}\n\nSome prose before the table.\n\n{table}\n"));
    }
    doc
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_text_encode");
    let opts = TableTextOptions::default();
    for rows in [10, 1_000, 10_000] {
        let csv = sample_csv(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &csv, |b, csv| {
            b.iter(|| encode(black_box(csv), &opts));
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_text_decode");
    for (tables, rows) in [(1, 1_000), (20, 50), (100, 100)] {
        let doc = sample_document(tables, rows);
        group.bench_with_input(
            BenchmarkId::new("tables_x_rows", format!("{tables}x{rows}")),
            &doc,
            |b, doc| {
                b.iter(|| decode(black_box(doc), "Section 0"));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
