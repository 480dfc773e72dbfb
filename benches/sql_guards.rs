use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cloudfloe::domain::{CatalogTarget, QueryPlanFragment, RowLimit};
use cloudfloe::gateway::rewrite::{inject_row_limit, rewrite_query, rewrite_scan_references};
use cloudfloe::validation::check_sql;

const QUERIES: [(&str, &str); 4] = [
    ("simple_select", "SELECT 1"),
    (
        "demo_scan",
        "SELECT primaryTitle, startYear FROM read_parquet('s3://movies/data/**/*.parquet') WHERE titleType = 'movie' ORDER BY startYear DESC",
    ),
    (
        "join_two_scans",
        "SELECT * FROM read_parquet('s3://lake/orders/**/*.parquet') o JOIN read_parquet('s3://lake/customers/**/*.parquet') c ON o.customer_id = c.id",
    ),
    (
        "subquery_with_limit",
        "SELECT genre, COUNT(*) FROM (SELECT UNNEST(string_split(genres, ',')) AS genre FROM read_parquet('s3://movies/data/**/*.parquet') LIMIT 5000) GROUP BY genre",
    ),
];

fn bench_check_sql(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_sql");

    for (name, sql) in QUERIES {
        group.bench_with_input(BenchmarkId::new("accept", name), sql, |b, sql| {
            b.iter(|| check_sql(black_box(sql)))
        });
    }

    group.bench_function("reject_late_keyword", |b| {
        let sql = format!("{} ; ALTER TABLE t ADD c INT", "SELECT 1 ".repeat(200));
        b.iter(|| check_sql(black_box(&sql)))
    });

    group.finish();
}

fn bench_inject_row_limit(c: &mut Criterion) {
    let mut group = c.benchmark_group("inject_row_limit");
    let limit = RowLimit::default();

    for (name, sql) in QUERIES {
        group.bench_with_input(BenchmarkId::new("inject", name), sql, |b, sql| {
            b.iter(|| inject_row_limit(black_box(sql), limit))
        });
    }

    group.finish();
}

fn bench_rewrite_scan_references(c: &mut Criterion) {
    let mut group = c.benchmark_group("rewrite_scan_references");
    let catalog = CatalogTarget {
        endpoint: "http://catalog:8181".to_string(),
        namespace: "analytics".to_string(),
    };

    for (name, sql) in QUERIES {
        group.bench_with_input(BenchmarkId::new("direct", name), sql, |b, sql| {
            b.iter(|| rewrite_scan_references(black_box(sql), None))
        });
        group.bench_with_input(BenchmarkId::new("catalog", name), sql, |b, sql| {
            b.iter(|| rewrite_scan_references(black_box(sql), Some(&catalog)))
        });
    }

    group.finish();
}

fn bench_rewrite_query(c: &mut Criterion) {
    let fragment = QueryPlanFragment::new(QUERIES[1].1, RowLimit::default());

    c.bench_function("rewrite_query_demo_scan", |b| {
        b.iter(|| rewrite_query(black_box(&fragment), None))
    });
}

criterion_group!(
    benches,
    bench_check_sql,
    bench_inject_row_limit,
    bench_rewrite_scan_references,
    bench_rewrite_query,
);
criterion_main!(benches);
