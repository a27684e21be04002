//! Criterion benchmarks for league_db

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use league_db::league::schema::CREATE_BRANCH;
use league_db::league::Record;
use league_db::prelude::*;

// ============================================================================
// Statement Binding Benchmarks
// ============================================================================

fn bench_statement_binding(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_binding");
    group.throughput(Throughput::Elements(1));

    let player = Player::new(1, "Liverpool", "Liverpool", "John Blonde", 175, 0, -1, 12345);
    let sql = Player::insert_sql();

    group.bench_function("player_bind", |b| {
        b.iter(|| {
            let mut stmt = Statement::new(sql.as_str());
            player.bind(&mut stmt).unwrap();
            black_box(stmt)
        });
    });

    group.bench_function("player_params", |b| {
        let mut stmt = Statement::new(sql.as_str());
        player.bind(&mut stmt).unwrap();
        b.iter(|| black_box(stmt.params().unwrap()));
    });

    group.bench_function("player_render", |b| {
        let mut stmt = Statement::new(sql.as_str());
        player.bind(&mut stmt).unwrap();
        b.iter(|| black_box(stmt.render()));
    });

    group.finish();
}

fn bench_placeholder_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("placeholder_scan");

    for count in [1usize, 10, 100] {
        let sql = format!(
            "INSERT INTO t VALUES ({}) -- '?' stays literal",
            vec!["?"; count].join(", ")
        );
        group.bench_with_input(BenchmarkId::from_parameter(count), &sql, |b, sql| {
            b.iter(|| black_box(Statement::new(sql.as_str())));
        });
    }

    group.finish();
}

// ============================================================================
// SQLite Round Trip Benchmarks
// ============================================================================

fn bench_insert_list_round_trip(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let handler = SqliteHandler::new(ConnectionConfig::sqlite_memory());
    runtime.block_on(async {
        handler.connect("bench", "bench").await.unwrap();
        handler.database().execute(CREATE_BRANCH).await.unwrap();
    });

    let mut group = c.benchmark_group("sqlite_round_trip");
    group.throughput(Throughput::Elements(1));

    group.bench_function("insert_list_delete_branch", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let branch = Branch::new(1, "First Branch", "123 Charming Ave", "Vancouver", 0);
                handler.insert_branch(&branch).await.unwrap();
                let branches = handler.list_branches().await.unwrap();
                handler.delete_branch(1).await.unwrap();
                black_box(branches)
            })
        });
    });

    group.bench_function("not_found_delete", |b| {
        b.iter(|| runtime.block_on(async { black_box(handler.delete_branch(404).await.unwrap()) }));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_statement_binding,
    bench_placeholder_scan,
    bench_insert_list_round_trip
);
criterion_main!(benches);
