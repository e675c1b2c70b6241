use criterion::{criterion_group, criterion_main, Criterion};
use pprof::criterion::{Output, PProfProfiler};
use tempo_lib::{board::Position, Tables};

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

pub fn criterion_benchmark(c: &mut Criterion) {
    let tables = match Tables::embedded() {
        Ok(tables) => tables,
        Err(e) => panic!("embedded tables failed to load: {e}"),
    };
    let mut start = Position::start(tables.clone());
    let mut kiwipete = match Position::from_fen(tables, KIWIPETE) {
        Ok(position) => position,
        Err(e) => panic!("bad benchmark position: {e}"),
    };

    c.bench_function("Perft speed test", |b| {
        b.iter(|| {
            start.perft(5);
        })
    });
    c.bench_function("Perft speed test (kiwipete)", |b| {
        b.iter(|| {
            kiwipete.perft(4);
        })
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = criterion_benchmark
);
criterion_main!(benches);
