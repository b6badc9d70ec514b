use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;

use bramble::core::types::DocId;
use bramble::index::memory::MemoryIndex;
use bramble::index::IndexReader;
use bramble::query::ast::{And, Filter, Or};
use bramble::query::docset::DocSetFilter;
use bramble::scoring::boost::BoostSort;
use bramble::scoring::{Order, NO_BOOST};
use bramble::search::DocIterator;

const SEGMENT_DOCS: u64 = 1_000_000;

/// Sorted random posting list with roughly `len` entries.
fn posting_list(len: usize) -> Vec<u64> {
    let mut rng = rand::thread_rng();
    let mut docs: Vec<u64> = (0..len)
        .map(|_| rng.gen_range(1..SEGMENT_DOCS))
        .collect();
    docs.sort_unstable();
    docs.dedup();
    docs
}

fn drain(filter: &Filter, reader: &MemoryIndex, ord: &Order) -> u64 {
    let prepared = filter.prepare(reader, ord, NO_BOOST, None).unwrap();
    let mut it = prepared.execute(reader.segment(0), ord, None).unwrap();
    let mut count = 0;
    while it.next() {
        count += 1;
    }
    count
}

fn bench_conjunction(c: &mut Criterion) {
    let reader = MemoryIndex::with_docs(SEGMENT_DOCS);
    let mut group = c.benchmark_group("conjunction");

    for clauses in [2usize, 4, 8] {
        let filter: Filter = {
            let mut and = And::new();
            for _ in 0..clauses {
                and.add(Filter::leaf(DocSetFilter::new(posting_list(100_000))));
            }
            and.into()
        };
        group.bench_with_input(BenchmarkId::from_parameter(clauses), &filter, |b, filter| {
            b.iter(|| black_box(drain(filter, &reader, Order::unordered())));
        });
    }
    group.finish();
}

fn bench_disjunction(c: &mut Criterion) {
    let reader = MemoryIndex::with_docs(SEGMENT_DOCS);
    let mut group = c.benchmark_group("disjunction");

    // 2 exercises the two-way merge, 5 the linear scan, 16 the bit-window
    for clauses in [2usize, 5, 16] {
        let filter: Filter = {
            let mut or = Or::new();
            for _ in 0..clauses {
                or.add(Filter::leaf(DocSetFilter::new(posting_list(20_000))));
            }
            or.into()
        };
        group.bench_with_input(BenchmarkId::from_parameter(clauses), &filter, |b, filter| {
            b.iter(|| black_box(drain(filter, &reader, Order::unordered())));
        });
    }
    group.finish();
}

fn bench_min_match(c: &mut Criterion) {
    let reader = MemoryIndex::with_docs(SEGMENT_DOCS);
    let mut group = c.benchmark_group("min_match");

    for min_match in [2usize, 4, 7] {
        let filter: Filter = {
            let mut or = Or::new().with_min_match_count(min_match);
            for _ in 0..8 {
                or.add(Filter::leaf(DocSetFilter::new(posting_list(20_000))));
            }
            or.into()
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(min_match),
            &filter,
            |b, filter| {
                b.iter(|| black_box(drain(filter, &reader, Order::unordered())));
            },
        );
    }
    group.finish();
}

fn bench_scored_disjunction(c: &mut Criterion) {
    let reader = MemoryIndex::with_docs(SEGMENT_DOCS);
    let ord = Order::new(vec![Box::new(BoostSort)]);

    let filter: Filter = {
        let mut or = Or::new();
        for i in 0..8 {
            or.add(Filter::leaf(
                DocSetFilter::new(posting_list(20_000)).with_boost(i as f32 + 1.0),
            ));
        }
        or.into()
    };

    c.bench_function("scored_disjunction", |b| {
        b.iter(|| {
            let prepared = filter.prepare(&reader, &ord, NO_BOOST, None).unwrap();
            let mut it = prepared.execute(reader.segment(0), &ord, None).unwrap();
            let mut acc = 0u64;
            while it.next() {
                acc = acc.wrapping_add(it.score().len() as u64);
            }
            black_box(acc)
        });
    });
}

fn bench_seek(c: &mut Criterion) {
    let reader = MemoryIndex::with_docs(SEGMENT_DOCS);
    let filter: Filter = Or::new()
        .with(Filter::leaf(DocSetFilter::new(posting_list(200_000))))
        .with(Filter::leaf(DocSetFilter::new(posting_list(200_000))))
        .with(Filter::leaf(DocSetFilter::new(posting_list(200_000))))
        .into();
    let ord = Order::unordered();
    let prepared = filter.prepare(&reader, ord, NO_BOOST, None).unwrap();

    c.bench_function("disjunction_seek_stride", |b| {
        b.iter(|| {
            let mut it = prepared.execute(reader.segment(0), ord, None).unwrap();
            let mut target = 1u64;
            while !it.seek(DocId(target)).is_eof() {
                target = it.value().0 + 1000;
            }
            black_box(target)
        });
    });
}

criterion_group!(
    benches,
    bench_conjunction,
    bench_disjunction,
    bench_min_match,
    bench_scored_disjunction,
    bench_seek
);
criterion_main!(benches);
