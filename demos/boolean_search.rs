/// Boolean search walkthrough
///
/// Builds a filter tree over doc-set leaves, prepares it once, executes
/// it per segment and drives the resulting iterator with next/seek,
/// reading scores merged by the order bundle.

use bramble::core::types::DocId;
use bramble::index::memory::{MemoryIndex, MemorySegment};
use bramble::index::IndexReader;
use bramble::query::ast::{And, Filter, Not, Or};
use bramble::query::docset::DocSetFilter;
use bramble::scoring::boost::{boost_score, BoostSort};
use bramble::scoring::{Order, NO_BOOST};
use bramble::search::DocIterator;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Two segments of different sizes
    let mut index = MemoryIndex::new();
    index
        .add_segment(MemorySegment::new(64))
        .add_segment(MemorySegment::new(32));

    // (rust OR search) AND NOT deprecated, with boosted leaves
    let filter: Filter = And::new()
        .with(
            Or::new()
                .with(
                    DocSetFilter::new(vec![1, 4, 9, 16, 25, 36, 49])
                        .with_boost(2.0)
                        .into_filter(),
                )
                .with(DocSetFilter::new(vec![2, 4, 8, 16, 32]).with_boost(1.0).into_filter()),
        )
        .with(Not::new().with(DocSetFilter::new(vec![9, 32]).into_filter()))
        .into();

    let ord = Order::new(vec![Box::new(BoostSort)]);
    let prepared = filter.prepare(&index, &ord, NO_BOOST, None)?;

    for segment_id in 0..index.segment_count() {
        println!("segment {segment_id}:");
        let mut it = prepared.execute(index.segment(segment_id), &ord, None)?;
        while it.next() {
            println!("  doc {:>3}  score {}", it.value().0, boost_score(it.score()));
        }
    }

    // Seek support: jump straight to the docs past 10 on segment 0
    let mut it = prepared.execute(index.segment(0), &ord, None)?;
    let mut doc = it.seek(DocId(10));
    print!("docs >= 10 on segment 0:");
    while !doc.is_eof() {
        print!(" {}", doc.0);
        doc = if it.next() { it.value() } else { DocId::EOF };
    }
    println!();

    Ok(())
}
