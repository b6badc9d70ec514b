pub mod all;
pub mod block;
pub mod conjunction;
pub mod disjunction;
pub mod exclusion;
pub mod min_match;

use std::any::{Any, TypeId};

use crate::core::types::DocId;

/// Sorted stream of document ids with lazily evaluated attributes.
///
/// Implementations iterate strictly ascending real ids: `value()` is
/// `DocId::INVALID` before the first `next`/`seek`, monotonically
/// non-decreasing afterwards, and sticks to `DocId::EOF` once exhausted.
pub trait DocIterator {
    /// The current position of the iterator.
    fn value(&self) -> DocId;

    /// Advance to the next document. Returns `false` exactly when the
    /// iterator transitions to `EOF`.
    fn next(&mut self) -> bool;

    /// Advance so that `value() >= target` and return the new position.
    ///
    /// A `target` at or before the current position returns the current
    /// position without moving; an `INVALID` target is a no-op; an `EOF`
    /// target exhausts the iterator.
    fn seek(&mut self, target: DocId) -> DocId;

    /// Estimated upper bound on the number of documents this iterator
    /// will ever produce.
    fn cost(&self) -> u64;

    /// Probe for the no-score default: `false` means calling [`score`]
    /// is wasted work.
    ///
    /// [`score`]: DocIterator::score
    fn has_score(&self) -> bool {
        false
    }

    /// Evaluate the score of the current document. The returned slice is
    /// valid until the next `next`/`seek` on this iterator; callers copy
    /// to persist. Iterators without scores return an empty slice.
    fn score(&mut self) -> &[u8] {
        &[]
    }

    /// Number of sub-iterators that fire on the current document.
    /// Zero if and only if the iterator is at `EOF`; plain iterators
    /// report one while positioned.
    fn match_count(&mut self) -> usize {
        usize::from(!self.value().is_eof())
    }

    /// Dynamic lookup for leaf-specific attributes. Composite iterators
    /// forward to their driving sub-iterator.
    fn attribute(&self, _type_id: TypeId) -> Option<&dyn Any> {
        None
    }
}

pub type DocIteratorBox<'a> = Box<dyn DocIterator + 'a>;

impl<'a> DocIterator for Box<dyn DocIterator + 'a> {
    fn value(&self) -> DocId {
        (**self).value()
    }

    fn next(&mut self) -> bool {
        (**self).next()
    }

    fn seek(&mut self, target: DocId) -> DocId {
        (**self).seek(target)
    }

    fn cost(&self) -> u64 {
        (**self).cost()
    }

    fn has_score(&self) -> bool {
        (**self).has_score()
    }

    fn score(&mut self) -> &[u8] {
        (**self).score()
    }

    fn match_count(&mut self) -> usize {
        (**self).match_count()
    }

    fn attribute(&self, type_id: TypeId) -> Option<&dyn Any> {
        (**self).attribute(type_id)
    }
}

/// Caller-supplied bag of execution attributes threaded through
/// `prepare`/`execute` untouched; leaf filters may consult it.
pub trait AttributeProvider {
    fn attribute(&self, type_id: TypeId) -> Option<&dyn Any>;
}

/// The shared no-op iterator: exhausted at birth.
///
/// Planning returns it whenever no document can match; `value()` is `EOF`
/// from the start, which is also how execute-time factories recognize
/// statically empty sub-queries.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyIterator;

impl DocIterator for EmptyIterator {
    fn value(&self) -> DocId {
        DocId::EOF
    }

    fn next(&mut self) -> bool {
        false
    }

    fn seek(&mut self, _target: DocId) -> DocId {
        DocId::EOF
    }

    fn cost(&self) -> u64 {
        0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::query::docset::DocSetIterator;
    use crate::scoring::{Boost, LeafScore, Order};
    use crate::index::memory::MemorySegment;

    /// Doc-list iterator over explicit ids, unscored.
    pub fn docs(ids: &[u64]) -> DocSetIterator {
        DocSetIterator::new(ids.iter().copied().map(DocId).collect(), LeafScore::none())
    }

    /// Doc-list iterator whose score is `boost` under `ord`.
    pub fn scored_docs(ids: &[u64], ord: &Order, boost: Boost) -> DocSetIterator {
        let segment = MemorySegment::new(ids.last().copied().unwrap_or(0));
        DocSetIterator::new(
            ids.iter().copied().map(DocId).collect(),
            ord.prepare_scorers(&segment, boost),
        )
    }

    /// Drain an iterator through `next`, returning the produced ids.
    pub fn collect(it: &mut dyn DocIterator) -> Vec<u64> {
        let mut out = Vec::new();
        while it.next() {
            out.push(it.value().0);
        }
        assert!(it.value().is_eof());
        assert!(!it.next(), "EOF must be sticky");
        out
    }

    #[test]
    fn test_empty_iterator() {
        let mut it = EmptyIterator;
        assert!(it.value().is_eof());
        assert!(!it.next());
        assert!(it.seek(DocId(5)).is_eof());
        assert_eq!(it.cost(), 0);
        assert!(!it.has_score());
        assert_eq!(it.match_count(), 0);
    }

    #[test]
    fn test_doc_list_iteration() {
        let mut it = docs(&[1, 4, 9]);
        assert_eq!(it.value(), DocId::INVALID);
        assert_eq!(collect(&mut it), vec![1, 4, 9]);
    }

    // Every union shape and both min-match variants must produce the
    // same stream over the same inputs.
    #[test]
    fn test_variant_equivalence_on_random_lists() {
        use std::collections::BTreeMap;

        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        use crate::scoring::ScoreMergeType;
        use crate::search::block::{BlockDisjunction, BlockDisjunctionTraits, MatchMode};
        use crate::search::disjunction::SmallDisjunction;
        use crate::search::min_match::MinMatchDisjunction;

        let mut rng = StdRng::seed_from_u64(0x5eed);
        for round in 0..16 {
            let lists: Vec<Vec<u64>> = (0..8)
                .map(|_| {
                    let len = rng.gen_range(0..120);
                    let mut ids: Vec<u64> =
                        (0..len).map(|_| rng.gen_range(1..700)).collect();
                    ids.sort_unstable();
                    ids.dedup();
                    ids
                })
                .collect();

            let mut hits: BTreeMap<u64, usize> = BTreeMap::new();
            for list in &lists {
                for &id in list {
                    *hits.entry(id).or_default() += 1;
                }
            }

            let boxed = |lists: &[Vec<u64>]| -> Vec<DocIteratorBox<'static>> {
                lists
                    .iter()
                    .map(|ids| Box::new(docs(ids)) as DocIteratorBox<'static>)
                    .collect()
            };

            let union: Vec<u64> = hits.keys().copied().collect();
            let mut small = SmallDisjunction::new(
                boxed(&lists),
                Order::unordered(),
                ScoreMergeType::Aggregate,
            );
            assert_eq!(collect(&mut small), union, "small union, round {round}");

            for block_count in [1usize, 2] {
                for read_ahead in [false, true] {
                    let traits = BlockDisjunctionTraits {
                        block_count,
                        read_ahead,
                        ..Default::default()
                    };
                    let mut block = BlockDisjunction::new(
                        boxed(&lists),
                        Order::unordered(),
                        ScoreMergeType::Aggregate,
                        traits,
                    );
                    assert_eq!(
                        collect(&mut block),
                        union,
                        "block union, round {round}, blocks {block_count}, read_ahead {read_ahead}"
                    );
                }
            }

            for min_match in [2usize, 3, 5] {
                let expected: Vec<u64> = hits
                    .iter()
                    .filter(|(_, count)| **count >= min_match)
                    .map(|(id, _)| *id)
                    .collect();

                let mut heap = MinMatchDisjunction::new(
                    boxed(&lists),
                    min_match,
                    Order::unordered(),
                    ScoreMergeType::Aggregate,
                );
                assert_eq!(
                    collect(&mut heap),
                    expected,
                    "heap min_match {min_match}, round {round}"
                );

                let traits = BlockDisjunctionTraits {
                    match_mode: MatchMode::MinMatch(min_match),
                    ..Default::default()
                };
                let mut block = BlockDisjunction::new(
                    boxed(&lists),
                    Order::unordered(),
                    ScoreMergeType::Aggregate,
                    traits,
                );
                assert_eq!(
                    collect(&mut block),
                    expected,
                    "block min_match {min_match}, round {round}"
                );
            }
        }
    }

    #[test]
    fn test_doc_list_seek() {
        let mut it = docs(&[1, 4, 9, 20]);
        assert_eq!(it.seek(DocId(4)), DocId(4));
        // seeking backwards or to the current position does not move
        assert_eq!(it.seek(DocId(2)), DocId(4));
        assert_eq!(it.seek(DocId::INVALID), DocId(4));
        assert_eq!(it.seek(DocId(10)), DocId(20));
        assert_eq!(it.seek(DocId::EOF), DocId::EOF);
        assert!(!it.next());
    }
}
