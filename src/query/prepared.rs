use crate::core::error::Result;
use crate::index::SubReader;
use crate::scoring::{Boost, NO_BOOST, Order, ScoreMergeType};
use crate::search::all::AllIterator;
use crate::search::block::{BlockDisjunction, BlockDisjunctionTraits, MatchMode};
use crate::search::conjunction::Conjunction;
use crate::search::disjunction::{BasicDisjunction, SmallDisjunction, SMALL_DISJUNCTION_LIMIT};
use crate::search::exclusion::Exclusion;
use crate::search::min_match::MinMatchDisjunction;
use crate::search::{AttributeProvider, DocIterator, DocIteratorBox, EmptyIterator};

/// Smallest fanout at which the block MIN_MATCH variant is preferred over
/// the heap one; below it the average per-window fanout is too low to pay
/// for window fills.
const BLOCK_MIN_MATCH_LIMIT: usize = 32;

/// A compiled filter: read-only, shareable across threads, executable
/// against any segment of the reader it was prepared with.
pub trait PreparedFilter: Send + Sync {
    /// Residual boost of this prepared node.
    fn boost(&self) -> Boost {
        NO_BOOST
    }

    /// Build the document iterator of this query over one segment. The
    /// returned iterator must not outlive the segment.
    fn execute<'a>(
        &'a self,
        segment: &'a dyn SubReader,
        ord: &'a Order,
        ctx: Option<&'a dyn AttributeProvider>,
    ) -> Result<DocIteratorBox<'a>>;
}

pub type PreparedBox = Box<dyn PreparedFilter>;

/// Prepared query that matches nothing; its iterator is born exhausted.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyQuery;

impl PreparedFilter for EmptyQuery {
    fn execute<'a>(
        &'a self,
        _segment: &'a dyn SubReader,
        _ord: &'a Order,
        _ctx: Option<&'a dyn AttributeProvider>,
    ) -> Result<DocIteratorBox<'a>> {
        Ok(Box::new(EmptyIterator))
    }
}

/// Prepared query that matches every document of a segment, scoring each
/// with its accumulated boost.
#[derive(Debug, Clone, Copy)]
pub struct AllQuery {
    boost: Boost,
}

impl AllQuery {
    pub fn new(boost: Boost) -> Self {
        AllQuery { boost }
    }
}

impl PreparedFilter for AllQuery {
    fn boost(&self) -> Boost {
        self.boost
    }

    fn execute<'a>(
        &'a self,
        segment: &'a dyn SubReader,
        ord: &'a Order,
        _ctx: Option<&'a dyn AttributeProvider>,
    ) -> Result<DocIteratorBox<'a>> {
        Ok(Box::new(AllIterator::new(segment, ord, self.boost)))
    }
}

/// The concrete plan shapes a boolean node compiles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BooleanKind {
    And,
    Or,
    MinMatch(usize),
}

/// Prepared boolean query: included children first, excluded children
/// after `excl_start`. Excluded children were prepared unordered and
/// unboosted; exclusion never affects ranking.
pub(crate) struct BooleanQuery {
    queries: Vec<PreparedBox>,
    excl_start: usize,
    boost: Boost,
    merge: ScoreMergeType,
    kind: BooleanKind,
}

impl BooleanQuery {
    pub(crate) fn new(
        kind: BooleanKind,
        incl: Vec<PreparedBox>,
        excl: Vec<PreparedBox>,
        boost: Boost,
        merge: ScoreMergeType,
    ) -> Self {
        let excl_start = incl.len();
        let mut queries = incl;
        queries.extend(excl);
        BooleanQuery {
            queries,
            excl_start,
            boost,
            merge,
            kind,
        }
    }
}

impl PreparedFilter for BooleanQuery {
    fn boost(&self) -> Boost {
        self.boost
    }

    fn execute<'a>(
        &'a self,
        segment: &'a dyn SubReader,
        ord: &'a Order,
        ctx: Option<&'a dyn AttributeProvider>,
    ) -> Result<DocIteratorBox<'a>> {
        if self.queries.is_empty() {
            return Ok(Box::new(EmptyIterator));
        }

        let incl = &self.queries[..self.excl_start];
        let incl = match self.kind {
            BooleanKind::And => make_conjunction(incl, segment, ord, ctx, self.merge)?,
            BooleanKind::Or => make_disjunction(incl, segment, ord, ctx, self.merge)?,
            BooleanKind::MinMatch(count) => {
                make_min_match(incl, count, segment, ord, ctx, self.merge)?
            }
        };

        // the exclusion side never scores
        let excl = make_disjunction(
            &self.queries[self.excl_start..],
            segment,
            Order::unordered(),
            ctx,
            ScoreMergeType::Aggregate,
        )?;

        // known-inert exclusion: skip the wrapper altogether
        if excl.value().is_eof() {
            return Ok(incl);
        }

        Ok(Box::new(Exclusion::new(incl, excl)))
    }
}

/// Conjunction over prepared sub-queries. Zero children or any child that
/// is exhausted at construction short-circuits to empty; a single child
/// is returned unwrapped.
pub(crate) fn make_conjunction<'a>(
    queries: &'a [PreparedBox],
    segment: &'a dyn SubReader,
    ord: &'a Order,
    ctx: Option<&'a dyn AttributeProvider>,
    merge: ScoreMergeType,
) -> Result<DocIteratorBox<'a>> {
    match queries.len() {
        0 => return Ok(Box::new(EmptyIterator)),
        1 => return queries[0].execute(segment, ord, ctx),
        _ => {}
    }

    let mut itrs: Vec<DocIteratorBox<'a>> = Vec::with_capacity(queries.len());
    for query in queries {
        let docs = query.execute(segment, ord, ctx)?;
        if docs.value().is_eof() {
            return Ok(Box::new(EmptyIterator));
        }
        itrs.push(docs);
    }

    Ok(Box::new(Conjunction::new(itrs, ord, merge)))
}

/// Disjunction over prepared sub-queries; children exhausted at
/// construction are dropped up front.
pub(crate) fn make_disjunction<'a>(
    queries: &'a [PreparedBox],
    segment: &'a dyn SubReader,
    ord: &'a Order,
    ctx: Option<&'a dyn AttributeProvider>,
    merge: ScoreMergeType,
) -> Result<DocIteratorBox<'a>> {
    let mut itrs: Vec<DocIteratorBox<'a>> = Vec::with_capacity(queries.len());
    for query in queries {
        let docs = query.execute(segment, ord, ctx)?;
        if !docs.value().is_eof() {
            itrs.push(docs);
        }
    }
    Ok(disjunction_over(itrs, ord, merge))
}

/// Pick the disjunction shape for an iterator fanout: dedicated two-way
/// merge, linear scan for a few, bit-block window for many.
pub(crate) fn disjunction_over<'a>(
    mut itrs: Vec<DocIteratorBox<'a>>,
    ord: &'a Order,
    merge: ScoreMergeType,
) -> DocIteratorBox<'a> {
    match itrs.len() {
        0 => Box::new(EmptyIterator),
        1 => itrs.pop().unwrap_or_else(|| Box::new(EmptyIterator) as DocIteratorBox<'a>),
        2 => {
            let rhs = itrs.pop();
            let lhs = itrs.pop();
            match (lhs, rhs) {
                (Some(lhs), Some(rhs)) => Box::new(BasicDisjunction::new(lhs, rhs, ord, merge)),
                _ => Box::new(EmptyIterator),
            }
        }
        n if n <= SMALL_DISJUNCTION_LIMIT => Box::new(SmallDisjunction::new(itrs, ord, merge)),
        _ => {
            let traits = BlockDisjunctionTraits {
                score_enabled: !ord.is_empty(),
                ..Default::default()
            };
            Box::new(BlockDisjunction::new(itrs, ord, merge, traits))
        }
    }
}

/// Min-match disjunction over prepared sub-queries. Degenerates to a
/// conjunction when every child must match, to the single survivor when
/// one remains, and to empty when the requirement cannot be met.
pub(crate) fn make_min_match<'a>(
    queries: &'a [PreparedBox],
    min_match: usize,
    segment: &'a dyn SubReader,
    ord: &'a Order,
    ctx: Option<&'a dyn AttributeProvider>,
    merge: ScoreMergeType,
) -> Result<DocIteratorBox<'a>> {
    let min_match = min_match.max(1);

    if queries.is_empty() || min_match > queries.len() {
        return Ok(Box::new(EmptyIterator));
    }
    if min_match == queries.len() {
        return make_conjunction(queries, segment, ord, ctx, merge);
    }

    let mut itrs: Vec<DocIteratorBox<'a>> = Vec::with_capacity(queries.len());
    for query in queries {
        let docs = query.execute(segment, ord, ctx)?;
        if !docs.value().is_eof() {
            itrs.push(docs);
        }
    }

    Ok(min_match_over(itrs, min_match, ord, merge))
}

pub(crate) fn min_match_over<'a>(
    mut itrs: Vec<DocIteratorBox<'a>>,
    min_match: usize,
    ord: &'a Order,
    merge: ScoreMergeType,
) -> DocIteratorBox<'a> {
    if min_match > itrs.len() {
        return Box::new(EmptyIterator);
    }
    match itrs.len() {
        0 => return Box::new(EmptyIterator),
        1 => {
            return itrs
                .pop()
                .unwrap_or_else(|| Box::new(EmptyIterator) as DocIteratorBox<'a>);
        }
        _ => {}
    }
    if min_match == itrs.len() {
        return Box::new(Conjunction::new(itrs, ord, merge));
    }
    if itrs.len() >= BLOCK_MIN_MATCH_LIMIT {
        let traits = BlockDisjunctionTraits {
            score_enabled: !ord.is_empty(),
            match_mode: MatchMode::MinMatch(min_match),
            ..Default::default()
        };
        return Box::new(BlockDisjunction::new(itrs, ord, merge, traits));
    }
    Box::new(MinMatchDisjunction::new(itrs, min_match, ord, merge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;
    use crate::index::memory::MemorySegment;
    use crate::query::docset::DocSetFilter;
    use crate::query::ast::LeafFilter;
    use crate::index::IndexReader;
    use crate::index::memory::MemoryIndex;
    use crate::search::tests::collect;

    fn prepared(docs: &[u64]) -> PreparedBox {
        let reader = MemoryIndex::with_docs(docs.last().copied().unwrap_or(0));
        DocSetFilter::new(docs.to_vec())
            .prepare(&reader as &dyn IndexReader, Order::unordered(), 1.0, None)
            .expect("doc set leaves prepare infallibly")
    }

    #[test]
    fn test_empty_query_execute() {
        let segment = MemorySegment::new(10);
        let mut it = EmptyQuery
            .execute(&segment, Order::unordered(), None)
            .expect("empty query executes");
        assert!(it.value().is_eof());
        assert!(!it.next());
    }

    #[test]
    fn test_all_query_execute() {
        let segment = MemorySegment::new(3);
        let query = AllQuery::new(1.0);
        let mut it = query
            .execute(&segment, Order::unordered(), None)
            .expect("all query executes");
        assert_eq!(collect(&mut it), vec![1, 2, 3]);
    }

    #[test]
    fn test_make_conjunction_single_child_passthrough() {
        let segment = MemorySegment::new(100);
        let queries = vec![prepared(&[4, 8])];
        let mut it =
            make_conjunction(&queries, &segment, Order::unordered(), None, ScoreMergeType::Aggregate)
                .expect("conjunction builds");
        assert_eq!(collect(&mut it), vec![4, 8]);
    }

    #[test]
    fn test_make_conjunction_short_circuits_on_empty_child() {
        let segment = MemorySegment::new(100);
        let queries = vec![prepared(&[4, 8]), Box::new(EmptyQuery) as PreparedBox];
        let mut it =
            make_conjunction(&queries, &segment, Order::unordered(), None, ScoreMergeType::Aggregate)
                .expect("conjunction builds");
        assert!(it.value().is_eof());
        assert!(!it.next());
    }

    #[test]
    fn test_make_disjunction_drops_empty_children() {
        let segment = MemorySegment::new(100);
        let queries = vec![
            Box::new(EmptyQuery) as PreparedBox,
            prepared(&[4, 8]),
            Box::new(EmptyQuery) as PreparedBox,
        ];
        let mut it =
            make_disjunction(&queries, &segment, Order::unordered(), None, ScoreMergeType::Aggregate)
                .expect("disjunction builds");
        assert_eq!(collect(&mut it), vec![4, 8]);
    }

    #[test]
    fn test_disjunction_shape_selection() {
        let segment = MemorySegment::new(100);
        for fanout in [2usize, 4, SMALL_DISJUNCTION_LIMIT + 1] {
            let queries: Vec<PreparedBox> = (0..fanout as u64)
                .map(|i| prepared(&[i + 1, 50 + i]))
                .collect();
            let mut it = make_disjunction(
                &queries,
                &segment,
                Order::unordered(),
                None,
                ScoreMergeType::Aggregate,
            )
            .expect("disjunction builds");
            let mut expected: Vec<u64> = (1..=fanout as u64).chain(50..50 + fanout as u64).collect();
            expected.sort_unstable();
            expected.dedup();
            assert_eq!(collect(&mut it), expected, "fanout {fanout}");
        }
    }

    #[test]
    fn test_make_min_match_degenerations() {
        let segment = MemorySegment::new(100);
        let queries = vec![prepared(&[1, 2, 5, 6]), prepared(&[1, 2, 5, 7, 9])];

        // min_match == children: conjunction semantics
        let mut it =
            make_min_match(&queries, 2, &segment, Order::unordered(), None, ScoreMergeType::Aggregate)
                .expect("min match builds");
        assert_eq!(collect(&mut it), vec![1, 2, 5]);

        // min_match beyond children: provably empty
        let mut it =
            make_min_match(&queries, 3, &segment, Order::unordered(), None, ScoreMergeType::Aggregate)
                .expect("min match builds");
        assert!(!it.next());

        // survivors below the requirement: empty as well
        let queries = vec![prepared(&[3]), Box::new(EmptyQuery) as PreparedBox, prepared(&[4])];
        let mut it =
            make_min_match(&queries, 2, &segment, Order::unordered(), None, ScoreMergeType::Aggregate)
                .expect("min match builds");
        assert!(!it.next());
    }

    #[test]
    fn test_min_match_single_survivor_passthrough() {
        let segment = MemorySegment::new(100);
        let queries = vec![
            prepared(&[6, 7]),
            Box::new(EmptyQuery) as PreparedBox,
            Box::new(EmptyQuery) as PreparedBox,
        ];
        let mut it =
            make_min_match(&queries, 1, &segment, Order::unordered(), None, ScoreMergeType::Aggregate)
                .expect("min match builds");
        assert_eq!(collect(&mut it), vec![6, 7]);
    }

    #[test]
    fn test_boolean_query_execute_with_exclusion() {
        let segment = MemorySegment::new(100);
        let query = BooleanQuery::new(
            BooleanKind::And,
            vec![prepared(&[1, 2, 5, 7, 9, 11, 29, 45])],
            vec![prepared(&[1, 5, 6, 12, 29])],
            1.0,
            ScoreMergeType::Aggregate,
        );
        let mut it = query
            .execute(&segment, Order::unordered(), None)
            .expect("boolean query executes");
        assert_eq!(collect(&mut it), vec![2, 7, 9, 11, 45]);
    }

    #[test]
    fn test_boolean_query_skips_inert_exclusion() {
        let segment = MemorySegment::new(100);
        let query = BooleanQuery::new(
            BooleanKind::Or,
            vec![prepared(&[2, 4])],
            vec![Box::new(EmptyQuery) as PreparedBox],
            1.0,
            ScoreMergeType::Aggregate,
        );
        let mut it = query
            .execute(&segment, Order::unordered(), None)
            .expect("boolean query executes");
        assert_eq!(collect(&mut it), vec![2, 4]);
    }

    #[test]
    fn test_boolean_query_min_match_kind() {
        let segment = MemorySegment::new(4096);
        let query = BooleanQuery::new(
            BooleanKind::MinMatch(2),
            vec![
                prepared(&[1, 2, 5, 7, 9, 11, 45]),
                prepared(&[7, 15, 26, 212, 239]),
                prepared(&[1001, 4001]),
                prepared(&[10, 101, 490, 713, 1201, 2801]),
            ],
            vec![],
            1.0,
            ScoreMergeType::Aggregate,
        );
        let mut it = query
            .execute(&segment, Order::unordered(), None)
            .expect("boolean query executes");
        assert_eq!(collect(&mut it), vec![7]);
        assert_eq!(it.seek(DocId(100)), DocId::EOF);
    }
}
