pub mod boost;

use std::ops::Range;

use serde::{Serialize, Deserialize};

use crate::core::types::DocId;
use crate::index::SubReader;

/// Multiplicative score factor attached to a filter subtree.
pub type Boost = f32;

/// Boost of a node that does not alter its subtree's score.
pub const NO_BOOST: Boost = 1.0;

/// How scores of several sub-iterators are merged into one buffer
/// at the same document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreMergeType {
    /// Sum across sub-iterators (the default).
    Aggregate,
    /// Per-bucket maximum across sub-iterators.
    Max,
}

impl Default for ScoreMergeType {
    fn default() -> Self {
        ScoreMergeType::Aggregate
    }
}

/// One sort definition of an order bundle.
///
/// A sort owns a fixed-size region of the score buffer and the arithmetic
/// over that region. Leaf iterators obtain a per-segment [`Scorer`] from it.
pub trait Sort: Send + Sync {
    /// Size in bytes of this sort's score region.
    fn score_size(&self) -> usize;

    /// Build the per-segment scorer used by leaf iterators. `boost` is the
    /// accumulated boost of the prepared leaf.
    fn prepare_scorer(&self, segment: &dyn SubReader, boost: Boost) -> Box<dyn Scorer>;

    /// `dst += src` over this sort's region.
    fn add(&self, dst: &mut [u8], src: &[u8]);

    /// `dst = max(dst, src)` over this sort's region.
    fn max(&self, dst: &mut [u8], src: &[u8]);
}

/// Per-segment score evaluator produced by a [`Sort`] for one leaf.
pub trait Scorer {
    /// Write the score of `doc` into `dst` (exactly `score_size` bytes).
    fn score(&mut self, doc: DocId, dst: &mut [u8]);
}

struct Bucket {
    sort: Box<dyn Sort>,
    offset: usize,
}

/// A prepared order bundle: an ordered list of sorts, each owning a region
/// of the score buffer. An empty bundle means unordered evaluation; no
/// score work happens anywhere in the iterator tree.
pub struct Order {
    buckets: Vec<Bucket>,
    score_size: usize,
}

static UNORDERED: Order = Order {
    buckets: Vec::new(),
    score_size: 0,
};

impl Order {
    pub fn new(sorts: Vec<Box<dyn Sort>>) -> Self {
        let mut buckets = Vec::with_capacity(sorts.len());
        let mut offset = 0;
        for sort in sorts {
            let size = sort.score_size();
            buckets.push(Bucket { sort, offset });
            offset += size;
        }
        Order {
            buckets,
            score_size: offset,
        }
    }

    /// The shared empty bundle.
    pub fn unordered() -> &'static Order {
        &UNORDERED
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total score buffer size in bytes.
    pub fn score_size(&self) -> usize {
        self.score_size
    }

    /// Allocate a zeroed score buffer of the right size.
    pub fn new_buffer(&self) -> Box<[u8]> {
        vec![0u8; self.score_size].into_boxed_slice()
    }

    /// Build the leaf scoring state for one segment: a scorer per bucket,
    /// all writing into one buffer. Empty bundle yields an inert state.
    pub fn prepare_scorers(&self, segment: &dyn SubReader, boost: Boost) -> LeafScore {
        let scorers = self
            .buckets
            .iter()
            .map(|b| {
                let range = b.offset..b.offset + b.sort.score_size();
                (b.sort.prepare_scorer(segment, boost), range)
            })
            .collect();
        LeafScore {
            scorers,
            buf: self.new_buffer(),
            doc: DocId::INVALID,
        }
    }

    /// Merge `src` into `dst`, bucket by bucket, according to `merge`.
    /// The first contributor at a document is copied, not merged; callers
    /// use [`Order::copy_into`] for it.
    pub fn merge_into(&self, merge: ScoreMergeType, dst: &mut [u8], src: &[u8]) {
        for b in &self.buckets {
            let range = b.offset..b.offset + b.sort.score_size();
            match merge {
                ScoreMergeType::Aggregate => b.sort.add(&mut dst[range.clone()], &src[range]),
                ScoreMergeType::Max => b.sort.max(&mut dst[range.clone()], &src[range]),
            }
        }
    }

    pub fn copy_into(&self, dst: &mut [u8], src: &[u8]) {
        dst[..self.score_size].copy_from_slice(&src[..self.score_size]);
    }
}

/// Scoring state of a leaf iterator: one scorer per bucket plus the owned
/// score buffer. Evaluation is lazy and cached per document.
pub struct LeafScore {
    scorers: Vec<(Box<dyn Scorer>, Range<usize>)>,
    buf: Box<[u8]>,
    doc: DocId,
}

impl LeafScore {
    /// Inert state used when no order was prepared.
    pub fn none() -> Self {
        LeafScore {
            scorers: Vec::new(),
            buf: Box::default(),
            doc: DocId::INVALID,
        }
    }

    /// True when score evaluation would be wasted (no order prepared).
    pub fn is_none(&self) -> bool {
        self.scorers.is_empty()
    }

    /// Evaluate the score of `doc`, reusing the previous evaluation when
    /// the iterator has not moved.
    pub fn evaluate(&mut self, doc: DocId) -> &[u8] {
        if self.doc != doc {
            for (scorer, range) in &mut self.scorers {
                scorer.score(doc, &mut self.buf[range.clone()]);
            }
            self.doc = doc;
        }
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::boost::BoostSort;

    fn order() -> Order {
        Order::new(vec![Box::new(BoostSort)])
    }

    fn as_f32(buf: &[u8]) -> f32 {
        f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
    }

    #[test]
    fn test_unordered_is_empty() {
        assert!(Order::unordered().is_empty());
        assert_eq!(Order::unordered().score_size(), 0);
    }

    #[test]
    fn test_merge_aggregate_commutes() {
        let ord = order();
        let a = 2.5f32.to_le_bytes();
        let b = 4.0f32.to_le_bytes();

        let mut lhs = ord.new_buffer();
        ord.copy_into(&mut lhs, &a);
        ord.merge_into(ScoreMergeType::Aggregate, &mut lhs, &b);

        let mut rhs = ord.new_buffer();
        ord.copy_into(&mut rhs, &b);
        ord.merge_into(ScoreMergeType::Aggregate, &mut rhs, &a);

        assert_eq!(as_f32(&lhs), 6.5);
        assert_eq!(as_f32(&lhs), as_f32(&rhs));
    }

    #[test]
    fn test_merge_max() {
        let ord = order();
        let mut buf = ord.new_buffer();
        ord.copy_into(&mut buf, &2.5f32.to_le_bytes());
        ord.merge_into(ScoreMergeType::Max, &mut buf, &4.0f32.to_le_bytes());
        assert_eq!(as_f32(&buf), 4.0);
        ord.merge_into(ScoreMergeType::Max, &mut buf, &1.0f32.to_le_bytes());
        assert_eq!(as_f32(&buf), 4.0);
    }
}
