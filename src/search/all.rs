use crate::core::types::DocId;
use crate::index::SubReader;
use crate::scoring::{Boost, LeafScore, Order};
use crate::search::DocIterator;

/// Iterator over every document of a segment, in id order.
///
/// Scores, when an order is prepared, carry the accumulated boost of the
/// `All` branch that produced this iterator.
pub struct AllIterator {
    doc: DocId,
    max: u64,
    score: LeafScore,
}

impl AllIterator {
    pub fn new(segment: &dyn SubReader, ord: &Order, boost: Boost) -> Self {
        AllIterator {
            doc: DocId::INVALID,
            max: segment.docs_count(),
            score: if ord.is_empty() {
                LeafScore::none()
            } else {
                ord.prepare_scorers(segment, boost)
            },
        }
    }
}

impl DocIterator for AllIterator {
    fn value(&self) -> DocId {
        self.doc
    }

    fn next(&mut self) -> bool {
        if self.doc.is_eof() {
            return false;
        }
        if self.doc.0 >= self.max {
            self.doc = DocId::EOF;
            return false;
        }
        self.doc = DocId(self.doc.0 + 1);
        true
    }

    fn seek(&mut self, target: DocId) -> DocId {
        if target <= self.doc {
            return self.doc;
        }
        self.doc = if target.0 > self.max { DocId::EOF } else { target };
        self.doc
    }

    fn cost(&self) -> u64 {
        self.max
    }

    fn has_score(&self) -> bool {
        !self.score.is_none()
    }

    fn score(&mut self) -> &[u8] {
        self.score.evaluate(self.doc)
    }
}
