use std::any::Any;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Deserialize};

use crate::core::error::Result;
use crate::core::types::DocId;
use crate::index::{IndexReader, SubReader};
use crate::query::ast::LeafFilter;
use crate::query::prepared::{PreparedBox, PreparedFilter};
use crate::scoring::{Boost, LeafScore, NO_BOOST, Order};
use crate::search::{AttributeProvider, DocIterator, DocIteratorBox};

/// Leaf filter over an explicit sorted set of document ids.
///
/// The crate-internal stand-in for index-backed leaves (term, range,
/// prefix): it carries its postings inline instead of resolving them
/// against a term dictionary, which makes it the natural building block
/// for tests, benchmarks and precomputed id sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocSetFilter {
    docs: Vec<DocId>,
    boost: Boost,
}

impl DocSetFilter {
    /// `docs` must be sorted ascending and free of reserved ids.
    pub fn new(docs: Vec<u64>) -> Self {
        let docs: Vec<DocId> = docs.into_iter().map(DocId).collect();
        debug_assert!(docs.is_sorted());
        debug_assert!(docs.iter().all(|doc| doc.is_valid() && !doc.is_eof()));
        DocSetFilter {
            docs,
            boost: NO_BOOST,
        }
    }

    pub fn with_boost(mut self, boost: Boost) -> Self {
        self.boost = boost;
        self
    }

    pub fn into_filter(self) -> crate::query::ast::Filter {
        crate::query::ast::Filter::leaf(self)
    }
}

impl LeafFilter for DocSetFilter {
    fn boost(&self) -> Boost {
        self.boost
    }

    fn prepare(
        &self,
        _reader: &dyn IndexReader,
        _ord: &Order,
        boost: Boost,
        _ctx: Option<&dyn AttributeProvider>,
    ) -> Result<PreparedBox> {
        Ok(Box::new(DocSetQuery {
            docs: self.docs.clone(),
            boost: boost * self.boost,
        }))
    }

    fn eq_dyn(&self, other: &dyn LeafFilter) -> bool {
        other
            .as_any()
            .downcast_ref::<DocSetFilter>()
            .is_some_and(|other| self == other)
    }

    fn hash_dyn(&self, mut state: &mut dyn Hasher) {
        self.docs.hash(&mut state);
        self.boost.to_bits().hash(&mut state);
    }

    fn clone_dyn(&self) -> Box<dyn LeafFilter> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Prepared form of [`DocSetFilter`]: the postings plus the accumulated
/// boost.
pub struct DocSetQuery {
    docs: Vec<DocId>,
    boost: Boost,
}

impl PreparedFilter for DocSetQuery {
    fn boost(&self) -> Boost {
        self.boost
    }

    fn execute<'a>(
        &'a self,
        segment: &'a dyn SubReader,
        ord: &'a Order,
        _ctx: Option<&'a dyn AttributeProvider>,
    ) -> Result<DocIteratorBox<'a>> {
        let score = if ord.is_empty() {
            LeafScore::none()
        } else {
            ord.prepare_scorers(segment, self.boost)
        };
        Ok(Box::new(DocSetIterator::new(self.docs.clone(), score)))
    }
}

/// Sorted iterator over an owned id list.
pub struct DocSetIterator {
    docs: Vec<DocId>,
    // index of the next unread entry
    pos: usize,
    doc: DocId,
    score: LeafScore,
}

impl DocSetIterator {
    pub fn new(docs: Vec<DocId>, score: LeafScore) -> Self {
        DocSetIterator {
            docs,
            pos: 0,
            doc: DocId::INVALID,
            score,
        }
    }
}

impl DocIterator for DocSetIterator {
    fn value(&self) -> DocId {
        self.doc
    }

    fn next(&mut self) -> bool {
        if self.pos >= self.docs.len() {
            self.doc = DocId::EOF;
            return false;
        }
        self.doc = self.docs[self.pos];
        self.pos += 1;
        true
    }

    fn seek(&mut self, target: DocId) -> DocId {
        if target <= self.doc {
            return self.doc;
        }
        self.pos += self.docs[self.pos..].partition_point(|doc| *doc < target);
        if self.pos >= self.docs.len() {
            self.doc = DocId::EOF;
        } else {
            self.doc = self.docs[self.pos];
            self.pos += 1;
        }
        self.doc
    }

    fn cost(&self) -> u64 {
        self.docs.len() as u64
    }

    fn has_score(&self) -> bool {
        !self.score.is_none()
    }

    fn score(&mut self) -> &[u8] {
        self.score.evaluate(self.doc)
    }
}
