use std::any::{Any, TypeId};

use crate::core::types::DocId;
use crate::search::{DocIterator, DocIteratorBox};

/// `include AND NOT exclude` over two sorted streams.
///
/// Position, cost and score all mirror the include side; the excluded
/// stream is a pure set filter and never contributes to scoring.
pub struct Exclusion<'a> {
    incl: DocIteratorBox<'a>,
    excl: DocIteratorBox<'a>,
}

impl<'a> Exclusion<'a> {
    pub fn new(incl: DocIteratorBox<'a>, excl: DocIteratorBox<'a>) -> Self {
        Exclusion { incl, excl }
    }

    // Moves the include side to the next non-excluded document at or
    // after `target`, which must be the include side's current value.
    fn skip_excluded(&mut self, mut target: DocId) -> DocId {
        let mut excl = self.excl.value();
        if excl < target {
            excl = self.excl.seek(target);
        }

        while excl == target {
            if !self.incl.next() {
                return self.incl.value();
            }
            target = self.incl.value();
            if excl < target {
                excl = self.excl.seek(target);
            }
        }

        target
    }
}

impl<'a> DocIterator for Exclusion<'a> {
    fn value(&self) -> DocId {
        self.incl.value()
    }

    fn next(&mut self) -> bool {
        if !self.incl.next() {
            return false;
        }
        let doc = self.incl.value();
        !self.skip_excluded(doc).is_eof()
    }

    fn seek(&mut self, target: DocId) -> DocId {
        if !target.is_valid() {
            return self.incl.value();
        }
        let doc = self.incl.seek(target);
        if doc.is_eof() {
            return doc;
        }
        self.skip_excluded(doc)
    }

    fn cost(&self) -> u64 {
        self.incl.cost()
    }

    fn has_score(&self) -> bool {
        self.incl.has_score()
    }

    fn score(&mut self) -> &[u8] {
        self.incl.score()
    }

    fn attribute(&self, type_id: TypeId) -> Option<&dyn Any> {
        self.incl.attribute(type_id)
    }
}
