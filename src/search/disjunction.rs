use crate::core::types::DocId;
use crate::scoring::{Order, ScoreMergeType};
use crate::search::{DocIterator, DocIteratorBox};

/// Largest sub-iterator count for which the linear-scan
/// [`SmallDisjunction`] beats batched evaluation.
pub const SMALL_DISJUNCTION_LIMIT: usize = 5;

/// Union of exactly two sorted streams.
///
/// A dedicated two-way merge: each step advances whichever side sits at
/// (or before) the current document and emits the smaller of the two new
/// positions. Cost is the sum of both sub-costs.
pub struct BasicDisjunction<'a> {
    lhs: DocIteratorBox<'a>,
    rhs: DocIteratorBox<'a>,
    doc: DocId,
    ord: &'a Order,
    merge: ScoreMergeType,
    buf: Box<[u8]>,
    score_doc: DocId,
    cost: u64,
}

impl<'a> BasicDisjunction<'a> {
    pub fn new(
        lhs: DocIteratorBox<'a>,
        rhs: DocIteratorBox<'a>,
        ord: &'a Order,
        merge: ScoreMergeType,
    ) -> Self {
        let cost = lhs.cost().saturating_add(rhs.cost());
        BasicDisjunction {
            lhs,
            rhs,
            doc: DocId::INVALID,
            ord,
            merge,
            buf: ord.new_buffer(),
            score_doc: DocId::INVALID,
            cost,
        }
    }
}

impl<'a> DocIterator for BasicDisjunction<'a> {
    fn value(&self) -> DocId {
        self.doc
    }

    fn next(&mut self) -> bool {
        if self.doc.is_eof() {
            return false;
        }
        if self.lhs.value() <= self.doc {
            self.lhs.next();
        }
        if self.rhs.value() <= self.doc {
            self.rhs.next();
        }
        self.doc = self.lhs.value().min(self.rhs.value());
        !self.doc.is_eof()
    }

    fn seek(&mut self, target: DocId) -> DocId {
        if target <= self.doc {
            return self.doc;
        }
        let lhs = self.lhs.seek(target);
        let rhs = self.rhs.seek(target);
        self.doc = lhs.min(rhs);
        self.doc
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn has_score(&self) -> bool {
        !self.ord.is_empty() && (self.lhs.has_score() || self.rhs.has_score())
    }

    fn score(&mut self) -> &[u8] {
        if self.score_doc != self.doc {
            self.score_doc = self.doc;
            let BasicDisjunction { lhs, rhs, doc, ord, merge, buf, .. } = self;
            let mut first = true;
            for it in [lhs, rhs] {
                if it.value() == *doc && it.has_score() {
                    let s = it.score();
                    if first {
                        ord.copy_into(buf, s);
                        first = false;
                    } else {
                        ord.merge_into(*merge, buf, s);
                    }
                }
            }
            if first {
                buf.fill(0);
            }
        }
        &self.buf
    }

    fn match_count(&mut self) -> usize {
        if self.doc.is_eof() {
            return 0;
        }
        usize::from(self.lhs.value() == self.doc) + usize::from(self.rhs.value() == self.doc)
    }
}

/// Union of a handful of sorted streams by linear min-scan.
///
/// Every step scans all live sub-iterators for the smallest position;
/// exhausted ones are dropped. Below [`SMALL_DISJUNCTION_LIMIT`] streams
/// the scan is cheaper than maintaining a heap or a bit window.
pub struct SmallDisjunction<'a> {
    itrs: Vec<DocIteratorBox<'a>>,
    doc: DocId,
    ord: &'a Order,
    merge: ScoreMergeType,
    buf: Box<[u8]>,
    score_doc: DocId,
    cost: u64,
}

impl<'a> SmallDisjunction<'a> {
    pub fn new(itrs: Vec<DocIteratorBox<'a>>, ord: &'a Order, merge: ScoreMergeType) -> Self {
        assert!(!itrs.is_empty());
        let cost = itrs.iter().fold(0u64, |sum, it| sum.saturating_add(it.cost()));
        SmallDisjunction {
            itrs,
            doc: DocId::INVALID,
            ord,
            merge,
            buf: ord.new_buffer(),
            score_doc: DocId::INVALID,
            cost,
        }
    }
}

impl<'a> DocIterator for SmallDisjunction<'a> {
    fn value(&self) -> DocId {
        self.doc
    }

    fn next(&mut self) -> bool {
        if self.doc.is_eof() {
            return false;
        }
        let mut min = DocId::EOF;
        let mut i = 0;
        while i < self.itrs.len() {
            let mut value = self.itrs[i].value();
            if value <= self.doc {
                self.itrs[i].next();
                value = self.itrs[i].value();
            }
            if value.is_eof() {
                self.itrs.swap_remove(i);
                continue;
            }
            min = min.min(value);
            i += 1;
        }
        self.doc = min;
        !min.is_eof()
    }

    fn seek(&mut self, target: DocId) -> DocId {
        if target <= self.doc {
            return self.doc;
        }
        let mut min = DocId::EOF;
        let mut i = 0;
        while i < self.itrs.len() {
            let value = self.itrs[i].seek(target);
            if value.is_eof() {
                self.itrs.swap_remove(i);
                continue;
            }
            min = min.min(value);
            i += 1;
        }
        self.doc = min;
        self.doc
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn has_score(&self) -> bool {
        !self.ord.is_empty() && self.itrs.iter().any(|it| it.has_score())
    }

    fn score(&mut self) -> &[u8] {
        if self.score_doc != self.doc {
            self.score_doc = self.doc;
            let SmallDisjunction { itrs, doc, ord, merge, buf, .. } = self;
            let mut first = true;
            for it in itrs.iter_mut() {
                if it.value() == *doc && it.has_score() {
                    let s = it.score();
                    if first {
                        ord.copy_into(buf, s);
                        first = false;
                    } else {
                        ord.merge_into(*merge, buf, s);
                    }
                }
            }
            if first {
                buf.fill(0);
            }
        }
        &self.buf
    }

    fn match_count(&mut self) -> usize {
        if self.doc.is_eof() {
            return 0;
        }
        self.itrs.iter().filter(|it| it.value() == self.doc).count()
    }
}
