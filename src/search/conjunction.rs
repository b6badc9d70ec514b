use std::any::{Any, TypeId};

use smallvec::SmallVec;

use crate::core::types::DocId;
use crate::scoring::{Order, ScoreMergeType};
use crate::search::{DocIterator, DocIteratorBox};

// Score dispatch is fixed at construction on the number of sub-iterators
// that actually carry a score, so the hot loop never re-discovers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScoreShape {
    None,
    One,
    Two,
    Three,
    Many,
}

impl ScoreShape {
    fn of(count: usize) -> Self {
        match count {
            0 => ScoreShape::None,
            1 => ScoreShape::One,
            2 => ScoreShape::Two,
            3 => ScoreShape::Three,
            _ => ScoreShape::Many,
        }
    }
}

/// Leapfrog intersection of N sorted streams.
///
/// Sub-iterators are ordered ascending by cost at construction; the
/// cheapest one becomes the lead and drives candidate selection, so the
/// cost estimate of the whole conjunction is the lead's cost.
pub struct Conjunction<'a> {
    // ascending by cost; [0] is the lead
    itrs: Vec<DocIteratorBox<'a>>,
    scored: SmallVec<[usize; 4]>,
    shape: ScoreShape,
    ord: &'a Order,
    merge: ScoreMergeType,
    buf: Box<[u8]>,
    score_doc: DocId,
    cost: u64,
}

impl<'a> Conjunction<'a> {
    pub fn new(mut itrs: Vec<DocIteratorBox<'a>>, ord: &'a Order, merge: ScoreMergeType) -> Self {
        assert!(!itrs.is_empty());

        itrs.sort_by_cached_key(|it| it.cost());
        let cost = itrs[0].cost();

        let mut scored = SmallVec::new();
        if !ord.is_empty() {
            for (i, it) in itrs.iter().enumerate() {
                if it.has_score() {
                    scored.push(i);
                }
            }
        }

        Conjunction {
            shape: ScoreShape::of(scored.len()),
            scored,
            itrs,
            ord,
            merge,
            buf: ord.new_buffer(),
            score_doc: DocId::INVALID,
            cost,
        }
    }

    /// Number of sub-iterators.
    pub fn size(&self) -> usize {
        self.itrs.len()
    }

    // Tries to converge the lead and the rest onto `target`; on a miss the
    // first doc some sub-iterator skipped to becomes the new candidate.
    fn converge(&mut self, mut target: DocId) -> DocId {
        debug_assert!(!target.is_eof());
        loop {
            let rest = self.seek_rest(target);
            if rest == target {
                return target;
            }
            target = self.itrs[0].seek(rest);
            if target.is_eof() {
                return DocId::EOF;
            }
        }
    }

    // Seeks every non-lead sub-iterator to `target`; returns the first doc
    // strictly past it if some sub-iterator overshot.
    fn seek_rest(&mut self, target: DocId) -> DocId {
        for it in &mut self.itrs[1..] {
            let doc = it.seek(target);
            if target < doc {
                return doc;
            }
        }
        target
    }
}

impl<'a> DocIterator for Conjunction<'a> {
    fn value(&self) -> DocId {
        self.itrs[0].value()
    }

    fn next(&mut self) -> bool {
        if !self.itrs[0].next() {
            return false;
        }
        let target = self.itrs[0].value();
        !self.converge(target).is_eof()
    }

    fn seek(&mut self, target: DocId) -> DocId {
        let target = self.itrs[0].seek(target);
        if target.is_eof() {
            return DocId::EOF;
        }
        self.converge(target)
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn has_score(&self) -> bool {
        self.shape != ScoreShape::None
    }

    fn score(&mut self) -> &[u8] {
        let doc = self.value();
        if self.score_doc != doc {
            self.score_doc = doc;
            let Conjunction { itrs, scored, ord, merge, buf, shape, .. } = self;
            match shape {
                ScoreShape::None => {}
                ScoreShape::One => {
                    let s = itrs[scored[0]].score();
                    ord.copy_into(buf, s);
                }
                ScoreShape::Two => {
                    let s = itrs[scored[0]].score();
                    ord.copy_into(buf, s);
                    let s = itrs[scored[1]].score();
                    ord.merge_into(*merge, buf, s);
                }
                ScoreShape::Three => {
                    let s = itrs[scored[0]].score();
                    ord.copy_into(buf, s);
                    let s = itrs[scored[1]].score();
                    ord.merge_into(*merge, buf, s);
                    let s = itrs[scored[2]].score();
                    ord.merge_into(*merge, buf, s);
                }
                ScoreShape::Many => {
                    let mut first = true;
                    for &i in scored.iter() {
                        let s = itrs[i].score();
                        if first {
                            ord.copy_into(buf, s);
                            first = false;
                        } else {
                            ord.merge_into(*merge, buf, s);
                        }
                    }
                }
            }
        }
        &self.buf
    }

    fn attribute(&self, type_id: TypeId) -> Option<&dyn Any> {
        self.itrs[0].attribute(type_id)
    }
}
