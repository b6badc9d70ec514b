use crate::core::types::DocId;
use crate::scoring::{Order, ScoreMergeType};
use crate::search::{DocIterator, DocIteratorBox};

struct CostIter<'a> {
    it: DocIteratorBox<'a>,
    est: u64,
}

/// Union requiring at least `min_match` sub-streams on every emitted
/// document, heap variant.
///
/// `heap` holds indices into `itrs`, split into two regions: the front is
/// a binary min-heap over `(value, cost)` (the head), the back is the lead
/// list of sub-iterators already known to sit on the current candidate.
/// Candidates are drawn from the head's root; once enough equal
/// sub-iterators have been moved to the lead, the candidate is emitted.
pub struct MinMatchDisjunction<'a> {
    itrs: Vec<CostIter<'a>>,
    heap: Vec<usize>,
    // number of entries at the back of `heap` forming the lead list
    lead: usize,
    min_match: usize,
    doc: DocId,
    scored: bool,
    ord: &'a Order,
    merge: ScoreMergeType,
    buf: Box<[u8]>,
    score_doc: DocId,
    cost: u64,
}

impl<'a> MinMatchDisjunction<'a> {
    pub fn new(
        itrs: Vec<DocIteratorBox<'a>>,
        min_match: usize,
        ord: &'a Order,
        merge: ScoreMergeType,
    ) -> Self {
        assert!(!itrs.is_empty());
        let min_match = min_match.clamp(1, itrs.len());

        let mut itrs: Vec<CostIter<'a>> = itrs
            .into_iter()
            .map(|it| CostIter { est: it.cost(), it })
            .collect();
        itrs.sort_by_key(|sub| sub.est);
        let cost = itrs.iter().fold(0u64, |sum, sub| sum.saturating_add(sub.est));
        let scored = !ord.is_empty() && itrs.iter().any(|sub| sub.it.has_score());

        let lead = itrs.len();
        MinMatchDisjunction {
            heap: (0..itrs.len()).collect(),
            itrs,
            lead,
            min_match,
            doc: DocId::INVALID,
            scored,
            ord,
            merge,
            buf: ord.new_buffer(),
            score_doc: DocId::INVALID,
            cost,
        }
    }

    fn head_len(&self) -> usize {
        self.heap.len() - self.lead
    }

    fn top_value(&self) -> DocId {
        self.itrs[self.heap[0]].it.value()
    }

    // (value asc, cost asc); the secondary key keeps ordering stable when
    // several sub-iterators share the current doc
    fn heap_less(&self, a: usize, b: usize) -> bool {
        let (va, vb) = (self.itrs[a].it.value(), self.itrs[b].it.value());
        va < vb || (va == vb && self.itrs[a].est < self.itrs[b].est)
    }

    // restore the heap property for the entry at `pos` within [0, pos]
    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.heap_less(self.heap[pos], self.heap[parent]) {
                self.heap.swap(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
    }

    // restore the heap property from the root within [0, len)
    fn sift_down(&mut self, len: usize) {
        let mut pos = 0;
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let mut child = left;
            let right = left + 1;
            if right < len && self.heap_less(self.heap[right], self.heap[left]) {
                child = right;
            }
            if self.heap_less(self.heap[child], self.heap[pos]) {
                self.heap.swap(pos, child);
                pos = child;
            } else {
                break;
            }
        }
    }

    // move the head's root to the lead list
    fn add_lead(&mut self) {
        let head_len = self.head_len();
        self.heap.swap(0, head_len - 1);
        self.sift_down(head_len - 1);
        self.lead += 1;
    }

    // drop the lead entry at `pos`; false when min_match can no longer
    // be satisfied
    fn remove_lead_at(&mut self, pos: usize) -> bool {
        let last = self.heap.len() - 1;
        self.heap.swap(pos, last);
        self.heap.pop();
        self.heap.len() >= self.min_match
    }

    // drop the head's root entirely
    fn remove_top(&mut self) -> bool {
        let head_len = self.head_len();
        self.heap.swap(0, head_len - 1);
        self.sift_down(head_len - 1);
        self.remove_lead_at(head_len - 1)
    }

    fn refresh_top(&mut self) {
        let head_len = self.head_len();
        self.sift_down(head_len);
    }

    // move the lead entry at `pos` back into the head
    fn push_head_at(&mut self, pos: usize) {
        let boundary = self.head_len();
        self.heap.swap(pos, boundary);
        self.sift_up(boundary);
    }

    // advance every lead iterator one step and return it to the head;
    // false when min_match can no longer be satisfied
    fn pop_lead(&mut self) -> bool {
        let mut i = self.head_len();
        while i < self.heap.len() {
            let idx = self.heap[i];
            if !self.itrs[idx].it.next() {
                self.lead -= 1;
                if !self.remove_lead_at(i) {
                    return false;
                }
            } else {
                self.sift_up(i);
                self.lead -= 1;
                i += 1;
            }
        }
        true
    }

    // hitch every head iterator sitting at or before the current doc;
    // afterwards the lead list holds every sub-iterator matching it
    fn push_valid_to_lead(&mut self) {
        while self.head_len() > 0 {
            let top = self.top_value();
            if top > self.doc {
                break;
            }
            if top == self.doc {
                self.add_lead();
            } else {
                let idx = self.heap[0];
                if self.itrs[idx].it.seek(self.doc).is_eof() {
                    let _ = self.remove_top();
                } else {
                    self.refresh_top();
                }
            }
        }
    }
}

impl<'a> DocIterator for MinMatchDisjunction<'a> {
    fn value(&self) -> DocId {
        self.doc
    }

    fn next(&mut self) -> bool {
        if self.doc.is_eof() {
            return false;
        }

        while self.heap.len() >= self.min_match {
            // start the next candidate round: step all lead iterators
            // back into the head
            if !self.pop_lead() {
                self.doc = DocId::EOF;
                return false;
            }

            // advance head iterators still at or before the current doc
            while self.top_value() <= self.doc {
                let idx = self.heap[0];
                let exhausted = if self.itrs[idx].it.value() == self.doc {
                    !self.itrs[idx].it.next()
                } else {
                    self.itrs[idx].it.seek(self.doc.succ()).is_eof()
                };
                if exhausted {
                    if !self.remove_top() {
                        self.doc = DocId::EOF;
                        return false;
                    }
                } else {
                    self.refresh_top();
                }
            }

            // count sub-iterators agreeing on the candidate
            let top = self.top_value();
            loop {
                self.add_lead();
                if self.lead >= self.min_match {
                    self.doc = top;
                    return true;
                }
                if self.top_value() != top {
                    break;
                }
            }
        }

        self.doc = DocId::EOF;
        false
    }

    fn seek(&mut self, target: DocId) -> DocId {
        if target <= self.doc {
            return self.doc;
        }

        // seek every lead iterator; hits stay leads, misses return to the
        // head, exhausted ones leave
        let mut i = self.head_len();
        while i < self.heap.len() {
            let idx = self.heap[i];
            let doc = self.itrs[idx].it.seek(target);
            if doc == target {
                i += 1;
            } else if doc.is_eof() {
                self.lead -= 1;
                if !self.remove_lead_at(i) {
                    self.doc = DocId::EOF;
                    return self.doc;
                }
            } else {
                self.push_head_at(i);
                self.lead -= 1;
                i += 1;
            }
        }

        if self.lead >= self.min_match {
            self.doc = target;
            return self.doc;
        }

        // main search loop over head candidates
        let mut target = target;
        loop {
            while self.top_value() <= target {
                let idx = self.heap[0];
                let doc = self.itrs[idx].it.seek(target);
                if doc.is_eof() {
                    if !self.remove_top() {
                        self.doc = DocId::EOF;
                        return self.doc;
                    }
                } else if doc == target {
                    self.add_lead();
                    if self.lead >= self.min_match {
                        self.doc = target;
                        return self.doc;
                    }
                } else {
                    self.refresh_top();
                }
            }

            // not enough hits at this candidate; step the partial lead
            // list and pick the next one
            if !self.pop_lead() {
                self.doc = DocId::EOF;
                return self.doc;
            }
            target = self.top_value();
        }
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn has_score(&self) -> bool {
        self.scored
    }

    fn score(&mut self) -> &[u8] {
        if !self.scored {
            return &[];
        }
        if self.score_doc != self.doc {
            self.score_doc = self.doc;
            self.push_valid_to_lead();

            let boundary = self.head_len();
            let mut first = true;
            for i in boundary..self.heap.len() {
                let idx = self.heap[i];
                if !self.itrs[idx].it.has_score() {
                    continue;
                }
                let score = self.itrs[idx].it.score();
                if first {
                    self.ord.copy_into(&mut self.buf, score);
                    first = false;
                } else {
                    self.ord.merge_into(self.merge, &mut self.buf, score);
                }
            }
            if first {
                self.buf.fill(0);
            }
        }
        &self.buf
    }

    /// Total number of sub-iterators on the current document; may exceed
    /// `min_match`. Moves every matching sub-iterator to the lead list.
    fn match_count(&mut self) -> usize {
        if !self.doc.is_valid() || self.doc.is_eof() {
            return 0;
        }
        self.push_valid_to_lead();
        self.lead
    }
}
