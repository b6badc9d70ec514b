use serde::{Serialize, Deserialize};

use crate::core::types::DocId;
use crate::scoring::{Order, ScoreMergeType};
use crate::search::{DocIterator, DocIteratorBox};

/// Emission rule of a [`BlockDisjunction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    /// Any sub-iterator suffices (plain union).
    Match,
    /// At least this many sub-iterators must fire on a document.
    MinMatch(usize),
}

/// Compile-knobs of a [`BlockDisjunction`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockDisjunctionTraits {
    /// Accumulate scores while filling windows. Ignored when the order
    /// bundle is empty.
    pub score_enabled: bool,
    pub match_mode: MatchMode,
    /// Keep windows contiguous instead of skipping to the next populated
    /// one; wastes some fills on sparse ranges but keeps the window loop
    /// branch-friendly.
    pub read_ahead: bool,
    /// Window width in 64-bit words.
    pub block_count: usize,
}

impl Default for BlockDisjunctionTraits {
    fn default() -> Self {
        BlockDisjunctionTraits {
            score_enabled: true,
            match_mode: MatchMode::Match,
            read_ahead: false,
            block_count: 1,
        }
    }
}

impl BlockDisjunctionTraits {
    fn min_match(&self) -> usize {
        match self.match_mode {
            MatchMode::Match => 1,
            MatchMode::MinMatch(n) => n.max(1),
        }
    }
}

/// Union of many sorted streams, evaluated window-at-a-time.
///
/// Instead of advancing every sub-iterator per emitted document, the
/// iterator drains all sub-iterators into a bit-block window of
/// `64 * block_count` ids: a presence bitmap, a per-slot fire count and,
/// when scoring, a per-slot score accumulated with the configured merge
/// policy. Emission then walks set bits. Slots that fire fewer than
/// `min_match` sub-iterators are masked out before emission.
pub struct BlockDisjunction<'a> {
    itrs: Vec<DocIteratorBox<'a>>,
    mask: Vec<u64>,
    counts: Vec<u32>,
    scores: Vec<u8>,
    // score of the last emitted document, kept past window turnover and EOF
    hold: Box<[u8]>,
    base: DocId,
    doc: DocId,
    window: u64,
    min_match: usize,
    read_ahead: bool,
    scored: bool,
    ord: &'a Order,
    merge: ScoreMergeType,
    cost: u64,
}

impl<'a> BlockDisjunction<'a> {
    pub fn new(
        mut itrs: Vec<DocIteratorBox<'a>>,
        ord: &'a Order,
        merge: ScoreMergeType,
        traits: BlockDisjunctionTraits,
    ) -> Self {
        assert!(traits.block_count >= 1);
        let window = 64 * traits.block_count as u64;
        let cost = itrs.iter().fold(0u64, |sum, it| sum.saturating_add(it.cost()));

        // position every sub-iterator on its first document so window
        // bases can be derived from real ids
        let mut i = 0;
        while i < itrs.len() {
            if !itrs[i].value().is_valid() {
                itrs[i].next();
            }
            if itrs[i].value().is_eof() {
                itrs.swap_remove(i);
            } else {
                i += 1;
            }
        }

        let scored =
            traits.score_enabled && !ord.is_empty() && itrs.iter().any(|it| it.has_score());

        BlockDisjunction {
            mask: vec![0; traits.block_count],
            counts: vec![0; window as usize],
            scores: if scored { vec![0; window as usize * ord.score_size()] } else { Vec::new() },
            hold: if scored { ord.new_buffer() } else { Box::default() },
            itrs,
            base: DocId::INVALID,
            doc: DocId::INVALID,
            window,
            min_match: traits.min_match(),
            read_ahead: traits.read_ahead,
            scored,
            ord,
            merge,
            cost,
        }
    }

    fn slot_of(&self, doc: DocId) -> usize {
        (doc.0 - self.base.0) as usize
    }

    // Preserve the current document's score before its window slot is
    // reused or lost; score() serves it once the iterator is at EOF.
    fn freeze_current(&mut self) {
        if !self.scored || !self.doc.is_valid() || self.doc.is_eof() || !self.base.is_valid() {
            return;
        }
        let Some(offset) = self.doc.0.checked_sub(self.base.0) else {
            return;
        };
        if offset >= self.window {
            return;
        }
        let size = self.ord.score_size();
        let slot = offset as usize;
        self.hold.copy_from_slice(&self.scores[slot * size..(slot + 1) * size]);
    }

    fn exhaust(&mut self) -> DocId {
        self.freeze_current();
        self.doc = DocId::EOF;
        DocId::EOF
    }

    // Drain every sub-iterator through the window [base, base + window)
    // into the bitmap, counters and score slots; exhausted sub-iterators
    // are dropped.
    fn fill(&mut self, base: DocId) {
        debug_assert!(base.is_valid() && !base.is_eof());
        self.freeze_current();

        self.mask.fill(0);
        self.counts.fill(0);
        self.scores.fill(0);
        self.base = base;

        let end = base.0.saturating_add(self.window);
        let size = self.ord.score_size();

        let mut i = 0;
        while i < self.itrs.len() {
            let mut value = self.itrs[i].value();
            if value < base {
                value = self.itrs[i].seek(base);
            }
            while value.0 < end {
                let slot = (value.0 - base.0) as usize;
                self.mask[slot / 64] |= 1 << (slot % 64);
                let first = self.counts[slot] == 0;
                self.counts[slot] += 1;
                if self.scored && self.itrs[i].has_score() {
                    let score = self.itrs[i].score();
                    let region = &mut self.scores[slot * size..(slot + 1) * size];
                    if first {
                        self.ord.copy_into(region, score);
                    } else {
                        self.ord.merge_into(self.merge, region, score);
                    }
                }
                self.itrs[i].next();
                value = self.itrs[i].value();
            }
            if value.is_eof() {
                self.itrs.swap_remove(i);
            } else {
                i += 1;
            }
        }

        if self.min_match > 1 {
            for slot in 0..self.counts.len() {
                if self.counts[slot] != 0 && (self.counts[slot] as usize) < self.min_match {
                    self.mask[slot / 64] &= !(1 << (slot % 64));
                }
            }
        }
    }

    // First set bit at or after `from`, if any.
    fn scan(&self, from: usize) -> Option<usize> {
        if from as u64 >= self.window {
            return None;
        }
        let mut word = from / 64;
        let mut bits = self.mask[word] & (!0u64 << (from % 64));
        loop {
            if bits != 0 {
                return Some(word * 64 + bits.trailing_zeros() as usize);
            }
            word += 1;
            if word >= self.mask.len() {
                return None;
            }
            bits = self.mask[word];
        }
    }

    // Base of the next window to fill, None when no sub-iterator is left.
    fn next_base(&mut self) -> Option<DocId> {
        let min = self.itrs.iter().map(|it| it.value()).min()?;
        if self.read_ahead && self.base.is_valid() {
            let contiguous = self.base.0.saturating_add(self.window);
            if min.0 < contiguous.saturating_add(self.window) {
                return Some(DocId(contiguous));
            }
        }
        Some(min)
    }

    // Emit the next set bit starting at `from` in the current window
    // (None = no window yet), filling further windows as needed.
    fn find_next(&mut self, mut from: Option<usize>) -> bool {
        loop {
            if let Some(f) = from {
                if let Some(slot) = self.scan(f) {
                    self.doc = DocId(self.base.0 + slot as u64);
                    return true;
                }
            }
            match self.next_base() {
                Some(base) => {
                    self.fill(base);
                    from = Some(0);
                }
                None => {
                    self.exhaust();
                    return false;
                }
            }
        }
    }
}

impl<'a> DocIterator for BlockDisjunction<'a> {
    fn value(&self) -> DocId {
        self.doc
    }

    fn next(&mut self) -> bool {
        if self.doc.is_eof() {
            return false;
        }
        let from = if !self.base.is_valid() {
            None
        } else if self.doc < self.base {
            Some(0)
        } else {
            Some(self.slot_of(self.doc) + 1)
        };
        self.find_next(from)
    }

    fn seek(&mut self, target: DocId) -> DocId {
        if target <= self.doc {
            return self.doc;
        }
        if target.is_eof() {
            return self.exhaust();
        }

        if self.base.is_valid() && target.0 < self.base.0.saturating_add(self.window) {
            // target falls into (or before) the current window
            let from = if target.0 <= self.base.0 { 0 } else { self.slot_of(target) };
            self.find_next(Some(from));
            return self.doc;
        }

        // jump: move every sub-iterator past the target first
        let mut i = 0;
        while i < self.itrs.len() {
            if self.itrs[i].seek(target).is_eof() {
                self.itrs.swap_remove(i);
            } else {
                i += 1;
            }
        }
        if self.itrs.is_empty() {
            return self.exhaust();
        }

        let base = if self.read_ahead {
            target
        } else {
            match self.itrs.iter().map(|it| it.value()).min() {
                Some(min) => min,
                None => return self.exhaust(),
            }
        };
        self.fill(base);
        self.find_next(Some(0));
        self.doc
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
        if self.doc.is_eof() {
            return &self.hold;
        }
        let size = self.ord.score_size();
        let slot = self.slot_of(self.doc);
        &self.scores[slot * size..(slot + 1) * size]
    }

    fn match_count(&mut self) -> usize {
        if self.doc.is_eof() || !self.doc.is_valid() {
            return 0;
        }
        self.counts[self.slot_of(self.doc)] as usize
    }
}
