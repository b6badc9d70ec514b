use serde::{Serialize, Deserialize};

use crate::core::types::DocId;
use crate::index::SubReader;
use crate::scoring::{Boost, Scorer, Sort};

fn read_f32(buf: &[u8]) -> f32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[..4]);
    f32::from_le_bytes(bytes)
}

fn write_f32(buf: &mut [u8], value: f32) {
    buf[..4].copy_from_slice(&value.to_le_bytes());
}

/// Sort that scores every document with the accumulated boost of the
/// query branch it was reached through. The simplest useful sort: with it,
/// a document's score is the sum (or max) of the boosts of all matching
/// branches.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct BoostSort;

impl Sort for BoostSort {
    fn score_size(&self) -> usize {
        std::mem::size_of::<f32>()
    }

    fn prepare_scorer(&self, _segment: &dyn SubReader, boost: Boost) -> Box<dyn Scorer> {
        Box::new(BoostScorer { boost })
    }

    fn add(&self, dst: &mut [u8], src: &[u8]) {
        write_f32(dst, read_f32(dst) + read_f32(src));
    }

    fn max(&self, dst: &mut [u8], src: &[u8]) {
        write_f32(dst, read_f32(dst).max(read_f32(src)));
    }
}

struct BoostScorer {
    boost: Boost,
}

impl Scorer for BoostScorer {
    fn score(&mut self, _doc: DocId, dst: &mut [u8]) {
        write_f32(dst, self.boost);
    }
}

/// Read a [`BoostSort`] score back out of a score buffer region.
pub fn boost_score(buf: &[u8]) -> f32 {
    read_f32(buf)
}
