// pinyin-typing/src/breakpoints.rs
//
// Input length -> index of the character finished at that length.

use std::collections::BTreeMap;

use crate::aligner::{self, AlignedLine};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinyinBreakpointMap {
    points: BTreeMap<usize, usize>,
}

impl PinyinBreakpointMap {
    /// Build from an alignment. `target_len` is the length of the full
    /// target input; when syllables were left without a character it lies
    /// past the last aligned word and gets a terminal entry pointing one
    /// past the last character, so the last key is always `target_len`.
    pub fn build(lines: &[AlignedLine], target_len: usize, char_count: usize) -> Self {
        let mut points: BTreeMap<usize, usize> = aligner::words(lines)
            .filter(|w| !w.is_punctuation && w.end > w.start)
            .map(|w| (w.end, w.char_index))
            .collect();

        let aligned_end = points.keys().next_back().copied().unwrap_or(0);
        if target_len > aligned_end {
            points.insert(target_len, char_count);
        }
        Self { points }
    }

    /// Character completed when the input reaches `len`, if any.
    pub fn get(&self, len: usize) -> Option<usize> {
        self.points.get(&len).copied()
    }

    pub fn last_key(&self) -> Option<usize> {
        self.points.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.points.iter().map(|(&k, &v)| (k, v))
    }
}
