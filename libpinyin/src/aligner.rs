// pinyin-typing/src/aligner.rs
//
// Pairs each character of an item with its display-pinyin syllable and the
// range of the flattened input stream that syllable occupies.
//
// Lines come from the display pinyin (`\n`-separated); the character string
// is walked with one shared cursor across all of them. Within a line:
//   - whitespace characters are skipped
//   - punctuation becomes a zero-width word and consumes no syllable
//   - any other character takes the line's next syllable
//   - once the line's syllables run out, the next non-punctuation character
//     is left for the following line
// A character still unmatched after the last line never appears in the
// alignment. Offsets are global across lines.

use std::collections::HashSet;
use std::ops::Range;

use once_cell::sync::Lazy;

use crate::transcoder::PinyinTranscoder;

/// Sentence punctuation that aligns to no syllable.
pub const PUNCTUATION: &str = "，。、？！：；\u{201C}\u{201D}\u{2018}\u{2019}（）【】《》…—,.?!:;\"'()[]<>";

static PUNCTUATION_SET: Lazy<HashSet<char>> = Lazy::new(|| PUNCTUATION.chars().collect());

pub fn is_punctuation(ch: char) -> bool {
    PUNCTUATION_SET.contains(&ch)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedWord {
    /// The character, or empty for pinyin-only teaching content
    pub ch: String,
    /// Code-point position of `ch` in the item's character string (the
    /// syllable ordinal for teaching content)
    pub char_index: usize,
    pub display_pinyin: String,
    pub input_pinyin: String,
    pub start: usize,
    pub end: usize,
    pub is_punctuation: bool,
}

impl AlignedWord {
    pub fn input_len(&self) -> usize {
        self.end - self.start
    }

    /// For each displayed pinyin letter, the input range it stands for,
    /// relative to `start`. Renderers colour letters with this.
    pub fn display_char_ranges(&self, transcoder: &PinyinTranscoder) -> Vec<Range<usize>> {
        let mut pos = 0;
        self.display_pinyin
            .chars()
            .map(|c| {
                let len = transcoder.to_input_form(c.encode_utf8(&mut [0; 4])).chars().count();
                let range = pos..pos + len;
                pos += len;
                range
            })
            .collect()
    }
}

/// One display line. `start`/`end` are the input offsets at which the line
/// begins and ends, so empty lines still have a position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlignedLine {
    pub words: Vec<AlignedWord>,
    start: usize,
    end: usize,
}

impl AlignedLine {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Align `character` against `display_pinyin`.
pub fn align(
    transcoder: &PinyinTranscoder,
    character: &str,
    display_pinyin: &str,
) -> Vec<AlignedLine> {
    if character.is_empty() {
        return align_pinyin_only(transcoder, display_pinyin);
    }

    let chars: Vec<char> = character.chars().collect();
    let mut cursor = 0;
    let mut offset = 0;
    let mut lines = Vec::new();

    for line in display_pinyin.split('\n') {
        let mut tokens = line.split(' ').filter(|t| !t.is_empty());
        let line_start = offset;
        let mut words = Vec::new();

        while let Some(&ch) = chars.get(cursor) {
            if ch.is_whitespace() {
                cursor += 1;
                continue;
            }
            if is_punctuation(ch) {
                words.push(AlignedWord {
                    ch: ch.to_string(),
                    char_index: cursor,
                    display_pinyin: String::new(),
                    input_pinyin: String::new(),
                    start: offset,
                    end: offset,
                    is_punctuation: true,
                });
                cursor += 1;
                continue;
            }
            let Some(token) = tokens.next() else {
                break;
            };
            let input = transcoder.to_input_form(token);
            let len = input.chars().count();
            words.push(AlignedWord {
                ch: ch.to_string(),
                char_index: cursor,
                display_pinyin: token.to_string(),
                input_pinyin: input,
                start: offset,
                end: offset + len,
                is_punctuation: false,
            });
            offset += len;
            cursor += 1;
        }

        lines.push(AlignedLine {
            words,
            start: line_start,
            end: offset,
        });
    }
    lines
}

fn align_pinyin_only(transcoder: &PinyinTranscoder, display_pinyin: &str) -> Vec<AlignedLine> {
    let mut offset = 0;
    let mut ordinal = 0;
    display_pinyin
        .split('\n')
        .map(|line| {
            let start = offset;
            let words = line
                .split(' ')
                .filter(|t| !t.is_empty())
                .map(|token| {
                    let input = transcoder.to_input_form(token);
                    let len = input.chars().count();
                    let word = AlignedWord {
                        ch: String::new(),
                        char_index: ordinal,
                        display_pinyin: token.to_string(),
                        input_pinyin: input,
                        start: offset,
                        end: offset + len,
                        is_punctuation: false,
                    };
                    offset += len;
                    ordinal += 1;
                    word
                })
                .collect();
            AlignedLine {
                words,
                start,
                end: offset,
            }
        })
        .collect()
}

/// Index of the line the cursor at `typed` sits on. A finished line hands
/// over to the next one as soon as its end is reached, except the last.
pub fn active_line(lines: &[AlignedLine], typed: usize) -> Option<usize> {
    let last = lines.len().checked_sub(1)?;
    for (idx, line) in lines.iter().enumerate() {
        let inside = if idx == last {
            typed >= line.start && typed <= line.end
        } else {
            typed >= line.start && typed < line.end
        };
        if inside {
            return Some(idx);
        }
    }
    if typed > lines[last].end {
        Some(last)
    } else {
        Some(0)
    }
}

/// Every aligned word in order, across lines.
pub fn words(lines: &[AlignedLine]) -> impl Iterator<Item = &AlignedWord> {
    lines.iter().flat_map(|l| l.words.iter())
}
