// pinyin-typing/src/validator.rs
//
// Keystroke cleaning, target input for an item and the finger-hint table.

use std::fmt;
use std::rc::Rc;

use phf::phf_map;

use typing_core::{utils, WordItem};

use crate::transcoder::PinyinTranscoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Pinky,
    Ring,
    Middle,
    Index,
}

/// Which finger should press a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerTag {
    LeftPinky,
    LeftRing,
    LeftMiddle,
    LeftIndex,
    RightIndex,
    RightMiddle,
    RightRing,
    RightPinky,
}

impl FingerTag {
    pub fn hand(&self) -> Hand {
        match self {
            Self::LeftPinky | Self::LeftRing | Self::LeftMiddle | Self::LeftIndex => Hand::Left,
            _ => Hand::Right,
        }
    }

    pub fn finger(&self) -> Finger {
        match self {
            Self::LeftPinky | Self::RightPinky => Finger::Pinky,
            Self::LeftRing | Self::RightRing => Finger::Ring,
            Self::LeftMiddle | Self::RightMiddle => Finger::Middle,
            Self::LeftIndex | Self::RightIndex => Finger::Index,
        }
    }

    /// Label shown on the on-screen keyboard.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LeftPinky => "左-小指",
            Self::LeftRing => "左-无名指",
            Self::LeftMiddle => "左-中指",
            Self::LeftIndex => "左-食指",
            Self::RightIndex => "右-食指",
            Self::RightMiddle => "右-中指",
            Self::RightRing => "右-无名指",
            Self::RightPinky => "右-小指",
        }
    }
}

impl fmt::Display for FingerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

static FINGERS: phf::Map<char, FingerTag> = phf_map! {
    'q' => FingerTag::LeftPinky, 'a' => FingerTag::LeftPinky, 'z' => FingerTag::LeftPinky,
    'p' => FingerTag::RightPinky,
    'w' => FingerTag::LeftRing, 's' => FingerTag::LeftRing, 'x' => FingerTag::LeftRing,
    'o' => FingerTag::RightRing, 'l' => FingerTag::RightRing,
    'e' => FingerTag::LeftMiddle, 'd' => FingerTag::LeftMiddle, 'c' => FingerTag::LeftMiddle,
    'i' => FingerTag::RightMiddle, 'k' => FingerTag::RightMiddle,
    'r' => FingerTag::LeftIndex, 'f' => FingerTag::LeftIndex, 'v' => FingerTag::LeftIndex,
    't' => FingerTag::LeftIndex, 'g' => FingerTag::LeftIndex, 'b' => FingerTag::LeftIndex,
    'y' => FingerTag::RightIndex, 'h' => FingerTag::RightIndex, 'n' => FingerTag::RightIndex,
    'u' => FingerTag::RightIndex, 'j' => FingerTag::RightIndex, 'm' => FingerTag::RightIndex,
};

/// Finger for `key`, case-insensitive. `None` outside `a..=z`.
pub fn finger_hint(key: char) -> Option<FingerTag> {
    FINGERS.get(&key.to_ascii_lowercase()).copied()
}

/// Stateless apart from sharing the transcoder (and its cache) with the
/// aligner, so target offsets and aligned offsets always agree.
#[derive(Clone)]
pub struct InputValidator {
    transcoder: Rc<PinyinTranscoder>,
}

impl InputValidator {
    pub fn new(transcoder: Rc<PinyinTranscoder>) -> Self {
        Self { transcoder }
    }

    pub fn transcoder(&self) -> &PinyinTranscoder {
        &self.transcoder
    }

    /// Lower-case and keep only `a..=z`.
    pub fn clean_input(&self, raw: &str) -> String {
        utils::clean_input(raw)
    }

    /// Arrow keys arrive as ASCII 28/29 in some hosts.
    pub fn contains_control_characters(&self, raw: &str) -> bool {
        raw.chars().any(|c| c == '\u{1c}' || c == '\u{1d}')
    }

    /// Everything the user has to type for `item`: all syllables of all
    /// lines, transcoded and concatenated. Characters play no part.
    pub fn target_input(&self, item: &WordItem) -> String {
        item.display_pinyin
            .split('\n')
            .flat_map(|line| line.split(' '))
            .filter(|t| !t.is_empty())
            .map(|t| self.transcoder.to_input_form(t))
            .collect()
    }

    pub fn finger_hint(&self, key: char) -> Option<FingerTag> {
        finger_hint(key)
    }
}
