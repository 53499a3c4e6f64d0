//! pinyin-typing crate root
//!
//! The pinyin half of the typing game: turning tone-marked pinyin into the
//! letters a player types, pairing characters with their syllables, judging
//! keystrokes and driving one item after another through a session. Shared
//! plumbing (config, content, collaborators, timers) comes from
//! `typing-core`.
//!
//! Public API exported here:
//! - `PinyinTranscoder` and `transcode` from `transcoder`
//! - `align`, `AlignedLine`, `AlignedWord` from `aligner`
//! - `PinyinBreakpointMap` from `breakpoints`
//! - `InputValidator` and the finger table from `validator`
//! - `TypingSession` from `session`
//! - `SessionOrchestrator` from `orchestrator`

pub mod aligner;
pub mod breakpoints;
pub mod orchestrator;
pub mod session;
pub mod transcoder;
pub mod validator;

pub use aligner::{active_line, align, is_punctuation, AlignedLine, AlignedWord, PUNCTUATION};
pub use breakpoints::PinyinBreakpointMap;
pub use orchestrator::{ActiveSession, SessionOrchestrator};
pub use session::{TypingPhase, TypingSession};
pub use transcoder::{transcode, PinyinTranscoder};
pub use validator::{finger_hint, Finger, FingerTag, Hand, InputValidator};

// Callers usually need the shared model alongside the engine.
pub use typing_core::{
    Config, ContentCategory, ContentSource, GameState, SessionEvent, WordItem,
};
