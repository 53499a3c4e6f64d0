//! Events a session emits for whatever renders it.

use crate::game::GameState;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The host's input buffer must be replaced with this text
    BufferRewritten(String),
    /// `current_input` changed (typed, deleted or reset)
    InputChanged,
    HintChanged { hint: Option<char> },
    KeyPressed { key: char },
    KeyReleased,
    CorrectKey { key: char, position: usize },
    WrongKey { key: char, position: usize },
    /// The wrong flag expired
    WrongCleared,
    /// A character's pinyin was fully typed for the first time
    CharacterCompleted { char_index: usize, text: String },
    /// The whole item was typed
    WordCompleted { index: usize },
    /// A new item became current
    ItemChanged { index: usize },
    HealthChanged { health: u32 },
    LowHealth { health: u32 },
    GameStateChanged(GameState),
    PracticeTargetChanged { target: char, repeats_remaining: u32 },
    PracticeHit,
}
