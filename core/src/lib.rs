//! typing-core
//!
//! Session plumbing shared by the typing game modes: configuration, the
//! content model, collaborator traits (narration, rewards, progress), the
//! timer scheduler, health/feedback state and the single-letter practice
//! drill. The pinyin-specific alignment and validation engine lives in the
//! `pinyin-typing` crate and builds on these types.
//!
//! Public API:
//! - `Config` - Numeric knobs read by the sessions on every use
//! - `WordItem`, `ContentCategory`, `ContentSource` - Content model
//! - `Narrator`, `RewardSink`, `ProgressStore` - Collaborator seams
//! - `Scheduler` - Named, cancellable single-shot timers on a virtual clock
//! - `SessionContext`, `SessionEvent` - What a session borrows and emits
//! - `PracticeSession` - Cyclic single-letter drill
use serde::{Deserialize, Serialize};
use std::time::Duration;

use anyhow::Context as _;

pub mod content;
pub use content::{ContentCategory, ContentSource, JsonContentSource, WordItem};

pub mod services;
pub use services::{Narrator, ProgressStore, RequestId, RewardSink};

pub mod narration;
pub use narration::{NarrationQueue, SpeechBackend};

pub mod score;
pub use score::{Reward, RewardKind, RewardRules, ScoreBoard};

pub mod progress;
pub use progress::{JsonProgressStore, MemoryProgressStore};

pub mod scheduler;
pub use scheduler::{Fired, Scheduler, TimerKind};

pub mod game;
pub use game::{GameState, Health, HealthChange, InputFeedback, PlayState};

pub mod event;
pub use event::SessionEvent;

pub mod context;
pub use context::{SessionContext, TimerDriven};

pub mod practice;
pub use practice::PracticeSession;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Tunable knobs for the typing sessions.
///
/// Sessions never keep a copy of this struct; they read it through
/// `SessionContext::config` each time a value is needed, so edits made
/// between keystrokes take effect immediately.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    // Economy
    /// Coins earned per correctly typed letter
    pub money_per_letter: f64,
    /// Coins deducted per wrong letter
    pub penalty_per_error: f64,
    /// Coins needed to buy one health point back
    pub cost_per_health: f64,

    // Health
    /// Starting health. 0 disables health entirely (no game over).
    pub max_health: u32,
    /// Health lost per wrong letter
    pub health_per_error: u32,

    // Rewards (consumed by `ScoreBoard`)
    pub combo_bonus_threshold: u32,
    pub combo_bonus_money: f64,
    pub random_reward_chance: f64,
    pub random_reward_min: f64,
    pub random_reward_max: f64,
    pub milestone_letter_count: u32,
    pub milestone_bonus_money: f64,

    // Delays (seconds)
    /// Wait after narration of a completed item before advancing
    pub delay_standard: f64,
    pub delay_article: f64,
    pub delay_xiehouyu: f64,
    pub delay_hard: f64,
    /// Wait between completing an item and narrating it
    pub delay_before_speak: f64,
    pub key_clear_delay: f64,
    pub wrong_key_clear_delay: f64,
    pub game_over_delay: f64,
    pub practice_flash_delay: f64,

    // Narration
    /// Rate multiplier applied to single-character utterances
    pub single_char_speed_multiplier: f32,

    // Transcoder cache
    pub transcoder_cache_entries: usize,
    pub transcoder_cache_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            money_per_letter: 0.05,
            penalty_per_error: 0.0,
            cost_per_health: 5.0,
            max_health: 5,
            health_per_error: 1,
            combo_bonus_threshold: 10,
            combo_bonus_money: 0.1,
            random_reward_chance: 0.05,
            random_reward_min: 0.5,
            random_reward_max: 1.0,
            milestone_letter_count: 50,
            milestone_bonus_money: 1.0,
            delay_standard: 0.2,
            delay_article: 0.2,
            delay_xiehouyu: 0.2,
            delay_hard: 0.2,
            delay_before_speak: 0.0,
            key_clear_delay: 0.2,
            wrong_key_clear_delay: 0.4,
            game_over_delay: 0.5,
            practice_flash_delay: 0.3,
            single_char_speed_multiplier: 2.0,
            transcoder_cache_entries: 5000,
            transcoder_cache_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parse config {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("write config {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Whether wrong input costs health (and can end the game).
    pub fn health_enabled(&self) -> bool {
        self.max_health > 0
    }

    /// How long to wait after narrating a finished item before moving on.
    pub fn post_completion_delay(&self, category: ContentCategory) -> Duration {
        let secs = match category {
            ContentCategory::Article => self.delay_article,
            ContentCategory::Hard => self.delay_hard,
            ContentCategory::Xiehouyu => self.delay_xiehouyu,
            _ => self.delay_standard,
        };
        utils::secs(secs)
    }

    /// Rate for an utterance: single characters are sped up by
    /// `single_char_speed_multiplier`.
    pub fn narration_rate(&self, text: &str, base: f32) -> f32 {
        if text.chars().count() == 1 {
            base * self.single_char_speed_multiplier
        } else {
            base
        }
    }
}

/// Utility helpers.
pub mod utils {
    use std::time::Duration;

    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>().trim().to_string()
    }

    /// Lower-case and keep only the 26 ASCII letters.
    ///
    /// Anything else is dropped silently; this is a keyboard filter, not a
    /// validation step.
    pub fn clean_input(raw: &str) -> String {
        raw.chars()
            .flat_map(char::to_lowercase)
            .filter(|c| c.is_ascii_lowercase())
            .collect()
    }

    /// Seconds from config to a `Duration`, treating negatives and NaN as zero.
    pub fn secs(value: f64) -> Duration {
        if value.is_finite() && value > 0.0 {
            Duration::from_secs_f64(value)
        } else {
            Duration::ZERO
        }
    }
}
