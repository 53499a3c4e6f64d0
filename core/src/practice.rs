//! Single-letter drill.
//!
//! A fixed letter sequence is walked cyclically. Each letter must be hit a
//! random 1..=5 times before the next one comes up; a hit starts a short
//! flash during which further keys are ignored, and the count only drops
//! when the flash ends. Misses never move the drill forward.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::content::ContentCategory;
use crate::context::{SessionContext, TimerDriven};
use crate::event::SessionEvent;
use crate::game::{GameState, PlayState};
use crate::scheduler::{Fired, TimerKind};
use crate::services::RequestId;
use crate::utils;

pub const HOME_ROW_SEQUENCE: &str = "asdfghjkl";
/// Initials in teaching order, typed letter by letter (zh, ch, sh included).
pub const LETTER_SEQUENCE: &str = "bpmfdtnlgkhjqxzhchshrzcsyw";

const MAX_REPEATS: u32 = 5;

pub struct PracticeSession {
    sequence: Vec<char>,
    letter_index: usize,
    repeats_remaining: u32,
    repeats_total: u32,
    hit_flash: bool,
    /// Bumped whenever a new target drops in
    drop_token: u64,
    generation: u64,
    play: PlayState,
    rng: SmallRng,
}

impl PracticeSession {
    pub fn new(category: ContentCategory) -> Self {
        Self::with_rng(category, SmallRng::from_os_rng())
    }

    pub fn with_seed(category: ContentCategory, seed: u64) -> Self {
        Self::with_rng(category, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(category: ContentCategory, rng: SmallRng) -> Self {
        let sequence = match category {
            ContentCategory::HomeRow => HOME_ROW_SEQUENCE,
            _ => LETTER_SEQUENCE,
        };
        Self {
            sequence: sequence.chars().collect(),
            letter_index: 0,
            repeats_remaining: 0,
            repeats_total: 0,
            hit_flash: false,
            drop_token: 0,
            generation: 0,
            play: PlayState::new(),
            rng,
        }
    }

    pub fn target(&self) -> char {
        self.sequence[self.letter_index]
    }

    pub fn letter_index(&self) -> usize {
        self.letter_index
    }

    pub fn sequence_len(&self) -> usize {
        self.sequence.len()
    }

    pub fn repeats_remaining(&self) -> u32 {
        self.repeats_remaining
    }

    pub fn repeats_total(&self) -> u32 {
        self.repeats_total
    }

    pub fn hit_flash(&self) -> bool {
        self.hit_flash
    }

    pub fn drop_token(&self) -> u64 {
        self.drop_token
    }

    pub fn play(&self) -> &PlayState {
        &self.play
    }

    pub fn play_mut(&mut self) -> &mut PlayState {
        &mut self.play
    }

    pub fn state(&self) -> GameState {
        self.play.state()
    }

    pub fn start(&mut self, cx: &mut SessionContext<'_>) {
        self.generation += 1;
        self.hit_flash = false;
        cx.scheduler.cancel_all();
        self.play.begin(cx);
        cx.rewards.reset_combo();
        self.letter_index = 0;
        self.roll_repeats();
        debug!(target = %self.target(), repeats = self.repeats_remaining, "practice started");
        self.present_target(cx);
    }

    pub fn stop(&mut self, cx: &mut SessionContext<'_>) {
        self.generation += 1;
        self.hit_flash = false;
        cx.narrator.stop();
        cx.scheduler.cancel_all();
        self.play.halt(cx);
    }

    pub fn pause(&mut self, cx: &mut SessionContext<'_>) -> bool {
        self.play.pause(cx)
    }

    pub fn resume(&mut self, cx: &mut SessionContext<'_>) -> bool {
        self.play.resume(cx)
    }

    /// Judge the last letter of the host's buffer, which is then cleared.
    pub fn handle_input(&mut self, cx: &mut SessionContext<'_>, raw: &str) {
        if !self.play.is_playing() || self.hit_flash {
            return;
        }
        let cleaned = utils::clean_input(raw);
        if cleaned != raw {
            cx.emit(SessionEvent::BufferRewritten(cleaned));
            return;
        }
        let Some(key) = cleaned.chars().last() else {
            return;
        };

        self.play.press_key(cx, key);
        if key == self.target() {
            cx.rewards.add_score(1);
            self.play.reward_correct(cx, key, 0);
            self.hit_flash = true;
            cx.emit(SessionEvent::PracticeHit);
            cx.scheduler.schedule(
                TimerKind::PracticeFlash,
                utils::secs(cx.config.practice_flash_delay),
                self.generation,
            );
        } else {
            self.play.penalize(cx, key, 0, self.generation);
        }
        cx.emit(SessionEvent::BufferRewritten(String::new()));
    }

    fn roll_repeats(&mut self) {
        self.repeats_remaining = self.rng.random_range(1..=MAX_REPEATS);
        self.repeats_total = self.repeats_remaining;
    }

    fn present_target(&mut self, cx: &mut SessionContext<'_>) {
        let target = self.target();
        self.drop_token += 1;
        self.play.set_hint(cx, Some(target));
        cx.emit(SessionEvent::PracticeTargetChanged {
            target,
            repeats_remaining: self.repeats_remaining,
        });
        cx.speak(&target.to_string(), 1.0);
    }

    fn finish_flash(&mut self, cx: &mut SessionContext<'_>) {
        self.hit_flash = false;
        self.repeats_remaining = self.repeats_remaining.saturating_sub(1);
        if self.repeats_remaining == 0 {
            self.letter_index = (self.letter_index + 1) % self.sequence.len();
            self.roll_repeats();
            trace!(target = %self.target(), repeats = self.repeats_remaining, "next letter");
        }
        self.present_target(cx);
    }
}

impl TimerDriven for PracticeSession {
    fn on_timer(&mut self, cx: &mut SessionContext<'_>, fired: Fired) {
        match fired.kind {
            TimerKind::KeyClear => self.play.release_key(cx),
            TimerKind::GameOver => {
                self.hit_flash = false;
                self.play.end_game(cx);
            }
            _ if fired.generation != self.generation => {
                trace!(kind = ?fired.kind, "dropping stale practice timer");
            }
            TimerKind::WrongKeyClear => {
                if self.play.clear_wrong(cx) {
                    let target = self.target();
                    self.play.set_hint(cx, Some(target));
                }
            }
            TimerKind::PracticeFlash => self.finish_flash(cx),
            TimerKind::SpeakCompleted | TimerKind::Advance => {}
        }
    }

    fn on_narration_done(&mut self, _cx: &mut SessionContext<'_>, _id: RequestId) {}
}
