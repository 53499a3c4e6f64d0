// pinyin-typing/src/session.rs
//
// Typing session: one item at a time, validated keystroke by keystroke.
//
// The host passes the whole input buffer on every change. A shorter buffer
// is a deletion and is never judged. A longer one must extend what was
// already accepted; its new letters are checked one at a time against the
// target input and the first miss ends the burst, so a paste cannot skip
// over an error. `current_input` is always a prefix of the target input.
//
// Finishing a character's syllable speaks that character (except for
// one-character items, which are spoken whole once complete). Finishing the
// item speaks it, waits for the narration to end and the category's delay to
// pass, then advances. Item-bound timers carry a generation token that every
// advance, start and stop bumps.

use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use typing_core::{
    utils, ContentCategory, Fired, GameState, PlayState, RequestId, SessionContext, SessionEvent,
    TimerDriven, TimerKind, WordItem,
};

use crate::aligner::{self, AlignedLine};
use crate::breakpoints::PinyinBreakpointMap;
use crate::transcoder::PinyinTranscoder;
use crate::validator::InputValidator;

/// Per-item progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypingPhase {
    #[default]
    Idle,
    Inputting,
    /// Item typed in full; input is ignored until the advance
    WordComplete,
}

/// Narration speed follows typing speed.
#[derive(Debug, Clone, Copy)]
struct RateTracker {
    last_key: Option<Duration>,
    multiplier: f32,
}

impl Default for RateTracker {
    fn default() -> Self {
        Self {
            last_key: None,
            multiplier: 1.0,
        }
    }
}

impl RateTracker {
    fn record(&mut self, now: Duration) {
        if let Some(last) = self.last_key {
            let gap = now.saturating_sub(last);
            self.multiplier = if gap < Duration::from_millis(250) {
                1.5
            } else if gap < Duration::from_millis(450) {
                1.2
            } else {
                1.0
            };
        }
        self.last_key = Some(now);
    }
}

pub struct TypingSession {
    category: ContentCategory,
    items: Arc<[WordItem]>,
    validator: InputValidator,
    index: usize,
    current_input: String,
    target: Vec<char>,
    lines: Vec<AlignedLine>,
    breakpoints: PinyinBreakpointMap,
    last_completed_char: Option<usize>,
    phase: TypingPhase,
    play: PlayState,
    generation: u64,
    has_started_input: bool,
    has_spoken_item: bool,
    /// Narration of the completed item, after which the advance is scheduled
    awaiting_narration: Option<RequestId>,
    rate: RateTracker,
}

impl TypingSession {
    pub fn new(
        category: ContentCategory,
        items: Arc<[WordItem]>,
        transcoder: Rc<PinyinTranscoder>,
    ) -> Self {
        Self {
            category,
            items,
            validator: InputValidator::new(transcoder),
            index: 0,
            current_input: String::new(),
            target: Vec::new(),
            lines: Vec::new(),
            breakpoints: PinyinBreakpointMap::default(),
            last_completed_char: None,
            phase: TypingPhase::Idle,
            play: PlayState::new(),
            generation: 0,
            has_started_input: false,
            has_spoken_item: false,
            awaiting_narration: None,
            rate: RateTracker::default(),
        }
    }

    pub fn category(&self) -> ContentCategory {
        self.category
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn current_item(&self) -> Option<&WordItem> {
        self.items.get(self.index)
    }

    pub fn current_input(&self) -> &str {
        &self.current_input
    }

    pub fn target_input(&self) -> String {
        self.target.iter().collect()
    }

    pub fn lines(&self) -> &[AlignedLine] {
        &self.lines
    }

    /// Line the cursor is on, for renderers.
    pub fn active_line(&self) -> Option<usize> {
        aligner::active_line(&self.lines, self.current_input.len())
    }

    pub fn breakpoints(&self) -> &PinyinBreakpointMap {
        &self.breakpoints
    }

    pub fn last_completed_char(&self) -> Option<usize> {
        self.last_completed_char
    }

    pub fn phase(&self) -> TypingPhase {
        self.phase
    }

    pub fn is_wrong(&self) -> bool {
        self.play.feedback().is_wrong
    }

    pub fn hint(&self) -> Option<char> {
        self.play.hint()
    }

    pub fn state(&self) -> GameState {
        self.play.state()
    }

    pub fn play(&self) -> &PlayState {
        &self.play
    }

    pub fn play_mut(&mut self) -> &mut PlayState {
        &mut self.play
    }

    pub fn validator(&self) -> &InputValidator {
        &self.validator
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Begin playing at `index` (clamped into range). With `announce` the
    /// item is spoken straight away; otherwise the first keystroke speaks it.
    pub fn start(&mut self, cx: &mut SessionContext<'_>, index: usize, announce: bool) {
        self.generation += 1;
        cx.scheduler.cancel_all();
        self.awaiting_narration = None;
        self.has_started_input = false;
        self.has_spoken_item = false;
        self.rate = RateTracker::default();
        self.play.begin(cx);

        if self.items.is_empty() {
            debug!(category = %self.category, "no items, nothing to type");
            self.phase = TypingPhase::Idle;
            return;
        }
        self.index = index.min(self.items.len() - 1);
        debug!(category = %self.category, index = self.index, items = self.items.len(), "typing session started");
        self.load_item(cx);
        if announce {
            self.speak_item(cx);
        }
    }

    /// Cancel everything pending, save progress and go idle.
    pub fn stop(&mut self, cx: &mut SessionContext<'_>) {
        self.generation += 1;
        cx.narrator.stop();
        cx.scheduler.cancel_all();
        self.awaiting_narration = None;
        if self.play.state() != GameState::Idle && !self.items.is_empty() {
            cx.progress.save_progress(self.category, self.index);
        }
        self.phase = TypingPhase::Idle;
        self.play.halt(cx);
        debug!(category = %self.category, index = self.index, "typing session stopped");
    }

    pub fn pause(&mut self, cx: &mut SessionContext<'_>) -> bool {
        self.play.pause(cx)
    }

    pub fn resume(&mut self, cx: &mut SessionContext<'_>) -> bool {
        self.play.resume(cx)
    }

    /// React to the host's full input buffer.
    pub fn handle_input(&mut self, cx: &mut SessionContext<'_>, raw: &str) {
        if !self.play.is_playing() || self.items.is_empty() {
            return;
        }

        if !self.has_started_input {
            self.has_started_input = true;
            cx.narrator.stop();
            if !self.has_spoken_item {
                self.speak_item(cx);
            }
        }

        if self.phase == TypingPhase::WordComplete {
            return;
        }

        let cleaned = self.validator.clean_input(raw);
        if cleaned != raw {
            cx.emit(SessionEvent::BufferRewritten(cleaned));
            return;
        }

        let accepted = self.current_input.len();
        if cleaned.len() < accepted {
            self.delete_to(cx, &cleaned);
        } else if cleaned.len() > accepted && cleaned.starts_with(self.current_input.as_str()) {
            for key in cleaned[accepted..].chars() {
                if !self.validate_key(cx, key) || self.phase == TypingPhase::WordComplete {
                    break;
                }
            }
        }

        if self.current_input != cleaned {
            cx.emit(SessionEvent::BufferRewritten(self.current_input.clone()));
        }
    }

    /// Shrink to the longest common prefix of the old input and `buffer`.
    fn delete_to(&mut self, cx: &mut SessionContext<'_>, buffer: &str) {
        let keep = self
            .current_input
            .bytes()
            .zip(buffer.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        self.current_input.truncate(keep);
        cx.emit(SessionEvent::InputChanged);
        self.update_hint(cx);
    }

    fn validate_key(&mut self, cx: &mut SessionContext<'_>, key: char) -> bool {
        let position = self.current_input.len();
        self.play.press_key(cx, key);

        if self.target.get(position) != Some(&key) {
            trace!(%key, position, "wrong key");
            self.play.penalize(cx, key, position, self.generation);
            return false;
        }

        self.rate.record(cx.scheduler.now());
        self.play.reward_correct(cx, key, position);
        self.current_input.push(key);
        cx.emit(SessionEvent::InputChanged);
        self.check_char_completion(cx);

        if self.current_input.len() == self.target.len() {
            self.complete_word(cx);
        } else {
            self.update_hint(cx);
        }
        true
    }

    fn check_char_completion(&mut self, cx: &mut SessionContext<'_>) {
        let Some(char_index) = self.breakpoints.get(self.current_input.len()) else {
            return;
        };
        if self.last_completed_char.is_some_and(|last| char_index <= last) {
            return;
        }
        self.last_completed_char = Some(char_index);

        let item = &self.items[self.index];
        let ch = item.character.chars().nth(char_index);
        cx.emit(SessionEvent::CharacterCompleted {
            char_index,
            text: ch.map(String::from).unwrap_or_default(),
        });

        // A one-character item is spoken whole on completion instead
        if item.char_count() == 1 {
            return;
        }
        if char_index == 0 {
            cx.narrator.stop();
        }
        if let Some(ch) = ch {
            cx.speak(&ch.to_string(), self.rate.multiplier);
        }
    }

    fn complete_word(&mut self, cx: &mut SessionContext<'_>) {
        let combo_bonus = (cx.rewards.combo() / 5 * 2).min(20);
        cx.rewards.add_score(10 + i64::from(combo_bonus));
        self.phase = TypingPhase::WordComplete;
        self.play.feedback_mut().success = true;
        self.play.set_hint(cx, None);
        cx.emit(SessionEvent::WordCompleted { index: self.index });
        debug!(index = self.index, combo = cx.rewards.combo(), "item complete");

        let delay = utils::secs(cx.config.delay_before_speak);
        if delay.is_zero() {
            self.speak_completed(cx);
        } else {
            cx.scheduler
                .schedule(TimerKind::SpeakCompleted, delay, self.generation);
        }
    }

    fn speak_completed(&mut self, cx: &mut SessionContext<'_>) {
        let text = self.items[self.index].spoken_text().to_string();
        if text.is_empty() {
            self.schedule_advance(cx);
            return;
        }
        self.awaiting_narration = Some(cx.speak(&text, 1.0));
    }

    fn schedule_advance(&mut self, cx: &mut SessionContext<'_>) {
        let delay = cx.config.post_completion_delay(self.category);
        cx.scheduler
            .schedule(TimerKind::Advance, delay, self.generation);
    }

    /// Move to item `to` (wrapping), saving progress for the item left.
    pub fn advance(&mut self, cx: &mut SessionContext<'_>, to: usize, speak: bool) {
        if self.items.is_empty() {
            return;
        }
        cx.narrator.stop();
        cx.progress.save_progress(self.category, self.index);
        self.generation += 1;
        for kind in [
            TimerKind::SpeakCompleted,
            TimerKind::Advance,
            TimerKind::WrongKeyClear,
        ] {
            cx.scheduler.cancel(kind);
        }
        self.awaiting_narration = None;
        self.index = to % self.items.len();
        debug!(index = self.index, generation = self.generation, "advance");
        self.load_item(cx);
        if speak {
            self.speak_item(cx);
        }
    }

    pub fn next(&mut self, cx: &mut SessionContext<'_>) {
        self.advance(cx, self.index + 1, true);
    }

    pub fn previous(&mut self, cx: &mut SessionContext<'_>) {
        if self.items.is_empty() {
            return;
        }
        let to = self.index.checked_sub(1).unwrap_or(self.items.len() - 1);
        self.advance(cx, to, true);
    }

    fn load_item(&mut self, cx: &mut SessionContext<'_>) {
        let item = &self.items[self.index];
        self.target = self.validator.target_input(item).chars().collect();
        self.lines = aligner::align(
            self.validator.transcoder(),
            &item.character,
            &item.display_pinyin,
        );
        self.breakpoints =
            PinyinBreakpointMap::build(&self.lines, self.target.len(), item.char_count());
        self.current_input.clear();
        self.last_completed_char = None;
        self.phase = TypingPhase::Inputting;
        self.play.feedback_mut().reset();

        cx.emit(SessionEvent::ItemChanged { index: self.index });
        cx.emit(SessionEvent::InputChanged);
        cx.emit(SessionEvent::BufferRewritten(String::new()));
        self.update_hint(cx);
    }

    fn speak_item(&mut self, cx: &mut SessionContext<'_>) {
        self.has_spoken_item = true;
        let text = self.items[self.index].spoken_text().to_string();
        if !text.is_empty() {
            cx.speak(&text, 1.0);
        }
    }

    fn update_hint(&mut self, cx: &mut SessionContext<'_>) {
        let hint = match self.phase {
            TypingPhase::Inputting => self.target.get(self.current_input.len()).copied(),
            _ => None,
        };
        self.play.set_hint(cx, hint);
    }
}

impl TimerDriven for TypingSession {
    fn on_timer(&mut self, cx: &mut SessionContext<'_>, fired: Fired) {
        match fired.kind {
            TimerKind::KeyClear => self.play.release_key(cx),
            TimerKind::GameOver => {
                if self.play.end_game(cx) {
                    self.generation += 1;
                    self.awaiting_narration = None;
                    cx.progress.save_progress(self.category, self.index);
                    debug!(index = self.index, "game over");
                }
            }
            _ if fired.generation != self.generation => {
                trace!(kind = ?fired.kind, stale = fired.generation, current = self.generation, "dropping stale timer");
            }
            TimerKind::WrongKeyClear => {
                if self.play.clear_wrong(cx) {
                    self.update_hint(cx);
                }
            }
            TimerKind::SpeakCompleted => {
                if self.phase == TypingPhase::WordComplete {
                    self.speak_completed(cx);
                }
            }
            TimerKind::Advance => {
                if self.phase == TypingPhase::WordComplete {
                    self.advance(cx, self.index + 1, true);
                }
            }
            TimerKind::PracticeFlash => {}
        }
    }

    fn on_narration_done(&mut self, cx: &mut SessionContext<'_>, id: RequestId) {
        if self.phase == TypingPhase::WordComplete && self.awaiting_narration == Some(id) {
            self.awaiting_narration = None;
            self.schedule_advance(cx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typing_core::testing::Harness;
    use typing_core::{Config, RewardSink};

    fn session(items: Vec<WordItem>) -> TypingSession {
        TypingSession::new(
            ContentCategory::Easy,
            items.into(),
            Rc::new(PinyinTranscoder::new()),
        )
    }

    fn nihao() -> Vec<WordItem> {
        vec![WordItem::new("你好", "nihao", "nǐ hǎo")]
    }

    #[test]
    fn test_start_builds_item_state() {
        let mut h = Harness::new(Config::default());
        let mut s = session(nihao());
        s.start(&mut h.cx(), 0, true);
        assert_eq!(s.target_input(), "nihao");
        assert_eq!(s.hint(), Some('n'));
        assert_eq!(s.phase(), TypingPhase::Inputting);
        assert_eq!(s.breakpoints().last_key(), Some(5));
        assert_eq!(h.spoken(), vec!["你好"]);
    }

    #[test]
    fn test_equal_length_edit_snaps_back() {
        let mut h = Harness::new(Config::default());
        let mut s = session(nihao());
        s.start(&mut h.cx(), 0, false);
        s.handle_input(&mut h.cx(), "ni");
        h.take_events();
        s.handle_input(&mut h.cx(), "nx");
        assert_eq!(s.current_input(), "ni");
        assert_eq!(h.events, vec![SessionEvent::BufferRewritten("ni".into())]);
    }

    #[test]
    fn test_non_prefix_extension_is_discarded() {
        let mut h = Harness::new(Config::default());
        let mut s = session(nihao());
        s.start(&mut h.cx(), 0, false);
        s.handle_input(&mut h.cx(), "ni");
        s.handle_input(&mut h.cx(), "xnih");
        assert_eq!(s.current_input(), "ni");
        assert_eq!(s.play().health(), 5);
    }

    #[test]
    fn test_deletion_truncates_to_common_prefix() {
        let mut h = Harness::new(Config::default());
        let mut s = session(nihao());
        s.start(&mut h.cx(), 0, false);
        s.handle_input(&mut h.cx(), "niha");
        s.handle_input(&mut h.cx(), "nx");
        assert_eq!(s.current_input(), "n");
        assert_eq!(s.hint(), Some('i'));
        assert_eq!(h.events.last(), Some(&SessionEvent::BufferRewritten("n".into())));
    }

    #[test]
    fn test_burst_stops_at_completion() {
        let mut h = Harness::new(Config::default());
        let mut s = session(vec![WordItem::new("", "a", "a"), WordItem::new("", "b", "b")]);
        s.start(&mut h.cx(), 0, false);
        s.handle_input(&mut h.cx(), "ab");
        // The extra letter is neither judged nor carried into the next item
        assert_eq!(s.current_input(), "a");
        assert_eq!(s.phase(), TypingPhase::WordComplete);
        assert_eq!(s.play().health(), 5);
        assert_eq!(h.events.last(), Some(&SessionEvent::BufferRewritten("a".into())));
    }

    #[test]
    fn test_input_past_target_is_wrong() {
        let mut h = Harness::new(Config::default());
        let mut s = session(vec![WordItem::new("", "", "")]);
        s.start(&mut h.cx(), 0, false);
        s.handle_input(&mut h.cx(), "a");
        assert_eq!(s.current_input(), "");
        assert!(s.is_wrong());
        assert_eq!(s.play().health(), 4);
    }

    #[test]
    fn test_rate_tracker_thresholds() {
        let mut r = RateTracker::default();
        r.record(Duration::from_millis(0));
        assert_eq!(r.multiplier, 1.0);
        r.record(Duration::from_millis(100));
        assert_eq!(r.multiplier, 1.5);
        r.record(Duration::from_millis(400));
        assert_eq!(r.multiplier, 1.2);
        r.record(Duration::from_millis(1000));
        assert_eq!(r.multiplier, 1.0);
    }

    #[test]
    fn test_completion_score_includes_combo_bonus() {
        let mut h = Harness::new(Config::default());
        let mut s = session(nihao());
        s.start(&mut h.cx(), 0, false);
        s.handle_input(&mut h.cx(), "nihao");
        // combo 5 -> bonus 2
        assert_eq!(h.rewards.combo(), 5);
        assert_eq!(h.rewards.score(), 12);
    }

    #[test]
    fn test_pause_ignores_input() {
        let mut h = Harness::new(Config::default());
        let mut s = session(nihao());
        s.start(&mut h.cx(), 0, false);
        assert!(s.pause(&mut h.cx()));
        s.handle_input(&mut h.cx(), "n");
        assert_eq!(s.current_input(), "");
        assert!(s.resume(&mut h.cx()));
        s.handle_input(&mut h.cx(), "n");
        assert_eq!(s.current_input(), "n");
    }

    #[test]
    fn test_first_input_speaks_unannounced_item() {
        let mut h = Harness::new(Config::default());
        let mut s = session(nihao());
        s.start(&mut h.cx(), 0, false);
        assert!(h.spoken().is_empty());
        s.handle_input(&mut h.cx(), "n");
        assert_eq!(h.spoken(), vec!["你好"]);
        s.handle_input(&mut h.cx(), "ni");
        assert_eq!(h.spoken(), vec!["你好", "你"]);
    }
}
