// pinyin-typing/src/orchestrator.rs
//
// Owns the collaborators and whichever session the chosen category needs.
// The host talks only to this type: it forwards buffers, navigation and the
// passage of time, then drains the resulting events.

use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info};

use typing_core::{
    ContentCategory, ContentSource, Config, Fired, GameState, Narrator, PlayState,
    PracticeSession, ProgressStore, RequestId, RewardSink, Scheduler, SessionContext,
    SessionEvent, TimerDriven,
};

use crate::session::TypingSession;
use crate::transcoder::PinyinTranscoder;

pub enum ActiveSession {
    Typing(TypingSession),
    Practice(PracticeSession),
}

impl ActiveSession {
    pub fn state(&self) -> GameState {
        match self {
            Self::Typing(s) => s.state(),
            Self::Practice(s) => s.state(),
        }
    }

    fn play(&self) -> &PlayState {
        match self {
            Self::Typing(s) => s.play(),
            Self::Practice(s) => s.play(),
        }
    }

    fn play_mut(&mut self) -> &mut PlayState {
        match self {
            Self::Typing(s) => s.play_mut(),
            Self::Practice(s) => s.play_mut(),
        }
    }

    fn handle_input(&mut self, cx: &mut SessionContext<'_>, raw: &str) {
        match self {
            Self::Typing(s) => s.handle_input(cx, raw),
            Self::Practice(s) => s.handle_input(cx, raw),
        }
    }

    fn stop(&mut self, cx: &mut SessionContext<'_>) {
        match self {
            Self::Typing(s) => s.stop(cx),
            Self::Practice(s) => s.stop(cx),
        }
    }

    fn pause(&mut self, cx: &mut SessionContext<'_>) -> bool {
        match self {
            Self::Typing(s) => s.pause(cx),
            Self::Practice(s) => s.pause(cx),
        }
    }

    fn resume(&mut self, cx: &mut SessionContext<'_>) -> bool {
        match self {
            Self::Typing(s) => s.resume(cx),
            Self::Practice(s) => s.resume(cx),
        }
    }
}

impl TimerDriven for ActiveSession {
    fn on_timer(&mut self, cx: &mut SessionContext<'_>, fired: Fired) {
        match self {
            Self::Typing(s) => s.on_timer(cx, fired),
            Self::Practice(s) => s.on_timer(cx, fired),
        }
    }

    fn on_narration_done(&mut self, cx: &mut SessionContext<'_>, id: RequestId) {
        match self {
            Self::Typing(s) => s.on_narration_done(cx, id),
            Self::Practice(s) => s.on_narration_done(cx, id),
        }
    }
}

pub struct SessionOrchestrator<C, N, R, P> {
    config: Config,
    content: C,
    narrator: N,
    rewards: R,
    progress: P,
    scheduler: Scheduler,
    events: Vec<SessionEvent>,
    transcoder: Rc<PinyinTranscoder>,
    active: Option<ActiveSession>,
    practice_seed: Option<u64>,
}

impl<C, N, R, P> SessionOrchestrator<C, N, R, P>
where
    C: ContentSource,
    N: Narrator,
    R: RewardSink,
    P: ProgressStore,
{
    pub fn new(config: Config, content: C, narrator: N, rewards: R, progress: P) -> Self {
        let transcoder = Rc::new(PinyinTranscoder::from_config(&config));
        Self {
            config,
            content,
            narrator,
            rewards,
            progress,
            scheduler: Scheduler::new(),
            events: Vec::new(),
            transcoder,
            active: None,
            practice_seed: None,
        }
    }

    /// Seed the letter drill's repeat counts (replays and tests).
    pub fn with_practice_seed(mut self, seed: u64) -> Self {
        self.practice_seed = Some(seed);
        self
    }

    fn split(&mut self) -> (SessionContext<'_>, Option<&mut ActiveSession>) {
        let cx = SessionContext {
            config: &self.config,
            narrator: &mut self.narrator,
            rewards: &mut self.rewards,
            progress: &mut self.progress,
            scheduler: &mut self.scheduler,
            events: &mut self.events,
        };
        (cx, self.active.as_mut())
    }

    /// Stop whatever runs and start `category`, resuming at its saved item.
    pub fn start(&mut self, category: ContentCategory) {
        self.stop();

        let mut session = if category.is_practice() {
            let practice = match self.practice_seed {
                Some(seed) => PracticeSession::with_seed(category, seed),
                None => PracticeSession::new(category),
            };
            ActiveSession::Practice(practice)
        } else {
            let items = self.content.items(category);
            ActiveSession::Typing(TypingSession::new(
                category,
                items,
                Rc::clone(&self.transcoder),
            ))
        };

        let (mut cx, _) = self.split();
        match &mut session {
            ActiveSession::Typing(s) => {
                let saved = cx.progress.load_progress(category);
                s.start(&mut cx, saved, true);
            }
            ActiveSession::Practice(s) => s.start(&mut cx),
        }
        info!(%category, "session started");
        self.active = Some(session);
    }

    pub fn stop(&mut self) {
        if let (mut cx, Some(session)) = self.split() {
            session.stop(&mut cx);
        }
    }

    pub fn pause(&mut self) -> bool {
        match self.split() {
            (mut cx, Some(session)) => session.pause(&mut cx),
            _ => false,
        }
    }

    pub fn resume(&mut self) -> bool {
        match self.split() {
            (mut cx, Some(session)) => session.resume(&mut cx),
            _ => false,
        }
    }

    /// Forward the host's whole input buffer.
    pub fn handle_input(&mut self, raw: &str) {
        if let (mut cx, Some(session)) = self.split() {
            session.handle_input(&mut cx, raw);
        }
    }

    pub fn next(&mut self) {
        if let (mut cx, Some(ActiveSession::Typing(s))) = self.split() {
            s.next(&mut cx);
        }
    }

    pub fn previous(&mut self) {
        if let (mut cx, Some(ActiveSession::Typing(s))) = self.split() {
            s.previous(&mut cx);
        }
    }

    /// Jump to item `index` (wrapping).
    pub fn jump(&mut self, index: usize, speak: bool) {
        if let (mut cx, Some(ActiveSession::Typing(s))) = self.split() {
            s.advance(&mut cx, index, speak);
        }
    }

    /// Let `elapsed` pass: deliver finished narration and due timers.
    pub fn tick(&mut self, elapsed: Duration) {
        match self.split() {
            (mut cx, Some(session)) => cx.tick(session, elapsed),
            (mut cx, None) => cx.scheduler.advance(elapsed),
        }
    }

    /// Buy one health point for `cost_per_health` coins.
    pub fn buy_health(&mut self) -> bool {
        let (mut cx, Some(session)) = self.split() else {
            return false;
        };
        if !cx.config.health_enabled()
            || session.state() == GameState::GameOver
            || session.play().health() >= cx.config.max_health
        {
            return false;
        }
        if !cx.rewards.try_spend(cx.config.cost_per_health) {
            return false;
        }
        let restored = session.play_mut().restore_health(&mut cx, 1);
        debug!(restored, health = session.play().health(), "health bought");
        restored
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn state(&self) -> GameState {
        self.active
            .as_ref()
            .map(ActiveSession::state)
            .unwrap_or_default()
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn typing(&self) -> Option<&TypingSession> {
        match &self.active {
            Some(ActiveSession::Typing(s)) => Some(s),
            _ => None,
        }
    }

    pub fn practice(&self) -> Option<&PracticeSession> {
        match &self.active {
            Some(ActiveSession::Practice(s)) => Some(s),
            _ => None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Session settings (delays, health, per-letter money, penalty) apply
    /// from the next keystroke or timer on. Bonus rules were copied into the
    /// reward sink when it was built; a `ScoreBoard` picks up edits through
    /// `set_rules(RewardRules::from_config(..))`.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn narrator(&self) -> &N {
        &self.narrator
    }

    pub fn narrator_mut(&mut self) -> &mut N {
        &mut self.narrator
    }

    pub fn rewards(&self) -> &R {
        &self.rewards
    }

    pub fn rewards_mut(&mut self) -> &mut R {
        &mut self.rewards
    }

    pub fn progress(&self) -> &P {
        &self.progress
    }

    pub fn content_mut(&mut self) -> &mut C {
        &mut self.content
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn transcoder(&self) -> &PinyinTranscoder {
        &self.transcoder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typing_core::testing::RecordingNarrator;
    use typing_core::{JsonContentSource, MemoryProgressStore, RewardRules, ScoreBoard, WordItem};

    type Orchestrator =
        SessionOrchestrator<JsonContentSource, RecordingNarrator, ScoreBoard, MemoryProgressStore>;

    fn orchestrator(config: Config) -> Orchestrator {
        let mut content = JsonContentSource::new();
        content.insert(
            ContentCategory::Easy,
            vec![
                WordItem::new("大", "da", "dà"),
                WordItem::new("小", "xiao", "xiǎo"),
                WordItem::new("人", "ren", "rén"),
            ],
        );
        let mut rules = RewardRules::from_config(&config);
        rules.random_reward_chance = 0.0;
        SessionOrchestrator::new(
            config,
            content,
            RecordingNarrator::new(),
            ScoreBoard::with_seed(rules, 1),
            MemoryProgressStore::new(),
        )
        .with_practice_seed(9)
    }

    #[test]
    fn test_start_picks_session_kind() {
        let mut o = orchestrator(Config::default());
        o.start(ContentCategory::Easy);
        assert!(o.typing().is_some());
        o.start(ContentCategory::HomeRow);
        assert!(o.practice().is_some());
        assert_eq!(o.practice().map(|p| p.target()), Some('a'));
    }

    #[test]
    fn test_previous_wraps_to_end() {
        let mut o = orchestrator(Config::default());
        o.start(ContentCategory::Easy);
        o.previous();
        assert_eq!(o.typing().map(|s| s.index()), Some(2));
        o.jump(7, false);
        assert_eq!(o.typing().map(|s| s.index()), Some(1));
    }

    #[test]
    fn test_buy_health() {
        let mut o = orchestrator(Config::default());
        o.start(ContentCategory::Easy);
        // Full health: nothing to buy
        o.rewards_mut().add_money(10.0);
        assert!(!o.buy_health());

        o.handle_input("x");
        assert_eq!(o.typing().map(|s| s.play().health()), Some(4));
        assert!(o.buy_health());
        assert_eq!(o.typing().map(|s| s.play().health()), Some(5));
        assert!((o.rewards().coins() - 5.0).abs() < 1e-9);

        o.handle_input("x");
        o.rewards_mut().apply_penalty(100.0);
        assert!(!o.buy_health());
    }

    #[test]
    fn test_tick_without_session_moves_clock() {
        let mut o = orchestrator(Config::default());
        o.tick(Duration::from_millis(300));
        assert_eq!(o.scheduler().now(), Duration::from_millis(300));
        assert_eq!(o.state(), GameState::Idle);
    }
}
