//! Game state, health and keyboard feedback shared by every session kind.
//!
//! `PlayState` holds the pieces both the typing session and the letter
//! drill mutate in the same way: the game state machine, health, the
//! pressed/wrong key flags and the finger hint. Correct and wrong input
//! side effects live here so both sessions reward and penalize alike.

use tracing::debug;

use crate::context::SessionContext;
use crate::event::SessionEvent;
use crate::scheduler::TimerKind;
use crate::utils;
use crate::Config;

/// `Idle -> Playing <-> Paused -> GameOver`. `GameOver` is terminal until
/// the next start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameState {
    #[default]
    Idle,
    Playing,
    Paused,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthChange {
    /// Health is disabled or nothing was taken
    Unchanged,
    Reduced { remaining: u32 },
    Depleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Health {
    current: u32,
}

impl Health {
    pub fn full(config: &Config) -> Self {
        Self {
            current: config.max_health,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn reset(&mut self, config: &Config) {
        self.current = config.max_health;
    }

    pub fn reduce(&mut self, amount: u32, config: &Config) -> HealthChange {
        if !config.health_enabled() || amount == 0 {
            return HealthChange::Unchanged;
        }
        self.current = self.current.saturating_sub(amount);
        if self.current == 0 {
            HealthChange::Depleted
        } else {
            HealthChange::Reduced {
                remaining: self.current,
            }
        }
    }

    /// Add health up to `max`. False when already full.
    pub fn increase(&mut self, amount: u32, max: u32) -> bool {
        if self.current >= max {
            return false;
        }
        self.current = (self.current + amount).min(max);
        true
    }
}

/// Transient keyboard feedback for the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputFeedback {
    pub last_pressed_key: Option<char>,
    pub last_wrong_key: Option<char>,
    /// Bumped on every validated key
    pub press_count: u64,
    /// Bumped on every wrong key
    pub shake_count: u64,
    pub is_wrong: bool,
    pub damage_flash: bool,
    /// Set while a completed item waits to advance
    pub success: bool,
}

impl InputFeedback {
    pub fn press(&mut self, key: char) {
        self.last_pressed_key = Some(key);
        self.press_count += 1;
    }

    pub fn mark_wrong(&mut self, key: char) {
        self.is_wrong = true;
        self.last_wrong_key = Some(key);
        self.shake_count += 1;
    }

    pub fn clear_wrong(&mut self) {
        self.is_wrong = false;
        self.last_wrong_key = None;
        self.damage_flash = false;
    }

    /// Drop the per-item flags. Counters keep running.
    pub fn reset(&mut self) {
        self.last_pressed_key = None;
        self.clear_wrong();
        self.success = false;
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayState {
    state: GameState,
    health: Health,
    feedback: InputFeedback,
    hint: Option<char>,
}

impl PlayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == GameState::Playing
    }

    pub fn health(&self) -> u32 {
        self.health.current()
    }

    pub fn feedback(&self) -> &InputFeedback {
        &self.feedback
    }

    pub fn feedback_mut(&mut self) -> &mut InputFeedback {
        &mut self.feedback
    }

    pub fn hint(&self) -> Option<char> {
        self.hint
    }

    /// Fresh game: full health, clean flags, `Playing`.
    pub fn begin(&mut self, cx: &mut SessionContext<'_>) {
        self.health.reset(cx.config);
        self.feedback.reset();
        cx.emit(SessionEvent::HealthChanged {
            health: self.health.current(),
        });
        self.set_state(cx, GameState::Playing);
    }

    /// Back to `Idle`, clearing the per-item flags and hint.
    pub fn halt(&mut self, cx: &mut SessionContext<'_>) {
        self.feedback.reset();
        self.set_hint(cx, None);
        self.set_state(cx, GameState::Idle);
    }

    pub fn set_state(&mut self, cx: &mut SessionContext<'_>, state: GameState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "game state");
            self.state = state;
            cx.emit(SessionEvent::GameStateChanged(state));
        }
    }

    pub fn pause(&mut self, cx: &mut SessionContext<'_>) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        self.set_state(cx, GameState::Paused);
        true
    }

    pub fn resume(&mut self, cx: &mut SessionContext<'_>) -> bool {
        if self.state != GameState::Paused {
            return false;
        }
        self.set_state(cx, GameState::Playing);
        true
    }

    pub fn set_hint(&mut self, cx: &mut SessionContext<'_>, hint: Option<char>) {
        if self.hint != hint {
            self.hint = hint;
            cx.emit(SessionEvent::HintChanged { hint });
        }
    }

    /// Highlight `key` until the key-clear timer fires.
    pub fn press_key(&mut self, cx: &mut SessionContext<'_>, key: char) {
        self.feedback.press(key);
        cx.scheduler
            .schedule(TimerKind::KeyClear, utils::secs(cx.config.key_clear_delay), 0);
        cx.emit(SessionEvent::KeyPressed { key });
    }

    pub fn release_key(&mut self, cx: &mut SessionContext<'_>) {
        if self.feedback.last_pressed_key.take().is_some() {
            cx.emit(SessionEvent::KeyReleased);
        }
    }

    /// Money, combo, letter count and the lucky-drop roll for one correct key.
    pub fn reward_correct(&mut self, cx: &mut SessionContext<'_>, key: char, position: usize) {
        let money = cx.config.money_per_letter;
        if money > 0.0 {
            cx.rewards.add_money(money);
        }
        cx.rewards.increment_combo();
        cx.rewards.record_correct_letter();
        cx.rewards.check_lucky_drop();
        cx.emit(SessionEvent::CorrectKey { key, position });
    }

    /// Wrong-key path: flag, combo reset, coin penalty, health loss and the
    /// timers that clear the flag or end the game.
    pub fn penalize(
        &mut self,
        cx: &mut SessionContext<'_>,
        key: char,
        position: usize,
        generation: u64,
    ) {
        self.feedback.mark_wrong(key);
        cx.emit(SessionEvent::WrongKey { key, position });
        cx.rewards.reset_combo();
        cx.rewards.apply_penalty(cx.config.penalty_per_error);

        match self.health.reduce(cx.config.health_per_error, cx.config) {
            HealthChange::Unchanged => {}
            HealthChange::Reduced { remaining } => {
                self.feedback.damage_flash = true;
                cx.emit(SessionEvent::HealthChanged { health: remaining });
                if remaining <= 2 {
                    cx.emit(SessionEvent::LowHealth { health: remaining });
                }
            }
            HealthChange::Depleted => {
                self.feedback.damage_flash = true;
                cx.emit(SessionEvent::HealthChanged { health: 0 });
                if !cx.scheduler.is_pending(TimerKind::GameOver) {
                    debug!("health depleted, game over pending");
                    cx.scheduler.schedule(
                        TimerKind::GameOver,
                        utils::secs(cx.config.game_over_delay),
                        generation,
                    );
                }
            }
        }

        cx.scheduler.schedule(
            TimerKind::WrongKeyClear,
            utils::secs(cx.config.wrong_key_clear_delay),
            generation,
        );
    }

    /// Wrong-key timer expiry. Returns false when there was nothing to clear.
    pub fn clear_wrong(&mut self, cx: &mut SessionContext<'_>) -> bool {
        if !self.feedback.is_wrong {
            return false;
        }
        self.feedback.clear_wrong();
        cx.emit(SessionEvent::WrongCleared);
        true
    }

    /// Game-over timer expiry: stop narration and every pending timer.
    pub fn end_game(&mut self, cx: &mut SessionContext<'_>) -> bool {
        if !matches!(self.state, GameState::Playing | GameState::Paused) {
            return false;
        }
        cx.narrator.stop();
        cx.scheduler.cancel_all();
        self.set_state(cx, GameState::GameOver);
        true
    }

    /// Give back health, capped at the configured maximum. Reviving from
    /// zero calls off a pending game over.
    pub fn restore_health(&mut self, cx: &mut SessionContext<'_>, amount: u32) -> bool {
        let revived = self.health.current() == 0;
        if !cx.config.health_enabled() || !self.health.increase(amount, cx.config.max_health) {
            return false;
        }
        if revived && cx.scheduler.is_pending(TimerKind::GameOver) {
            cx.scheduler.cancel(TimerKind::GameOver);
            debug!("health restored, game over called off");
        }
        cx.emit(SessionEvent::HealthChanged {
            health: self.health.current(),
        });
        true
    }
}
