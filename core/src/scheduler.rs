//! Named single-shot timers on a virtual clock.
//!
//! Each `TimerKind` has at most one pending timer; scheduling a kind again
//! replaces it. Timers carry the generation token of the session state they
//! were scheduled for, and the session drops any that fire for an older
//! generation. The host advances the clock and drains due timers in
//! deadline order, so every callback runs as one atomic step.

use std::time::Duration;

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Clear the pressed-key highlight
    KeyClear,
    /// Clear the wrong flag and restore the hint
    WrongKeyClear,
    /// Speak a completed item
    SpeakCompleted,
    /// Move on to the next item
    Advance,
    /// Health ran out
    GameOver,
    /// End of the practice hit flash
    PracticeFlash,
}

impl TimerKind {
    const COUNT: usize = 6;

    fn slot(self) -> usize {
        match self {
            Self::KeyClear => 0,
            Self::WrongKeyClear => 1,
            Self::SpeakCompleted => 2,
            Self::Advance => 3,
            Self::GameOver => 4,
            Self::PracticeFlash => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    deadline: Duration,
    generation: u64,
    /// Insertion order breaks deadline ties
    seq: u64,
}

/// A timer that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub kind: TimerKind,
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    slots: [Option<Pending>; TimerKind::COUNT],
    seq: u64,
}

const KINDS: [TimerKind; TimerKind::COUNT] = [
    TimerKind::KeyClear,
    TimerKind::WrongKeyClear,
    TimerKind::SpeakCompleted,
    TimerKind::Advance,
    TimerKind::GameOver,
    TimerKind::PracticeFlash,
];

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Arm `kind` to fire `delay` from now, replacing any pending one.
    pub fn schedule(&mut self, kind: TimerKind, delay: Duration, generation: u64) {
        self.seq += 1;
        self.slots[kind.slot()] = Some(Pending {
            deadline: self.now + delay,
            generation,
            seq: self.seq,
        });
        trace!(?kind, ?delay, generation, "timer scheduled");
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.slots[kind.slot()] = None;
    }

    pub fn cancel_all(&mut self) {
        self.slots = [None; TimerKind::COUNT];
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.slots[kind.slot()].is_some()
    }

    /// Time left until `kind` fires.
    pub fn remaining(&self, kind: TimerKind) -> Option<Duration> {
        self.slots[kind.slot()].map(|p| p.deadline.saturating_sub(self.now))
    }

    /// Move the clock forward.
    pub fn advance(&mut self, elapsed: Duration) {
        self.now += elapsed;
    }

    /// Move the clock to `instant`. The clock never runs backwards.
    pub fn advance_to(&mut self, instant: Duration) {
        self.now = self.now.max(instant);
    }

    /// Remove and return the earliest timer that is due, if any.
    pub fn pop_due(&mut self) -> Option<Fired> {
        let now = self.now;
        let (kind, pending) = KINDS
            .iter()
            .filter_map(|&kind| self.slots[kind.slot()].map(|p| (kind, p)))
            .filter(|(_, p)| p.deadline <= now)
            .min_by_key(|(_, p)| (p.deadline, p.seq))?;
        self.slots[kind.slot()] = None;
        Some(Fired {
            kind,
            generation: pending.generation,
        })
    }

    /// Deadline of the next pending timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.slots.iter().flatten().map(|p| p.deadline).min()
    }
}
