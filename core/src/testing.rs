//! Recording collaborators for tests.
//!
//! Enabled for this crate's own tests and, through the `testing` feature,
//! for downstream crates' tests.

use std::collections::VecDeque;
use std::time::Duration;

use crate::context::{SessionContext, TimerDriven};
use crate::event::SessionEvent;
use crate::progress::MemoryProgressStore;
use crate::scheduler::Scheduler;
use crate::score::{RewardRules, ScoreBoard};
use crate::services::{Narrator, RequestId};
use crate::Config;

#[derive(Debug, Clone, PartialEq)]
pub struct Spoken {
    pub id: RequestId,
    pub text: String,
    pub rate: f32,
}

/// Narrator that records every request.
///
/// With `auto_finish` each request is reported finished on the next poll;
/// otherwise requests finish in order through `finish_next`.
#[derive(Debug)]
pub struct RecordingNarrator {
    pub spoken: Vec<Spoken>,
    pub stops: usize,
    auto_finish: bool,
    in_flight: VecDeque<RequestId>,
    finished: Vec<RequestId>,
    next_id: RequestId,
}

impl Default for RecordingNarrator {
    fn default() -> Self {
        Self {
            spoken: Vec::new(),
            stops: 0,
            auto_finish: true,
            in_flight: VecDeque::new(),
            finished: Vec::new(),
            next_id: 1,
        }
    }
}

impl RecordingNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests stay in flight until `finish_next` is called.
    pub fn manual() -> Self {
        Self {
            auto_finish: false,
            ..Self::default()
        }
    }

    pub fn texts(&self) -> Vec<&str> {
        self.spoken.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Finish the oldest in-flight request.
    pub fn finish_next(&mut self) -> Option<RequestId> {
        let id = self.in_flight.pop_front()?;
        self.finished.push(id);
        Some(id)
    }
}

impl Narrator for RecordingNarrator {
    fn speak(&mut self, text: &str, rate: f32) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        self.spoken.push(Spoken {
            id,
            text: text.to_string(),
            rate,
        });
        if self.auto_finish {
            self.finished.push(id);
        } else {
            self.in_flight.push_back(id);
        }
        id
    }

    fn stop(&mut self) {
        self.stops += 1;
        self.in_flight.clear();
        self.finished.clear();
    }

    fn take_finished(&mut self) -> Vec<RequestId> {
        std::mem::take(&mut self.finished)
    }
}

/// Owns one of every collaborator and lends them out as a `SessionContext`.
pub struct Harness {
    pub config: Config,
    pub narrator: RecordingNarrator,
    pub rewards: ScoreBoard,
    pub progress: MemoryProgressStore,
    pub scheduler: Scheduler,
    pub events: Vec<SessionEvent>,
}

impl Harness {
    /// Lucky drops are switched off so reward totals are deterministic.
    pub fn new(config: Config) -> Self {
        let mut rules = RewardRules::from_config(&config);
        rules.random_reward_chance = 0.0;
        Self {
            config,
            narrator: RecordingNarrator::new(),
            rewards: ScoreBoard::with_seed(rules, 0),
            progress: MemoryProgressStore::new(),
            scheduler: Scheduler::new(),
            events: Vec::new(),
        }
    }

    pub fn with_narrator(mut self, narrator: RecordingNarrator) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn cx(&mut self) -> SessionContext<'_> {
        SessionContext {
            config: &self.config,
            narrator: &mut self.narrator,
            rewards: &mut self.rewards,
            progress: &mut self.progress,
            scheduler: &mut self.scheduler,
            events: &mut self.events,
        }
    }

    /// Let `secs` of virtual time pass for `session`.
    pub fn tick<S: TimerDriven + ?Sized>(&mut self, session: &mut S, secs: f64) {
        self.cx().tick(session, Duration::from_secs_f64(secs));
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn spoken(&self) -> Vec<&str> {
        self.narrator.texts()
    }
}
