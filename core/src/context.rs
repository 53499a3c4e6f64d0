//! What a session borrows for the duration of one call.

use std::time::Duration;

use crate::event::SessionEvent;
use crate::scheduler::{Fired, Scheduler};
use crate::services::{Narrator, ProgressStore, RequestId, RewardSink};
use crate::Config;

/// Collaborators handed to a session operation.
///
/// Sessions own only their own state; everything they talk to is passed in
/// here, so the same session runs against real services or recorders.
pub struct SessionContext<'a> {
    pub config: &'a Config,
    pub narrator: &'a mut dyn Narrator,
    pub rewards: &'a mut dyn RewardSink,
    pub progress: &'a mut dyn ProgressStore,
    pub scheduler: &'a mut Scheduler,
    pub events: &'a mut Vec<SessionEvent>,
}

/// A session that reacts to its timers and to finished narration.
pub trait TimerDriven {
    fn on_timer(&mut self, cx: &mut SessionContext<'_>, fired: Fired);
    fn on_narration_done(&mut self, cx: &mut SessionContext<'_>, id: RequestId);
}

impl SessionContext<'_> {
    pub fn emit(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    /// Queue `text` for narration at `base_rate`, sped up for single
    /// characters.
    pub fn speak(&mut self, text: &str, base_rate: f32) -> RequestId {
        let rate = self.config.narration_rate(text, base_rate);
        self.narrator.speak(text, rate)
    }

    /// Let `elapsed` pass: the clock steps from deadline to deadline so a
    /// timer scheduled by a callback is measured from when that callback
    /// ran. Narration completions are delivered before each timer.
    pub fn tick<S: TimerDriven + ?Sized>(&mut self, session: &mut S, elapsed: Duration) {
        let target = self.scheduler.now() + elapsed;
        loop {
            for id in self.narrator.take_finished() {
                session.on_narration_done(self, id);
            }
            match self.scheduler.next_deadline() {
                Some(deadline) if deadline <= target => {
                    self.scheduler.advance_to(deadline);
                    if let Some(fired) = self.scheduler.pop_due() {
                        session.on_timer(self, fired);
                    }
                }
                _ => break,
            }
        }
        self.scheduler.advance_to(target);
    }
}
