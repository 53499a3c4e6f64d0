//! Collaborator seams.
//!
//! The sessions drive these traits but own none of their internals: how
//! narration is synthesized, how rewards are randomized or animated, and
//! where progress lands on disk all live behind them.

use crate::content::ContentCategory;

/// Identifier handed out for each narration request.
pub type RequestId = u64;

/// Serialized text-to-speech queue.
///
/// Requests play one at a time in submission order. Completion is polled
/// rather than called back so that sessions stay single-owner; a request
/// that fails to play must still be reported as finished. After `stop()`
/// none of the requests issued before it are ever reported.
pub trait Narrator {
    fn speak(&mut self, text: &str, rate: f32) -> RequestId;
    fn stop(&mut self);
    /// Requests that finished since the last call, in completion order.
    fn take_finished(&mut self) -> Vec<RequestId>;
}

/// Score/economy sink.
pub trait RewardSink {
    fn add_score(&mut self, amount: i64);
    fn add_money(&mut self, amount: f64);
    fn apply_penalty(&mut self, amount: f64);
    fn increment_combo(&mut self);
    fn reset_combo(&mut self);
    fn combo(&self) -> u32;
    /// One more correctly typed letter (drives milestone rewards).
    fn record_correct_letter(&mut self);
    /// Roll for a random bonus; true when one was granted.
    fn check_lucky_drop(&mut self) -> bool;
    fn coins(&self) -> f64;
    /// Spend coins if the balance covers `amount`.
    fn try_spend(&mut self, amount: f64) -> bool;
}

/// Per-category "last item index" checkpoint.
pub trait ProgressStore {
    fn save_progress(&mut self, category: ContentCategory, index: usize);
    /// Saved index, or 0 when nothing was saved.
    fn load_progress(&self, category: ContentCategory) -> usize;
}
