//! In-memory score board: score, coins, combo and the bonus rules.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::services::RewardSink;
use crate::Config;

/// Reward knobs copied out of `Config` when the board is built.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardRules {
    pub combo_bonus_threshold: u32,
    pub combo_bonus_money: f64,
    pub random_reward_chance: f64,
    pub random_reward_min: f64,
    pub random_reward_max: f64,
    pub milestone_letter_count: u32,
    pub milestone_bonus_money: f64,
}

impl RewardRules {
    pub fn from_config(config: &Config) -> Self {
        Self {
            combo_bonus_threshold: config.combo_bonus_threshold,
            combo_bonus_money: config.combo_bonus_money,
            random_reward_chance: config.random_reward_chance,
            random_reward_min: config.random_reward_min,
            random_reward_max: config.random_reward_max,
            milestone_letter_count: config.milestone_letter_count,
            milestone_bonus_money: config.milestone_bonus_money,
        }
    }
}

impl Default for RewardRules {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardKind {
    Combo,
    Milestone,
    Lucky,
}

/// A bonus granted on top of the per-letter money.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reward {
    pub kind: RewardKind,
    pub amount: f64,
}

#[derive(Debug)]
pub struct ScoreBoard {
    rules: RewardRules,
    score: i64,
    coins: f64,
    combo: u32,
    max_combo: u32,
    correct_letters: u64,
    rewards: Vec<Reward>,
    rng: SmallRng,
}

impl ScoreBoard {
    pub fn new(rules: RewardRules) -> Self {
        Self::with_rng(rules, SmallRng::from_os_rng())
    }

    /// Deterministic board for replays and tests.
    pub fn with_seed(rules: RewardRules, seed: u64) -> Self {
        Self::with_rng(rules, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rules: RewardRules, rng: SmallRng) -> Self {
        Self {
            rules,
            score: 0,
            coins: 0.0,
            combo: 0,
            max_combo: 0,
            correct_letters: 0,
            rewards: Vec::new(),
            rng,
        }
    }

    pub fn rules(&self) -> &RewardRules {
        &self.rules
    }

    pub fn set_rules(&mut self, rules: RewardRules) {
        self.rules = rules;
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    pub fn correct_letters(&self) -> u64 {
        self.correct_letters
    }

    /// Title shown for the current score.
    pub fn rank_title(&self) -> &'static str {
        match self.score {
            s if s < 100 => "拼音小萌新",
            s if s < 300 => "拼音小能手",
            s if s < 600 => "拼音大达人",
            s if s < 1000 => "拼音大宗师",
            _ => "拼音传说",
        }
    }

    /// Bonuses granted since the last call.
    pub fn take_rewards(&mut self) -> Vec<Reward> {
        std::mem::take(&mut self.rewards)
    }

    /// Clear score, coins and combo. The max combo is kept.
    pub fn reset(&mut self) {
        self.score = 0;
        self.coins = 0.0;
        self.combo = 0;
        self.rewards.clear();
    }

    fn grant(&mut self, kind: RewardKind, amount: f64) {
        self.add_money(amount);
        self.rewards.push(Reward { kind, amount });
        debug!(?kind, amount, coins = self.coins, "reward granted");
    }
}

impl RewardSink for ScoreBoard {
    fn add_score(&mut self, amount: i64) {
        self.score += amount;
    }

    fn add_money(&mut self, amount: f64) {
        if amount > 0.0 {
            self.coins += amount;
        }
    }

    fn apply_penalty(&mut self, amount: f64) {
        if amount > 0.0 {
            self.coins = (self.coins - amount).max(0.0);
        }
    }

    fn increment_combo(&mut self) {
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
        let threshold = self.rules.combo_bonus_threshold;
        if threshold > 0 && self.combo % threshold == 0 {
            self.grant(RewardKind::Combo, self.rules.combo_bonus_money);
        }
    }

    fn reset_combo(&mut self) {
        self.combo = 0;
    }

    fn combo(&self) -> u32 {
        self.combo
    }

    fn record_correct_letter(&mut self) {
        self.correct_letters += 1;
        let milestone = u64::from(self.rules.milestone_letter_count);
        if milestone > 0 && self.correct_letters % milestone == 0 {
            self.grant(RewardKind::Milestone, self.rules.milestone_bonus_money);
        }
    }

    fn check_lucky_drop(&mut self) -> bool {
        let chance = self.rules.random_reward_chance.clamp(0.0, 1.0);
        if chance <= 0.0 || !self.rng.random_bool(chance) {
            return false;
        }
        let (lo, hi) = (self.rules.random_reward_min, self.rules.random_reward_max);
        let amount = if lo < hi {
            self.rng.random_range(lo..=hi)
        } else {
            lo
        };
        self.grant(RewardKind::Lucky, amount);
        true
    }

    fn coins(&self) -> f64 {
        self.coins
    }

    fn try_spend(&mut self, amount: f64) -> bool {
        if amount < 0.0 || self.coins < amount {
            return false;
        }
        self.coins -= amount;
        true
    }
}
