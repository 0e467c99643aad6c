// Simulated opponent answering behaviour.
//
// A policy plans each bot's answer for a question up front; the battle then
// locks the plan in once the countdown reaches the planned time. Plans never
// look at what the human has done.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::{
    BOT_BONUS_JITTER_MAX, BOT_CORRECT_PROBABILITY, BOT_THINK_MAX_PERCENT, BOT_THINK_MIN_PERCENT,
};
use super::question::Question;

/// A bot's decision for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotPlan {
    pub answer: usize,
    /// Lock in once the countdown is at or below this many seconds.
    pub lock_in_at: u32,
    /// Extra points added only if the answer turns out correct.
    pub bonus: u32,
}

/// Decides how simulated opponents answer.
pub trait AnsweringPolicy: Send {
    fn plan(&mut self, question: &Question) -> BotPlan;
}

/// Default policy: mostly right, answers somewhere in the middle-to-late window.
pub struct RandomPolicy {
    rng: StdRng,
    correct_probability: f64,
}

impl RandomPolicy {
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            correct_probability: BOT_CORRECT_PROBABILITY,
        }
    }

    /// Override how often bots pick the right answer (clamped to 0..=1).
    pub fn with_accuracy(mut self, probability: f64) -> Self {
        self.correct_probability = probability.clamp(0.0, 1.0);
        self
    }

    fn pick_answer(&mut self, question: &Question) -> usize {
        let options = question.options.len();
        if self.rng.gen_bool(self.correct_probability) {
            return question.correct_index;
        }
        // Uniform over the wrong options: draw from n-1 slots and skip the correct one
        let i = self.rng.gen_range(0..options - 1);
        if i >= question.correct_index {
            i + 1
        } else {
            i
        }
    }

    fn pick_lock_in(&mut self, time_limit: u32) -> u32 {
        let limit = u64::from(time_limit);
        let min_elapsed = (limit * u64::from(BOT_THINK_MIN_PERCENT))
            .div_ceil(100)
            .clamp(1, limit.max(1));
        let max_elapsed =
            (limit * u64::from(BOT_THINK_MAX_PERCENT) / 100).clamp(min_elapsed, limit.max(1));
        let elapsed = self.rng.gen_range(min_elapsed..=max_elapsed);
        limit.saturating_sub(elapsed) as u32
    }
}

impl AnsweringPolicy for RandomPolicy {
    fn plan(&mut self, question: &Question) -> BotPlan {
        let answer = self.pick_answer(question);
        let lock_in_at = self.pick_lock_in(question.time_limit_secs);
        let bonus = self.rng.gen_range(0..=BOT_BONUS_JITTER_MAX);
        BotPlan {
            answer,
            lock_in_at,
            bonus,
        }
    }
}

/// Replays a fixed list of plans in order, then falls back to answering
/// correctly at the last second. Used for demos and deterministic tests.
#[derive(Debug, Default)]
pub struct ScriptedPolicy {
    plans: VecDeque<BotPlan>,
}

impl ScriptedPolicy {
    pub fn new(plans: impl IntoIterator<Item = BotPlan>) -> Self {
        Self {
            plans: plans.into_iter().collect(),
        }
    }
}

impl AnsweringPolicy for ScriptedPolicy {
    fn plan(&mut self, question: &Question) -> BotPlan {
        self.plans.pop_front().unwrap_or(BotPlan {
            answer: question.correct_index,
            lock_in_at: 0,
            bonus: 0,
        })
    }
}
