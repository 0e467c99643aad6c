// Battle state machine: question progression, bot lock-ins, scoring and the
// final leaderboard.
//
// A `Battle` is a plain single-writer value. Whoever owns it (the server's
// battle task, the headless runner, a test) calls `tick` once per second and
// forwards the human's `select` / `advance` commands; presentation reads
// `snapshot`.

use serde::Serialize;

use crate::metrics;

use super::bot::{AnsweringPolicy, BotPlan};
use super::config::FEED_CAPACITY;
use super::error::BattleError;
use super::feed::{AnswerEvent, AnswerEventView, AnswerFeed};
use super::participant::{Leaderboard, ParticipantRegistry, ParticipantView, Roster, Selection};
use super::question::{QuestionSet, QuestionView};
use super::scoring;
use super::timer::{Countdown, TimerSignal};

/// Where the battle is.
#[derive(Debug, Clone, PartialEq)]
pub enum BattleState {
    InProgress {
        question_index: usize,
        time_remaining: u32,
    },
    Complete {
        leaderboard: Leaderboard,
    },
}

/// What a call to `advance` (or an expiring tick) did.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    NextQuestion { question_index: usize },
    Complete(Leaderboard),
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Countdown moved; question still open.
    Counting { time_remaining: u32 },
    /// Countdown hit zero and the question was force-advanced.
    Advanced(AdvanceOutcome),
    /// Battle is complete or torn down; nothing changed.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    InProgress,
    Complete,
}

/// Read-only projection of a battle for presentation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BattleSnapshot {
    pub status: BattleStatus,
    pub question_index: usize,
    pub question_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    pub time_remaining: u32,
    pub time_limit: u32,
    pub elapsed_secs: u64,
    /// The human's locked-in answer for the current question, if any.
    pub human_answer: Option<usize>,
    pub participants: Vec<ParticipantView>,
    pub recent_answers: Vec<AnswerEventView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaderboard: Option<Leaderboard>,
}

impl BattleSnapshot {
    pub fn is_complete(&self) -> bool {
        self.status == BattleStatus::Complete
    }
}

pub struct Battle {
    questions: QuestionSet,
    registry: ParticipantRegistry,
    timer: Countdown,
    policy: Box<dyn AnsweringPolicy>,
    /// Plans for the current question, indexed like the registry (None for the human).
    bot_plans: Vec<Option<BotPlan>>,
    question_index: usize,
    leaderboard: Option<Leaderboard>,
    feed: AnswerFeed,
    elapsed_secs: u64,
    closed: bool,
}

impl Battle {
    /// Set up a battle at the first question with everyone on zero.
    pub fn new(
        questions: QuestionSet,
        roster: Roster,
        policy: Box<dyn AnsweringPolicy>,
    ) -> Result<Self, BattleError> {
        let first_limit = questions
            .get(0)
            .map(|q| q.time_limit_secs)
            .ok_or(BattleError::EmptyQuestionSet)?;
        let registry = ParticipantRegistry::from_roster(roster)?;

        let mut battle = Battle {
            bot_plans: vec![None; registry.len()],
            questions,
            registry,
            timer: Countdown::new(first_limit),
            policy,
            question_index: 0,
            leaderboard: None,
            feed: AnswerFeed::new(FEED_CAPACITY),
            elapsed_secs: 0,
            closed: false,
        };
        battle.plan_bots();
        Ok(battle)
    }

    /// Replace the recent-answers capacity. Only meaningful before play starts.
    pub fn with_feed_capacity(mut self, capacity: usize) -> Self {
        self.feed = AnswerFeed::new(capacity);
        self
    }

    pub fn state(&self) -> BattleState {
        match &self.leaderboard {
            Some(leaderboard) => BattleState::Complete {
                leaderboard: leaderboard.clone(),
            },
            None => BattleState::InProgress {
                question_index: self.question_index,
                time_remaining: self.timer.remaining(),
            },
        }
    }

    pub fn is_complete(&self) -> bool {
        self.leaderboard.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn leaderboard(&self) -> Option<&Leaderboard> {
        self.leaderboard.as_ref()
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn time_remaining(&self) -> u32 {
        self.timer.remaining()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn participants(&self) -> &ParticipantRegistry {
        &self.registry
    }

    /// Every answer scored so far, oldest first.
    pub fn answer_log(&self) -> &[AnswerEvent] {
        self.feed.log()
    }

    /// One second passes.
    ///
    /// Bots whose planned lock-in time has been reached answer first, then an
    /// expired countdown force-advances the question.
    pub fn tick(&mut self) -> TickOutcome {
        if self.closed || self.is_complete() {
            return TickOutcome::Ignored;
        }
        let signal = self.timer.tick();
        if signal == TimerSignal::Suspended {
            return TickOutcome::Ignored;
        }
        self.elapsed_secs += 1;
        self.lock_in_due_bots(false);

        match signal {
            TimerSignal::Running(time_remaining) => TickOutcome::Counting { time_remaining },
            _ => {
                tracing::debug!(
                    question_index = self.question_index,
                    "Time up, advancing question"
                );
                TickOutcome::Advanced(self.advance_question())
            }
        }
    }

    /// Lock in the human's answer for the current question.
    pub fn select(&mut self, answer: usize) -> Result<(), BattleError> {
        if self.closed {
            return Err(BattleError::BattleClosed);
        }
        if self.is_complete() {
            return Err(BattleError::BattleComplete);
        }
        let options = self
            .questions
            .get(self.question_index)
            .map(|q| q.options.len())
            .ok_or(BattleError::BattleComplete)?;
        if answer >= options {
            return Err(BattleError::AnswerOutOfRange {
                index: answer,
                options,
            });
        }
        let time_remaining = self.timer.remaining();
        let human = self.registry.human_mut();
        if human.selection.is_some() {
            return Err(BattleError::AlreadyAnswered);
        }
        human.selection = Some(Selection {
            answer,
            time_remaining,
        });
        tracing::debug!(
            question_index = self.question_index,
            answer,
            time_remaining,
            "Human answer locked in"
        );
        Ok(())
    }

    /// Close the current question now (the human pressed submit).
    ///
    /// Bots that have not locked in yet answer with their plan at the current
    /// time so that an early submit does not zero them out.
    pub fn advance(&mut self) -> Result<AdvanceOutcome, BattleError> {
        if self.closed {
            return Err(BattleError::BattleClosed);
        }
        if self.is_complete() {
            return Err(BattleError::BattleComplete);
        }
        self.lock_in_due_bots(true);
        Ok(self.advance_question())
    }

    /// Stop the battle for good. Later ticks are ignored and commands rejected.
    pub fn teardown(&mut self) {
        if !self.closed {
            self.closed = true;
            self.timer.suspend();
            tracing::debug!(question_index = self.question_index, "Battle torn down");
        }
    }

    pub fn snapshot(&self) -> BattleSnapshot {
        let current = if self.is_complete() {
            None
        } else {
            self.questions.get(self.question_index)
        };
        BattleSnapshot {
            status: if self.is_complete() {
                BattleStatus::Complete
            } else {
                BattleStatus::InProgress
            },
            question_index: self.question_index,
            question_count: self.questions.len(),
            question: current.map(|q| q.view()),
            time_remaining: self.timer.remaining(),
            time_limit: self.timer.limit(),
            elapsed_secs: self.elapsed_secs,
            human_answer: self.registry.human().selection.map(|s| s.answer),
            participants: self.registry.iter().map(|p| p.view()).collect(),
            recent_answers: self
                .feed
                .recent()
                .map(|e| e.view(self.elapsed_secs))
                .collect(),
            leaderboard: self.leaderboard.clone(),
        }
    }

    /// Plan every bot's answer for the current question.
    fn plan_bots(&mut self) {
        let Some(question) = self.questions.get(self.question_index) else {
            return;
        };
        for (slot, participant) in self.registry.iter().enumerate() {
            self.bot_plans[slot] = if participant.is_bot {
                Some(self.policy.plan(question))
            } else {
                None
            };
        }
    }

    /// Lock in bots whose time has come, or all pending bots when `all` is set.
    /// A bot that already answered this question is left alone.
    fn lock_in_due_bots(&mut self, all: bool) {
        let time_remaining = self.timer.remaining();
        for (slot, participant) in self.registry.iter_mut().enumerate() {
            if !participant.is_bot || participant.selection.is_some() {
                continue;
            }
            let Some(plan) = self.bot_plans.get(slot).copied().flatten() else {
                continue;
            };
            if all || time_remaining <= plan.lock_in_at {
                participant.selection = Some(Selection {
                    answer: plan.answer,
                    time_remaining,
                });
            }
        }
    }

    /// Score everyone on the current question and move on.
    fn advance_question(&mut self) -> AdvanceOutcome {
        if let Some(question) = self.questions.get(self.question_index) {
            for (slot, participant) in self.registry.iter_mut().enumerate() {
                let selection = participant.selection;
                let mut points = scoring::score(
                    selection.map(|s| s.answer),
                    question.correct_index,
                    selection.map(|s| s.time_remaining).unwrap_or(0),
                    question.time_limit_secs,
                    question.points,
                );
                let correct = points > 0;
                if correct && participant.is_bot {
                    // Bots carry an extra random bonus that the human path never gets
                    let bonus = self
                        .bot_plans
                        .get(slot)
                        .copied()
                        .flatten()
                        .map(|plan| plan.bonus)
                        .unwrap_or(0);
                    points = points.saturating_add(bonus);
                }
                participant.score = participant.score.saturating_add(points);

                metrics::ANSWERS_TOTAL
                    .with_label_values(&[
                        if participant.is_bot { "bot" } else { "human" },
                        if correct { "correct" } else { "incorrect" },
                    ])
                    .inc();

                self.feed.record(AnswerEvent {
                    participant_id: participant.id,
                    participant_name: participant.name.clone(),
                    is_bot: participant.is_bot,
                    correct,
                    points,
                    subject: question.subject.clone(),
                    question_index: self.question_index,
                    at_secs: self.elapsed_secs,
                });
            }
        }

        self.registry.clear_selections();
        self.bot_plans.iter_mut().for_each(|plan| *plan = None);
        self.question_index += 1;

        match self.questions.get(self.question_index) {
            Some(next) => {
                self.timer.reset(next.time_limit_secs);
                self.plan_bots();
                AdvanceOutcome::NextQuestion {
                    question_index: self.question_index,
                }
            }
            None => {
                self.timer.suspend();
                let leaderboard = self.registry.leaderboard();
                tracing::info!(
                    questions = self.questions.len(),
                    elapsed_secs = self.elapsed_secs,
                    winner = leaderboard.first().map(|s| s.name.as_str()).unwrap_or(""),
                    "Battle complete"
                );
                self.leaderboard = Some(leaderboard.clone());
                AdvanceOutcome::Complete(leaderboard)
            }
        }
    }
}
