use serde::{Deserialize, Serialize};

use super::config::{BOT_ROSTER, DEFAULT_HUMAN_AVATAR};
use super::error::BattleError;

/// An answer locked in for the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub answer: usize,
    /// Seconds left on the countdown when the answer was locked in.
    pub time_remaining: u32,
}

/// A battle participant: the human player or a simulated opponent.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: u32,
    pub name: String,
    pub avatar: String,
    pub is_bot: bool,
    pub score: u32,
    pub selection: Option<Selection>,
}

impl Participant {
    pub fn has_answered(&self) -> bool {
        self.selection.is_some()
    }

    pub fn status_label(&self) -> &'static str {
        if self.has_answered() {
            "Answered!"
        } else {
            "Thinking..."
        }
    }

    pub fn view(&self) -> ParticipantView {
        ParticipantView {
            id: self.id,
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            is_bot: self.is_bot,
            score: self.score,
            answered: self.has_answered(),
            status: self.status_label().to_string(),
        }
    }
}

/// Live per-participant state for presentation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParticipantView {
    pub id: u32,
    pub name: String,
    pub avatar: String,
    pub is_bot: bool,
    pub score: u32,
    pub answered: bool,
    pub status: String,
}

/// Name and avatar for a participant to be registered.
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantEntry {
    pub name: String,
    pub avatar: String,
}

impl ParticipantEntry {
    pub fn new(name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar: avatar.into(),
        }
    }
}

/// Battle roster: exactly one human against one or more bots.
#[derive(Debug, Clone)]
pub struct Roster {
    pub human: ParticipantEntry,
    pub bots: Vec<ParticipantEntry>,
}

impl Roster {
    /// A human named `player_name` against the first `bot_count` stock opponents.
    pub fn with_stock_bots(player_name: &str, avatar: Option<&str>, bot_count: usize) -> Self {
        let bots = BOT_ROSTER
            .iter()
            .take(bot_count)
            .map(|(name, avatar)| ParticipantEntry::new(*name, *avatar))
            .collect();
        Self {
            human: ParticipantEntry::new(player_name, avatar.unwrap_or(DEFAULT_HUMAN_AVATAR)),
            bots,
        }
    }
}

/// One row of the final leaderboard.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Standing {
    pub rank: usize,
    pub participant_id: u32,
    pub name: String,
    pub avatar: String,
    pub is_bot: bool,
    pub score: u32,
}

pub type Leaderboard = Vec<Standing>;

/// Participants in registration order (human first, then bots as listed).
#[derive(Debug, Clone)]
pub struct ParticipantRegistry {
    participants: Vec<Participant>,
}

impl ParticipantRegistry {
    pub fn from_roster(roster: Roster) -> Result<Self, BattleError> {
        if roster.bots.is_empty() {
            return Err(BattleError::NoOpponents);
        }
        let mut participants = Vec::with_capacity(roster.bots.len() + 1);
        let entries =
            std::iter::once((roster.human, false)).chain(roster.bots.into_iter().map(|b| (b, true)));
        for (i, (entry, is_bot)) in entries.enumerate() {
            participants.push(Participant {
                id: i as u32 + 1,
                name: entry.name,
                avatar: entry.avatar,
                is_bot,
                score: 0,
                selection: None,
            });
        }
        Ok(Self { participants })
    }

    pub fn human(&self) -> &Participant {
        &self.participants[0]
    }

    pub fn human_mut(&mut self) -> &mut Participant {
        &mut self.participants[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.participants.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&Participant> {
        self.participants.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Participant> {
        self.participants.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Clear every participant's answer for the next question.
    pub fn clear_selections(&mut self) {
        for p in &mut self.participants {
            p.selection = None;
        }
    }

    /// Participants ranked by score, descending. Equal scores keep registration order.
    pub fn leaderboard(&self) -> Leaderboard {
        let mut ranked: Vec<&Participant> = self.participants.iter().collect();
        // sort_by is stable, so ties stay in registration order
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
            .into_iter()
            .enumerate()
            .map(|(i, p)| Standing {
                rank: i + 1,
                participant_id: p.id,
                name: p.name.clone(),
                avatar: p.avatar.clone(),
                is_bot: p.is_bot,
                score: p.score,
            })
            .collect()
    }
}
