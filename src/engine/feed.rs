// Recent-answers feed and the per-battle answer log.

use std::collections::VecDeque;

use serde::Serialize;

/// One scored answer. Every scoring call produces exactly one of these.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnswerEvent {
    pub participant_id: u32,
    pub participant_name: String,
    pub is_bot: bool,
    pub correct: bool,
    pub points: u32,
    pub subject: String,
    pub question_index: usize,
    /// Battle clock (seconds since start) when the answer was scored.
    pub at_secs: u64,
}

impl AnswerEvent {
    pub fn view(&self, now_secs: u64) -> AnswerEventView {
        AnswerEventView {
            participant_name: self.participant_name.clone(),
            is_bot: self.is_bot,
            correct: self.correct,
            points: self.points,
            subject: self.subject.clone(),
            time_label: relative_label(now_secs.saturating_sub(self.at_secs)),
        }
    }
}

/// Feed entry as shown to players.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnswerEventView {
    pub participant_name: String,
    pub is_bot: bool,
    pub correct: bool,
    pub points: u32,
    pub subject: String,
    pub time_label: String,
}

/// "just now", "12s ago", "3m ago".
pub fn relative_label(age_secs: u64) -> String {
    match age_secs {
        0..=4 => "just now".to_string(),
        5..=59 => format!("{age_secs}s ago"),
        _ => format!("{}m ago", age_secs / 60),
    }
}

/// Bounded newest-first feed plus the complete log for the session.
#[derive(Debug, Clone)]
pub struct AnswerFeed {
    capacity: usize,
    recent: VecDeque<AnswerEvent>,
    log: Vec<AnswerEvent>,
}

impl AnswerFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            recent: VecDeque::with_capacity(capacity.max(1) + 1),
            log: Vec::new(),
        }
    }

    pub fn record(&mut self, event: AnswerEvent) {
        self.log.push(event.clone());
        self.recent.push_front(event);
        self.recent.truncate(self.capacity);
    }

    /// Newest first, at most `capacity` entries.
    pub fn recent(&self) -> impl Iterator<Item = &AnswerEvent> {
        self.recent.iter()
    }

    /// Every event in the order it was recorded.
    pub fn log(&self) -> &[AnswerEvent] {
        &self.log
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
