// Battle error types.

use thiserror::Error;

/// Everything that can go wrong when building or driving a battle.
///
/// Construction errors are precondition violations and are reported before a
/// battle ever starts. Selection errors never mutate the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleError {
    #[error("question set is empty")]
    EmptyQuestionSet,

    #[error("question '{question_id}' needs at least two options, got {options}")]
    TooFewOptions { question_id: String, options: usize },

    #[error("question '{question_id}' marks option {index} correct but only has {options} options")]
    CorrectIndexOutOfRange {
        question_id: String,
        index: usize,
        options: usize,
    },

    #[error("question '{question_id}' must be worth at least one point")]
    ZeroPoints { question_id: String },

    #[error("question '{question_id}' is worth {points} points, more than the maximum of {max}")]
    TooManyPoints {
        question_id: String,
        points: u32,
        max: u32,
    },

    #[error("question '{question_id}' must have a time limit of at least one second")]
    ZeroTimeLimit { question_id: String },

    #[error("a battle needs at least one bot opponent")]
    NoOpponents,

    #[error("answer {index} is out of range for a question with {options} options")]
    AnswerOutOfRange { index: usize, options: usize },

    #[error("an answer is already locked in for this question")]
    AlreadyAnswered,

    #[error("battle is already complete")]
    BattleComplete,

    #[error("battle not found")]
    BattleNotFound,

    #[error("battle session has been torn down")]
    BattleClosed,

    #[error("too many active battles (max {max})")]
    TooManyBattles { max: usize },

    #[error("invalid question set: {0}")]
    InvalidQuestionSet(String),
}

impl BattleError {
    /// Whether the error stems from caller input rather than session state.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            BattleError::BattleNotFound
                | BattleError::BattleClosed
                | BattleError::TooManyBattles { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = BattleError::AnswerOutOfRange {
            index: 7,
            options: 4,
        };
        assert_eq!(
            e.to_string(),
            "answer 7 is out of range for a question with 4 options"
        );
        assert_eq!(
            BattleError::TooManyBattles { max: 2 }.to_string(),
            "too many active battles (max 2)"
        );
    }

    #[test]
    fn test_client_error_classification() {
        assert!(BattleError::AlreadyAnswered.is_client_error());
        assert!(BattleError::EmptyQuestionSet.is_client_error());
        assert!(!BattleError::BattleNotFound.is_client_error());
        assert!(!BattleError::BattleClosed.is_client_error());
    }
}
