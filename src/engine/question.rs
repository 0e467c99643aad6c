// Question records and question-set loading.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::config::{DEFAULT_POINTS, DEFAULT_SUBJECT, DEFAULT_TIME_LIMIT_SECS, MAX_POINTS};
use super::error::BattleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// A single multiple-choice question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default = "default_time_limit")]
    pub time_limit_secs: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Category label shown in the recent-answers feed.
    #[serde(default = "default_subject")]
    pub subject: String,
}

fn default_points() -> u32 {
    DEFAULT_POINTS
}

fn default_time_limit() -> u32 {
    DEFAULT_TIME_LIMIT_SECS
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

impl Question {
    /// Check the question is playable.
    pub fn validate(&self) -> Result<(), BattleError> {
        if self.options.len() < 2 {
            return Err(BattleError::TooFewOptions {
                question_id: self.id.clone(),
                options: self.options.len(),
            });
        }
        if self.correct_index >= self.options.len() {
            return Err(BattleError::CorrectIndexOutOfRange {
                question_id: self.id.clone(),
                index: self.correct_index,
                options: self.options.len(),
            });
        }
        if self.points == 0 {
            return Err(BattleError::ZeroPoints {
                question_id: self.id.clone(),
            });
        }
        if self.points > MAX_POINTS {
            return Err(BattleError::TooManyPoints {
                question_id: self.id.clone(),
                points: self.points,
                max: MAX_POINTS,
            });
        }
        if self.time_limit_secs == 0 {
            return Err(BattleError::ZeroTimeLimit {
                question_id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Public view of the question, without the answer key.
    pub fn view(&self) -> QuestionView {
        QuestionView {
            id: self.id.clone(),
            prompt: self.prompt.clone(),
            options: self.options.clone(),
            points: self.points,
            time_limit_secs: self.time_limit_secs,
            difficulty: self.difficulty,
            subject: self.subject.clone(),
        }
    }
}

/// What players are allowed to see of the active question.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuestionView {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub points: u32,
    pub time_limit_secs: u32,
    pub difficulty: Difficulty,
    pub subject: String,
}

/// A validated, non-empty, ordered set of questions. Frozen once built.
#[derive(Debug, Clone)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    pub fn new(questions: Vec<Question>) -> Result<Self, BattleError> {
        if questions.is_empty() {
            return Err(BattleError::EmptyQuestionSet);
        }
        for q in &questions {
            q.validate()?;
        }
        Ok(Self { questions })
    }

    /// Parse a question-set file: `{ "name": ..., "questions": [...] }`.
    pub fn from_json(json: &str) -> Result<Self, BattleError> {
        let file: QuestionSetFile = serde_json::from_str(json)
            .map_err(|e| BattleError::InvalidQuestionSet(e.to_string()))?;
        Self::new(file.questions)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

#[derive(Debug, Deserialize)]
struct QuestionSetFile {
    #[serde(default)]
    name: Option<String>,
    questions: Vec<Question>,
}

/// Metadata about an available question-set file.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionSetInfo {
    pub name: String,
    pub title: String,
    pub question_count: usize,
}

/// Scan a directory for `*.json` question sets and return their metadata, sorted by name.
pub fn list_question_sets(dir: &Path) -> Vec<QuestionSetInfo> {
    let mut sets = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return sets,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => continue,
        };
        match serde_json::from_str::<QuestionSetFile>(&contents) {
            Ok(file) => sets.push(QuestionSetInfo {
                title: file.name.unwrap_or_else(|| stem.clone()),
                name: stem,
                question_count: file.questions.len(),
            }),
            Err(e) => tracing::warn!(file = %path.display(), "Skipping unreadable question set: {e}"),
        }
    }

    sets.sort_by(|a, b| a.name.cmp(&b.name));
    sets
}

/// Load a question set by name from the given directory.
pub fn load_question_set(dir: &Path, name: &str) -> Result<QuestionSet, BattleError> {
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(BattleError::InvalidQuestionSet(format!(
            "bad question set name '{name}'"
        )));
    }
    let path = dir.join(format!("{name}.json"));
    let contents = std::fs::read_to_string(&path).map_err(|e| {
        BattleError::InvalidQuestionSet(format!("failed to read '{name}': {e}"))
    })?;
    QuestionSet::from_json(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, options: usize, correct: usize) -> Question {
        Question {
            id: id.to_string(),
            prompt: "What is 2 + 2?".to_string(),
            options: (0..options).map(|i| i.to_string()).collect(),
            correct_index: correct,
            points: 10,
            time_limit_secs: 30,
            difficulty: Difficulty::Easy,
            subject: "Math".to_string(),
        }
    }

    #[test]
    fn test_empty_set_rejected() {
        assert_eq!(
            QuestionSet::new(vec![]).unwrap_err(),
            BattleError::EmptyQuestionSet
        );
    }

    #[test]
    fn test_malformed_questions_rejected() {
        let err = QuestionSet::new(vec![question("q1", 1, 0)]).unwrap_err();
        assert!(matches!(err, BattleError::TooFewOptions { options: 1, .. }));

        let err = QuestionSet::new(vec![question("q1", 4, 0), question("q2", 4, 4)]).unwrap_err();
        assert_eq!(
            err,
            BattleError::CorrectIndexOutOfRange {
                question_id: "q2".into(),
                index: 4,
                options: 4
            }
        );

        let mut q = question("q3", 4, 1);
        q.time_limit_secs = 0;
        assert!(matches!(
            QuestionSet::new(vec![q]).unwrap_err(),
            BattleError::ZeroTimeLimit { .. }
        ));

        let mut q = question("q4", 4, 1);
        q.points = 0;
        assert!(matches!(
            QuestionSet::new(vec![q]).unwrap_err(),
            BattleError::ZeroPoints { .. }
        ));

        let mut q = question("q5", 4, 1);
        q.points = u32::MAX;
        assert_eq!(
            QuestionSet::new(vec![q]).unwrap_err(),
            BattleError::TooManyPoints {
                question_id: "q5".into(),
                points: u32::MAX,
                max: MAX_POINTS
            }
        );

        let mut q = question("q6", 4, 1);
        q.points = MAX_POINTS;
        assert!(QuestionSet::new(vec![q]).is_ok());
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let json = r#"{
            "name": "Warmup",
            "questions": [
                { "id": "q1", "prompt": "Capital of France?", "options": ["Paris", "Rome"], "correct_index": 0 }
            ]
        }"#;
        let set = QuestionSet::from_json(json).unwrap();
        assert_eq!(set.len(), 1);
        let q = set.get(0).unwrap();
        assert_eq!(q.points, DEFAULT_POINTS);
        assert_eq!(q.time_limit_secs, DEFAULT_TIME_LIMIT_SECS);
        assert_eq!(q.difficulty, Difficulty::Medium);
        assert_eq!(q.subject, DEFAULT_SUBJECT);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            QuestionSet::from_json("not json"),
            Err(BattleError::InvalidQuestionSet(_))
        ));
    }

    #[test]
    fn test_view_hides_answer() {
        let view = question("q1", 3, 2).view();
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("correct_index"));
        assert_eq!(view.options.len(), 3);
    }

    #[test]
    fn test_load_question_set_rejects_traversal() {
        let dir = std::env::temp_dir();
        assert!(load_question_set(&dir, "../etc/passwd").is_err());
    }

    #[test]
    fn test_list_and_load_from_directory() {
        let dir = std::env::temp_dir().join(format!("quiz-sets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("science.json"),
            r#"{"name":"Science","questions":[{"id":"s1","prompt":"H2O?","options":["Water","Salt"],"correct_index":0}]}"#,
        )
        .unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let sets = list_question_sets(&dir);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].name, "science");
        assert_eq!(sets[0].title, "Science");
        assert_eq!(sets[0].question_count, 1);

        let set = load_question_set(&dir, "science").unwrap();
        assert_eq!(set.get(0).unwrap().id, "s1");
        assert!(load_question_set(&dir, "missing").is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
