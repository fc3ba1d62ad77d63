use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Every interview asks exactly this many questions.
pub const QUESTION_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn time_limit_secs(self) -> u32 {
        match self {
            Difficulty::Easy => 20,
            Difficulty::Medium => 60,
            Difficulty::Hard => 120,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

/// One generated interview question. Sequences are immutable once generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub difficulty: Difficulty,
    pub time_limit_secs: u32,
}

/// Four-part evaluation of a single answer, each field in 1–10.
/// `overall` is the authoritative per-question score used in aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiScore {
    pub technical: u8,
    pub clarity: u8,
    pub problem_solving: u8,
    pub overall: u8,
    pub feedback: String,
}

/// One entry in the session's answer map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedAnswer {
    pub answer: String,
    pub time_taken_secs: u32,
    pub score: AiScore,
}

/// Identity mirrored alongside the session so an interrupted interview can
/// greet the returning candidate without a database round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateIdentity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Resumable progress record for one candidate's in-flight interview.
///
/// Invariant: `current_question` equals `answers.len()` and only ever grows.
/// The map is keyed by 0-based question index, so key order is answer order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub candidate_id: Uuid,
    pub questions: Vec<Question>,
    pub current_question: usize,
    pub answers: BTreeMap<usize, RecordedAnswer>,
    pub is_completed: bool,
    pub started_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(candidate_id: Uuid, questions: Vec<Question>) -> Self {
        Self {
            candidate_id,
            questions,
            current_question: 0,
            answers: BTreeMap::new(),
            is_completed: false,
            started_at: Utc::now(),
        }
    }

    /// Records the answer to the current question and advances the cursor.
    /// Returns the 0-based index the answer was recorded under.
    pub fn record_answer(&mut self, recorded: RecordedAnswer) -> usize {
        let index = self.current_question;
        self.answers.insert(index, recorded);
        self.current_question += 1;
        debug_assert_eq!(self.current_question, self.answers.len());
        index
    }

    /// True once every question in the sequence has been answered.
    pub fn is_finished(&self) -> bool {
        self.current_question >= self.questions.len()
    }

    /// Per-question overall scores in answer order.
    pub fn overall_scores(&self) -> Vec<u8> {
        self.answers.values().map(|a| a.score.overall).collect()
    }
}

/// Ordered presentation events returned by each transition, so the UI
/// renders purely from the response body.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InterviewEvent {
    Greeting {
        message: String,
    },
    Question {
        index: usize,
        total: usize,
        text: String,
        difficulty: Difficulty,
        time_limit_secs: u32,
    },
    AnswerRecorded {
        index: usize,
        overall: u8,
        feedback: String,
    },
    Replay {
        index: usize,
        question: String,
        answer: String,
    },
    Completed {
        final_score: f64,
        summary: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_question(difficulty: Difficulty) -> Question {
        Question {
            text: "What is a closure?".to_string(),
            difficulty,
            time_limit_secs: difficulty.time_limit_secs(),
        }
    }

    fn sample_score(overall: u8) -> AiScore {
        AiScore {
            technical: overall,
            clarity: overall,
            problem_solving: overall,
            overall,
            feedback: String::new(),
        }
    }

    #[test]
    fn time_limits_follow_difficulty() {
        assert_eq!(Difficulty::Easy.time_limit_secs(), 20);
        assert_eq!(Difficulty::Medium.time_limit_secs(), 60);
        assert_eq!(Difficulty::Hard.time_limit_secs(), 120);
    }

    #[test]
    fn cursor_tracks_answer_count() {
        let questions = vec![
            sample_question(Difficulty::Easy),
            sample_question(Difficulty::Easy),
        ];
        let mut session = SessionState::new(Uuid::new_v4(), questions);
        assert_eq!(session.current_question, 0);

        let index = session.record_answer(RecordedAnswer {
            answer: "first".to_string(),
            time_taken_secs: 5,
            score: sample_score(6),
        });
        assert_eq!(index, 0);
        assert_eq!(session.current_question, session.answers.len());
        assert!(!session.is_finished());

        session.record_answer(RecordedAnswer {
            answer: "second".to_string(),
            time_taken_secs: 8,
            score: sample_score(7),
        });
        assert_eq!(session.current_question, 2);
        assert!(session.is_finished());
        assert_eq!(session.overall_scores(), vec![6, 7]);
    }
}
