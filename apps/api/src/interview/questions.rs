//! Question sequence rules: the fixed difficulty ladder, the hardcoded
//! fallback sequence, and validation of AI-generated sequences.

use super::models::{Difficulty, Question, QUESTION_COUNT};

/// Fixed difficulty order for every interview: two Easy, two Medium, two Hard.
pub const DIFFICULTY_LADDER: [Difficulty; QUESTION_COUNT] = [
    Difficulty::Easy,
    Difficulty::Easy,
    Difficulty::Medium,
    Difficulty::Medium,
    Difficulty::Hard,
    Difficulty::Hard,
];

const FALLBACK_TEXTS: [&str; QUESTION_COUNT] = [
    "What is the difference between let, const, and var in JavaScript?",
    "Explain what JSX is and why React uses it.",
    "How does state differ from props in React, and when would you lift state up?",
    "Describe how Express middleware works and give an example of a custom middleware.",
    "Design a REST API for a paginated activity feed. Discuss endpoint shapes, cursor vs offset pagination, and how you would handle consistency under concurrent writes.",
    "A Node.js service's event loop is intermittently blocked in production. Walk through how you would diagnose the cause and the strategies you would use to fix it.",
];

/// The deterministic local sequence used whenever generation fails.
pub fn fallback_sequence() -> Vec<Question> {
    FALLBACK_TEXTS
        .iter()
        .zip(DIFFICULTY_LADDER)
        .map(|(text, difficulty)| Question {
            text: (*text).to_string(),
            difficulty,
            time_limit_secs: difficulty.time_limit_secs(),
        })
        .collect()
}

/// A generated sequence is usable only if it has exactly six questions in
/// ladder order with the canonical per-difficulty time limits.
pub fn is_valid_sequence(questions: &[Question]) -> bool {
    questions.len() == QUESTION_COUNT
        && questions.iter().zip(DIFFICULTY_LADDER).all(|(q, expected)| {
            q.difficulty == expected
                && q.time_limit_secs == expected.time_limit_secs()
                && !q.text.trim().is_empty()
        })
}
