//! AI evaluation service seam. The state machine only sees `Evaluator`;
//! the LLM-backed implementation lives here, with a hard per-call deadline
//! so a hung request can never stall an interview. Every error variant has
//! a deterministic local fallback applied by the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::models::{AiScore, Difficulty, Question};
use super::prompts::{
    GENERATE_QUESTIONS_PROMPT, JSON_ONLY_SYSTEM, SCORE_ANSWER_PROMPT, SUMMARIZE_PROMPT,
};
use super::questions::is_valid_sequence;
use crate::llm_client::{parse_json, LlmClient, LlmError};

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Question generation failed: {0}")]
    Generation(String),

    #[error("Answer scoring failed: {0}")]
    Scoring(String),

    #[error("Summary generation failed: {0}")]
    Summary(String),

    #[error("AI call exceeded its {0}s budget")]
    Timeout(u64),
}

/// The AI evaluation service contract. Carried in the interview service as
/// `Arc<dyn Evaluator>` so tests swap in a deterministic fake.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Produces the fixed six-question sequence (validated against the
    /// difficulty ladder before use).
    async fn generate_questions(&self) -> Result<Vec<Question>, EvalError>;

    /// Scores one question/answer/difficulty triple. Returned fields are
    /// always clamped to 1–10.
    async fn score_answer(
        &self,
        question: &str,
        answer: &str,
        difficulty: Difficulty,
    ) -> Result<AiScore, EvalError>;

    /// Produces a prose hiring summary from the candidate name and the full
    /// Q/A transcript.
    async fn summarize(&self, candidate_name: &str, transcript: &str)
        -> Result<String, EvalError>;
}

/// Transport seam under `LlmEvaluator`: one prompt in, raw response text
/// out. Production uses `LlmClient`; tests inject canned responses or hangs
/// to exercise the deadline without a network client.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    async fn call(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl LlmTransport for LlmClient {
    async fn call(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        LlmClient::call(self, prompt, system).await
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    text: String,
    difficulty: Difficulty,
}

#[derive(Debug, Deserialize)]
struct RawScore {
    technical: f64,
    clarity: f64,
    problem_solving: f64,
    overall: f64,
    #[serde(default)]
    feedback: String,
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    summary: String,
}

/// Claude-backed evaluator. Each call races a `tokio::time::timeout` with
/// the configured budget; expiry surfaces as `EvalError::Timeout` and the
/// caller's local fallback applies.
pub struct LlmEvaluator<C = LlmClient> {
    llm: C,
    budget: Duration,
}

impl<C: LlmTransport> LlmEvaluator<C> {
    pub fn new(llm: C, budget_secs: u64) -> Self {
        Self {
            llm,
            budget: Duration::from_secs(budget_secs),
        }
    }

    /// Runs one transport call under the deadline, returning the raw text.
    async fn bounded_call(&self, prompt: &str) -> Result<Result<String, LlmError>, EvalError> {
        tokio::time::timeout(self.budget, self.llm.call(prompt, JSON_ONLY_SYSTEM))
            .await
            .map_err(|_| EvalError::Timeout(self.budget.as_secs()))
    }
}

#[async_trait]
impl<C: LlmTransport> Evaluator for LlmEvaluator<C> {
    async fn generate_questions(&self) -> Result<Vec<Question>, EvalError> {
        let text = self
            .bounded_call(GENERATE_QUESTIONS_PROMPT)
            .await?
            .map_err(|e| EvalError::Generation(e.to_string()))?;
        let generated: Vec<GeneratedQuestion> =
            parse_json(&text).map_err(|e| EvalError::Generation(e.to_string()))?;

        let questions: Vec<Question> = generated
            .into_iter()
            .map(|q| Question {
                text: q.text,
                difficulty: q.difficulty,
                time_limit_secs: q.difficulty.time_limit_secs(),
            })
            .collect();

        if !is_valid_sequence(&questions) {
            return Err(EvalError::Generation(
                "generated sequence does not match the difficulty ladder".to_string(),
            ));
        }

        debug!("Generated {} interview questions", questions.len());
        Ok(questions)
    }

    async fn score_answer(
        &self,
        question: &str,
        answer: &str,
        difficulty: Difficulty,
    ) -> Result<AiScore, EvalError> {
        let prompt = SCORE_ANSWER_PROMPT
            .replace("{question}", question)
            .replace("{difficulty}", difficulty.as_str())
            .replace("{answer}", answer);

        let text = self
            .bounded_call(&prompt)
            .await?
            .map_err(|e| EvalError::Scoring(e.to_string()))?;
        let raw: RawScore = parse_json(&text).map_err(|e| EvalError::Scoring(e.to_string()))?;

        Ok(AiScore {
            technical: clamp_score(raw.technical),
            clarity: clamp_score(raw.clarity),
            problem_solving: clamp_score(raw.problem_solving),
            overall: clamp_score(raw.overall),
            feedback: raw.feedback,
        })
    }

    async fn summarize(
        &self,
        candidate_name: &str,
        transcript: &str,
    ) -> Result<String, EvalError> {
        let prompt = SUMMARIZE_PROMPT
            .replace("{name}", candidate_name)
            .replace("{transcript}", transcript);

        let text = self
            .bounded_call(&prompt)
            .await?
            .map_err(|e| EvalError::Summary(e.to_string()))?;
        let raw: RawSummary = parse_json(&text).map_err(|e| EvalError::Summary(e.to_string()))?;

        if raw.summary.trim().is_empty() {
            return Err(EvalError::Summary("empty summary".to_string()));
        }
        Ok(raw.summary)
    }
}

/// Clamps an LLM-reported score into the 1–10 contract. Non-finite values
/// (a malformed model response) collapse to 1.
fn clamp_score(value: f64) -> u8 {
    if !value.is_finite() {
        return 1;
    }
    value.round().clamp(1.0, 10.0) as u8
}
