//! The interview session state machine: onboarding, the six-question loop,
//! completion, and resume/restart for interrupted sessions. Each transition
//! is an explicit async method that takes the stored session, returns
//! ordered presentation events, and invokes persistence as an explicit side
//! effect.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::aggregate::final_score;
use super::evaluator::Evaluator;
use super::fallback::{fallback_score, fallback_summary};
use super::models::{
    CandidateIdentity, InterviewEvent, RecordedAnswer, SessionState, QUESTION_COUNT,
};
use super::questions::fallback_sequence;
use super::session_store::{SessionStore, StoredSession};
use super::store::{CandidateStore, CandidateUpdate, NewAnswerRecord};
use crate::errors::AppError;
use crate::models::candidate::CandidateStatus;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Submitted answer. Timeouts are the caller's concern: on expiry the
/// presentation layer submits whatever partial text exists (or a placeholder)
/// with `time_taken_secs` equal to the limit, and it arrives here as an
/// ordinary answer.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
    pub time_taken_secs: u32,
}

/// Result of a transition: the new cursor position plus the ordered events
/// the presentation layer renders.
#[derive(Debug, Serialize)]
pub struct TransitionOutcome {
    pub candidate_id: Uuid,
    pub current_question: usize,
    pub is_completed: bool,
    pub events: Vec<InterviewEvent>,
}

/// Owns the interview state machine. One instance serves all sessions; the
/// in-flight set enforces single-flight answer processing per session.
pub struct InterviewService {
    candidates: Arc<dyn CandidateStore>,
    sessions: Arc<dyn SessionStore>,
    evaluator: Arc<dyn Evaluator>,
    in_flight: Mutex<HashSet<Uuid>>,
    clear_delay: Duration,
}

impl InterviewService {
    pub fn new(
        candidates: Arc<dyn CandidateStore>,
        sessions: Arc<dyn SessionStore>,
        evaluator: Arc<dyn Evaluator>,
        clear_delay: Duration,
    ) -> Self {
        Self {
            candidates,
            sessions,
            evaluator,
            in_flight: Mutex::new(HashSet::new()),
            clear_delay,
        }
    }

    /// ONBOARDING -> IN_PROGRESS. Finds or creates the candidate by email,
    /// generates the question sequence (fixed fallback on failure), and
    /// persists the fresh session. Any persistence failure aborts the
    /// transition; nothing partial is retained.
    pub async fn start(&self, req: StartRequest) -> Result<TransitionOutcome, AppError> {
        let name = req.name.trim().to_string();
        let email = req.email.trim().to_lowercase();
        let phone = req
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from);

        if name.is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("a valid email is required".to_string()));
        }

        // Reuse the existing candidate for this email, never a duplicate.
        let candidate = match self.candidates.find_by_email(&email).await? {
            Some(existing) => {
                self.candidates
                    .update(
                        existing.id,
                        CandidateUpdate {
                            name: Some(name.clone()),
                            phone: phone.clone(),
                            status: Some(CandidateStatus::InProgress),
                            ..Default::default()
                        },
                    )
                    .await?
            }
            None => {
                self.candidates
                    .create(&name, &email, phone.as_deref())
                    .await?
            }
        };

        let questions = match self.evaluator.generate_questions().await {
            Ok(questions) => questions,
            Err(e) => {
                warn!(candidate_id = %candidate.id, "Question generation fell back to the fixed sequence: {e}");
                fallback_sequence()
            }
        };

        let identity = CandidateIdentity {
            id: candidate.id,
            name: name.clone(),
            email,
            phone,
        };
        let session = SessionState::new(candidate.id, questions);

        self.sessions.save(&identity, &session).await?;

        info!(candidate_id = %candidate.id, "Interview started");

        let events = vec![
            InterviewEvent::Greeting {
                message: format!(
                    "Hello {name}! Your interview has {QUESTION_COUNT} questions: \
                     2 Easy, 2 Medium, and 2 Hard. Each question is timed. Good luck!"
                ),
            },
            question_event(&session, 0),
        ];

        Ok(outcome(candidate.id, &session, events))
    }

    /// IN_PROGRESS(i) -> IN_PROGRESS(i+1) or COMPLETED. Scores the answer
    /// (local fallback on any evaluator failure), persists the answer record
    /// (failure logged, never blocks), advances the cursor, and either asks
    /// the next question or completes the interview.
    pub async fn answer(
        &self,
        candidate_id: Uuid,
        req: AnswerRequest,
    ) -> Result<TransitionOutcome, AppError> {
        let _guard = FlightGuard::acquire(&self.in_flight, candidate_id).ok_or_else(|| {
            AppError::Conflict(
                "an answer for this session is already being processed".to_string(),
            )
        })?;

        let StoredSession {
            identity,
            mut session,
        } = self
            .sessions
            .load(candidate_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No active session for candidate {candidate_id}"))
            })?;

        if session.is_completed {
            return Err(AppError::Conflict("interview already completed".to_string()));
        }

        let index = session.current_question;
        let Some(question) = session.questions.get(index).cloned() else {
            // Cursor past the end without the completed flag set: finish now.
            let events = self.complete(&identity, &mut session).await;
            return Ok(outcome(candidate_id, &session, events));
        };

        // The deadline races only the scoring step. The record insert below
        // always runs once scoring has settled.
        let score = match self
            .evaluator
            .score_answer(&question.text, &req.answer, question.difficulty)
            .await
        {
            Ok(score) => score,
            Err(e) => {
                warn!(candidate_id = %candidate_id, question = index + 1, "Scoring fell back locally: {e}");
                fallback_score(&req.answer, question.difficulty)
            }
        };

        let record = NewAnswerRecord {
            candidate_id,
            question_number: (index + 1) as i32,
            question_text: question.text.clone(),
            difficulty: question.difficulty,
            time_limit_secs: question.time_limit_secs,
            answer: req.answer.clone(),
            time_taken_secs: req.time_taken_secs,
            score: score.clone(),
        };
        if let Err(e) = self.candidates.insert_answer(&record).await {
            // Accepted tradeoff: the interview advances even if the record
            // is lost; the session copy still carries the score.
            error!(candidate_id = %candidate_id, question = index + 1, "Failed to persist answer record: {e}");
        }

        session.record_answer(RecordedAnswer {
            answer: req.answer,
            time_taken_secs: req.time_taken_secs,
            score: score.clone(),
        });

        let mut events = vec![InterviewEvent::AnswerRecorded {
            index,
            overall: score.overall,
            feedback: score.feedback,
        }];

        if session.is_finished() {
            events.extend(self.complete(&identity, &mut session).await);
        } else {
            if let Err(e) = self.sessions.save(&identity, &session).await {
                error!(candidate_id = %candidate_id, "Failed to persist session state: {e}");
            }
            events.push(question_event(&session, session.current_question));
        }

        Ok(outcome(candidate_id, &session, events))
    }

    /// INTERRUPTED -> IN_PROGRESS. Replays the stored transcript in original
    /// order and re-asks the current question. Completed or missing sessions
    /// are not resumable.
    pub async fn resume(&self, candidate_id: Uuid) -> Result<TransitionOutcome, AppError> {
        let StoredSession { session, .. } = self
            .sessions
            .load(candidate_id)
            .await?
            .filter(|stored| !stored.session.is_completed)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No resumable session for candidate {candidate_id}"
                ))
            })?;

        // Stored answer keys come back from an external store; one that no
        // longer maps to a question is skipped rather than trusted.
        let mut events: Vec<InterviewEvent> = session
            .answers
            .iter()
            .filter_map(|(&index, recorded)| {
                let Some(question) = session.questions.get(index) else {
                    warn!(candidate_id = %candidate_id, index, "Dropping stored answer with no matching question");
                    return None;
                };
                Some(InterviewEvent::Replay {
                    index,
                    question: question.text.clone(),
                    answer: recorded.answer.clone(),
                })
            })
            .collect();

        if session.current_question < session.questions.len() {
            events.push(question_event(&session, session.current_question));
        }

        info!(candidate_id = %candidate_id, question = session.current_question, "Interview resumed");

        Ok(outcome(candidate_id, &session, events))
    }

    /// Any state -> ONBOARDING. Unconditionally clears both session-store
    /// keys. Server-side candidate and answer records are untouched.
    pub async fn restart(&self, candidate_id: Uuid) -> Result<(), AppError> {
        self.sessions.clear(candidate_id).await?;
        info!(candidate_id = %candidate_id, "Session cleared for restart");
        Ok(())
    }

    /// COMPLETED. Aggregates the final score, fetches a summary (banded
    /// fallback on failure), updates the candidate, marks the session
    /// completed, and schedules the deferred clear of both session keys.
    /// Infallible from the caller's view: every failure is logged and the
    /// completion events are still returned.
    async fn complete(
        &self,
        identity: &CandidateIdentity,
        session: &mut SessionState,
    ) -> Vec<InterviewEvent> {
        let overalls = session.overall_scores();
        let score = final_score(&overalls);

        // Explicit policy: completing with zero recorded answers marks the
        // candidate incomplete, not completed.
        let status = if overalls.is_empty() {
            CandidateStatus::Incomplete
        } else {
            CandidateStatus::Completed
        };

        let summary = match self
            .evaluator
            .summarize(&identity.name, &transcript(session))
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                warn!(candidate_id = %identity.id, "Summary fell back locally: {e}");
                fallback_summary(&identity.name, score)
            }
        };

        if let Err(e) = self
            .candidates
            .update(
                identity.id,
                CandidateUpdate {
                    status: Some(status),
                    final_score: Some(score),
                    final_summary: Some(summary.clone()),
                    ..Default::default()
                },
            )
            .await
        {
            // Completion is still reported to the candidate.
            error!(candidate_id = %identity.id, "Failed to update candidate on completion: {e}");
        }

        session.is_completed = true;
        if let Err(e) = self.sessions.save(identity, session).await {
            error!(candidate_id = %identity.id, "Failed to persist completed session: {e}");
        }

        // Clearing is deferred so the presentation layer gets a final render
        // window with the stored session intact. Both keys go together.
        let sessions = Arc::clone(&self.sessions);
        let candidate_id = identity.id;
        let delay = self.clear_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = sessions.clear(candidate_id).await {
                error!(candidate_id = %candidate_id, "Failed to clear session keys: {e}");
            }
        });

        info!(candidate_id = %identity.id, final_score = score, "Interview completed");

        vec![InterviewEvent::Completed {
            final_score: score,
            summary,
        }]
    }
}

fn question_event(session: &SessionState, index: usize) -> InterviewEvent {
    let question = &session.questions[index];
    InterviewEvent::Question {
        index,
        total: session.questions.len(),
        text: question.text.clone(),
        difficulty: question.difficulty,
        time_limit_secs: question.time_limit_secs,
    }
}

fn transcript(session: &SessionState) -> String {
    session
        .answers
        .iter()
        .filter_map(|(&index, recorded)| {
            let question = session.questions.get(index)?;
            Some(format!(
                "Q{} ({}): {}\nA: {}\n",
                index + 1,
                question.difficulty.as_str(),
                question.text,
                recorded.answer
            ))
        })
        .collect()
}

fn outcome(
    candidate_id: Uuid,
    session: &SessionState,
    events: Vec<InterviewEvent>,
) -> TransitionOutcome {
    TransitionOutcome {
        candidate_id,
        current_question: session.current_question,
        is_completed: session.is_completed,
        events,
    }
}

/// Session-level in-flight marker. Acquiring twice for the same candidate
/// fails until the first guard drops, which rejects overlapping answer
/// submissions instead of racing them.
struct FlightGuard<'a> {
    set: &'a Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl<'a> FlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<Uuid>>, id: Uuid) -> Option<Self> {
        let mut entries = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.insert(id) {
            Some(Self { set, id })
        } else {
            None
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::interview::evaluator::{EvalError, LlmEvaluator, LlmTransport};
    use crate::interview::models::{AiScore, Difficulty, Question};
    use crate::interview::questions::DIFFICULTY_LADDER;
    use crate::llm_client::LlmError;
    use crate::models::answer::AnswerRecordRow;
    use crate::models::candidate::CandidateRow;

    #[derive(Default)]
    struct FakeCandidates {
        rows: Mutex<Vec<CandidateRow>>,
        answers: Mutex<Vec<AnswerRecordRow>>,
        fail_inserts: AtomicBool,
        fail_updates: AtomicBool,
    }

    #[async_trait]
    impl CandidateStore for FakeCandidates {
        async fn find_by_email(&self, email: &str) -> Result<Option<CandidateRow>, AppError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.email == email)
                .cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<CandidateRow>, AppError> {
            Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
        }

        async fn create(
            &self,
            name: &str,
            email: &str,
            phone: Option<&str>,
        ) -> Result<CandidateRow, AppError> {
            let row = CandidateRow {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: email.to_string(),
                phone: phone.map(String::from),
                status: "in_progress".to_string(),
                final_score: 0.0,
                final_summary: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn update(
            &self,
            id: Uuid,
            update: CandidateUpdate,
        ) -> Result<CandidateRow, AppError> {
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(AppError::Database(sqlx::Error::PoolClosed));
            }
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::NotFound(format!("candidate {id}")))?;
            if let Some(name) = update.name {
                row.name = name;
            }
            if let Some(phone) = update.phone {
                row.phone = Some(phone);
            }
            if let Some(status) = update.status {
                row.status = status.as_str().to_string();
            }
            if let Some(score) = update.final_score {
                row.final_score = score;
            }
            if let Some(summary) = update.final_summary {
                row.final_summary = Some(summary);
            }
            row.updated_at = Utc::now();
            Ok(row.clone())
        }

        async fn insert_answer(
            &self,
            record: &NewAnswerRecord,
        ) -> Result<AnswerRecordRow, AppError> {
            if self.fail_inserts.load(Ordering::SeqCst) {
                return Err(AppError::Database(sqlx::Error::PoolClosed));
            }
            let row = AnswerRecordRow {
                id: Uuid::new_v4(),
                candidate_id: record.candidate_id,
                question_number: record.question_number,
                question_text: record.question_text.clone(),
                difficulty: record.difficulty.as_str().to_string(),
                time_limit_secs: record.time_limit_secs as i32,
                answer: record.answer.clone(),
                time_taken_secs: record.time_taken_secs as i32,
                technical: i16::from(record.score.technical),
                clarity: i16::from(record.score.clarity),
                problem_solving: i16::from(record.score.problem_solving),
                overall: i16::from(record.score.overall),
                feedback: record.score.feedback.clone(),
                created_at: Utc::now(),
            };
            self.answers.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn list_answers(
            &self,
            candidate_id: Uuid,
        ) -> Result<Vec<AnswerRecordRow>, AppError> {
            let mut rows: Vec<_> = self
                .answers
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.candidate_id == candidate_id)
                .cloned()
                .collect();
            rows.sort_by_key(|r| r.question_number);
            Ok(rows)
        }
    }

    #[derive(Default)]
    struct FakeSessions {
        map: Mutex<HashMap<Uuid, StoredSession>>,
    }

    #[async_trait]
    impl SessionStore for FakeSessions {
        async fn save(
            &self,
            identity: &CandidateIdentity,
            session: &SessionState,
        ) -> Result<(), AppError> {
            self.map.lock().unwrap().insert(
                identity.id,
                StoredSession {
                    identity: identity.clone(),
                    session: session.clone(),
                },
            );
            Ok(())
        }

        async fn load(&self, candidate_id: Uuid) -> Result<Option<StoredSession>, AppError> {
            Ok(self.map.lock().unwrap().get(&candidate_id).cloned())
        }

        async fn clear(&self, candidate_id: Uuid) -> Result<(), AppError> {
            self.map.lock().unwrap().remove(&candidate_id);
            Ok(())
        }
    }

    struct FakeEvaluator {
        fail_generation: bool,
        fail_scoring: bool,
        fail_summary: bool,
        /// Overall scores handed out in order; repeats the last one after.
        scores: Mutex<Vec<u8>>,
    }

    impl Default for FakeEvaluator {
        fn default() -> Self {
            Self {
                fail_generation: false,
                fail_scoring: false,
                fail_summary: false,
                scores: Mutex::new(vec![8]),
            }
        }
    }

    #[async_trait]
    impl Evaluator for FakeEvaluator {
        async fn generate_questions(&self) -> Result<Vec<Question>, EvalError> {
            if self.fail_generation {
                return Err(EvalError::Generation("offline".to_string()));
            }
            Ok(DIFFICULTY_LADDER
                .iter()
                .enumerate()
                .map(|(i, &difficulty)| Question {
                    text: format!("AI question {}", i + 1),
                    difficulty,
                    time_limit_secs: difficulty.time_limit_secs(),
                })
                .collect())
        }

        async fn score_answer(
            &self,
            _question: &str,
            _answer: &str,
            _difficulty: Difficulty,
        ) -> Result<AiScore, EvalError> {
            if self.fail_scoring {
                return Err(EvalError::Scoring("offline".to_string()));
            }
            let mut scores = self.scores.lock().unwrap();
            let overall = if scores.len() > 1 {
                scores.remove(0)
            } else {
                scores[0]
            };
            Ok(AiScore {
                technical: overall,
                clarity: overall,
                problem_solving: overall,
                overall,
                feedback: "Solid answer.".to_string(),
            })
        }

        async fn summarize(
            &self,
            candidate_name: &str,
            _transcript: &str,
        ) -> Result<String, EvalError> {
            if self.fail_summary {
                return Err(EvalError::Summary("offline".to_string()));
            }
            Ok(format!("{candidate_name} interviewed well."))
        }
    }

    struct Harness {
        service: InterviewService,
        candidates: Arc<FakeCandidates>,
        sessions: Arc<FakeSessions>,
    }

    fn harness(evaluator: FakeEvaluator) -> Harness {
        let candidates = Arc::new(FakeCandidates::default());
        let sessions = Arc::new(FakeSessions::default());
        let service = InterviewService::new(
            Arc::clone(&candidates) as Arc<dyn CandidateStore>,
            Arc::clone(&sessions) as Arc<dyn SessionStore>,
            Arc::new(evaluator),
            Duration::from_secs(600), // effectively never during a test
        );
        Harness {
            service,
            candidates,
            sessions,
        }
    }

    fn start_request() -> StartRequest {
        StartRequest {
            name: "Jane Doe".to_string(),
            email: "jane@x.com".to_string(),
            phone: Some("555-0100".to_string()),
        }
    }

    async fn answer_all(h: &Harness, candidate_id: Uuid, answer: &str) -> TransitionOutcome {
        let mut last = None;
        for _ in 0..QUESTION_COUNT {
            last = Some(
                h.service
                    .answer(
                        candidate_id,
                        AnswerRequest {
                            answer: answer.to_string(),
                            time_taken_secs: 10,
                        },
                    )
                    .await
                    .unwrap(),
            );
        }
        last.unwrap()
    }

    #[tokio::test]
    async fn start_greets_and_asks_first_question() {
        let h = harness(FakeEvaluator::default());
        let out = h.service.start(start_request()).await.unwrap();

        assert_eq!(out.current_question, 0);
        assert!(!out.is_completed);
        assert!(matches!(out.events[0], InterviewEvent::Greeting { .. }));
        match &out.events[1] {
            InterviewEvent::Question {
                index,
                total,
                difficulty,
                time_limit_secs,
                ..
            } => {
                assert_eq!(*index, 0);
                assert_eq!(*total, 6);
                assert_eq!(*difficulty, Difficulty::Easy);
                assert_eq!(*time_limit_secs, 20);
            }
            other => panic!("expected question event, got {other:?}"),
        }

        let stored = h.sessions.map.lock().unwrap();
        assert!(stored.contains_key(&out.candidate_id));
    }

    #[tokio::test]
    async fn start_rejects_missing_fields() {
        let h = harness(FakeEvaluator::default());

        let missing_name = StartRequest {
            name: "  ".to_string(),
            email: "jane@x.com".to_string(),
            phone: None,
        };
        assert!(matches!(
            h.service.start(missing_name).await,
            Err(AppError::Validation(_))
        ));

        let bad_email = StartRequest {
            name: "Jane".to_string(),
            email: "not-an-email".to_string(),
            phone: None,
        };
        assert!(matches!(
            h.service.start(bad_email).await,
            Err(AppError::Validation(_))
        ));

        assert!(h.candidates.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn start_reuses_candidate_by_email() {
        let h = harness(FakeEvaluator::default());
        let first = h.service.start(start_request()).await.unwrap();

        let renamed = StartRequest {
            name: "Jane D.".to_string(),
            email: "JANE@x.com".to_string(), // case-insensitive match
            phone: None,
        };
        let second = h.service.start(renamed).await.unwrap();

        assert_eq!(first.candidate_id, second.candidate_id);
        let rows = h.candidates.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Jane D.");
        assert_eq!(rows[0].status, "in_progress");
    }

    #[tokio::test]
    async fn generation_failure_uses_fallback_sequence_verbatim() {
        let h = harness(FakeEvaluator {
            fail_generation: true,
            ..Default::default()
        });
        let out = h.service.start(start_request()).await.unwrap();

        let stored = h.sessions.map.lock().unwrap();
        let session = &stored[&out.candidate_id].session;
        let expected = fallback_sequence();
        assert_eq!(session.questions.len(), 6);
        for (got, want) in session.questions.iter().zip(&expected) {
            assert_eq!(got.text, want.text);
            assert_eq!(got.difficulty, want.difficulty);
            assert_eq!(got.time_limit_secs, want.time_limit_secs);
        }
    }

    #[tokio::test]
    async fn answer_advances_cursor_and_persists_record() {
        let h = harness(FakeEvaluator::default());
        let out = h.service.start(start_request()).await.unwrap();

        let after = h
            .service
            .answer(
                out.candidate_id,
                AnswerRequest {
                    answer: "Use const for bindings that never re-assign.".to_string(),
                    time_taken_secs: 12,
                },
            )
            .await
            .unwrap();

        assert_eq!(after.current_question, 1);
        assert!(!after.is_completed);

        let stored = h.sessions.map.lock().unwrap();
        let session = &stored[&out.candidate_id].session;
        assert_eq!(session.current_question, session.answers.len());

        let answers = h.candidates.answers.lock().unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].question_number, 1);
        assert_eq!(answers[0].time_taken_secs, 12);
        assert!((1..=10).contains(&answers[0].overall));
    }

    #[tokio::test]
    async fn scoring_failure_persists_exactly_one_fallback_record() {
        let h = harness(FakeEvaluator {
            fail_scoring: true,
            ..Default::default()
        });
        let out = h.service.start(start_request()).await.unwrap();

        h.service
            .answer(
                out.candidate_id,
                AnswerRequest {
                    answer: String::new(), // empty answer -> overall 1
                    time_taken_secs: 20,
                },
            )
            .await
            .unwrap();

        let answers = h.candidates.answers.lock().unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].overall, 1);
        assert!((1..=10).contains(&answers[0].overall));
    }

    #[tokio::test]
    async fn record_insert_failure_does_not_block_the_interview() {
        let h = harness(FakeEvaluator::default());
        let out = h.service.start(start_request()).await.unwrap();
        h.candidates.fail_inserts.store(true, Ordering::SeqCst);

        let after = h
            .service
            .answer(
                out.candidate_id,
                AnswerRequest {
                    answer: "answer".to_string(),
                    time_taken_secs: 5,
                },
            )
            .await
            .unwrap();

        assert_eq!(after.current_question, 1);
        assert!(h.candidates.answers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_interview_completes_with_mean_score() {
        let h = harness(FakeEvaluator {
            scores: Mutex::new(vec![8, 6, 7, 9, 5, 10]),
            ..Default::default()
        });
        let out = h.service.start(start_request()).await.unwrap();
        let last = answer_all(&h, out.candidate_id, "a reasonable answer").await;

        assert!(last.is_completed);
        assert_eq!(last.current_question, 6);
        let completed = last
            .events
            .iter()
            .find_map(|e| match e {
                InterviewEvent::Completed {
                    final_score,
                    summary,
                } => Some((*final_score, summary.clone())),
                _ => None,
            })
            .expect("completed event");
        assert_eq!(completed.0, 7.5);
        assert_eq!(completed.1, "Jane Doe interviewed well.");

        let rows = h.candidates.rows.lock().unwrap();
        assert_eq!(rows[0].status, "completed");
        assert_eq!(rows[0].final_score, 7.5);
        assert_eq!(rows[0].final_summary.as_deref(), Some("Jane Doe interviewed well."));

        // Clearing is deferred, so the completed session is still readable.
        let stored = h.sessions.map.lock().unwrap();
        assert!(stored[&out.candidate_id].session.is_completed);
    }

    #[tokio::test]
    async fn summary_failure_uses_banded_fallback() {
        let h = harness(FakeEvaluator {
            fail_summary: true,
            scores: Mutex::new(vec![8]),
            ..Default::default()
        });
        let out = h.service.start(start_request()).await.unwrap();
        answer_all(&h, out.candidate_id, "fine").await;

        let rows = h.candidates.rows.lock().unwrap();
        let summary = rows[0].final_summary.as_deref().unwrap();
        assert!(summary.contains("strong"), "got: {summary}");
    }

    #[tokio::test]
    async fn candidate_update_failure_still_reports_completion() {
        let h = harness(FakeEvaluator::default());
        let out = h.service.start(start_request()).await.unwrap();
        h.candidates.fail_updates.store(true, Ordering::SeqCst);

        let last = answer_all(&h, out.candidate_id, "fine").await;
        assert!(last.is_completed);
        assert!(last
            .events
            .iter()
            .any(|e| matches!(e, InterviewEvent::Completed { .. })));
    }

    #[tokio::test]
    async fn zero_answer_completion_marks_candidate_incomplete() {
        let h = harness(FakeEvaluator::default());
        let out = h.service.start(start_request()).await.unwrap();

        // Force the degenerate case: a session whose cursor is already past
        // its (empty) question list.
        {
            let mut stored = h.sessions.map.lock().unwrap();
            let entry = stored.get_mut(&out.candidate_id).unwrap();
            entry.session.questions.clear();
        }

        let last = h
            .service
            .answer(
                out.candidate_id,
                AnswerRequest {
                    answer: String::new(),
                    time_taken_secs: 0,
                },
            )
            .await
            .unwrap();

        assert!(last.is_completed);
        let rows = h.candidates.rows.lock().unwrap();
        assert_eq!(rows[0].status, "incomplete");
        assert_eq!(rows[0].final_score, 0.0);
    }

    #[tokio::test]
    async fn resume_replays_transcript_in_order() {
        let h = harness(FakeEvaluator::default());
        let out = h.service.start(start_request()).await.unwrap();
        for text in ["first answer", "second answer"] {
            h.service
                .answer(
                    out.candidate_id,
                    AnswerRequest {
                        answer: text.to_string(),
                        time_taken_secs: 10,
                    },
                )
                .await
                .unwrap();
        }

        let resumed = h.service.resume(out.candidate_id).await.unwrap();
        assert_eq!(resumed.current_question, 2);

        let replayed: Vec<(usize, String)> = resumed
            .events
            .iter()
            .filter_map(|e| match e {
                InterviewEvent::Replay { index, answer, .. } => {
                    Some((*index, answer.clone()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            replayed,
            vec![
                (0, "first answer".to_string()),
                (1, "second answer".to_string())
            ]
        );

        match resumed.events.last().unwrap() {
            InterviewEvent::Question { index, .. } => assert_eq!(*index, 2),
            other => panic!("expected re-asked question, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn resume_skips_answers_without_a_matching_question() {
        let h = harness(FakeEvaluator::default());
        let out = h.service.start(start_request()).await.unwrap();
        h.service
            .answer(
                out.candidate_id,
                AnswerRequest {
                    answer: "first answer".to_string(),
                    time_taken_secs: 10,
                },
            )
            .await
            .unwrap();

        // A stored session can come back with an answer key past the question
        // list. Resume must not panic on it.
        {
            let mut stored = h.sessions.map.lock().unwrap();
            let entry = stored.get_mut(&out.candidate_id).unwrap();
            entry.session.answers.insert(
                99,
                RecordedAnswer {
                    answer: "stray".to_string(),
                    time_taken_secs: 1,
                    score: AiScore {
                        technical: 1,
                        clarity: 1,
                        problem_solving: 1,
                        overall: 1,
                        feedback: String::new(),
                    },
                },
            );
        }

        let resumed = h.service.resume(out.candidate_id).await.unwrap();
        let replayed: Vec<usize> = resumed
            .events
            .iter()
            .filter_map(|e| match e {
                InterviewEvent::Replay { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(replayed, vec![0]);
    }

    #[tokio::test]
    async fn resume_without_session_is_not_found() {
        let h = harness(FakeEvaluator::default());
        assert!(matches!(
            h.service.resume(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn completed_session_is_not_resumable() {
        let h = harness(FakeEvaluator::default());
        let out = h.service.start(start_request()).await.unwrap();
        answer_all(&h, out.candidate_id, "fine").await;

        assert!(matches!(
            h.service.resume(out.candidate_id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn restart_clears_session_and_start_reuses_candidate() {
        let h = harness(FakeEvaluator::default());
        let out = h.service.start(start_request()).await.unwrap();
        h.service
            .answer(
                out.candidate_id,
                AnswerRequest {
                    answer: "partial".to_string(),
                    time_taken_secs: 10,
                },
            )
            .await
            .unwrap();

        h.service.restart(out.candidate_id).await.unwrap();
        assert!(h.sessions.map.lock().unwrap().is_empty());

        let again = h.service.start(start_request()).await.unwrap();
        assert_eq!(again.candidate_id, out.candidate_id);
        assert_eq!(again.current_question, 0);
        assert_eq!(h.candidates.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deferred_clear_removes_both_session_keys() {
        let candidates = Arc::new(FakeCandidates::default());
        let sessions = Arc::new(FakeSessions::default());
        let service = InterviewService::new(
            Arc::clone(&candidates) as Arc<dyn CandidateStore>,
            Arc::clone(&sessions) as Arc<dyn SessionStore>,
            Arc::new(FakeEvaluator::default()),
            Duration::ZERO,
        );
        let h = Harness {
            service,
            candidates,
            sessions,
        };

        let out = h.service.start(start_request()).await.unwrap();
        answer_all(&h, out.candidate_id, "fine").await;

        // Let the spawned clear task run.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(h.sessions.map.lock().unwrap().is_empty());
    }

    /// Never completes; the evaluator's deadline must fire.
    struct HangingTransport;

    #[async_trait]
    impl LlmTransport for HangingTransport {
        async fn call(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scoring_timeout_falls_back_and_still_persists_the_record() {
        let candidates = Arc::new(FakeCandidates::default());
        let sessions = Arc::new(FakeSessions::default());
        let service = InterviewService::new(
            Arc::clone(&candidates) as Arc<dyn CandidateStore>,
            Arc::clone(&sessions) as Arc<dyn SessionStore>,
            Arc::new(LlmEvaluator::new(HangingTransport, 25)),
            Duration::from_secs(600),
        );
        let h = Harness {
            service,
            candidates,
            sessions,
        };

        // Generation also times out, so the fixed sequence applies.
        let out = h.service.start(start_request()).await.unwrap();

        let after = h
            .service
            .answer(
                out.candidate_id,
                AnswerRequest {
                    answer: String::new(),
                    time_taken_secs: 20,
                },
            )
            .await
            .unwrap();

        // The deadline only races the scoring step; once it settles the
        // locally scored record still lands in the store.
        assert_eq!(after.current_question, 1);
        let answers = h.candidates.answers.lock().unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].overall, 1);
    }

    #[tokio::test]
    async fn answered_interview_rejects_further_answers() {
        let h = harness(FakeEvaluator::default());
        let out = h.service.start(start_request()).await.unwrap();
        answer_all(&h, out.candidate_id, "fine").await;

        let err = h
            .service
            .answer(
                out.candidate_id,
                AnswerRequest {
                    answer: "late".to_string(),
                    time_taken_secs: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn flight_guard_is_exclusive_per_session() {
        let set = Mutex::new(HashSet::new());
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();

        let first = FlightGuard::acquire(&set, id).expect("first acquire");
        assert!(FlightGuard::acquire(&set, id).is_none());
        assert!(FlightGuard::acquire(&set, other).is_some());

        drop(first);
        assert!(FlightGuard::acquire(&set, id).is_some());
    }
}
