//! Persistence service seam for candidates and answer records. The state
//! machine only sees `CandidateStore`; the sqlx-backed implementation lives
//! here and tests use an in-memory fake.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{AiScore, Difficulty};
use crate::errors::AppError;
use crate::models::answer::AnswerRecordRow;
use crate::models::candidate::{CandidateRow, CandidateStatus};

/// Insert payload for one answered question. `question_number` is 1-based.
#[derive(Debug, Clone)]
pub struct NewAnswerRecord {
    pub candidate_id: Uuid,
    pub question_number: i32,
    pub question_text: String,
    pub difficulty: Difficulty,
    pub time_limit_secs: u32,
    pub answer: String,
    pub time_taken_secs: u32,
    pub score: AiScore,
}

/// Partial candidate update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct CandidateUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub status: Option<CandidateStatus>,
    pub final_score: Option<f64>,
    pub final_summary: Option<String>,
}

#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<CandidateRow>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CandidateRow>, AppError>;

    /// Creates a candidate with status `in_progress` (candidates only come
    /// into existence when an interview starts).
    async fn create(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<CandidateRow, AppError>;

    async fn update(&self, id: Uuid, update: CandidateUpdate) -> Result<CandidateRow, AppError>;

    async fn insert_answer(&self, record: &NewAnswerRecord) -> Result<AnswerRecordRow, AppError>;

    /// Answer records for a candidate, ordered by question number.
    async fn list_answers(&self, candidate_id: Uuid) -> Result<Vec<AnswerRecordRow>, AppError>;
}

pub struct PgCandidateStore {
    pool: PgPool,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<CandidateRow>, AppError> {
        let row = sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CandidateRow>, AppError> {
        let row = sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<CandidateRow, AppError> {
        let row = sqlx::query_as::<_, CandidateRow>(
            r#"
            INSERT INTO candidates (id, name, email, phone, status, final_score)
            VALUES ($1, $2, $3, $4, 'in_progress', 0)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, update: CandidateUpdate) -> Result<CandidateRow, AppError> {
        let row = sqlx::query_as::<_, CandidateRow>(
            r#"
            UPDATE candidates SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                status = COALESCE($4, status),
                final_score = COALESCE($5, final_score),
                final_summary = COALESCE($6, final_summary),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.name)
        .bind(update.phone)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.final_score)
        .bind(update.final_summary)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_answer(&self, record: &NewAnswerRecord) -> Result<AnswerRecordRow, AppError> {
        let row = sqlx::query_as::<_, AnswerRecordRow>(
            r#"
            INSERT INTO answer_records
                (id, candidate_id, question_number, question_text, difficulty,
                 time_limit_secs, answer, time_taken_secs,
                 technical, clarity, problem_solving, overall, feedback)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.candidate_id)
        .bind(record.question_number)
        .bind(&record.question_text)
        .bind(record.difficulty.as_str())
        .bind(record.time_limit_secs as i32)
        .bind(&record.answer)
        .bind(record.time_taken_secs as i32)
        .bind(i16::from(record.score.technical))
        .bind(i16::from(record.score.clarity))
        .bind(i16::from(record.score.problem_solving))
        .bind(i16::from(record.score.overall))
        .bind(&record.score.feedback)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_answers(&self, candidate_id: Uuid) -> Result<Vec<AnswerRecordRow>, AppError> {
        let rows = sqlx::query_as::<_, AnswerRecordRow>(
            "SELECT * FROM answer_records WHERE candidate_id = $1 ORDER BY question_number",
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
