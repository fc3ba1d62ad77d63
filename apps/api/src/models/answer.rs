use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable record of one answered question. Inserted exactly once,
/// immediately after scoring; never updated. `question_number` is 1-based
/// and rows for a candidate are only ever created in question order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnswerRecordRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub question_number: i32,
    pub question_text: String,
    pub difficulty: String,
    pub time_limit_secs: i32,
    pub answer: String,
    pub time_taken_secs: i32,
    pub technical: i16,
    pub clarity: i16,
    pub problem_solving: i16,
    pub overall: i16,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
}
