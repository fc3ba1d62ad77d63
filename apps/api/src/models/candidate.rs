use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One persistent record per unique email. `final_score` of 0 means "unset";
/// the authoritative displayed score is then recomputed from answer records.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
    pub final_score: f64,
    pub final_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Onboarding,
    InProgress,
    Completed,
    Incomplete,
}

impl CandidateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStatus::Onboarding => "onboarding",
            CandidateStatus::InProgress => "in_progress",
            CandidateStatus::Completed => "completed",
            CandidateStatus::Incomplete => "incomplete",
        }
    }
}
