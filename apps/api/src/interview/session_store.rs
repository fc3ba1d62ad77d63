//! Session resumption storage: two keyed records per candidate (identity and
//! session state), always written and cleared together, never partially.
//! Redis-backed in production; tests use an in-memory fake.

use async_trait::async_trait;
use uuid::Uuid;

use super::models::{CandidateIdentity, SessionState};
use crate::errors::AppError;

/// A loaded identity/session pair.
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub identity: CandidateIdentity,
    pub session: SessionState,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Writes both records atomically (a reader never sees one without the
    /// other).
    async fn save(
        &self,
        identity: &CandidateIdentity,
        session: &SessionState,
    ) -> Result<(), AppError>;

    async fn load(&self, candidate_id: Uuid) -> Result<Option<StoredSession>, AppError>;

    /// Deletes both records in one operation.
    async fn clear(&self, candidate_id: Uuid) -> Result<(), AppError>;
}

pub struct RedisSessionStore {
    client: redis::Client,
}

impl RedisSessionStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn identity_key(candidate_id: Uuid) -> String {
        format!("interview:identity:{candidate_id}")
    }

    fn session_key(candidate_id: Uuid) -> String {
        format!("interview:session:{candidate_id}")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(
        &self,
        identity: &CandidateIdentity,
        session: &SessionState,
    ) -> Result<(), AppError> {
        let identity_json = serde_json::to_string(identity)
            .map_err(|e| AppError::SessionStore(e.to_string()))?;
        let session_json = serde_json::to_string(session)
            .map_err(|e| AppError::SessionStore(e.to_string()))?;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::pipe()
            .set(Self::identity_key(identity.id), identity_json)
            .set(Self::session_key(identity.id), session_json)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn load(&self, candidate_id: Uuid) -> Result<Option<StoredSession>, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let (identity_json, session_json): (Option<String>, Option<String>) = redis::pipe()
            .get(Self::identity_key(candidate_id))
            .get(Self::session_key(candidate_id))
            .query_async(&mut conn)
            .await?;

        let (Some(identity_json), Some(session_json)) = (identity_json, session_json) else {
            return Ok(None);
        };

        let identity = serde_json::from_str(&identity_json)
            .map_err(|e| AppError::SessionStore(e.to_string()))?;
        let session = serde_json::from_str(&session_json)
            .map_err(|e| AppError::SessionStore(e.to_string()))?;
        Ok(Some(StoredSession { identity, session }))
    }

    async fn clear(&self, candidate_id: Uuid) -> Result<(), AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("DEL")
            .arg(Self::identity_key(candidate_id))
            .arg(Self::session_key(candidate_id))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}
