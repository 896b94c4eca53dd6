//! State Store port
//!
//! Persists `EnsembleSession`s across process restarts. Implementations
//! live in the infrastructure layer (a rusqlite-backed adapter ships
//! there; tests use an in-memory double).

use async_trait::async_trait;
use ensemble_domain::session::{AssignmentStatus, EnsembleSession, SessionStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    #[error("session not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save(&self, session: &EnsembleSession) -> Result<(), StateStoreError>;

    async fn load(&self, session_name: &str) -> Result<EnsembleSession, StateStoreError>;

    async fn list(&self) -> Result<Vec<String>, StateStoreError>;

    async fn delete(&self, session_name: &str) -> Result<(), StateStoreError>;

    async fn update_status(
        &self,
        session_name: &str,
        status: SessionStatus,
    ) -> Result<(), StateStoreError>;

    async fn update_assignment_status(
        &self,
        session_name: &str,
        mode_id: &str,
        status: AssignmentStatus,
    ) -> Result<(), StateStoreError>;
}
