//! Fingerprint & Output Cache port
//!
//! Two-tier (memory + disk) content-addressed cache over `ModeOutput`,
//! keyed by `ModeOutputFingerprint`. Implementations live in the
//! infrastructure layer.

use async_trait::async_trait;
use ensemble_domain::cache::{LookupResult, ModeOutputFingerprint};
use ensemble_domain::mode_output::ModeOutput;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn lookup(
        &self,
        fingerprint: &ModeOutputFingerprint,
    ) -> Result<LookupResult<ModeOutput>, CacheError>;

    async fn store(
        &self,
        fingerprint: &ModeOutputFingerprint,
        output: &ModeOutput,
    ) -> Result<(), CacheError>;
}
