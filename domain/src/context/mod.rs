//! Context pack entity: a reusable, hash-addressable context bundle for a
//! question, shared by reference between the cache and any in-flight runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Minimum number of informative sections a pack needs before it is
/// considered "thin" (spec.md §4.3 / glossary).
pub const MIN_INFORMATIVE_SECTIONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPack {
    pub hash: String,
    pub token_estimate: u32,
    pub questions: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl ContextPack {
    pub fn is_thin(&self) -> bool {
        !self.questions.is_empty()
    }
}

/// Deterministic content hash over the inputs that influence a
/// `ContextPack`: normalized question text, project identifier, and a
/// digest of the collaborator-provided project snapshot sections.
///
/// Stable across processes for identical inputs (the determinism law in
/// spec.md §8).
pub fn hash_inputs(question: &str, project_id: &str, snapshot_digest: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(question.as_bytes());
    hasher.update([0u8]);
    hasher.update(project_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(snapshot_digest.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let a = hash_inputs("why does this fail", "proj-1", "digest-a");
        let b = hash_inputs("why does this fail", "proj-1", "digest-a");
        assert_eq!(a, b);
    }

    #[test]
    fn hash_changes_with_any_input() {
        let base = hash_inputs("q", "p", "d");
        assert_ne!(base, hash_inputs("q2", "p", "d"));
        assert_ne!(base, hash_inputs("q", "p2", "d"));
        assert_ne!(base, hash_inputs("q", "p", "d2"));
    }

    #[test]
    fn thin_pack_carries_questions() {
        let pack = ContextPack {
            hash: "h".into(),
            token_estimate: 10,
            questions: vec!["what is the test plan?".into()],
            generated_at: Utc::now(),
        };
        assert!(pack.is_thin());
    }
}
