//! Context Pack Generator
//!
//! Assembles a `ContextPack` from the normalized question, a project
//! identifier, and whatever informative project sections the caller
//! supplies (README excerpt, manifest, recent task results). The hash is
//! content-addressed so identical inputs always produce the same pack.

use chrono::Utc;
use ensemble_domain::context::{hash_inputs, ContextPack, MIN_INFORMATIVE_SECTIONS};
use ensemble_domain::core::Question;
use sha2::{Digest, Sha256};

/// One named, possibly-empty project section considered for inclusion in
/// the context pack (e.g. "readme", "manifest", "recent_tasks").
#[derive(Debug, Clone)]
pub struct ProjectSection {
    pub name: String,
    pub content: String,
}

impl ProjectSection {
    fn is_informative(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// Rough token estimate: four characters per token, the same ballpark
/// figure used by context-budget truncation elsewhere in the pipeline.
fn estimate_tokens(text: &str) -> u32 {
    (text.len() as u32).div_ceil(4)
}

fn digest_sections(sections: &[ProjectSection]) -> String {
    let mut hasher = Sha256::new();
    for section in sections {
        hasher.update(section.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(section.content.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Build a `ContextPack` for `question` against a project's informative
/// sections. When fewer than `MIN_INFORMATIVE_SECTIONS` sections carry
/// content, the pack is marked thin and `questions` is populated with a
/// clarifying prompt rather than failing the run.
pub fn generate_context_pack(
    question: &Question,
    project_id: &str,
    sections: &[ProjectSection],
) -> ContextPack {
    let informative_count = sections.iter().filter(|s| s.is_informative()).count();
    let snapshot_digest = digest_sections(sections);
    let hash = hash_inputs(question.content(), project_id, &snapshot_digest);

    let token_estimate = sections.iter().map(|s| estimate_tokens(&s.content)).sum::<u32>()
        + estimate_tokens(question.content());

    let questions = if informative_count < MIN_INFORMATIVE_SECTIONS {
        vec![
            "the project context is thin — consider adding a README or manifest for richer answers"
                .to_string(),
        ]
    } else {
        Vec::new()
    };

    ContextPack {
        hash,
        token_estimate,
        questions,
        generated_at: Utc::now(),
    }
}
