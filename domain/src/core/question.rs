//! Question value object.

use serde::{Deserialize, Serialize};

/// The question a run is answering (Value Object).
///
/// Normalization (trimming, collapsing internal whitespace) happens once at
/// construction so that the same question text always produces the same
/// [`crate::context::ContextPack::hash`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    content: String,
}

impl Question {
    /// Build a question, returning `None` if the content is empty or
    /// whitespace-only.
    pub fn try_new(content: impl Into<String>) -> Option<Self> {
        let normalized = normalize(&content.into());
        if normalized.is_empty() {
            None
        } else {
            Some(Self { content: normalized })
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
