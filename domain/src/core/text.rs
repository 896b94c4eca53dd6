//! Text normalization and Jaccard similarity, shared by the merger's
//! deduplication, the auditor's divergence detector, and the coordinator's
//! early-stop predicate.

use std::collections::HashSet;

/// Lowercase, collapse non-alphanumerics to spaces, and tokenize.
pub fn normalize_tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(|s| s.to_string())
        .collect()
}

/// Jaccard similarity between two token sets: `|A∩B| / |A∪B|`. Two empty
/// sets are defined as similarity 0 (nothing to compare).
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Convenience wrapper over raw strings.
pub fn jaccard_text(a: &str, b: &str) -> f64 {
    jaccard(&normalize_tokens(a), &normalize_tokens(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_is_similarity_one() {
        assert_eq!(jaccard_text("the cause is X", "The Cause Is X!"), 1.0);
    }

    #[test]
    fn disjoint_text_is_similarity_zero() {
        assert_eq!(jaccard_text("apples and oranges", "quantum gravity theory"), 0.0);
    }

    #[test]
    fn normalize_collapses_punctuation() {
        let tokens = normalize_tokens("X is the cause!!");
        assert!(tokens.contains("x"));
        assert!(tokens.contains("cause"));
    }
}
