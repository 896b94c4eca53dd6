//! Edit-distance based "did you mean" suggestions for catalog lookups.

/// Return the `limit` closest candidates to `query` by Levenshtein distance,
/// nearest first. Ties are broken by input order.
pub fn closest(query: &str, candidates: impl IntoIterator<Item = impl AsRef<str>>, limit: usize) -> Vec<String> {
    let query = query.to_lowercase();
    let mut scored: Vec<(usize, String)> = candidates
        .into_iter()
        .map(|c| {
            let c = c.as_ref().to_string();
            let distance = levenshtein(&query, &c.to_lowercase());
            (distance, c)
        })
        .collect();
    scored.sort_by_key(|a| a.0);
    scored.into_iter().take(limit).map(|(_, c)| c).collect()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    let mut row: Vec<usize> = (0..=m).collect();

    for i in 1..=n {
        let mut prev_diag = row[0];
        row[0] = i;
        for j in 1..=m {
            let temp = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev_diag
            } else {
                1 + prev_diag.min(row[j]).min(row[j - 1])
            };
            prev_diag = temp;
        }
    }
    row[m]
}
