//! Substring-quality scoring for search.
//!
//! Replaces an exact `LIKE` match with a graded score: every contiguous
//! substring of the query is tested against the candidate, so partial overlap
//! still counts. The search routes combine this score across paper fields
//! against a caller-supplied quality limit.

mod tests;

/// Scores how well `query` occurs inside `candidate`, in [0, 1].
///
/// An empty query vacuously matches everything and scores 1.0. Otherwise the
/// score is `(2 * matching_substrings) / (L * (L + 1))` where L is the query
/// length in chars and `matching_substrings` counts every (start, length) pair
/// of the query found in the candidate. Not symmetric in its arguments: query
/// substrings are tested against the candidate, never the reverse.
pub fn partial_match_score(query: &str, candidate: &str) -> f64 {
    let chars: Vec<char> = query.chars().collect();
    let len = chars.len();
    if len == 0 {
        return 1.0;
    }

    let mut matching = 0u64;
    for start in 0..len {
        let mut needle = String::new();
        for end in start..len {
            needle.push(chars[end]);
            if candidate.contains(&needle) {
                matching += 1;
            }
        }
    }

    (2 * matching) as f64 / (len * (len + 1)) as f64
}
