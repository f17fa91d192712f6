#[cfg(test)]
mod tests {
    use crate::fuzzy::partial_match_score;

    #[test]
    fn empty_query_matches_everything() {
        assert_eq!(partial_match_score("", ""), 1.0);
        assert_eq!(partial_match_score("", "anything at all"), 1.0);
    }

    #[test]
    fn exact_match_scores_one() {
        assert_eq!(partial_match_score("abc", "abc"), 1.0);
        assert_eq!(partial_match_score("abc", "xx abc yy"), 1.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(partial_match_score("xyz", "abc"), 0.0);
    }

    #[test]
    fn partial_overlap_scores_between() {
        // "ab" contributes substrings "a", "b", "ab"; "c" finds nothing.
        let score = partial_match_score("abc", "ab");
        assert!(score > 0.0 && score < 1.0);
        assert_eq!(score, 6.0 / 12.0);
    }

    #[test]
    fn more_overlap_never_lowers_the_score() {
        let query = "neural networks";
        let a = partial_match_score(query, "neu");
        let b = partial_match_score(query, "neural");
        let c = partial_match_score(query, "neural net");
        let d = partial_match_score(query, "neural networks");
        assert!(a <= b && b <= c && c <= d);
        assert_eq!(d, 1.0);
    }

    #[test]
    fn single_char_query() {
        assert_eq!(partial_match_score("a", "a"), 1.0);
        assert_eq!(partial_match_score("a", "b"), 0.0);
    }

    #[test]
    fn multibyte_queries_are_char_based() {
        // L = 2 chars, all 3 substrings present.
        assert_eq!(partial_match_score("éß", "xéßy"), 1.0);
        // Only "é" matches out of {"é", "ß", "éß"}.
        assert_eq!(partial_match_score("éß", "é"), 2.0 / 6.0);
    }

    #[test]
    fn score_is_not_symmetric() {
        // Every substring of "ab" is in "abab", but not vice versa.
        assert_eq!(partial_match_score("ab", "abab"), 1.0);
        assert!(partial_match_score("abab", "ab") < 1.0);
    }
}
