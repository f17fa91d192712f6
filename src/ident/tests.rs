#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;

    use crate::ident::{
        AllocateError, CODE_SPACE, ProbeStrategy, allocate, format_code, seed_from_bytes,
    };

    fn is_valid_code(code: &str) -> bool {
        let parts: Vec<&str> = code.split('-').collect();
        parts.len() == 3
            && parts
                .iter()
                .all(|part| part.len() == 3 && part.chars().all(|c| c.is_ascii_digit()))
    }

    #[test]
    fn format_code_pads_and_groups() {
        assert_eq!(format_code(0), "000-000-000");
        assert_eq!(format_code(42), "000-000-042");
        assert_eq!(format_code(999_999_999), "999-999-999");
        assert_eq!(format_code(12_345_678), "012-345-678");
    }

    #[test]
    fn format_code_wraps_into_space() {
        assert_eq!(format_code(CODE_SPACE + 7), "000-000-007");
    }

    #[test]
    fn seed_is_deterministic_and_in_range() {
        let a = seed_from_bytes(b"manuscript bytes");
        let b = seed_from_bytes(b"manuscript bytes");
        assert_eq!(a, b);
        assert!(a < CODE_SPACE);
        assert_ne!(a, seed_from_bytes(b"other bytes"));
    }

    #[tokio::test]
    async fn allocations_are_distinct() {
        let used = RefCell::new(HashSet::new());
        let exists = |code: String| {
            let used = &used;
            async move { Ok::<bool, sqlx::Error>(used.borrow().contains(&code)) }
        };

        // Same seed every time forces the probe loop to do the work.
        for _ in 0..50 {
            let code = allocate(7, ProbeStrategy::Increment, 100, &exists)
                .await
                .unwrap();
            assert!(is_valid_code(&code));
            assert!(used.borrow_mut().insert(code));
        }
        assert_eq!(used.borrow().len(), 50);
    }

    #[tokio::test]
    async fn increment_wraps_at_end_of_space() {
        let used = RefCell::new(HashSet::from([format_code(CODE_SPACE - 1)]));
        let exists = |code: String| {
            let used = &used;
            async move { Ok::<bool, sqlx::Error>(used.borrow().contains(&code)) }
        };

        let code = allocate(CODE_SPACE - 1, ProbeStrategy::Increment, 10, exists)
            .await
            .unwrap();
        assert_eq!(code, "000-000-000");
    }

    #[tokio::test]
    async fn rehash_and_random_terminate_with_valid_codes() {
        for strategy in [ProbeStrategy::Rehash, ProbeStrategy::Random] {
            let used = RefCell::new(HashSet::from([format_code(3)]));
            let exists = |code: String| {
                let used = &used;
                async move { Ok::<bool, sqlx::Error>(used.borrow().contains(&code)) }
            };

            let code = allocate(3, strategy, 100, exists).await.unwrap();
            assert!(is_valid_code(&code));
            assert_ne!(code, format_code(3));
        }
    }

    #[tokio::test]
    async fn exhaustion_is_reported() {
        let exists = |_code: String| async { Ok::<bool, sqlx::Error>(true) };

        let err = allocate(0, ProbeStrategy::Increment, 5, exists)
            .await
            .unwrap_err();
        assert!(matches!(err, AllocateError::Exhausted(5)));
    }

    #[tokio::test]
    async fn store_failure_aborts_allocation() {
        let exists = |_code: String| async { Err::<bool, sqlx::Error>(sqlx::Error::PoolClosed) };

        let err = allocate(0, ProbeStrategy::Increment, 5, exists)
            .await
            .unwrap_err();
        assert!(matches!(err, AllocateError::Store(_)));
    }
}
