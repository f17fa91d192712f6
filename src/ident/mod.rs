//! Identifier allocation for papers and corrections.
//!
//! Codes are nine zero-padded digits split into hyphenated triples
//! (`012-345-678`), drawn from [0, 999_999_999]. A candidate is seeded from the
//! uploaded document's bytes and probed against the store until an unused code
//! is found; the probe sequence is configurable.

mod tests;

use std::future::Future;

use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Size of the identifier space: codes encode integers in [0, 999_999_999].
pub const CODE_SPACE: u64 = 1_000_000_000;

#[derive(Debug, Error)]
pub enum AllocateError {
    #[error("no unused identifier found after {0} attempts")]
    Exhausted(u32),
    #[error("identifier existence check failed: {0}")]
    Store(#[from] sqlx::Error),
}

/// How the next candidate is derived after a collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStrategy {
    /// Linear probing: wrapping increment.
    Increment,
    /// Hash the previous code to jump elsewhere in the space.
    Rehash,
    /// Draw a fresh random value.
    Random,
}

impl ProbeStrategy {
    fn next(self, current: u64) -> u64 {
        match self {
            Self::Increment => (current + 1) % CODE_SPACE,
            Self::Rehash => hash_to_value(format_code(current).as_bytes()),
            Self::Random => rand::rng().random_range(0..CODE_SPACE),
        }
    }
}

/// Formats `value` as nine zero-padded digits split every three with a `-`.
/// Usable as a DOI suffix too.
pub fn format_code(value: u64) -> String {
    let digits = format!("{:09}", value % CODE_SPACE);
    format!("{}-{}-{}", &digits[0..3], &digits[3..6], &digits[6..9])
}

/// Derives the initial candidate from the uploaded document's contents.
pub fn seed_from_bytes(bytes: &[u8]) -> u64 {
    hash_to_value(bytes)
}

fn hash_to_value(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix) % CODE_SPACE
}

/// Finds an unused code, starting from `seed` and probing with `strategy`.
///
/// `exists` is the backing existence check; if it errors the allocation fails
/// and the caller must not create a partially-identified record. There is a
/// check-then-act window between `exists` and the caller's insert under
/// concurrent submissions; the primary key on the papers table turns the losing
/// writer into an insert error rather than an overwrite.
pub async fn allocate<F, Fut>(
    seed: u64,
    strategy: ProbeStrategy,
    max_attempts: u32,
    exists: F,
) -> Result<String, AllocateError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<bool, sqlx::Error>>,
{
    let mut candidate = seed % CODE_SPACE;

    for _ in 0..max_attempts {
        let code = format_code(candidate);
        if !exists(code.clone()).await? {
            return Ok(code);
        }
        candidate = strategy.next(candidate);
    }

    Err(AllocateError::Exhausted(max_attempts))
}
