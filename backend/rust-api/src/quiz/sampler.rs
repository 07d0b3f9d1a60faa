use rand::Rng;

use crate::models::Question;

/// Draw `count` questions from `pool` uniformly at random, without
/// replacement, preserving no source order. Returns `min(count, pool.len())`
/// questions; an empty pool yields an empty result, which callers must treat
/// as a fetch failure rather than a zero-question attempt.
///
/// Partial Fisher-Yates: each prefix slot is swapped with a uniformly chosen
/// remaining element, so every subset and ordering is equally likely. The
/// comparator-based "random sort" this replaces does not produce uniform
/// permutations.
pub fn sample_questions<R: Rng + ?Sized>(
    rng: &mut R,
    mut pool: Vec<Question>,
    count: usize,
) -> Vec<Question> {
    let take = count.min(pool.len());
    for i in 0..take {
        let j = rng.random_range(i..pool.len());
        pool.swap(i, j);
    }
    pool.truncate(take);
    pool
}
