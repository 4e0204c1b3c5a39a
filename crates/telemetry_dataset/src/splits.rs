//! Seeded development/test splitting of a held-out pool.

use crate::types::WindowSet;
use rand::{seq::SliceRandom, SeedableRng};

/// Fraction of the held-out pool assigned to the development split.
pub const DEV_FRACTION: f64 = 0.5;

/// Permute the pool with `seed` and cut it into `(dev, test)`.
///
/// The development split takes the first `round_half_even(n * 0.5)` permuted
/// windows; the test split takes the rest. The two are disjoint and cover the pool.
pub fn split_dev_test(pool: &WindowSet, seed: u64) -> (WindowSet, WindowSet) {
    let mut order: Vec<usize> = (0..pool.len()).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let cut = dev_len(pool.len());
    let (dev_idx, test_idx) = order.split_at(cut);
    (pool.select(dev_idx), pool.select(test_idx))
}

pub fn dev_len(pool_len: usize) -> usize {
    (pool_len as f64 * DEV_FRACTION).round_ties_even() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_contracts::WindowShape;

    fn pool(n: usize) -> WindowSet {
        let features = (0..n).map(|i| i as f32).collect();
        let labels = (0..n).map(|i| (i % 2) as f32).collect();
        WindowSet::new(WindowShape::new(1, 1), features, labels).unwrap()
    }

    #[test]
    fn split_is_disjoint_and_complete() {
        let p = pool(11);
        let (dev, test) = split_dev_test(&p, 2024);
        assert_eq!(dev.len() + test.len(), 11);
        let mut seen: Vec<f32> = dev.features().iter().chain(test.features()).copied().collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(seen, (0..11).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn split_is_seed_deterministic() {
        let p = pool(40);
        assert_eq!(split_dev_test(&p, 7), split_dev_test(&p, 7));
        assert_ne!(split_dev_test(&p, 7).0, split_dev_test(&p, 8).0);
    }

    #[test]
    fn dev_len_rounds_half_to_even() {
        assert_eq!(dev_len(100), 50);
        assert_eq!(dev_len(101), 50);
        assert_eq!(dev_len(103), 52);
        assert_eq!(dev_len(0), 0);
    }
}
