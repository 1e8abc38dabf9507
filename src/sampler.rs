//! Sampler
//!
//! Seeded row sampling for each tree, and predictor sampling for each split.
use crate::constants::{OUT_OF_BAG, TREE_SEED_STRIDE};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};

/// Random number generator of one tree, derived from the model seed.
pub fn tree_rng(seed: u64, tree: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (tree as u64 + 1).wrapping_mul(TREE_SEED_STRIDE))
}

// A sampler chooses the rows a tree is grown from.
pub trait Sampler {
    /// Place the rows of a new tree, returning the node of every row:
    /// the root for sampled rows, [`OUT_OF_BAG`] for the others.
    fn sample(&self, rng: &mut StdRng, n_rows: usize) -> Vec<u32>;
}

/// Samples every row independently, without replacement.
pub struct RandomSampler {
    sample_rate: f64,
}

impl RandomSampler {
    pub fn new(sample_rate: f64) -> Self {
        RandomSampler { sample_rate }
    }
}

impl Sampler for RandomSampler {
    fn sample(&self, rng: &mut StdRng, n_rows: usize) -> Vec<u32> {
        if self.sample_rate >= 1.0 {
            return vec![0; n_rows];
        }
        (0..n_rows)
            .map(|_| if rng.gen::<f64>() < self.sample_rate { 0 } else { OUT_OF_BAG })
            .collect()
    }
}

/// Draw `mtries` of `n_features` predictors, returned in ascending order.
pub fn sample_features(rng: &mut StdRng, n_features: usize, mtries: usize) -> Vec<usize> {
    if mtries >= n_features {
        return (0..n_features).collect();
    }
    let mut features = sample(rng, n_features, mtries).into_vec();
    features.sort_unstable();
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_sampler() {
        let mut rng = tree_rng(42, 0);
        let sampler = RandomSampler::new(0.5);
        let rows = sampler.sample(&mut rng, 1000);
        let chosen = rows.iter().filter(|r| **r == 0).count();
        assert_eq!(rows.len(), 1000);
        assert!(chosen > 400 && chosen < 600);

        // Test with sample rate 1.0 (all should be chosen)
        let rows = RandomSampler::new(1.0).sample(&mut rng, 10);
        assert!(rows.iter().all(|r| *r == 0));
    }

    #[test]
    fn test_sampling_is_seeded() {
        let sampler = RandomSampler::new(0.632);
        let a = sampler.sample(&mut tree_rng(7, 3), 100);
        let b = sampler.sample(&mut tree_rng(7, 3), 100);
        let c = sampler.sample(&mut tree_rng(7, 4), 100);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_sample_features() {
        let mut rng = tree_rng(0, 0);
        assert_eq!(sample_features(&mut rng, 4, 4), vec![0, 1, 2, 3]);
        assert_eq!(sample_features(&mut rng, 4, 10), vec![0, 1, 2, 3]);
        let f = sample_features(&mut rng, 10, 3);
        assert_eq!(f.len(), 3);
        assert!(f.windows(2).all(|w| w[0] < w[1]));
        assert!(f.iter().all(|v| *v < 10));
    }
}
