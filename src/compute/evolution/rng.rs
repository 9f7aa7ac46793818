//! Seeded randomness for population-based search.
//!
//! Provides random initialization and the trial-vector moves of the
//! reference optimizers. All draws come from one `StdRng`, so a search is
//! reproducible from its seed.

use rand::prelude::*;
use rand::seq::index;

use crate::schema::{Bound, Bounds, DesignVector};

/// Random number generator wrapper for design-vector operations.
pub struct DesignRng {
    rng: StdRng,
}

impl DesignRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform random vector within bounds.
    pub fn random_vector(&mut self, bounds: &Bounds) -> DesignVector {
        bounds
            .iter()
            .map(|v| match v.bound {
                Bound::Integer { lo, hi } => self.rng.gen_range(lo..=hi) as f64,
                Bound::Continuous { lo, hi } => self.rng.gen_range(lo..=hi),
            })
            .collect::<Vec<_>>()
            .into()
    }

    /// `count` distinct indices in `0..n`, none equal to `exclude`.
    ///
    /// Requires `n > count`.
    pub fn distinct_indices(&mut self, n: usize, exclude: usize, count: usize) -> Vec<usize> {
        index::sample(&mut self.rng, n, count + 1)
            .into_iter()
            .filter(|&i| i != exclude)
            .take(count)
            .collect()
    }

    /// DE/rand/1/bin trial: mutate from three donors, binomial crossover
    /// with `target`, then repair into bounds.
    pub fn differential_trial(
        &mut self,
        target: &[f64],
        donors: [&[f64]; 3],
        f: f64,
        cr: f64,
        bounds: &Bounds,
    ) -> DesignVector {
        let [a, b, c] = donors;
        // at least one position always comes from the mutant
        let forced = self.rng.gen_range(0..target.len().max(1));
        let mut trial: Vec<f64> = (0..target.len())
            .map(|j| {
                if j == forced || self.rng.r#gen::<f64>() < cr {
                    a[j] + f * (b[j] - c[j])
                } else {
                    target[j]
                }
            })
            .collect();
        bounds.repair(&mut trial);
        trial.into()
    }

    /// Jaya move: toward the best and away from the worst candidate.
    pub fn jaya_move(
        &mut self,
        current: &[f64],
        best: &[f64],
        worst: &[f64],
        bounds: &Bounds,
    ) -> DesignVector {
        let mut moved: Vec<f64> = current
            .iter()
            .zip(best.iter().zip(worst))
            .map(|(&x, (&b, &w))| {
                let r1 = self.rng.r#gen::<f64>();
                let r2 = self.rng.r#gen::<f64>();
                x + r1 * (b - x.abs()) - r2 * (w - x.abs())
            })
            .collect();
        bounds.repair(&mut moved);
        moved.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_vector_within_bounds() {
        let mut rng = DesignRng::new(42);
        let bounds = Bounds::uniform(36, Bound::BINARY);
        for _ in 0..20 {
            let v = rng.random_vector(&bounds);
            assert!(bounds.check(&v).is_ok());
        }
    }

    #[test]
    fn test_reproducible() {
        let bounds = Bounds::uniform(4, Bound::Continuous { lo: 0.0, hi: 4.0 });
        let a = DesignRng::new(7).random_vector(&bounds);
        let b = DesignRng::new(7).random_vector(&bounds);
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_indices() {
        let mut rng = DesignRng::new(1);
        for exclude in 0..4 {
            let picked = rng.distinct_indices(4, exclude, 3);
            assert_eq!(picked.len(), 3);
            assert!(!picked.contains(&exclude));
            let mut sorted = picked.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), 3);
        }
    }

    #[test]
    fn test_differential_trial_repairs() {
        let mut rng = DesignRng::new(3);
        let bounds = Bounds::uniform(10, Bound::BINARY);
        let zeros = [0.0; 10];
        let ones = [1.0; 10];
        for _ in 0..20 {
            let trial = rng.differential_trial(&zeros, [&ones[..], &ones[..], &zeros[..]], 0.5, 0.3, &bounds);
            assert!(bounds.check(&trial).is_ok());
        }
    }

    #[test]
    fn test_full_crossover_takes_mutant() {
        let mut rng = DesignRng::new(3);
        let bounds = Bounds::uniform(3, Bound::Continuous { lo: -10.0, hi: 10.0 });
        let trial = rng.differential_trial(
            &[0.0; 3],
            [&[1.0; 3][..], &[3.0; 3][..], &[1.0; 3][..]],
            0.5,
            1.0,
            &bounds,
        );
        assert_eq!(&*trial, &[2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_jaya_stays_in_bounds() {
        let mut rng = DesignRng::new(9);
        let bounds = Bounds::uniform(4, Bound::Continuous { lo: 0.0, hi: 359.634 });
        let moved = rng.jaya_move(&[10.0; 4], &[300.0; 4], &[0.0; 4], &bounds);
        assert!(bounds.check(&moved).is_ok());
    }
}
