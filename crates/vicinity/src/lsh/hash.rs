//! Table hash: k random projections combined into one bucket key.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::projection::L2Hash;

/// Large prime modulus for the combined hash, `2^32 - 5`.
const COMBINE_PRIME: i64 = 4_294_967_291;

/// Seed for the combining coefficients. Fixed independently of the user seed
/// so the coefficient stream is identical across tables and runs.
const COEFF_SEED: u64 = 42;

/// The per-table `g` function: an ordered bundle of `k` projection hashes
/// with positive combining coefficients.
pub(crate) struct CombinedHash {
    hashes: Vec<L2Hash>,
    coeffs: Vec<i64>,
}

impl CombinedHash {
    /// Build `k` fresh projection hashes from `rng` plus the fixed
    /// coefficient stream.
    pub(crate) fn new(dim: usize, width: f32, k: usize, rng: &mut StdRng) -> Self {
        let hashes = (0..k).map(|_| L2Hash::new(dim, width, rng)).collect();

        let mut coeff_rng = StdRng::seed_from_u64(COEFF_SEED);
        let coeffs = (0..k)
            .map(|_| coeff_rng.gen_range(1..=1_000_000_000i64))
            .collect();

        Self { hashes, coeffs }
    }

    /// The full pre-modulus identity `(sum r_i * h_i(p)) mod M`, always
    /// non-negative and below `2^32 - 5`.
    pub(crate) fn identity(&self, p: &[f32]) -> u32 {
        let mut sum: i64 = 0;
        for (h, &r) in self.hashes.iter().zip(&self.coeffs) {
            let hv = h.hash(p);
            // i128 product: r can reach 1e9 and h is unbounded in theory
            sum += ((r as i128 * hv as i128) % COMBINE_PRIME as i128) as i64;
        }
        (((sum % COMBINE_PRIME) + COMBINE_PRIME) % COMBINE_PRIME) as u32
    }

    /// Bucket index for a table of `table_size` buckets.
    pub(crate) fn bucket(&self, identity: u32, table_size: usize) -> usize {
        (identity as u64 % table_size as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_below_modulus() {
        let mut rng = StdRng::seed_from_u64(1);
        let g = CombinedHash::new(4, 4.0, 4, &mut rng);
        let id = g.identity(&[100.0, -50.0, 3.0, 0.5]);
        assert!((id as i64) < COMBINE_PRIME);
    }

    #[test]
    fn test_coefficients_shared_across_tables() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = CombinedHash::new(4, 4.0, 4, &mut rng);
        let b = CombinedHash::new(4, 4.0, 4, &mut rng);
        // Same coefficient stream, different projection hashes.
        assert_eq!(a.coeffs, b.coeffs);
    }

    #[test]
    fn test_identity_deterministic() {
        let mut rng_a = StdRng::seed_from_u64(5);
        let mut rng_b = StdRng::seed_from_u64(5);
        let g_a = CombinedHash::new(8, 4.0, 6, &mut rng_a);
        let g_b = CombinedHash::new(8, 4.0, 6, &mut rng_b);

        let p = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        assert_eq!(g_a.identity(&p), g_b.identity(&p));
    }
}
