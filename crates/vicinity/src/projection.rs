//! Random-projection hash for Euclidean distance.
//!
//! `h(p) = floor((v . p + t) / w)` with `v` a Gaussian N(0,1) vector and
//! `t` a uniform offset in `[0, w)`. Shared by the LSH and Hypercube
//! indexes.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::simd;

#[derive(Clone, Debug)]
pub(crate) struct L2Hash {
    v: Vec<f32>,
    offset: f32,
    width: f32,
}

impl L2Hash {
    /// Draw a fresh hash function from `rng`: a Gaussian projection vector
    /// and an offset in `[0, w)`.
    pub(crate) fn new(dim: usize, width: f32, rng: &mut StdRng) -> Self {
        let v = (0..dim).map(|_| rng.sample::<f32, _>(StandardNormal)).collect();
        let offset = rng.gen_range(0.0..width);
        Self { v, offset, width }
    }

    /// Hash `p` to a signed bucket index.
    #[inline]
    pub(crate) fn hash(&self, p: &[f32]) -> i64 {
        let projection = simd::dot(&self.v, p);
        ((projection + self.offset) / self.width).floor() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_deterministic_for_seed() {
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let h_a = L2Hash::new(8, 4.0, &mut rng_a);
        let h_b = L2Hash::new(8, 4.0, &mut rng_b);

        let p = [0.5, -1.0, 2.0, 0.0, 3.5, -0.25, 1.0, 1.0];
        assert_eq!(h_a.hash(&p), h_b.hash(&p));
    }

    #[test]
    fn test_nearby_points_often_collide() {
        let mut rng = StdRng::seed_from_u64(42);
        let hashes: Vec<L2Hash> = (0..32).map(|_| L2Hash::new(2, 4.0, &mut rng)).collect();

        let p = [1.0, 2.0];
        let q = [1.1, 2.05];
        let collisions = hashes.iter().filter(|h| h.hash(&p) == h.hash(&q)).count();
        // projections of near-identical points land in the same width-4 bin
        // almost always
        assert!(collisions >= 28, "only {} of 32 hashes collided", collisions);
    }
}
