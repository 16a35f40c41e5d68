//! Product quantizer: per-subspace codebooks over coarse residuals.

use crate::kmeans::{self, KMeansParams};
use crate::{simd, Matrix, VicinityError};

/// Seed offset separating the per-subspace codebook k-means streams from the
/// coarse k-means stream.
const CODEBOOK_SEED_OFFSET: u64 = 1234;

/// Product quantizer.
///
/// Splits a `d`-dimensional residual into `m` sub-vectors of `d / m`
/// components and quantizes each against its own codebook of `2^nbits`
/// codewords, so one base vector compresses to `m` bytes.
pub struct ProductQuantizer {
    num_subspaces: usize,
    codebook_size: usize,
    sub_dim: usize,
    codebooks: Vec<Matrix>,
}

impl ProductQuantizer {
    /// Train codebooks on the residuals of the first `trainN` base points,
    /// where `trainN = min(n, max(2^nbits, floor(sqrt(n))))`.
    ///
    /// `assign` and `centroids` come from the coarse k-means; the residual of
    /// point `i` is `base[i] - centroids[assign[i]]`.
    pub(crate) fn train(
        base: &Matrix,
        assign: &[u32],
        centroids: &Matrix,
        m: usize,
        nbits: u32,
        seed: u64,
    ) -> Result<Self, VicinityError> {
        let d = base.d();
        if m == 0 {
            return Err(VicinityError::InvalidParameter(
                "pq: subspace count must be at least 1".to_string(),
            ));
        }
        if nbits < 1 || nbits > 8 {
            return Err(VicinityError::InvalidParameter(format!(
                "pq: nbits must be in [1, 8] for one-byte codes, got {}",
                nbits
            )));
        }
        if d % m != 0 {
            return Err(VicinityError::InvalidParameter(format!(
                "pq: dimension {} is not divisible by {} subspaces",
                d, m
            )));
        }
        let sub_dim = d / m;
        let codebook_size = 1usize << nbits;

        let n = base.n();
        let train_n = crate::ivf::default_train_subset(n)
            .max(codebook_size)
            .min(n);

        // One k-means per subspace, each over the residual slices of the
        // training prefix.
        let mut codebooks = Vec::with_capacity(m);
        for si in 0..m {
            let lo = si * sub_dim;
            let hi = (si + 1) * sub_dim;

            let mut residuals = Vec::with_capacity(train_n * sub_dim);
            for t in 0..train_n {
                let x = &base.row(t)[lo..hi];
                let c = &centroids.row(assign[t] as usize)[lo..hi];
                residuals.extend(x.iter().zip(c).map(|(xv, cv)| xv - cv));
            }
            let residuals = Matrix::new(train_n, sub_dim, residuals)?;

            let km = kmeans::train(
                &residuals,
                &KMeansParams {
                    k: codebook_size,
                    seed: seed + CODEBOOK_SEED_OFFSET + si as u64,
                    train_subset: None,
                    ..KMeansParams::default()
                },
            )?;
            codebooks.push(km.centroids);
        }

        Ok(Self {
            num_subspaces: m,
            codebook_size,
            sub_dim,
            codebooks,
        })
    }

    /// Index of the codeword closest to the residual slice `r` in subspace
    /// `si`. Fits one byte because `codebook_size <= 256`.
    pub(crate) fn nearest_code(&self, si: usize, r: &[f32]) -> u8 {
        let codebook = &self.codebooks[si];
        let mut best = 0u8;
        let mut best_d = f32::INFINITY;
        for (h, codeword) in codebook.rows().enumerate() {
            let d = simd::l2_sq(r, codeword);
            if d < best_d {
                best_d = d;
                best = h as u8;
            }
        }
        best
    }

    /// Fill `lut` with the `m x s` table
    /// `lut[si * s + h] = || r_q[subspace si] - codeword h ||^2`
    /// for the full-dimensional query residual `r_q`.
    pub(crate) fn build_lut(&self, r_q: &[f32], lut: &mut Vec<f32>) {
        lut.clear();
        lut.reserve(self.num_subspaces * self.codebook_size);
        for si in 0..self.num_subspaces {
            let slice = &r_q[si * self.sub_dim..(si + 1) * self.sub_dim];
            for codeword in self.codebooks[si].rows() {
                lut.push(simd::l2_sq(slice, codeword));
            }
        }
    }

    /// Asymmetric distance of one packed code against a prepared LUT:
    /// the sum of per-subspace squared sub-distances.
    #[inline]
    pub(crate) fn adc(&self, lut: &[f32], code: &[u8]) -> f32 {
        code.iter()
            .enumerate()
            .map(|(si, &h)| lut[si * self.codebook_size + h as usize])
            .sum()
    }

    /// Number of subspaces `m`.
    pub fn num_subspaces(&self) -> usize {
        self.num_subspaces
    }

    /// Codewords per subspace, `2^nbits`.
    pub fn codebook_size(&self) -> usize {
        self.codebook_size
    }

    /// Components per subspace, `d / m`.
    pub fn sub_dim(&self) -> usize {
        self.sub_dim
    }

    /// Codebook of subspace `si` (`codebook_size x sub_dim`).
    /// For testing/debugging.
    pub fn codebook(&self, si: usize) -> &Matrix {
        &self.codebooks[si]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn random_base(n: usize, d: usize) -> Matrix {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let data = (0..n * d).map(|_| rng.gen_range(-1.0..1.0)).collect();
        Matrix::new(n, d, data).unwrap()
    }

    fn coarse(base: &Matrix, k: usize) -> (Vec<u32>, Matrix) {
        let km = kmeans::train(
            base,
            &KMeansParams {
                k,
                seed: 1,
                ..KMeansParams::default()
            },
        )
        .unwrap();
        (km.assign, km.centroids)
    }

    #[test]
    fn test_codebook_shapes() {
        let base = random_base(256, 16);
        let (assign, centroids) = coarse(&base, 4);
        let pq = ProductQuantizer::train(&base, &assign, &centroids, 4, 4, 1).unwrap();

        assert_eq!(pq.num_subspaces(), 4);
        assert_eq!(pq.codebook_size(), 16);
        assert_eq!(pq.sub_dim(), 4);
        for si in 0..4 {
            assert_eq!(pq.codebook(si).n(), 16);
            assert_eq!(pq.codebook(si).d(), 4);
        }
    }

    #[test]
    fn test_rejects_bad_config() {
        let base = random_base(64, 16);
        let (assign, centroids) = coarse(&base, 4);

        // d not divisible by m
        assert!(ProductQuantizer::train(&base, &assign, &centroids, 3, 4, 1).is_err());
        // nbits outside one byte
        assert!(ProductQuantizer::train(&base, &assign, &centroids, 4, 0, 1).is_err());
        assert!(ProductQuantizer::train(&base, &assign, &centroids, 4, 9, 1).is_err());
        assert!(ProductQuantizer::train(&base, &assign, &centroids, 0, 4, 1).is_err());
    }

    #[test]
    fn test_adc_matches_lut_sum() {
        let base = random_base(128, 8);
        let (assign, centroids) = coarse(&base, 2);
        let pq = ProductQuantizer::train(&base, &assign, &centroids, 2, 3, 1).unwrap();

        let r_q = [0.3, -0.2, 0.7, 0.1, -0.4, 0.9, 0.0, 0.25];
        let mut lut = Vec::new();
        pq.build_lut(&r_q, &mut lut);
        assert_eq!(lut.len(), 2 * 8);

        let code = [3u8, 5u8];
        let expected = lut[3] + lut[8 + 5];
        assert!((pq.adc(&lut, &code) - expected).abs() < 1e-6);
    }
}
