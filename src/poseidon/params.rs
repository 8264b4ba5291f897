//! Permutation parameter sets.
//!
//! A [`PermutationConfig`] can only be obtained through validation, so every
//! instance in circulation has consistent round counts, constant counts and
//! an invertible square MDS matrix.

use crate::error::{ErrorCode, PoseidonResult};
use crate::field::{self, Fr};
use num_bigint::BigUint;

/// Kind of a single round in the permutation schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundKind {
    /// S-box applied to every state element.
    Full,
    /// S-box applied to state element 0 only.
    Partial,
}

/// Unvalidated parameter material, as produced by generation or loaded
/// from an external source.
#[derive(Debug, Clone)]
pub struct RawParameters {
    /// State width `t`.
    pub width: usize,
    /// Total full rounds `RF` (split evenly around the partial rounds).
    pub full_rounds: usize,
    /// Partial rounds `RP`.
    pub partial_rounds: usize,
    /// S-box exponent.
    pub alpha: u64,
    /// Nominal security level in bits.
    pub security_level: u32,
    /// Round-major constants, `(RF + RP) * t` entries.
    pub round_constants: Vec<Fr>,
    /// `t x t` mixing matrix, row-major.
    pub mds: Vec<Vec<Fr>>,
}

/// A validated, immutable permutation parameter set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationConfig {
    width: usize,
    full_rounds: usize,
    partial_rounds: usize,
    alpha: u64,
    security_level: u32,
    round_constants: Vec<Vec<Fr>>,
    mds: Vec<Vec<Fr>>,
}

impl PermutationConfig {
    /// Validate raw parameter material.
    ///
    /// Fails with [`ErrorCode::MalformedParameters`] when any structural
    /// invariant does not hold.
    pub fn new(raw: RawParameters) -> PoseidonResult<Self> {
        validate(&raw)?;

        let round_constants = raw
            .round_constants
            .chunks(raw.width)
            .map(<[Fr]>::to_vec)
            .collect();

        Ok(Self {
            width: raw.width,
            full_rounds: raw.full_rounds,
            partial_rounds: raw.partial_rounds,
            alpha: raw.alpha,
            security_level: raw.security_level,
            round_constants,
            mds: raw.mds,
        })
    }

    /// State width `t`.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of input elements absorbed per permutation (`t - 1`).
    pub fn rate(&self) -> usize {
        self.width - self.capacity()
    }

    /// Number of state elements reserved from input; always 1.
    pub fn capacity(&self) -> usize {
        1
    }

    /// Total full rounds `RF`.
    pub fn full_rounds(&self) -> usize {
        self.full_rounds
    }

    /// Partial rounds `RP`.
    pub fn partial_rounds(&self) -> usize {
        self.partial_rounds
    }

    /// `RF + RP`.
    pub fn total_rounds(&self) -> usize {
        self.full_rounds + self.partial_rounds
    }

    /// S-box exponent.
    pub fn alpha(&self) -> u64 {
        self.alpha
    }

    /// Nominal security level in bits.
    pub fn security_level(&self) -> u32 {
        self.security_level
    }

    /// The `t` constants added at the start of `round`.
    ///
    /// Returns an empty slice for out-of-range rounds.
    pub fn round_constants(&self, round: usize) -> &[Fr] {
        self.round_constants
            .get(round)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All round constants, one row per round.
    pub fn all_round_constants(&self) -> &[Vec<Fr>] {
        &self.round_constants
    }

    /// The mixing matrix, row-major.
    pub fn mds(&self) -> &[Vec<Fr>] {
        &self.mds
    }

    /// Kind of round `round`: `RF/2` full, `RP` partial, `RF/2` full.
    pub fn round_kind(&self, round: usize) -> RoundKind {
        let half = self.full_rounds / 2;
        if round < half || round >= half + self.partial_rounds {
            RoundKind::Full
        } else {
            RoundKind::Partial
        }
    }

    /// The full round schedule in execution order.
    pub fn schedule(&self) -> impl Iterator<Item = RoundKind> + '_ {
        (0..self.total_rounds()).map(move |round| self.round_kind(round))
    }

    /// Stable identifier, e.g. `bn254-x5-t3-rf8-rp57-s128`.
    pub fn id(&self) -> String {
        format!(
            "bn254-x{}-t{}-rf{}-rp{}-s{}",
            self.alpha, self.width, self.full_rounds, self.partial_rounds, self.security_level
        )
    }
}

/// Check every structural invariant of a raw parameter set.
pub fn validate(raw: &RawParameters) -> PoseidonResult<()> {
    validate_shape(raw.width, raw.full_rounds)?;
    validate_alpha(raw.alpha)?;
    validate_round_constants(raw)?;
    validate_mds(&raw.mds, raw.width)?;
    Ok(())
}

fn malformed(msg: String) -> ErrorCode {
    ErrorCode::MalformedParameters(msg)
}

fn validate_shape(width: usize, full_rounds: usize) -> PoseidonResult<()> {
    if width < 2 {
        return Err(malformed(format!("width must be at least 2, got {}", width)));
    }
    if full_rounds == 0 || full_rounds % 2 != 0 {
        return Err(malformed(format!(
            "full rounds must be even and non-zero, got {}",
            full_rounds
        )));
    }
    Ok(())
}

/// x^alpha is a permutation of Fr iff gcd(alpha, p - 1) = 1.
fn validate_alpha(alpha: u64) -> PoseidonResult<()> {
    if alpha < 3 {
        return Err(malformed(format!("alpha must be at least 3, got {}", alpha)));
    }
    let p_minus_one = field::modulus() - BigUint::from(1u32);
    let residue = (p_minus_one % alpha)
        .to_u64_digits()
        .first()
        .copied()
        .unwrap_or(0);
    if gcd(alpha, residue) != 1 {
        return Err(malformed(format!(
            "x^{} is not a permutation of the field",
            alpha
        )));
    }
    Ok(())
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

fn validate_round_constants(raw: &RawParameters) -> PoseidonResult<()> {
    let expected = (raw.full_rounds + raw.partial_rounds) * raw.width;
    if raw.round_constants.len() != expected {
        return Err(malformed(format!(
            "expected {} round constants, got {}",
            expected,
            raw.round_constants.len()
        )));
    }
    Ok(())
}

fn validate_mds(mds: &[Vec<Fr>], width: usize) -> PoseidonResult<()> {
    if mds.len() != width || mds.iter().any(|row| row.len() != width) {
        return Err(malformed(format!("MDS matrix must be {}x{}", width, width)));
    }
    if determinant(mds).is_zero() {
        return Err(malformed("MDS matrix is singular".to_string()));
    }
    Ok(())
}

/// Determinant by Gaussian elimination over Fr.
fn determinant(matrix: &[Vec<Fr>]) -> Fr {
    let mut m: Vec<Vec<Fr>> = matrix.to_vec();
    let n = m.len();
    let mut det = Fr::ONE;

    for col in 0..n {
        let Some(pivot_row) = (col..n).find(|&r| !m[r][col].is_zero()) else {
            return Fr::ZERO;
        };
        if pivot_row != col {
            m.swap(pivot_row, col);
            det = -det;
        }

        let pivot = m[col][col];
        det *= pivot;
        let Some(pivot_inv) = pivot.invert() else {
            return Fr::ZERO;
        };

        for row in col + 1..n {
            let factor = m[row][col] * pivot_inv;
            if factor.is_zero() {
                continue;
            }
            for k in col..n {
                let sub = factor * m[col][k];
                m[row][k] = m[row][k] - sub;
            }
        }
    }

    det
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(n: usize) -> Vec<Vec<Fr>> {
        (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| if i == j { Fr::ONE } else { Fr::ZERO })
                    .collect()
            })
            .collect()
    }

    fn raw(width: usize, full_rounds: usize, partial_rounds: usize) -> RawParameters {
        RawParameters {
            width,
            full_rounds,
            partial_rounds,
            alpha: 5,
            security_level: 128,
            round_constants: (0..(full_rounds + partial_rounds) * width)
                .map(|i| Fr::from_u64(i as u64))
                .collect(),
            mds: identity(width),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = PermutationConfig::new(raw(3, 8, 57)).unwrap();
        assert_eq!(config.rate(), 2);
        assert_eq!(config.capacity(), 1);
        assert_eq!(config.total_rounds(), 65);
        assert_eq!(config.round_constants(1), &[3, 4, 5].map(Fr::from_u64)[..]);
        assert!(config.round_constants(65).is_empty());
        assert_eq!(config.id(), "bn254-x5-t3-rf8-rp57-s128");
    }

    #[test]
    fn test_schedule_split() {
        let config = PermutationConfig::new(raw(3, 8, 57)).unwrap();
        let kinds: Vec<RoundKind> = config.schedule().collect();
        assert_eq!(kinds.len(), 65);
        assert!(kinds[..4].iter().all(|k| *k == RoundKind::Full));
        assert!(kinds[4..61].iter().all(|k| *k == RoundKind::Partial));
        assert!(kinds[61..].iter().all(|k| *k == RoundKind::Full));
    }

    #[test]
    fn test_constant_count_mismatch() {
        let mut r = raw(3, 8, 57);
        r.round_constants.pop();
        assert!(matches!(
            PermutationConfig::new(r),
            Err(ErrorCode::MalformedParameters(_))
        ));
    }

    #[test]
    fn test_non_square_mds() {
        let mut r = raw(3, 8, 57);
        r.mds[1].pop();
        assert!(PermutationConfig::new(r).is_err());

        let mut r = raw(3, 8, 57);
        r.mds.pop();
        assert!(PermutationConfig::new(r).is_err());
    }

    #[test]
    fn test_singular_mds() {
        let mut r = raw(3, 8, 57);
        r.mds[2] = r.mds[0].clone();
        assert!(matches!(
            PermutationConfig::new(r),
            Err(ErrorCode::MalformedParameters(_))
        ));
    }

    #[test]
    fn test_bad_round_counts() {
        assert!(PermutationConfig::new(raw(3, 7, 57)).is_err());
        assert!(PermutationConfig::new(raw(3, 0, 57)).is_err());
        assert!(PermutationConfig::new(raw(1, 8, 57)).is_err());
    }

    #[test]
    fn test_alpha_must_be_permutation() {
        // 3 divides p - 1 for BN254.
        let mut r = raw(3, 8, 57);
        r.alpha = 3;
        assert!(PermutationConfig::new(r).is_err());

        let mut r = raw(3, 8, 57);
        r.alpha = 7;
        assert!(PermutationConfig::new(r).is_ok());
    }

    #[test]
    fn test_determinant_with_row_swap() {
        let m = vec![
            vec![Fr::ZERO, Fr::ONE],
            vec![Fr::ONE, Fr::ZERO],
        ];
        assert_eq!(determinant(&m), -Fr::ONE);

        let m = vec![
            vec![Fr::from_u64(2), Fr::from_u64(3)],
            vec![Fr::from_u64(4), Fr::from_u64(5)],
        ];
        assert_eq!(determinant(&m), -Fr::from_u64(2));
    }
}
