//! Grain LFSR parameter generation.
//!
//! Reproduces the published Poseidon parameter procedure (eprint 2019/458,
//! supplementary material F) for prime fields and the x^alpha S-box: the
//! 80-bit LFSR is seeded from the instance description, the first 160 bits
//! are discarded, and output bits are taken through the self-shrinking
//! filter. Round constants are rejection sampled; MDS entries are reduced.

use crate::error::{ErrorCode, PoseidonResult};
use crate::field::{self, Fr};
use num_bigint::BigUint;
use std::collections::VecDeque;

const STATE_BITS: usize = 80;
const WARMUP_BITS: usize = 160;

/// Field type tag for GF(p).
const FIELD_TYPE_PRIME: u32 = 1;
/// S-box tag for x^alpha (x^-1 would be 1).
const SBOX_POWER: u32 = 0;

/// Upper bound on Cauchy matrix redraws before giving up.
const MAX_MDS_ATTEMPTS: usize = 64;

/// Round constants and MDS matrix for one instance.
#[derive(Debug, Clone)]
pub(crate) struct GeneratedParameters {
    /// Flat, round-major: `(full_rounds + partial_rounds) * width` entries.
    pub(crate) round_constants: Vec<Fr>,
    pub(crate) mds: Vec<Vec<Fr>>,
}

/// Grain initializes round constants and MDS matrix for given instance parameters.
pub(crate) struct Grain {
    bits: VecDeque<bool>,
}

impl Grain {
    pub(crate) fn new(width: usize, full_rounds: usize, partial_rounds: usize) -> Self {
        let mut bits = VecDeque::with_capacity(STATE_BITS);
        append_bits(&mut bits, 2, FIELD_TYPE_PRIME as u64);
        append_bits(&mut bits, 4, SBOX_POWER as u64);
        append_bits(&mut bits, 12, field::NUM_BITS as u64);
        append_bits(&mut bits, 12, width as u64);
        append_bits(&mut bits, 10, full_rounds as u64);
        append_bits(&mut bits, 10, partial_rounds as u64);
        append_bits(&mut bits, 30, (1u64 << 30) - 1);

        let mut grain = Grain { bits };
        for _ in 0..WARMUP_BITS {
            grain.clock();
        }
        grain
    }

    /// Run the full procedure: all round constants first, then the MDS matrix.
    pub(crate) fn generate(
        width: usize,
        full_rounds: usize,
        partial_rounds: usize,
    ) -> PoseidonResult<GeneratedParameters> {
        let mut grain = Grain::new(width, full_rounds, partial_rounds);

        let count = (full_rounds + partial_rounds) * width;
        let round_constants = (0..count).map(|_| grain.next_field_element()).collect();
        let mds = grain.next_cauchy_matrix(width)?;

        Ok(GeneratedParameters {
            round_constants,
            mds,
        })
    }

    fn clock(&mut self) -> bool {
        let bit = [62usize, 51, 38, 23, 13]
            .iter()
            .fold(self.bits[0], |acc, &pos| acc ^ self.bits[pos]);
        self.bits.pop_front();
        self.bits.push_back(bit);
        bit
    }

    /// Self-shrinking output: a 1 emits the following bit, a 0 drops it.
    fn next_bit(&mut self) -> bool {
        loop {
            let keep = self.clock();
            let bit = self.clock();
            if keep {
                return bit;
            }
        }
    }

    /// Draw `NUM_BITS` bits, most significant first.
    fn next_uint(&mut self) -> BigUint {
        let mut value = BigUint::default();
        for _ in 0..field::NUM_BITS {
            value <<= 1u32;
            if self.next_bit() {
                value += 1u32;
            }
        }
        value
    }

    /// Rejection-sampled field element.
    fn next_field_element(&mut self) -> Fr {
        loop {
            if let Ok(fe) = Fr::from_biguint(&self.next_uint()) {
                return fe;
            }
        }
    }

    /// Field element reduced modulo p, without rejection.
    fn next_reduced(&mut self) -> BigUint {
        self.next_uint() % field::modulus()
    }

    /// Cauchy matrix `M[i][j] = 1 / (x_i + y_j)` over `2 * width` fresh draws.
    ///
    /// Draws are repeated until all values are distinct and no denominator
    /// vanishes.
    fn next_cauchy_matrix(&mut self, width: usize) -> PoseidonResult<Vec<Vec<Fr>>> {
        for _ in 0..MAX_MDS_ATTEMPTS {
            let mut draws: Vec<BigUint> = (0..2 * width).map(|_| self.next_reduced()).collect();

            let mut unique = draws.clone();
            unique.sort();
            unique.dedup();
            if unique.len() != draws.len() {
                continue;
            }

            let ys = draws
                .split_off(width)
                .iter()
                .map(Fr::from_biguint)
                .collect::<PoseidonResult<Vec<_>>>()?;
            let xs = draws
                .iter()
                .map(Fr::from_biguint)
                .collect::<PoseidonResult<Vec<_>>>()?;

            let matrix: Option<Vec<Vec<Fr>>> = xs
                .iter()
                .map(|&x| ys.iter().map(|&y| (x + y).invert()).collect())
                .collect();

            if let Some(matrix) = matrix {
                return Ok(matrix);
            }
        }

        Err(ErrorCode::MalformedParameters(format!(
            "no Cauchy matrix found for width {} after {} draws",
            width, MAX_MDS_ATTEMPTS
        )))
    }
}

fn append_bits(bits: &mut VecDeque<bool>, n: usize, value: u64) {
    for i in (0..n).rev() {
        bits.push_back((value >> i) & 1 != 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_80_bits() {
        let grain = Grain::new(3, 8, 57);
        assert_eq!(grain.bits.len(), STATE_BITS);
    }

    #[test]
    fn test_first_constant_t3() {
        let params = Grain::generate(3, 8, 57).unwrap();
        assert_eq!(
            params.round_constants[0].to_hex(),
            "0x0ee9a592ba9a9518d05986d656f40c2114c4993c11bb29938d21d47304cd8e6e"
        );
    }

    #[test]
    fn test_shapes() {
        let params = Grain::generate(5, 8, 60).unwrap();
        assert_eq!(params.round_constants.len(), 68 * 5);
        assert_eq!(params.mds.len(), 5);
        assert!(params.mds.iter().all(|row| row.len() == 5));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = Grain::generate(3, 8, 57).unwrap();
        let b = Grain::generate(3, 8, 57).unwrap();
        assert_eq!(a.round_constants, b.round_constants);
        assert_eq!(a.mds, b.mds);
    }

    #[test]
    fn test_instance_description_changes_stream() {
        let a = Grain::generate(3, 8, 57).unwrap();
        let b = Grain::generate(3, 8, 56).unwrap();
        assert_ne!(a.round_constants[0], b.round_constants[0]);
    }
}
