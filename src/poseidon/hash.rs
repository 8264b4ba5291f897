//! Fixed-arity hash façade.
//!
//! The state is laid out capacity-first: slot 0 is the capacity element
//! (initialized to zero), slots `1..t` take the inputs in order, and unused
//! input slots are zero. The digest is state element 0 after one
//! permutation.

use super::params::PermutationConfig;
use super::permute::permute_unchecked;
use super::table;
use crate::error::{ErrorCode, PoseidonResult};
use crate::field::Fr;

/// Hash up to `config.rate()` field elements to one field element.
///
/// Fails with [`ErrorCode::InputTooLarge`] when more inputs are supplied
/// than the rate allows. Empty input is hashed as all-zero input slots.
pub fn hash(inputs: &[Fr], config: &PermutationConfig) -> PoseidonResult<Fr> {
    if inputs.len() > config.rate() {
        return Err(ErrorCode::InputTooLarge {
            got: inputs.len(),
            limit: config.rate(),
        });
    }

    let mut state = vec![Fr::ZERO; config.width()];
    for (slot, &x) in state.iter_mut().skip(config.capacity()).zip(inputs) {
        *slot = x;
    }

    permute_unchecked(&mut state, config);
    Ok(state.first().copied().unwrap_or(Fr::ZERO))
}

/// A hasher bound to one entry of the parameter table.
#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    config: &'static PermutationConfig,
}

impl Hasher {
    /// Bind to the `(width, security_level)` entry of the parameter table.
    pub fn new(width: usize, security_level: u32) -> PoseidonResult<Self> {
        Ok(Self {
            config: table::load(width, security_level)?,
        })
    }

    /// Hasher for the default instance (t = 3, 128-bit security).
    pub fn default_instance() -> PoseidonResult<Self> {
        Self::new(super::DEFAULT_WIDTH, super::DEFAULT_SECURITY_LEVEL)
    }

    /// Maximum number of inputs per call.
    pub fn arity(&self) -> usize {
        self.config.rate()
    }

    /// The bound configuration.
    pub fn config(&self) -> &'static PermutationConfig {
        self.config
    }

    /// See [`hash`].
    pub fn hash(&self, inputs: &[Fr]) -> PoseidonResult<Fr> {
        hash(inputs, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_two_inputs() {
        let hasher = Hasher::default_instance().unwrap();
        let digest = hasher.hash(&[Fr::ONE, Fr::from_u64(2)]).unwrap();
        assert_eq!(
            digest.to_hex(),
            "0x115cc0f5e7d690413df64c6b9662e9cf2a3617f2743245519e19607a4417189a"
        );
    }

    #[test]
    fn test_hash_four_inputs() {
        let hasher = Hasher::new(5, 128).unwrap();
        let digest = hasher.hash(&[1u64, 2, 3, 4].map(Fr::from_u64)).unwrap();
        assert_eq!(
            digest.to_decimal(),
            "18821383157269793795438455681495246036402687001665670618754263018637548127333"
        );
    }

    #[test]
    fn test_short_input_is_zero_padded() {
        let hasher = Hasher::default_instance().unwrap();
        assert_eq!(
            hasher.hash(&[Fr::ONE]).unwrap(),
            hasher.hash(&[Fr::ONE, Fr::ZERO]).unwrap()
        );
        assert_eq!(
            hasher.hash(&[]).unwrap(),
            hasher.hash(&[Fr::ZERO, Fr::ZERO]).unwrap()
        );
    }

    #[test]
    fn test_input_limit() {
        let hasher = Hasher::default_instance().unwrap();
        assert_eq!(hasher.arity(), 2);
        assert_eq!(
            hasher.hash(&[Fr::ONE; 3]),
            Err(ErrorCode::InputTooLarge { got: 3, limit: 2 })
        );
    }

    #[test]
    fn test_input_order_matters() {
        let hasher = Hasher::default_instance().unwrap();
        let a = hasher.hash(&[Fr::ONE, Fr::from_u64(2)]).unwrap();
        let b = hasher.hash(&[Fr::from_u64(2), Fr::ONE]).unwrap();
        assert_ne!(a, b);
    }
}
