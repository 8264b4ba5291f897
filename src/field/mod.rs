//! BN254 scalar field (Fr) operations.
//!
//! This module provides the Fr type used throughout the crate for field
//! arithmetic, Poseidon hashing and the constants embedded in emitted
//! bytecode.
//!
//! Every `Fr` is canonical by construction. Raw encodings (bytes, hex,
//! decimal, big integers) are checked at the boundary and rejected with
//! [`ErrorCode::InvalidFieldElement`](crate::error::ErrorCode) when they do
//! not lie in [0, p).

mod fr;

pub use fr::Fr;

use num_bigint::BigUint;
use std::sync::OnceLock;

/// BN254 scalar field modulus as a decimal string.
pub const MODULUS_DECIMAL: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

/// BN254 scalar field modulus as big-endian hex.
pub const MODULUS_HEX: &str = "0x30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001";

/// Bit length of the modulus.
pub const NUM_BITS: u32 = 254;

/// The field modulus as a big integer.
pub fn modulus() -> &'static BigUint {
    static MODULUS: OnceLock<BigUint> = OnceLock::new();
    MODULUS.get_or_init(|| (-Fr::ONE).to_biguint() + 1u32)
}
