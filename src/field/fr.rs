//! BN254 scalar field element (Fr).
//!
//! Wraps `halo2curves::bn256::Fr` with validation on construction to ensure
//! canonical representation. The inner type multiplies in Montgomery form
//! with double-width intermediates, so no product is ever truncated before
//! reduction.

use crate::error::{ErrorCode, PoseidonResult};
use ff::{Field, PrimeField};
use halo2curves::bn256::Fr as Scalar;
use num_bigint::BigUint;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub};

/// A BN254 scalar field element.
///
/// This is a newtype wrapper around `halo2curves::bn256::Fr` that enforces
/// canonical encoding on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fr(Scalar);

impl Fr {
    /// The additive identity (zero).
    pub const ZERO: Fr = Fr(Scalar::ZERO);

    /// The multiplicative identity (one).
    pub const ONE: Fr = Fr(Scalar::ONE);

    /// Create an Fr from a u64 value.
    pub fn from_u64(val: u64) -> Fr {
        Fr(Scalar::from(val))
    }

    /// Create an Fr from 32 little-endian bytes.
    ///
    /// Returns an error if the bytes encode a value >= the field modulus.
    pub fn from_bytes_le(bytes: &[u8; 32]) -> PoseidonResult<Fr> {
        let mut repr = <Scalar as PrimeField>::Repr::default();
        repr.as_mut().copy_from_slice(bytes);
        Option::<Scalar>::from(Scalar::from_repr(repr))
            .map(Fr)
            .ok_or_else(|| ErrorCode::InvalidFieldElement(format!("0x{}", hex_be(bytes))))
    }

    /// Create an Fr from 32 big-endian bytes (EVM word order).
    pub fn from_bytes_be(bytes: &[u8; 32]) -> PoseidonResult<Fr> {
        let mut le = *bytes;
        le.reverse();
        Self::from_bytes_le(&le)
    }

    /// Canonical 32-byte little-endian representation.
    pub fn to_bytes_le(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.0.to_repr().as_ref());
        out
    }

    /// Canonical 32-byte big-endian representation.
    pub fn to_bytes_be(&self) -> [u8; 32] {
        let mut out = self.to_bytes_le();
        out.reverse();
        out
    }

    /// Parse big-endian hex, with or without a `0x` prefix.
    ///
    /// Up to 64 hex digits are accepted; shorter strings are left-padded.
    pub fn from_hex(s: &str) -> PoseidonResult<Fr> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > 64 {
            return Err(ErrorCode::InvalidFieldElement(format!(
                "expected 1 to 64 hex digits, got {}",
                digits.len()
            )));
        }

        let padded = format!("{:0>64}", digits);
        let bytes = hex::decode(&padded)
            .map_err(|e| ErrorCode::InvalidFieldElement(format!("invalid hex {:?}: {}", s, e)))?;

        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Self::from_bytes_be(&arr)
    }

    /// `0x`-prefixed, 64-digit big-endian hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes_be()))
    }

    /// Create an Fr from a big integer, rejecting values >= p.
    pub fn from_biguint(value: &BigUint) -> PoseidonResult<Fr> {
        if value >= super::modulus() {
            return Err(ErrorCode::InvalidFieldElement(format!(
                "{} is not below the field modulus",
                value
            )));
        }
        let mut bytes = value.to_bytes_le();
        bytes.resize(32, 0);
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Self::from_bytes_le(&arr)
    }

    /// The canonical integer value of this element.
    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_le(&self.to_bytes_le())
    }

    /// Parse a decimal string of ASCII digits only. Signs, separators and
    /// whitespace are rejected.
    pub fn from_decimal(s: &str) -> PoseidonResult<Fr> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ErrorCode::InvalidFieldElement(format!("invalid decimal {:?}", s)));
        }
        let value = BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| ErrorCode::InvalidFieldElement(format!("invalid decimal {:?}", s)))?;
        Self::from_biguint(&value)
    }

    /// Parse either `0x`-prefixed hex or a decimal string.
    pub fn parse(s: &str) -> PoseidonResult<Fr> {
        if s.starts_with("0x") {
            Self::from_hex(s)
        } else {
            Self::from_decimal(s)
        }
    }

    /// Canonical decimal representation.
    pub fn to_decimal(&self) -> String {
        self.to_biguint().to_string()
    }

    /// Get the underlying scalar value.
    pub fn inner(&self) -> &Scalar {
        &self.0
    }

    /// Whether this is the additive identity.
    pub fn is_zero(&self) -> bool {
        bool::from(self.0.is_zero())
    }

    /// Square the field element.
    pub fn square(&self) -> Fr {
        Fr(self.0.square())
    }

    /// Compute x^5 (the Poseidon S-box for BN254).
    pub fn pow5(&self) -> Fr {
        let x2 = self.0.square();
        let x4 = x2.square();
        Fr(x4 * self.0)
    }

    /// Raise to a small exponent by square-and-multiply.
    pub fn pow(&self, exponent: u64) -> Fr {
        let mut acc = Scalar::ONE;
        for i in (0..64 - exponent.leading_zeros()).rev() {
            acc = acc.square();
            if (exponent >> i) & 1 == 1 {
                acc *= self.0;
            }
        }
        Fr(acc)
    }

    /// Multiplicative inverse, or `None` for zero.
    pub fn invert(&self) -> Option<Fr> {
        Option::<Scalar>::from(self.0.invert()).map(Fr)
    }
}

fn hex_be(le: &[u8; 32]) -> String {
    let mut be = *le;
    be.reverse();
    hex::encode(be)
}

impl Default for Fr {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<u64> for Fr {
    fn from(val: u64) -> Self {
        Fr::from_u64(val)
    }
}

impl Add for Fr {
    type Output = Fr;
    fn add(self, rhs: Fr) -> Fr {
        Fr(self.0 + rhs.0)
    }
}

impl AddAssign for Fr {
    fn add_assign(&mut self, rhs: Fr) {
        self.0 += rhs.0;
    }
}

impl Sub for Fr {
    type Output = Fr;
    fn sub(self, rhs: Fr) -> Fr {
        Fr(self.0 - rhs.0)
    }
}

impl Mul for Fr {
    type Output = Fr;
    fn mul(self, rhs: Fr) -> Fr {
        Fr(self.0 * rhs.0)
    }
}

impl MulAssign for Fr {
    fn mul_assign(&mut self, rhs: Fr) {
        self.0 *= rhs.0;
    }
}

impl Neg for Fr {
    type Output = Fr;
    fn neg(self) -> Fr {
        Fr(-self.0)
    }
}

impl fmt::Display for Fr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}
