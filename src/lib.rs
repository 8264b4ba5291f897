//! Poseidon over the BN254 scalar field, with a deterministic EVM contract
//! emitter.
//!
//! # Architecture
//!
//! - [`field`] - BN254 scalar field arithmetic (Fr)
//! - [`poseidon`] - Parameter table, permutation, fixed-arity hash and sponge
//! - [`evm`] - Bytecode and ABI emission, plus an interpreter for the
//!   emitted opcode subset
//! - [`conformance`] - Differential testing of native hash vs. contract
//! - [`error`] - Error codes
//!
//! # Example
//!
//! ```
//! use poseidon_gen::{evm, poseidon, Fr};
//!
//! let config = poseidon::load(3, 128)?;
//! let digest = poseidon::hash(&[Fr::from_u64(1), Fr::from_u64(2)], config)?;
//! assert_eq!(
//!     digest.to_hex(),
//!     "0x115cc0f5e7d690413df64c6b9662e9cf2a3617f2743245519e19607a4417189a"
//! );
//!
//! let artifact = evm::emit(config)?;
//! assert!(artifact.bytecode().len() > artifact.runtime().len());
//! # Ok::<(), poseidon_gen::ErrorCode>(())
//! ```

// Library code must avoid unwrap/expect/panic; tests are checked separately.
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

pub mod conformance;
pub mod error;
pub mod evm;
pub mod field;
pub mod poseidon;

// Re-export commonly used types
pub use conformance::{DiffResult, DiffTestHarness};
pub use error::{ErrorCode, PoseidonResult};
pub use evm::{emit, BytecodeArtifact, InterfaceDescriptor};
pub use field::Fr;
pub use poseidon::{hash, Hasher, PermutationConfig};
