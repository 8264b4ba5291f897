//! Poseidon permutation and hashing over the BN254 scalar field.
//!
//! Parameter sets are generated with the Grain LFSR procedure, validated
//! into a [`PermutationConfig`], and cached in a process-wide
//! [`ParameterTable`]. Supported pairs:
//!
//! | width | security | RF | RP | alpha |
//! |-------|----------|----|----|-------|
//! | 3     | 128      | 8  | 57 | 5     |
//! | 5     | 128      | 8  | 60 | 5     |

mod grain;
mod hash;
mod params;
mod permute;
mod sponge;
mod table;

pub use hash::{hash, Hasher};
pub use params::{validate, PermutationConfig, RawParameters, RoundKind};
pub use permute::{permute, permute_with_trace, RoundTrace};
pub use sponge::{hash_bytes, sponge_hash, Mode, SpongeState, BYTES_PER_ELEMENT};
pub use table::{generate, load, ParameterTable, TableEntry, ALPHA, SUPPORTED};

/// Width of the default instance.
pub const DEFAULT_WIDTH: usize = 3;

/// Security level of the default instance.
pub const DEFAULT_SECURITY_LEVEL: u32 = 128;
