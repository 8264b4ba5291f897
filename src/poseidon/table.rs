//! Process-wide table of supported parameter sets.
//!
//! Entries are derived once on first use and shared read-only afterwards.

use super::grain::Grain;
use super::params::{PermutationConfig, RawParameters};
use crate::error::{ErrorCode, PoseidonResult};
use std::sync::OnceLock;

/// S-box exponent shared by every supported entry.
pub const ALPHA: u64 = 5;

/// Round counts for one supported `(width, security_level)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableEntry {
    /// State width `t`.
    pub width: usize,
    /// Security level in bits.
    pub security_level: u32,
    /// Total full rounds.
    pub full_rounds: usize,
    /// Partial rounds.
    pub partial_rounds: usize,
}

/// Supported pairs. Round numbers follow the published BN254 x^5 instances.
pub const SUPPORTED: &[TableEntry] = &[
    TableEntry {
        width: 3,
        security_level: 128,
        full_rounds: 8,
        partial_rounds: 57,
    },
    TableEntry {
        width: 5,
        security_level: 128,
        full_rounds: 8,
        partial_rounds: 60,
    },
];

/// All supported permutation configurations.
#[derive(Debug)]
pub struct ParameterTable {
    configs: Vec<PermutationConfig>,
}

static TABLE: OnceLock<PoseidonResult<ParameterTable>> = OnceLock::new();

impl ParameterTable {
    /// The shared table, building it on first access.
    pub fn global() -> PoseidonResult<&'static ParameterTable> {
        TABLE
            .get_or_init(ParameterTable::build)
            .as_ref()
            .map_err(Clone::clone)
    }

    fn build() -> PoseidonResult<Self> {
        let configs = SUPPORTED
            .iter()
            .map(|entry| {
                let config = generate(entry)?;
                log::debug!("loaded parameter set {}", config.id());
                Ok(config)
            })
            .collect::<PoseidonResult<Vec<_>>>()?;

        Ok(Self { configs })
    }

    /// Look up a configuration.
    pub fn get(&self, width: usize, security_level: u32) -> Option<&PermutationConfig> {
        self.configs
            .iter()
            .find(|c| c.width() == width && c.security_level() == security_level)
    }

    /// All configurations, in table order.
    pub fn configs(&self) -> &[PermutationConfig] {
        &self.configs
    }
}

/// Derive and validate a parameter set for arbitrary round counts.
///
/// The table entries are produced this way; other entries are useful for
/// experimentation but carry no security claim.
pub fn generate(entry: &TableEntry) -> PoseidonResult<PermutationConfig> {
    let generated = Grain::generate(entry.width, entry.full_rounds, entry.partial_rounds)?;
    PermutationConfig::new(RawParameters {
        width: entry.width,
        full_rounds: entry.full_rounds,
        partial_rounds: entry.partial_rounds,
        alpha: ALPHA,
        security_level: entry.security_level,
        round_constants: generated.round_constants,
        mds: generated.mds,
    })
}

/// Load the configuration for a `(width, security_level)` pair.
///
/// Fails with [`ErrorCode::UnsupportedConfiguration`] for pairs absent
/// from the table.
pub fn load(width: usize, security_level: u32) -> PoseidonResult<&'static PermutationConfig> {
    ParameterTable::global()?
        .get(width, security_level)
        .ok_or(ErrorCode::UnsupportedConfiguration {
            width,
            security_level,
        })
}
