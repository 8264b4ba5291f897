//! Poseidon permutation implementation.
//!
//! Rounds run in the order given by [`PermutationConfig::schedule`]:
//! `RF/2` full rounds, `RP` partial rounds, `RF/2` full rounds.
//!
//! Each round consists of:
//! 1. Round constant addition
//! 2. S-box (x^alpha), on all elements or on element 0 only
//! 3. MDS matrix multiplication

use super::params::{PermutationConfig, RoundKind};
use crate::error::{ErrorCode, PoseidonResult};
use crate::field::Fr;

/// State after one round, for divergence localization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTrace {
    /// Zero-based round index.
    pub round: usize,
    /// Full or partial.
    pub kind: RoundKind,
    /// State after the round's MDS step.
    pub state: Vec<Fr>,
}

#[inline]
fn sbox(x: Fr, alpha: u64) -> Fr {
    if alpha == 5 {
        x.pow5()
    } else {
        x.pow(alpha)
    }
}

/// Apply MDS matrix multiplication: state' = MDS * state
fn apply_mds(state: &[Fr], mds: &[Vec<Fr>]) -> Vec<Fr> {
    mds.iter()
        .map(|row| {
            row.iter()
                .zip(state)
                .fold(Fr::ZERO, |acc, (&m, &s)| acc + m * s)
        })
        .collect()
}

fn add_round_constants(state: &mut [Fr], constants: &[Fr]) {
    for (s, &c) in state.iter_mut().zip(constants) {
        *s += c;
    }
}

fn round(state: &mut Vec<Fr>, config: &PermutationConfig, round: usize, kind: RoundKind) {
    add_round_constants(state, config.round_constants(round));

    match kind {
        RoundKind::Full => {
            for s in state.iter_mut() {
                *s = sbox(*s, config.alpha());
            }
        }
        RoundKind::Partial => {
            if let Some(s) = state.first_mut() {
                *s = sbox(*s, config.alpha());
            }
        }
    }

    *state = apply_mds(state, config.mds());
}

/// Run the permutation on a state already known to have `config.width()`
/// elements.
pub(crate) fn permute_unchecked(state: &mut Vec<Fr>, config: &PermutationConfig) {
    for (r, kind) in config.schedule().enumerate() {
        round(state, config, r, kind);
    }
}

fn check_width(state: &[Fr], config: &PermutationConfig) -> PoseidonResult<()> {
    if state.len() != config.width() {
        return Err(ErrorCode::MalformedParameters(format!(
            "state has {} elements, configuration width is {}",
            state.len(),
            config.width()
        )));
    }
    Ok(())
}

/// Complete Poseidon permutation.
///
/// The state length must equal the configuration width.
pub fn permute(state: &[Fr], config: &PermutationConfig) -> PoseidonResult<Vec<Fr>> {
    check_width(state, config)?;
    let mut st = state.to_vec();
    permute_unchecked(&mut st, config);
    Ok(st)
}

/// Poseidon permutation with per-round trace output.
///
/// Returns `(final_state, round_traces)`; trace `i` holds the state after
/// round `i`.
pub fn permute_with_trace(
    state: &[Fr],
    config: &PermutationConfig,
) -> PoseidonResult<(Vec<Fr>, Vec<RoundTrace>)> {
    check_width(state, config)?;
    let mut st = state.to_vec();
    let mut traces = Vec::with_capacity(config.total_rounds());

    for (r, kind) in config.schedule().enumerate() {
        round(&mut st, config, r, kind);
        traces.push(RoundTrace {
            round: r,
            kind,
            state: st.clone(),
        });
    }

    Ok((st, traces))
}
