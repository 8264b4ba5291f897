//! Poseidon sponge construction for variable-length input.
//!
//! Separate from the fixed-arity [`hash`](super::hash()): the sponge absorbs
//! into the rate slots `1..t`, pads with a single one followed by zeros on
//! finalization, and squeezes from the rate slots.

use super::params::PermutationConfig;
use super::permute::permute_unchecked;
use crate::field::Fr;

/// Bytes packed into each field element by [`hash_bytes`].
pub const BYTES_PER_ELEMENT: usize = 31;

/// Sponge operation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Absorbing input elements
    Absorbing,
    /// Squeezing output elements
    Squeezing,
}

/// Sponge state for incremental hashing.
#[derive(Debug, Clone)]
pub struct SpongeState<'a> {
    config: &'a PermutationConfig,
    state: Vec<Fr>,
    /// Next rate slot, in `0..rate`.
    pos: usize,
    mode: Mode,
}

impl<'a> SpongeState<'a> {
    /// Create a new sponge state initialized to zeros.
    pub fn new(config: &'a PermutationConfig) -> Self {
        Self {
            config,
            state: vec![Fr::ZERO; config.width()],
            pos: 0,
            mode: Mode::Absorbing,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn permute(&mut self) {
        permute_unchecked(&mut self.state, self.config);
    }

    fn rate_slot(&mut self) -> Option<&mut Fr> {
        self.state.get_mut(self.config.capacity() + self.pos)
    }

    /// Absorb a single field element.
    ///
    /// 1. if squeezing: permute, switch to absorbing, pos = 0
    /// 2. rate[pos] += x; pos += 1
    /// 3. if pos == rate: permute, pos = 0
    pub fn absorb_one(&mut self, x: Fr) {
        if self.mode == Mode::Squeezing {
            self.permute();
            self.mode = Mode::Absorbing;
            self.pos = 0;
        }

        if let Some(slot) = self.rate_slot() {
            *slot += x;
        }
        self.pos += 1;

        if self.pos >= self.config.rate() {
            self.permute();
            self.pos = 0;
        }
    }

    /// Absorb multiple field elements.
    pub fn absorb(&mut self, elements: &[Fr]) {
        for &x in elements {
            self.absorb_one(x);
        }
    }

    /// Pad and switch to squeezing.
    fn finalize(&mut self) {
        if self.mode == Mode::Absorbing {
            if let Some(slot) = self.rate_slot() {
                *slot += Fr::ONE;
            }
            self.permute();
            self.mode = Mode::Squeezing;
            self.pos = 0;
        }
    }

    /// Squeeze a single field element.
    ///
    /// 1. if absorbing: pad, permute, switch to squeezing, pos = 0
    /// 2. y = rate[pos]; pos += 1
    /// 3. if pos == rate: permute, pos = 0
    pub fn squeeze_one(&mut self) -> Fr {
        self.finalize();

        let result = self.rate_slot().map(|s| *s).unwrap_or(Fr::ZERO);
        self.pos += 1;

        if self.pos >= self.config.rate() {
            self.permute();
            self.pos = 0;
        }

        result
    }

    /// Squeeze n field elements.
    pub fn squeeze(&mut self, n: usize) -> Vec<Fr> {
        (0..n).map(|_| self.squeeze_one()).collect()
    }
}

/// Hash any number of field elements to n field elements.
pub fn sponge_hash(elements: &[Fr], n: usize, config: &PermutationConfig) -> Vec<Fr> {
    let mut sponge = SpongeState::new(config);
    sponge.absorb(elements);
    sponge.squeeze(n)
}

/// Hash an arbitrary byte string.
///
/// Bytes are split into 31-byte chunks, each read as a little-endian
/// integer (always below p), and absorbed in order. The byte length is
/// absorbed last so that trailing zero bytes change the digest.
pub fn hash_bytes(bytes: &[u8], config: &PermutationConfig) -> Fr {
    let mut sponge = SpongeState::new(config);
    let radix = Fr::from_u64(256);
    for chunk in bytes.chunks(BYTES_PER_ELEMENT) {
        let fe = chunk
            .iter()
            .rev()
            .fold(Fr::ZERO, |acc, &b| acc * radix + Fr::from_u64(u64::from(b)));
        sponge.absorb_one(fe);
    }
    sponge.absorb_one(Fr::from_u64(bytes.len() as u64));
    sponge.squeeze_one()
}
