//! Deterministic EVM bytecode emission.
//!
//! The runtime keeps the permutation state on the stack as
//! `[s0, s1, .., s(t-1), q]` (top first), with `q` the field modulus. The
//! MDS matrix and round constants live in a data segment appended to the
//! code, copied to memory once per call:
//!
//! | memory               | contents                       |
//! |----------------------|--------------------------------|
//! | `0x00`               | return address for `mix`       |
//! | `0x20 + 32*(i*t+j)`  | `M[i][j]`                      |
//! | `0x20 + 32*(t*t+k)`  | round constant `k` (flat)      |
//!
//! Every round inlines its constant additions and S-boxes, then calls a
//! single shared `mix` subroutine. Inputs not below `q` and short calldata
//! revert with empty data; unknown selectors hit `INVALID`.

use super::abi::InterfaceDescriptor;
use super::assembler::Assembler;
use super::opcode::Opcode;
use crate::error::{ErrorCode, PoseidonResult};
use crate::field;
use crate::poseidon::{PermutationConfig, RoundKind};

/// Largest width whose `mix` routine fits in `DUP16`.
pub const MAX_WIDTH: usize = 7;

/// Runtime code size limit for deployable contracts (EIP-170).
pub const MAX_RUNTIME_SIZE: usize = 24_576;

const RETURN_SLOT: usize = 0x00;
const DATA_BASE: usize = 0x20;
const WORD: usize = 32;
const SELECTOR_LEN: usize = 4;

const START: &str = "start";
const FAIL: &str = "fail";
const MIX: &str = "mix";
const DATA: &str = "data";

/// Output of [`emit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytecodeArtifact {
    bytecode: Vec<u8>,
    runtime: Vec<u8>,
    data_offset: usize,
    interface: InterfaceDescriptor,
}

impl BytecodeArtifact {
    /// Deployable creation code: init prefix followed by the runtime.
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// Code left at the contract address after deployment.
    pub fn runtime(&self) -> &[u8] {
        &self.runtime
    }

    /// Executable part of the runtime.
    pub fn program(&self) -> &[u8] {
        self.runtime.get(..self.data_offset).unwrap_or(&[])
    }

    /// MDS matrix then round constants, one big-endian word each.
    pub fn data_segment(&self) -> &[u8] {
        self.runtime.get(self.data_offset..).unwrap_or(&[])
    }

    /// Offset of the data segment within the runtime.
    pub fn data_offset(&self) -> usize {
        self.data_offset
    }

    /// ABI of the deployed contract.
    pub fn interface(&self) -> &InterfaceDescriptor {
        &self.interface
    }

    /// Lowercase hex of the creation code, without prefix.
    pub fn bytecode_hex(&self) -> String {
        hex::encode(&self.bytecode)
    }
}

/// Emit creation code and ABI for a configuration.
///
/// Fails with [`ErrorCode::EmitterConfigMismatch`] when the configuration
/// has no template: alpha other than 5, width above [`MAX_WIDTH`], no
/// partial rounds, or a runtime above [`MAX_RUNTIME_SIZE`]. Output is a
/// pure function of the configuration.
pub fn emit(config: &PermutationConfig) -> PoseidonResult<BytecodeArtifact> {
    check_template(config)?;

    let interface = InterfaceDescriptor::for_arity(config.rate());
    let (runtime, data_offset) = emit_runtime(config, &interface)?;
    if runtime.len() > MAX_RUNTIME_SIZE {
        return Err(ErrorCode::EmitterConfigMismatch(format!(
            "runtime is {} bytes, limit is {}",
            runtime.len(),
            MAX_RUNTIME_SIZE
        )));
    }

    let mut bytecode = emit_init(runtime.len())?;
    bytecode.extend_from_slice(&runtime);

    log::debug!(
        "emitted {} (arity {}): {} runtime bytes, data at {:#x}",
        config.id(),
        config.rate(),
        runtime.len(),
        data_offset
    );

    Ok(BytecodeArtifact {
        bytecode,
        runtime,
        data_offset,
        interface,
    })
}

fn check_template(config: &PermutationConfig) -> PoseidonResult<()> {
    let mismatch = |msg: String| Err(ErrorCode::EmitterConfigMismatch(msg));

    if config.alpha() != 5 {
        return mismatch(format!("no template for x^{}", config.alpha()));
    }
    if !(2..=MAX_WIDTH).contains(&config.width()) {
        return mismatch(format!(
            "width {} outside 2..={}",
            config.width(),
            MAX_WIDTH
        ));
    }
    if config.full_rounds() == 0 || config.full_rounds() % 2 != 0 {
        return mismatch(format!("{} full rounds", config.full_rounds()));
    }
    if config.partial_rounds() == 0 {
        return mismatch("no partial rounds".to_string());
    }
    if config.rate() + 1 != config.width() {
        return mismatch(format!(
            "rate {} with width {}",
            config.rate(),
            config.width()
        ));
    }
    Ok(())
}

/// Memory addresses of the copied data segment.
struct Layout {
    width: usize,
}

impl Layout {
    fn mds(&self, i: usize, j: usize) -> usize {
        DATA_BASE + WORD * (i * self.width + j)
    }

    fn round_constant(&self, round: usize, i: usize) -> usize {
        DATA_BASE + WORD * (self.width * self.width + round * self.width + i)
    }
}

fn data_segment(config: &PermutationConfig) -> Vec<u8> {
    config
        .mds()
        .iter()
        .flatten()
        .chain(config.all_round_constants().iter().flatten())
        .flat_map(|x| x.to_bytes_be())
        .collect()
}

fn modulus_word() -> [u8; 32] {
    let bytes = field::modulus().to_bytes_be();
    let mut word = [0u8; 32];
    word[WORD - bytes.len()..].copy_from_slice(&bytes);
    word
}

fn emit_runtime(
    config: &PermutationConfig,
    interface: &InterfaceDescriptor,
) -> PoseidonResult<(Vec<u8>, usize)> {
    let t = config.width();
    let layout = Layout { width: t };
    let data = data_segment(config);
    let mut asm = Assembler::new();

    // Selector dispatch.
    asm.push_usize(0);
    asm.op(Opcode::CallDataLoad);
    asm.push_usize(0xe0);
    asm.op(Opcode::Shr);
    for entry in interface.entries() {
        asm.dup(1);
        asm.push_bytes(&entry.selector());
        asm.op(Opcode::Eq);
        asm.jumpi(START);
    }
    asm.op(Opcode::Invalid);

    asm.label(START);
    asm.op(Opcode::Pop);

    asm.push_usize(SELECTOR_LEN + WORD * config.rate());
    asm.op(Opcode::CallDataSize);
    asm.op(Opcode::Lt);
    asm.jumpi(FAIL);

    asm.push_usize(data.len());
    asm.push_label(DATA);
    asm.push_usize(DATA_BASE);
    asm.op(Opcode::CodeCopy);

    // Load inputs deepest first so that s1 ends up just below s0.
    asm.push_word(&modulus_word());
    for k in (1..t).rev() {
        let loaded = t - k;
        asm.push_usize(SELECTOR_LEN + WORD * (k - 1));
        asm.op(Opcode::CallDataLoad);
        asm.dup(loaded + 1);
        asm.dup(2);
        asm.op(Opcode::Lt);
        asm.op(Opcode::IsZero);
        asm.jumpi(FAIL);
    }
    asm.push_usize(0);

    for (round, kind) in config.schedule().enumerate() {
        let after = format!("round_{}", round);

        for i in 0..t {
            emit_add_constant(&mut asm, t, i, layout.round_constant(round, i));
        }
        match kind {
            RoundKind::Full => (0..t).for_each(|i| emit_sbox(&mut asm, t, i)),
            RoundKind::Partial => emit_sbox(&mut asm, t, 0),
        }

        asm.push_label(&after);
        asm.push_usize(RETURN_SLOT);
        asm.op(Opcode::MStore);
        asm.jump(MIX);
        asm.label(&after);
    }

    asm.push_usize(0);
    asm.op(Opcode::MStore);
    asm.push_usize(WORD);
    asm.push_usize(0);
    asm.op(Opcode::Return);

    emit_mix(&mut asm, t, &layout);

    asm.label(FAIL);
    asm.push_usize(0);
    asm.dup(1);
    asm.op(Opcode::Revert);

    let data_offset = asm.len();
    asm.mark(DATA);
    asm.raw(&data);

    Ok((asm.finish()?, data_offset))
}

/// `s_i = (s_i + c) mod q`.
fn emit_add_constant(asm: &mut Assembler, t: usize, i: usize, addr: usize) {
    asm.dup(t + 1);
    asm.push_usize(addr);
    asm.op(Opcode::MLoad);
    asm.dup(i + 3);
    asm.op(Opcode::AddMod);
    asm.swap(i + 1);
    asm.op(Opcode::Pop);
}

/// `s_i = s_i^5 mod q`.
fn emit_sbox(asm: &mut Assembler, t: usize, i: usize) {
    asm.dup(t + 1);
    asm.dup(i + 2);
    asm.dup(2);
    asm.dup(1);
    asm.dup(3);
    asm.dup(1);
    asm.op(Opcode::MulMod);
    asm.dup(1);
    asm.op(Opcode::MulMod);
    asm.op(Opcode::MulMod);
    asm.swap(i + 1);
    asm.op(Opcode::Pop);
}

/// Shared `state = M * state` subroutine, returning through `RETURN_SLOT`.
///
/// Builds `n(t-1) .. n0` above the old state, then swaps each new value
/// into place. Deepest access is `DUP(2t+2)`.
fn emit_mix(asm: &mut Assembler, t: usize, layout: &Layout) {
    asm.label(MIX);

    for i in (0..t).rev() {
        let done = t - 1 - i;

        asm.dup(done + t + 1);
        asm.push_usize(layout.mds(i, 0));
        asm.op(Opcode::MLoad);
        asm.dup(done + 3);
        asm.op(Opcode::MulMod);

        for j in 1..t {
            asm.dup(done + t + 2);
            asm.push_usize(layout.mds(i, j));
            asm.op(Opcode::MLoad);
            asm.dup(done + 4 + j);
            asm.op(Opcode::MulMod);
            asm.dup(done + t + 3);
            asm.swap(2);
            asm.op(Opcode::AddMod);
        }
    }

    for _ in 0..t {
        asm.swap(t);
        asm.op(Opcode::Pop);
    }

    asm.push_usize(RETURN_SLOT);
    asm.op(Opcode::MLoad);
    asm.op(Opcode::Jump);
}

/// Creation prefix copying the runtime from the end of the code.
fn emit_init(runtime_len: usize) -> PoseidonResult<Vec<u8>> {
    let len = u16::try_from(runtime_len).map_err(|_| {
        ErrorCode::EmitterConfigMismatch(format!("runtime of {} bytes", runtime_len))
    })?;

    let mut asm = Assembler::new();
    asm.push_bytes(&len.to_be_bytes());
    asm.dup(1);
    asm.dup(1);
    asm.op(Opcode::CodeSize);
    asm.op(Opcode::Sub);
    asm.push_usize(0);
    asm.op(Opcode::CodeCopy);
    asm.push_usize(0);
    asm.op(Opcode::Return);
    asm.finish()
}
