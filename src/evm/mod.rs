//! EVM contract emission for the Poseidon hash.
//!
//! [`emit`] turns a [`PermutationConfig`](crate::poseidon::PermutationConfig)
//! into deployable creation code plus a Solidity ABI. The [`Machine`]
//! interpreter executes that code so it can be checked against the native
//! hash without an external node.

mod abi;
mod assembler;
mod emitter;
mod interpreter;
mod opcode;

pub use abi::{encode_call, selector, EntryPoint, InterfaceDescriptor, Param, FUNCTION_NAME};
pub use assembler::Assembler;
pub use emitter::{emit, BytecodeArtifact, MAX_RUNTIME_SIZE, MAX_WIDTH};
pub use interpreter::{ExecOutcome, Machine, VmError, DEFAULT_STEP_LIMIT, MEMORY_LIMIT};
pub use opcode::{disassemble, Instruction, Opcode};
