//! Minimal EVM interpreter for the emitted opcode subset.
//!
//! No gas, storage, logs or calls: just enough machine to deploy creation
//! code and execute the runtime against calldata.

use super::opcode::Opcode;
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use std::sync::OnceLock;
use thiserror::Error;

/// Default step budget per execution.
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

/// Memory cap in bytes.
pub const MEMORY_LIMIT: usize = 1 << 20;

const STACK_LIMIT: usize = 1024;

/// How an execution halted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// `RETURN` with output bytes.
    Return(Vec<u8>),
    /// `REVERT` with output bytes.
    Revert(Vec<u8>),
    /// `STOP` or end of code.
    Stop,
    /// `INVALID`.
    Invalid,
}

/// Faults the machine cannot express as an [`ExecOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// Pop from an empty stack.
    #[error("stack underflow at pc {pc:#x}")]
    StackUnderflow {
        /// Program counter.
        pc: usize,
    },
    /// Push beyond 1024 items.
    #[error("stack overflow at pc {pc:#x}")]
    StackOverflow {
        /// Program counter.
        pc: usize,
    },
    /// Jump to something other than a `JUMPDEST`.
    #[error("bad jump destination {dest} at pc {pc:#x}")]
    BadJump {
        /// Program counter.
        pc: usize,
        /// Requested destination.
        dest: String,
    },
    /// Byte outside the supported subset.
    #[error("unsupported opcode {byte:#04x} at pc {pc:#x}")]
    UnsupportedOpcode {
        /// Program counter.
        pc: usize,
        /// Opcode byte.
        byte: u8,
    },
    /// Memory access beyond [`MEMORY_LIMIT`].
    #[error("memory access out of range at pc {pc:#x}")]
    MemoryLimit {
        /// Program counter.
        pc: usize,
    },
    /// Step budget exhausted.
    #[error("step limit of {0} exceeded")]
    StepLimit(usize),
    /// Creation code did not return runtime code.
    #[error("deployment failed: {0:?}")]
    DeployFailed(ExecOutcome),
}

fn word_modulus() -> &'static BigUint {
    static MODULUS: OnceLock<BigUint> = OnceLock::new();
    MODULUS.get_or_init(|| BigUint::one() << 256u32)
}

/// Interpreter configuration.
#[derive(Debug, Clone, Copy)]
pub struct Machine {
    step_limit: usize,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    /// Machine with [`DEFAULT_STEP_LIMIT`].
    pub fn new() -> Self {
        Self {
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Machine with a custom step budget.
    pub fn with_step_limit(step_limit: usize) -> Self {
        Self { step_limit }
    }

    /// Run creation code and return the deployed runtime.
    pub fn deploy(&self, init_code: &[u8]) -> Result<Vec<u8>, VmError> {
        match self.call(init_code, &[])? {
            ExecOutcome::Return(runtime) => Ok(runtime),
            other => Err(VmError::DeployFailed(other)),
        }
    }

    /// Execute `code` against `calldata`.
    pub fn call(&self, code: &[u8], calldata: &[u8]) -> Result<ExecOutcome, VmError> {
        Frame::new(code, calldata).run(self.step_limit)
    }
}

struct Frame<'a> {
    code: &'a [u8],
    calldata: &'a [u8],
    jumpdests: Vec<bool>,
    pc: usize,
    stack: Vec<BigUint>,
    memory: Vec<u8>,
}

fn valid_jumpdests(code: &[u8]) -> Vec<bool> {
    let mut valid = vec![false; code.len()];
    let mut pc = 0;
    while let Some(&byte) = code.get(pc) {
        match Opcode::from_byte(byte) {
            Some(Opcode::JumpDest) => valid[pc] = true,
            Some(op) => pc += op.immediate_len(),
            None => {}
        }
        pc += 1;
    }
    valid
}

impl<'a> Frame<'a> {
    fn new(code: &'a [u8], calldata: &'a [u8]) -> Self {
        Self {
            code,
            calldata,
            jumpdests: valid_jumpdests(code),
            pc: 0,
            stack: Vec::new(),
            memory: Vec::new(),
        }
    }

    fn pop(&mut self) -> Result<BigUint, VmError> {
        self.stack
            .pop()
            .ok_or(VmError::StackUnderflow { pc: self.pc })
    }

    fn push(&mut self, value: BigUint) -> Result<(), VmError> {
        if self.stack.len() >= STACK_LIMIT {
            return Err(VmError::StackOverflow { pc: self.pc });
        }
        self.stack.push(value);
        Ok(())
    }

    fn push_bool(&mut self, value: bool) -> Result<(), VmError> {
        self.push(if value { BigUint::one() } else { BigUint::zero() })
    }

    /// Offset and length as usize, growing memory to cover them.
    fn touch(&mut self, offset: &BigUint, len: &BigUint) -> Result<(usize, usize), VmError> {
        let len = len.to_usize().ok_or(VmError::MemoryLimit { pc: self.pc })?;
        if len == 0 {
            return Ok((0, 0));
        }
        let offset = offset
            .to_usize()
            .ok_or(VmError::MemoryLimit { pc: self.pc })?;
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= MEMORY_LIMIT)
            .ok_or(VmError::MemoryLimit { pc: self.pc })?;
        if end > self.memory.len() {
            self.memory.resize(end.div_ceil(32) * 32, 0);
        }
        Ok((offset, len))
    }

    fn read_memory(&mut self, offset: &BigUint, len: &BigUint) -> Result<Vec<u8>, VmError> {
        let (offset, len) = self.touch(offset, len)?;
        Ok(self.memory[offset..offset + len].to_vec())
    }

    fn jump(&mut self, dest: BigUint) -> Result<(), VmError> {
        let target = dest
            .to_usize()
            .filter(|&d| self.jumpdests.get(d).copied().unwrap_or(false));
        match target {
            Some(d) => {
                self.pc = d;
                Ok(())
            }
            None => Err(VmError::BadJump {
                pc: self.pc,
                dest: format!("{:#x}", dest),
            }),
        }
    }

    fn run(mut self, step_limit: usize) -> Result<ExecOutcome, VmError> {
        let modulus = word_modulus();

        for _ in 0..step_limit {
            let Some(&byte) = self.code.get(self.pc) else {
                return Ok(ExecOutcome::Stop);
            };
            let op = Opcode::from_byte(byte).ok_or(VmError::UnsupportedOpcode {
                pc: self.pc,
                byte,
            })?;
            let mut next = self.pc + 1;

            match op {
                Opcode::Stop => return Ok(ExecOutcome::Stop),
                Opcode::Invalid => return Ok(ExecOutcome::Invalid),
                Opcode::Sub => {
                    let a = self.pop()?;
                    let b = self.pop()?;
                    self.push((a + modulus - b) % modulus)?;
                }
                Opcode::AddMod | Opcode::MulMod => {
                    let a = self.pop()?;
                    let b = self.pop()?;
                    let n = self.pop()?;
                    let value = if n.is_zero() {
                        BigUint::zero()
                    } else if op == Opcode::AddMod {
                        (a + b) % n
                    } else {
                        (a * b) % n
                    };
                    self.push(value)?;
                }
                Opcode::Lt => {
                    let a = self.pop()?;
                    let b = self.pop()?;
                    self.push_bool(a < b)?;
                }
                Opcode::Eq => {
                    let a = self.pop()?;
                    let b = self.pop()?;
                    self.push_bool(a == b)?;
                }
                Opcode::IsZero => {
                    let a = self.pop()?;
                    self.push_bool(a.is_zero())?;
                }
                Opcode::Shr => {
                    let shift = self.pop()?;
                    let value = self.pop()?;
                    let shifted = match shift.to_u32() {
                        Some(s) if s < 256 => value >> s,
                        _ => BigUint::zero(),
                    };
                    self.push(shifted)?;
                }
                Opcode::CallDataLoad => {
                    let offset = self.pop()?;
                    let mut word = [0u8; 32];
                    if let Some(start) = offset.to_usize() {
                        for (i, b) in word.iter_mut().enumerate() {
                            *b = start
                                .checked_add(i)
                                .and_then(|at| self.calldata.get(at))
                                .copied()
                                .unwrap_or(0);
                        }
                    }
                    self.push(BigUint::from_bytes_be(&word))?;
                }
                Opcode::CallDataSize => self.push(BigUint::from(self.calldata.len()))?,
                Opcode::CodeSize => self.push(BigUint::from(self.code.len()))?,
                Opcode::CodeCopy => {
                    let dest = self.pop()?;
                    let offset = self.pop()?;
                    let len = self.pop()?;
                    let (dest, len) = self.touch(&dest, &len)?;
                    let src = offset.to_usize();
                    let code = self.code;
                    for (i, b) in self.memory[dest..dest + len].iter_mut().enumerate() {
                        *b = src
                            .and_then(|s| s.checked_add(i))
                            .and_then(|at| code.get(at))
                            .copied()
                            .unwrap_or(0);
                    }
                }
                Opcode::Pop => {
                    self.pop()?;
                }
                Opcode::MLoad => {
                    let offset = self.pop()?;
                    let bytes = self.read_memory(&offset, &BigUint::from(32u32))?;
                    self.push(BigUint::from_bytes_be(&bytes))?;
                }
                Opcode::MStore => {
                    let offset = self.pop()?;
                    let value = self.pop()?;
                    let (offset, _) = self.touch(&offset, &BigUint::from(32u32))?;
                    let bytes = value.to_bytes_be();
                    let word = &mut self.memory[offset..offset + 32];
                    word.fill(0);
                    word[32 - bytes.len()..].copy_from_slice(&bytes);
                }
                Opcode::Jump => {
                    let dest = self.pop()?;
                    self.jump(dest)?;
                    continue;
                }
                Opcode::JumpI => {
                    let dest = self.pop()?;
                    let cond = self.pop()?;
                    if !cond.is_zero() {
                        self.jump(dest)?;
                        continue;
                    }
                }
                Opcode::JumpDest => {}
                Opcode::Push(n) => {
                    let n = n as usize;
                    let mut word = vec![0u8; n];
                    for (i, b) in word.iter_mut().enumerate() {
                        *b = self.code.get(self.pc + 1 + i).copied().unwrap_or(0);
                    }
                    self.push(BigUint::from_bytes_be(&word))?;
                    next += n;
                }
                Opcode::Dup(n) => {
                    let value = self
                        .stack
                        .len()
                        .checked_sub(n as usize)
                        .and_then(|i| self.stack.get(i))
                        .cloned()
                        .ok_or(VmError::StackUnderflow { pc: self.pc })?;
                    self.push(value)?;
                }
                Opcode::Swap(n) => {
                    let top = self.stack.len().checked_sub(1);
                    let other = self.stack.len().checked_sub(n as usize + 1);
                    match (top, other) {
                        (Some(top), Some(other)) => self.stack.swap(top, other),
                        _ => return Err(VmError::StackUnderflow { pc: self.pc }),
                    }
                }
                Opcode::Return | Opcode::Revert => {
                    let offset = self.pop()?;
                    let len = self.pop()?;
                    let data = self.read_memory(&offset, &len)?;
                    return Ok(if op == Opcode::Return {
                        ExecOutcome::Return(data)
                    } else {
                        ExecOutcome::Revert(data)
                    });
                }
            }

            self.pc = next;
        }

        Err(VmError::StepLimit(step_limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(code: &[u8]) -> Result<ExecOutcome, VmError> {
        Machine::new().call(code, &[])
    }

    /// Store the top of stack at 0 and return it.
    const RETURN_TOP: [u8; 8] = [0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];

    fn returns(prefix: &[u8]) -> BigUint {
        let mut code = prefix.to_vec();
        code.extend_from_slice(&RETURN_TOP);
        match run(&code).unwrap() {
            ExecOutcome::Return(out) => BigUint::from_bytes_be(&out),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic() {
        // (5 + 4) mod 7
        assert_eq!(returns(&[0x60, 7, 0x60, 4, 0x60, 5, 0x08]), BigUint::from(2u32));
        // (5 * 4) mod 7
        assert_eq!(returns(&[0x60, 7, 0x60, 4, 0x60, 5, 0x09]), BigUint::from(6u32));
        // 1 - 2 wraps
        let wrapped = returns(&[0x60, 2, 0x60, 1, 0x03]);
        assert_eq!(wrapped, word_modulus() - 1u32);
        // 0xff >> 4
        assert_eq!(returns(&[0x60, 0xff, 0x60, 4, 0x1c]), BigUint::from(0x0fu32));
    }

    #[test]
    fn test_comparisons() {
        // 1 < 2
        assert_eq!(returns(&[0x60, 2, 0x60, 1, 0x10]), BigUint::one());
        assert_eq!(returns(&[0x60, 1, 0x60, 2, 0x10]), BigUint::zero());
        assert_eq!(returns(&[0x60, 3, 0x60, 3, 0x14]), BigUint::one());
        assert_eq!(returns(&[0x60, 0, 0x15]), BigUint::one());
    }

    #[test]
    fn test_dup_swap() {
        // push 1, push 2, swap1 -> top is 1
        assert_eq!(returns(&[0x60, 1, 0x60, 2, 0x90]), BigUint::one());
        // push 1, push 2, dup2 -> top is 1
        assert_eq!(returns(&[0x60, 1, 0x60, 2, 0x81]), BigUint::one());
    }

    #[test]
    fn test_jumps() {
        // PUSH1 6, JUMP, INVALID, INVALID, INVALID, JUMPDEST, STOP
        assert_eq!(
            run(&[0x60, 0x06, 0x56, 0xfe, 0xfe, 0xfe, 0x5b, 0x00]).unwrap(),
            ExecOutcome::Stop
        );
        // Jump into push data.
        assert!(matches!(
            run(&[0x60, 0x04, 0x56, 0x60, 0x5b]),
            Err(VmError::BadJump { .. })
        ));
        // JUMPI not taken.
        assert_eq!(
            run(&[0x60, 0x00, 0x60, 0x06, 0x57, 0xfe]).unwrap(),
            ExecOutcome::Invalid
        );
    }

    #[test]
    fn test_faults() {
        assert!(matches!(run(&[0x50]), Err(VmError::StackUnderflow { .. })));
        assert!(matches!(
            run(&[0x01]),
            Err(VmError::UnsupportedOpcode { byte: 0x01, .. })
        ));
        // Infinite loop.
        assert_eq!(
            Machine::with_step_limit(100).call(&[0x5b, 0x60, 0x00, 0x56], &[]),
            Err(VmError::StepLimit(100))
        );
        // MLOAD far beyond the memory cap.
        assert!(matches!(
            run(&[0x63, 0xff, 0xff, 0xff, 0xff, 0x51]),
            Err(VmError::MemoryLimit { .. })
        ));
    }

    #[test]
    fn test_calldata() {
        let calldata = [0xaa, 0xbb];
        // CALLDATASIZE, then CALLDATALOAD(0) is zero-padded.
        let code = [0x36, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];
        let out = Machine::new().call(&code, &calldata).unwrap();
        assert_eq!(out, ExecOutcome::Return({
            let mut w = vec![0u8; 32];
            w[31] = 2;
            w
        }));

        let code = [0x60, 0x00, 0x35, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];
        match Machine::new().call(&code, &calldata).unwrap() {
            ExecOutcome::Return(w) => {
                assert_eq!(&w[..2], &[0xaa, 0xbb]);
                assert!(w[2..].iter().all(|&b| b == 0));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_deploy() {
        // Returns the single byte 0x00 copied from the end of the code.
        let init = [0x60, 0x01, 0x80, 0x80, 0x38, 0x03, 0x60, 0x00, 0x39, 0x60, 0x00, 0xf3, 0x00];
        assert_eq!(Machine::new().deploy(&init).unwrap(), vec![0x00]);

        assert!(matches!(
            Machine::new().deploy(&[0x00]),
            Err(VmError::DeployFailed(ExecOutcome::Stop))
        ));
    }

    #[test]
    fn test_revert() {
        assert_eq!(
            run(&[0x60, 0x00, 0x80, 0xfd]).unwrap(),
            ExecOutcome::Revert(Vec::new())
        );
    }
}
