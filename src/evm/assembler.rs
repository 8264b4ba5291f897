//! Two-pass label assembler.
//!
//! Label references are always encoded as `PUSH2` placeholders and patched
//! in [`Assembler::finish`], so the layout never depends on label values.
//! Numeric constants use the narrowest push that holds them.

use super::opcode::Opcode;
use crate::error::{ErrorCode, PoseidonResult};
use std::collections::BTreeMap;

/// Bytecode under construction.
#[derive(Debug, Default)]
pub struct Assembler {
    code: Vec<u8>,
    labels: BTreeMap<String, usize>,
    fixups: Vec<(usize, String)>,
    error: Option<ErrorCode>,
}

fn mismatch(msg: String) -> ErrorCode {
    ErrorCode::EmitterConfigMismatch(msg)
}

impl Assembler {
    /// Empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current code offset.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    fn fail(&mut self, err: ErrorCode) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn emit(&mut self, op: Opcode) {
        match op.byte() {
            Some(byte) => self.code.push(byte),
            None => self.fail(mismatch(format!("{} is out of range", op))),
        }
    }

    /// Emit an opcode without immediate.
    pub fn op(&mut self, op: Opcode) {
        if op.immediate_len() != 0 {
            self.fail(mismatch(format!("{} needs an immediate", op)));
            return;
        }
        self.emit(op);
    }

    /// `DUPn`.
    pub fn dup(&mut self, n: usize) {
        match u8::try_from(n) {
            Ok(n) => self.emit(Opcode::Dup(n)),
            Err(_) => self.fail(mismatch(format!("DUP{} is out of range", n))),
        }
    }

    /// `SWAPn`.
    pub fn swap(&mut self, n: usize) {
        match u8::try_from(n) {
            Ok(n) => self.emit(Opcode::Swap(n)),
            Err(_) => self.fail(mismatch(format!("SWAP{} is out of range", n))),
        }
    }

    /// Push a big-endian value with leading zero bytes stripped.
    ///
    /// Zero is pushed as `PUSH1 0x00`.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        let trimmed = &bytes[start..];
        let trimmed: &[u8] = if trimmed.is_empty() { &[0] } else { trimmed };

        match u8::try_from(trimmed.len()) {
            Ok(n @ 1..=32) => {
                self.emit(Opcode::Push(n));
                self.code.extend_from_slice(trimmed);
            }
            _ => self.fail(mismatch(format!(
                "{}-byte constant does not fit a push",
                trimmed.len()
            ))),
        }
    }

    /// Push an integer with the narrowest encoding.
    pub fn push_usize(&mut self, value: usize) {
        self.push_bytes(&(value as u64).to_be_bytes());
    }

    /// Push a full 32-byte word.
    pub fn push_word(&mut self, word: &[u8; 32]) {
        self.emit(Opcode::Push(32));
        self.code.extend_from_slice(word);
    }

    /// Push the address of `label` as a `PUSH2` placeholder.
    pub fn push_label(&mut self, label: &str) {
        self.emit(Opcode::Push(2));
        self.fixups.push((self.code.len(), label.to_string()));
        self.code.extend_from_slice(&[0, 0]);
    }

    /// Define `label` here and emit a `JUMPDEST`.
    pub fn label(&mut self, label: &str) {
        self.mark(label);
        self.emit(Opcode::JumpDest);
    }

    /// Define `label` here without emitting anything.
    pub fn mark(&mut self, label: &str) {
        if self.labels.insert(label.to_string(), self.code.len()).is_some() {
            self.fail(mismatch(format!("label {:?} defined twice", label)));
        }
    }

    /// `PUSH2 @label; JUMP`.
    pub fn jump(&mut self, label: &str) {
        self.push_label(label);
        self.emit(Opcode::Jump);
    }

    /// `PUSH2 @label; JUMPI`.
    pub fn jumpi(&mut self, label: &str) {
        self.push_label(label);
        self.emit(Opcode::JumpI);
    }

    /// Append raw bytes, e.g. a data segment.
    pub fn raw(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    /// Resolve label references and return the code.
    pub fn finish(mut self) -> PoseidonResult<Vec<u8>> {
        if let Some(err) = self.error {
            return Err(err);
        }

        for (at, label) in &self.fixups {
            let target = *self
                .labels
                .get(label)
                .ok_or_else(|| mismatch(format!("undefined label {:?}", label)))?;
            let target = u16::try_from(target).map_err(|_| {
                mismatch(format!("label {:?} at {:#x} exceeds PUSH2", label, target))
            })?;
            if let Some(slot) = self.code.get_mut(*at..*at + 2) {
                slot.copy_from_slice(&target.to_be_bytes());
            }
        }

        Ok(self.code)
    }
}
