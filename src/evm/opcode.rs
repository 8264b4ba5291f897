//! The EVM opcode subset used by emitted code.

use std::fmt;

/// An EVM instruction, without its immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Halt.
    Stop,
    /// Wrapping 256-bit subtraction.
    Sub,
    /// `(a + b) mod n`.
    AddMod,
    /// `(a * b) mod n`.
    MulMod,
    /// Unsigned less-than.
    Lt,
    /// Equality.
    Eq,
    /// Is zero.
    IsZero,
    /// Logical right shift.
    Shr,
    /// Load a 32-byte calldata word.
    CallDataLoad,
    /// Calldata length.
    CallDataSize,
    /// Code length.
    CodeSize,
    /// Copy code to memory.
    CodeCopy,
    /// Discard the top of stack.
    Pop,
    /// Load a memory word.
    MLoad,
    /// Store a memory word.
    MStore,
    /// Unconditional jump.
    Jump,
    /// Conditional jump.
    JumpI,
    /// Jump target marker.
    JumpDest,
    /// Push an `n`-byte immediate, `1..=32`.
    Push(u8),
    /// Duplicate the `n`th stack item, `1..=16`.
    Dup(u8),
    /// Swap the top with the `n+1`th stack item, `1..=16`.
    Swap(u8),
    /// Halt returning memory.
    Return,
    /// Halt reverting with memory.
    Revert,
    /// Designated invalid instruction.
    Invalid,
}

impl Opcode {
    /// Encoded byte, or `None` when a `Push`, `Dup` or `Swap` index is
    /// outside its range.
    pub fn byte(self) -> Option<u8> {
        let byte = match self {
            Opcode::Stop => 0x00,
            Opcode::Sub => 0x03,
            Opcode::AddMod => 0x08,
            Opcode::MulMod => 0x09,
            Opcode::Lt => 0x10,
            Opcode::Eq => 0x14,
            Opcode::IsZero => 0x15,
            Opcode::Shr => 0x1c,
            Opcode::CallDataLoad => 0x35,
            Opcode::CallDataSize => 0x36,
            Opcode::CodeSize => 0x38,
            Opcode::CodeCopy => 0x39,
            Opcode::Pop => 0x50,
            Opcode::MLoad => 0x51,
            Opcode::MStore => 0x52,
            Opcode::Jump => 0x56,
            Opcode::JumpI => 0x57,
            Opcode::JumpDest => 0x5b,
            Opcode::Push(n @ 1..=32) => 0x5f + n,
            Opcode::Dup(n @ 1..=16) => 0x7f + n,
            Opcode::Swap(n @ 1..=16) => 0x8f + n,
            Opcode::Push(_) | Opcode::Dup(_) | Opcode::Swap(_) => return None,
            Opcode::Return => 0xf3,
            Opcode::Revert => 0xfd,
            Opcode::Invalid => 0xfe,
        };
        Some(byte)
    }

    /// Decode a byte, or `None` outside the supported subset.
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        let op = match byte {
            0x00 => Opcode::Stop,
            0x03 => Opcode::Sub,
            0x08 => Opcode::AddMod,
            0x09 => Opcode::MulMod,
            0x10 => Opcode::Lt,
            0x14 => Opcode::Eq,
            0x15 => Opcode::IsZero,
            0x1c => Opcode::Shr,
            0x35 => Opcode::CallDataLoad,
            0x36 => Opcode::CallDataSize,
            0x38 => Opcode::CodeSize,
            0x39 => Opcode::CodeCopy,
            0x50 => Opcode::Pop,
            0x51 => Opcode::MLoad,
            0x52 => Opcode::MStore,
            0x56 => Opcode::Jump,
            0x57 => Opcode::JumpI,
            0x5b => Opcode::JumpDest,
            0x60..=0x7f => Opcode::Push(byte - 0x5f),
            0x80..=0x8f => Opcode::Dup(byte - 0x7f),
            0x90..=0x9f => Opcode::Swap(byte - 0x8f),
            0xf3 => Opcode::Return,
            0xfd => Opcode::Revert,
            0xfe => Opcode::Invalid,
            _ => return None,
        };
        Some(op)
    }

    /// Number of immediate bytes following the opcode.
    pub fn immediate_len(self) -> usize {
        match self {
            Opcode::Push(n) => n as usize,
            _ => 0,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Stop => write!(f, "STOP"),
            Opcode::Sub => write!(f, "SUB"),
            Opcode::AddMod => write!(f, "ADDMOD"),
            Opcode::MulMod => write!(f, "MULMOD"),
            Opcode::Lt => write!(f, "LT"),
            Opcode::Eq => write!(f, "EQ"),
            Opcode::IsZero => write!(f, "ISZERO"),
            Opcode::Shr => write!(f, "SHR"),
            Opcode::CallDataLoad => write!(f, "CALLDATALOAD"),
            Opcode::CallDataSize => write!(f, "CALLDATASIZE"),
            Opcode::CodeSize => write!(f, "CODESIZE"),
            Opcode::CodeCopy => write!(f, "CODECOPY"),
            Opcode::Pop => write!(f, "POP"),
            Opcode::MLoad => write!(f, "MLOAD"),
            Opcode::MStore => write!(f, "MSTORE"),
            Opcode::Jump => write!(f, "JUMP"),
            Opcode::JumpI => write!(f, "JUMPI"),
            Opcode::JumpDest => write!(f, "JUMPDEST"),
            Opcode::Push(n) => write!(f, "PUSH{}", n),
            Opcode::Dup(n) => write!(f, "DUP{}", n),
            Opcode::Swap(n) => write!(f, "SWAP{}", n),
            Opcode::Return => write!(f, "RETURN"),
            Opcode::Revert => write!(f, "REVERT"),
            Opcode::Invalid => write!(f, "INVALID"),
        }
    }
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction<'a> {
    /// Offset of the opcode byte.
    pub pc: usize,
    /// Raw opcode byte.
    pub byte: u8,
    /// Decoded opcode, `None` for bytes outside the subset.
    pub opcode: Option<Opcode>,
    /// Immediate bytes; shorter than declared if the code ends early.
    pub immediate: &'a [u8],
}

impl fmt::Display for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}: ", self.pc)?;
        match self.opcode {
            Some(op) if self.immediate.is_empty() => write!(f, "{}", op),
            Some(op) => write!(f, "{} 0x{}", op, hex::encode(self.immediate)),
            None => write!(f, "0x{:02x}", self.byte),
        }
    }
}

/// Linear disassembly of `code`.
pub fn disassemble(code: &[u8]) -> Vec<Instruction<'_>> {
    let mut out = Vec::new();
    let mut pc = 0;
    while let Some(&byte) = code.get(pc) {
        let opcode = Opcode::from_byte(byte);
        let start = pc + 1;
        let end = (start + opcode.map_or(0, Opcode::immediate_len)).min(code.len());
        out.push(Instruction {
            pc,
            byte,
            opcode,
            immediate: code.get(start..end).unwrap_or(&[]),
        });
        pc = end.max(start);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_round_trip() {
        for byte in 0..=u8::MAX {
            if let Some(op) = Opcode::from_byte(byte) {
                assert_eq!(op.byte(), Some(byte));
            }
        }
        assert_eq!(Opcode::Push(1).byte(), Some(0x60));
        assert_eq!(Opcode::Push(32).byte(), Some(0x7f));
        assert_eq!(Opcode::Dup(16).byte(), Some(0x8f));
        assert_eq!(Opcode::Swap(1).byte(), Some(0x90));
        assert_eq!(Opcode::from_byte(0x01), None);
        assert_eq!(Opcode::from_byte(0x17), None);
    }

    #[test]
    fn test_indexed_opcodes_out_of_range() {
        for op in [
            Opcode::Push(0),
            Opcode::Push(33),
            Opcode::Push(u8::MAX),
            Opcode::Dup(0),
            Opcode::Dup(17),
            Opcode::Swap(0),
            Opcode::Swap(u8::MAX),
        ] {
            assert_eq!(op.byte(), None, "{}", op);
        }
    }

    #[test]
    fn test_disassemble() {
        let code = [0x61, 0x01, 0x02, 0x80, 0x09, 0xaa, 0x60];
        let listing: Vec<String> = disassemble(&code).iter().map(ToString::to_string).collect();
        assert_eq!(
            listing,
            vec![
                "0000: PUSH2 0x0102",
                "0003: DUP1",
                "0004: MULMOD",
                "0005: 0xaa",
                "0006: PUSH1",
            ]
        );
    }
}
