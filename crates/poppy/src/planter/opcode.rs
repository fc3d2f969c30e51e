// SPDX-License-Identifier: MIT
// Copyright 2026 Poppy contributors

//! Opcodes and their per-opcode metadata. The planter and the Engine's
//! interpreter loop must agree on `nargs`/`ptr_bitmask` for every opcode;
//! this table is the single source both read from.
//!
//! Bytecode is stored as a dense opcode index rather than a handler
//! address, matched with an inner `match` rather than computed goto.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    PushQ = 0,
    PushS = 1,
    PushGlobal = 2,
    PushLocal = 3,
    PopGlobal = 4,
    PopLocal = 5,
    Passign = 6,
    Add = 7,
    Sub = 8,
    Mul = 9,
    IfSo = 10,
    IfNot = 11,
    Goto = 12,
    CallGlobal = 13,
    CallLocal = 14,
    Return = 15,
    Halt = 16,
}

impl OpCode {
    #[must_use]
    pub const fn from_u64(raw: u64) -> Option<Self> {
        Some(match raw {
            0 => Self::PushQ,
            1 => Self::PushS,
            2 => Self::PushGlobal,
            3 => Self::PushLocal,
            4 => Self::PopGlobal,
            5 => Self::PopLocal,
            6 => Self::Passign,
            7 => Self::Add,
            8 => Self::Sub,
            9 => Self::Mul,
            10 => Self::IfSo,
            11 => Self::IfNot,
            12 => Self::Goto,
            13 => Self::CallGlobal,
            14 => Self::CallLocal,
            15 => Self::Return,
            16 => Self::Halt,
            _ => return None,
        })
    }

    /// Number of immediate operand cells this opcode consumes.
    #[must_use]
    pub const fn nargs(self) -> u8 {
        match self {
            Self::PushS | Self::Add | Self::Sub | Self::Mul | Self::Return | Self::Halt => 0,
            Self::Passign => 2,
            _ => 1,
        }
    }

    /// Bitmask over operand positions: bit `i` set means operand `i` is a
    /// tagged-pointer candidate the planter must record in the Q-block.
    #[must_use]
    pub const fn ptr_bitmask(self) -> u8 {
        match self {
            Self::PushQ => 0b1,
            Self::Passign => 0b10,
            _ => 0,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PushQ => "PUSHQ",
            Self::PushS => "PUSHS",
            Self::PushGlobal => "PUSH_GLOBAL",
            Self::PushLocal => "PUSH_LOCAL",
            Self::PopGlobal => "POP_GLOBAL",
            Self::PopLocal => "POP_LOCAL",
            Self::Passign => "PASSIGN",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::IfSo => "IFSO",
            Self::IfNot => "IFNOT",
            Self::Goto => "GOTO",
            Self::CallGlobal => "CALL_GLOBAL",
            Self::CallLocal => "CALL_LOCAL",
            Self::Return => "RETURN",
            Self::Halt => "HALT",
        }
    }
}

/// `(name, nargs, ptr_bitmask)` for one opcode.
#[must_use]
pub const fn instruction_info(op: OpCode) -> (&'static str, u8, u8) {
    (op.name(), op.nargs(), op.ptr_bitmask())
}
