// SPDX-License-Identifier: MIT
// Copyright 2026 Poppy contributors

//! The tagged 64-bit value that flows through every part of Poppy: the
//! value stack, the call stack, the heap, and identifier bindings.
//!
//! The low 3 bits are the tag; for `Key` and `Special` cells the next 5
//! bits narrow the interpretation further, giving an 8-bit "wide tag".

#[cfg(test)]
mod cell_test;

use core::fmt;

/// Low 3-bit tag values.
pub mod tag {
    pub const SMALL: u64 = 0;
    pub const TAGGED_PTR: u64 = 1;
    pub const SMALL_FLOAT: u64 = 2;
    pub const KEY: u64 = 3;
    pub const SPECIAL: u64 = 4;
    pub const EVACUATED: u64 = 5;
    #[allow(dead_code)]
    pub const UNUSED: u64 = 6;
    pub const VISITED: u64 = 7;
}

const TAG_MASK: u64 = 0x7;
const WIDE_TAG_MASK: u64 = 0xFF;

/// Full 8-bit wide tags for the `Special` tag's subkinds.
pub mod special {
    pub const FALSE: u64 = 0x04;
    pub const TRUE: u64 = 0x0C;
    pub const SENTINEL: u64 = 0x14;
    pub const SYMBOL: u64 = 0x1C;
}

/// `KeyCode`s: the wide tags a `Key`-tagged cell can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum KeyCode {
    KeyKey = 0x03,
    ProcedureKey = 0x0B,
    BooleanKey = 0x13,
    IntVectorKey = 0x1B,
    SymbolKey = 0x2B,
}

impl KeyCode {
    /// Recover a `KeyCode` from a cell's raw wide tag, if it names one we
    /// recognise. Unknown key codes are a GC-time `Mishap`, not a panic
    /// here — see `collector.rs`.
    #[must_use]
    pub const fn from_wide_tag(wide_tag: u64) -> Option<Self> {
        match wide_tag {
            0x03 => Some(Self::KeyKey),
            0x0B => Some(Self::ProcedureKey),
            0x13 => Some(Self::BooleanKey),
            0x1B => Some(Self::IntVectorKey),
            0x2B => Some(Self::SymbolKey),
            _ => None,
        }
    }
}

/// A single 64-bit tagged runtime value.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Cell(pub u64);

impl Cell {
    /// Raw zero cell (tag `Small`, value 0). Used to pre-fill reserved
    /// local slots before a frame's code has run.
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn raw(bits: u64) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn tag(self) -> u64 {
        self.0 & TAG_MASK
    }

    #[must_use]
    pub const fn wide_tag(self) -> u64 {
        self.0 & WIDE_TAG_MASK
    }

    // --- constructors -------------------------------------------------

    /// `n << 3`, tag `Small`. Callers guarantee `n` fits the 61-bit
    /// range; overflow is the planter/engine's problem, not this
    /// constructor's.
    #[must_use]
    pub const fn make_small(n: i64) -> Self {
        Self(((n as u64) << 3) | tag::SMALL)
    }

    /// A pointer to the cell at heap index `idx`.
    #[must_use]
    pub const fn make_tagged_ptr(idx: usize) -> Self {
        Self(((idx as u64) << 3) | tag::TAGGED_PTR)
    }

    /// A forwarding pointer left behind by the collector, pointing at
    /// `idx` in to-space.
    #[must_use]
    pub const fn make_forwarded(idx: usize) -> Self {
        Self(((idx as u64) << 3) | tag::EVACUATED)
    }

    #[must_use]
    pub const fn make_key(code: KeyCode) -> Self {
        Self(code as u64)
    }

    #[must_use]
    pub const fn make_symbol(index: u64) -> Self {
        Self((index << 8) | special::SYMBOL)
    }

    #[must_use]
    pub const fn make_false() -> Self {
        Self(special::FALSE)
    }

    #[must_use]
    pub const fn make_true() -> Self {
        Self(special::TRUE)
    }

    #[must_use]
    pub const fn make_sentinel(index: u64) -> Self {
        Self((index << 8) | special::SENTINEL)
    }

    /// Raw `u64` payload stored as-is (used for NumLocals, the Q-block's
    /// offset list, and other non-tagged header fields).
    #[must_use]
    pub const fn make_raw_u64(n: u64) -> Self {
        Self(n)
    }

    // --- predicates -----------------------------------------------------

    #[must_use]
    pub const fn is_small(self) -> bool {
        self.tag() == tag::SMALL
    }

    #[must_use]
    pub const fn is_tagged_ptr(self) -> bool {
        self.tag() == tag::TAGGED_PTR
    }

    #[must_use]
    pub const fn is_key(self) -> bool {
        self.tag() == tag::KEY
    }

    #[must_use]
    pub const fn is_forwarded(self) -> bool {
        self.tag() == tag::EVACUATED
    }

    /// `(cell & 0xF7) == 0x04`: clears the bit that distinguishes True
    /// from False, so this matches the canonical False cell only.
    #[must_use]
    pub const fn is_false(self) -> bool {
        (self.0 & 0xF7) == special::FALSE
    }

    #[must_use]
    pub const fn is_true(self) -> bool {
        self.wide_tag() == special::TRUE
    }

    #[must_use]
    pub const fn is_boolean(self) -> bool {
        (self.0 & 0xF7) == special::FALSE
    }

    /// Truthiness is "not false".
    #[must_use]
    pub const fn is_truthy(self) -> bool {
        !self.is_false()
    }

    #[must_use]
    pub const fn key_code(self) -> Option<KeyCode> {
        if !self.is_key() {
            return None;
        }
        KeyCode::from_wide_tag(self.wide_tag())
    }

    // --- accessors --------------------------------------------------------

    /// Arithmetic shift right by 3 to recover a small integer.
    #[must_use]
    pub const fn get_small(self) -> i64 {
        (self.0 as i64) >> 3
    }

    /// The heap index a `TaggedPtr` or `EvacuatedObject` cell names.
    #[must_use]
    pub const fn deref(self) -> usize {
        (self.0 >> 3) as usize
    }

    #[must_use]
    pub const fn raw_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn symbol_index(self) -> Option<u64> {
        if self.wide_tag() == special::SYMBOL {
            Some(self.0 >> 8)
        } else {
            None
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_small() {
            write!(f, "Small({})", self.get_small())
        } else if self.is_tagged_ptr() {
            write!(f, "TaggedPtr(@{})", self.deref())
        } else if self.is_forwarded() {
            write!(f, "Evacuated(@{})", self.deref())
        } else if self.is_false() {
            write!(f, "False")
        } else if self.is_true() {
            write!(f, "True")
        } else if let Some(code) = self.key_code() {
            write!(f, "Key({code:?})")
        } else {
            write!(f, "Cell(0x{:016x})", self.0)
        }
    }
}
