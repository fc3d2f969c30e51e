// SPDX-License-Identifier: MIT
// Copyright 2026 Poppy contributors

//! # Poppy
//!
//! A small bytecode virtual machine kernel.
//!
//! This crate provides:
//! - A tagged 64-bit value representation (`Cell`)
//! - A semispace copying heap with a Cheney-style collector
//! - An append-only object builder (`Builder`) and a bytecode assembler
//!   with two-pass label back-patching (`CodePlanter`)
//! - A permanent identifier table for global bindings
//! - An O(1) extra-roots registry for values pinned outside the heap
//! - A dense-match interpreter (`Engine`) over a 17-opcode instruction set
//!
//! There is no reader, compiler, or surface language here: programs are
//! built directly against `CodePlanter`'s mnemonic API. See
//! `src/bin/poppy-demo.rs` for a worked example.

pub mod builder;
pub mod cell;
pub mod collector;
pub mod engine;
pub mod heap;
pub mod identifier;
pub mod mishap;
pub mod planter;
pub mod roots;
pub mod symbol;

pub use cell::Cell;
pub use engine::Engine;
pub use heap::HeapPtr;
pub use mishap::{Kind as MishapKind, Mishap, Severity as MishapSeverity};
pub use planter::{CodePlanter, Label};
