// SPDX-License-Identifier: MIT
// Copyright 2026 Poppy contributors

//! The Engine: owns the heap, the identifier table, the symbol table, and
//! the extra-roots registry, and runs the dense-match interpreter loop
//! over planted procedures.
//!
//! Dispatch is a `match` over `OpCode`, not threaded (address-of-label)
//! dispatch, which Rust has no equivalent of without unsafe computed
//! jumps. Call-stack frame metadata is tracked separately from the
//! scanned local-slot cells: it's not a `Cell` and a stale or corrupt
//! return address should never be mistaken for a heap pointer by the
//! collector.


use crate::cell::{Cell, KeyCode};
use crate::collector;
use crate::heap::{Heap, HeapPtr};
use crate::identifier::{IdentId, IdentifierTable};
use crate::mishap::Mishap;
use crate::planter::opcode::OpCode;
use crate::roots::ExtraRoots;
use crate::symbol::SymbolTable;

/// Call-stack metadata for one active frame. Deliberately *not* a `Cell`
/// and never scanned by the collector: the previous-procedure pointer
/// and return PC live outside the scanned root set.
struct Frame {
    prev_proc_key: HeapPtr,
    /// `None` marks the outermost frame: its RETURN ends `run`.
    return_pc: Option<usize>,
    num_locals: u64,
}

pub struct Engine {
    pub(crate) heap: Heap,
    pub(crate) identifiers: IdentifierTable,
    pub(crate) extra_roots: ExtraRoots,
    pub(crate) symbols: SymbolTable,
    value_stack: Vec<Cell>,
    locals_stack: Vec<Cell>,
    frames: Vec<Frame>,
    current_proc: HeapPtr,
    pc: usize,
}

impl Engine {
    /// Allocates a heap of `2 * half_space_cells` cells.
    #[must_use]
    pub fn new(half_space_cells: usize) -> Self {
        Self {
            heap: Heap::new(half_space_cells),
            identifiers: IdentifierTable::new(),
            extra_roots: ExtraRoots::new(),
            symbols: SymbolTable::new(),
            value_stack: Vec::new(),
            locals_stack: Vec::new(),
            frames: Vec::new(),
            current_proc: 0,
            pc: 0,
        }
    }

    /// Idempotent; redeclaring an existing global prints a warning rather
    /// than failing.
    pub fn declare_global(&mut self, name: &str) -> IdentId {
        self.identifiers.declare(name)
    }

    #[must_use]
    pub fn global(&self, name: &str) -> Option<Cell> {
        self.identifiers.lookup(name).map(|id| self.identifiers.get(id))
    }

    #[must_use]
    pub fn is_procedure(&self, cell: Cell) -> bool {
        cell.is_tagged_ptr() && self.heap.get(cell.deref()).key_code() == Some(KeyCode::ProcedureKey)
    }

    /// Looks `name` up in the identifier table and enters it. Fails with
    /// `NotCallable` if the name is undeclared or its value is not a
    /// procedure.
    pub fn run(&mut self, name: &str) -> Result<(), Mishap> {
        let id = self
            .identifiers
            .lookup(name)
            .ok_or_else(|| Mishap::not_callable().culprit("name", name))?;
        let proc_cell = self.identifiers.get(id);
        self.call(proc_cell, None)?;
        self.dispatch_loop()
    }

    /// Runs an explicit stop-the-world collection now; normally driven at
    /// the `Builder::object()` safe point on `HeapOverflow`, here also
    /// exposed directly for callers that want to force a collection.
    pub fn gc(&mut self) -> Result<(), Mishap> {
        collector::collect(
            &mut self.heap,
            &mut self.value_stack,
            &mut self.locals_stack,
            &mut self.identifiers,
            &mut self.extra_roots,
        )
    }

    #[must_use]
    pub fn value_stack(&self) -> &[Cell] {
        &self.value_stack
    }

    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    fn call(&mut self, callee: Cell, return_pc: Option<usize>) -> Result<(), Mishap> {
        if !self.is_procedure(callee) {
            return Err(Mishap::not_callable().culprit("cell", format!("{callee:?}")));
        }
        let key = callee.deref();
        let num_locals = self.heap.get(key + 1).raw_u64();
        self.frames.push(Frame {
            prev_proc_key: self.current_proc,
            return_pc,
            num_locals,
        });
        self.current_proc = key;
        for _ in 0..num_locals {
            self.locals_stack.push(Cell::make_small(0));
        }
        self.pc = key + 2; // InstructionsOffset
        Ok(())
    }

    fn pop_value(&mut self) -> Result<Cell, Mishap> {
        // Stack underflow indicates malformed bytecode, not a Mishap kind
        // worth defining: a correctly-planted procedure never underflows.
        Ok(self
            .value_stack
            .pop()
            .expect("value stack underflow: malformed bytecode"))
    }

    fn require_small(cell: Cell) -> Result<Cell, Mishap> {
        if cell.is_small() {
            Ok(cell)
        } else {
            Err(Mishap::not_small().culprit("cell", format!("{cell:?}")))
        }
    }

    fn local_slot(&self, offset_from_top: u64) -> usize {
        self.locals_stack.len() - 1 - offset_from_top as usize
    }

    fn dispatch_loop(&mut self) -> Result<(), Mishap> {
        loop {
            let op_cell = self.heap.get(self.pc);
            let op = OpCode::from_u64(op_cell.raw_u64())
                .ok_or_else(|| {
                    Mishap::invalid_key()
                        .with_message("unrecognized opcode in instruction stream")
                        .culprit("opcode_bits", op_cell.bits())
                })?;
            self.pc += 1;

            match op {
                OpCode::PushQ => {
                    let v = self.heap.get(self.pc);
                    self.pc += 1;
                    self.value_stack.push(v);
                }
                OpCode::PushS => {
                    let top = *self
                        .value_stack
                        .last()
                        .expect("value stack underflow: malformed bytecode");
                    self.value_stack.push(top);
                }
                OpCode::PushGlobal => {
                    let id = IdentId::from_u64(self.heap.get(self.pc).raw_u64());
                    self.pc += 1;
                    self.value_stack.push(self.identifiers.get(id));
                }
                OpCode::PushLocal => {
                    let n = self.heap.get(self.pc).raw_u64();
                    self.pc += 1;
                    let idx = self.local_slot(n);
                    self.value_stack.push(self.locals_stack[idx]);
                }
                OpCode::PopGlobal => {
                    let id = IdentId::from_u64(self.heap.get(self.pc).raw_u64());
                    self.pc += 1;
                    let v = self.pop_value()?;
                    self.identifiers.set(id, v);
                }
                OpCode::PopLocal => {
                    let n = self.heap.get(self.pc).raw_u64();
                    self.pc += 1;
                    let v = self.pop_value()?;
                    let idx = self.local_slot(n);
                    self.locals_stack[idx] = v;
                }
                OpCode::Passign => {
                    let id = IdentId::from_u64(self.heap.get(self.pc).raw_u64());
                    self.pc += 1;
                    let procedure = self.heap.get(self.pc);
                    self.pc += 1;
                    self.identifiers.set(id, procedure);
                }
                OpCode::Add => {
                    let b = Self::require_small(self.pop_value()?)?;
                    let a = Self::require_small(self.pop_value()?)?;
                    let raw = (a.bits() as i64)
                        .checked_add(b.bits() as i64)
                        .ok_or_else(|| {
                            Mishap::overflow()
                                .culprit("lhs", a.get_small())
                                .culprit("rhs", b.get_small())
                        })?;
                    self.value_stack.push(Cell::raw(raw as u64));
                }
                OpCode::Sub => {
                    let b = Self::require_small(self.pop_value()?)?;
                    let a = Self::require_small(self.pop_value()?)?;
                    let raw = (a.bits() as i64)
                        .checked_sub(b.bits() as i64)
                        .ok_or_else(|| {
                            Mishap::overflow()
                                .culprit("lhs", a.get_small())
                                .culprit("rhs", b.get_small())
                        })?;
                    self.value_stack.push(Cell::raw(raw as u64));
                }
                OpCode::Mul => {
                    let b = Self::require_small(self.pop_value()?)?;
                    let a = Self::require_small(self.pop_value()?)?;
                    let raw = a.get_small().checked_mul(b.bits() as i64).ok_or_else(|| {
                        Mishap::overflow()
                            .culprit("lhs", a.get_small())
                            .culprit("rhs", b.get_small())
                    })?;
                    self.value_stack.push(Cell::raw(raw as u64));
                }
                OpCode::IfSo => {
                    let delta = self.heap.get(self.pc).raw_u64() as i64;
                    let delta_pc = self.pc;
                    self.pc += 1;
                    let v = self.pop_value()?;
                    if v.is_truthy() {
                        self.pc = (delta_pc as i64 + delta) as usize;
                    }
                }
                OpCode::IfNot => {
                    let delta = self.heap.get(self.pc).raw_u64() as i64;
                    let delta_pc = self.pc;
                    self.pc += 1;
                    let v = self.pop_value()?;
                    if v.is_false() {
                        self.pc = (delta_pc as i64 + delta) as usize;
                    }
                }
                OpCode::Goto => {
                    let delta = self.heap.get(self.pc).raw_u64() as i64;
                    let delta_pc = self.pc;
                    self.pc = (delta_pc as i64 + delta) as usize;
                }
                OpCode::CallGlobal => {
                    let id = IdentId::from_u64(self.heap.get(self.pc).raw_u64());
                    self.pc += 1;
                    let callee = self.identifiers.get(id);
                    let return_pc = self.pc;
                    self.call(callee, Some(return_pc))?;
                }
                OpCode::CallLocal => {
                    let n = self.heap.get(self.pc).raw_u64();
                    self.pc += 1;
                    let idx = self.local_slot(n);
                    let callee = self.locals_stack[idx];
                    let return_pc = self.pc;
                    self.call(callee, Some(return_pc))?;
                }
                OpCode::Return => {
                    let frame = self
                        .frames
                        .pop()
                        .expect("call stack underflow: malformed bytecode");
                    let new_len = self.locals_stack.len() - frame.num_locals as usize;
                    self.locals_stack.truncate(new_len);
                    self.current_proc = frame.prev_proc_key;
                    match frame.return_pc {
                        Some(pc) => self.pc = pc,
                        None => return Ok(()),
                    }
                }
                OpCode::Halt => return Ok(()),
            }
        }
    }

    /// Dumps the value stack and every declared identifier.
    #[must_use]
    pub fn debug_display(&self) -> String {
        let mut out = String::new();
        out.push_str("value stack:\n");
        for (i, cell) in self.value_stack.iter().enumerate() {
            out.push_str(&format!("  {i}. {cell:?}\n"));
        }
        out
    }
}
