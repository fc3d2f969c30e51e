// SPDX-License-Identifier: MIT
// Copyright 2026 Poppy contributors

//! `CodePlanter`: assembles one procedure object into the heap, and
//! `Label`, its two-pass branch-target back-patcher.

#[cfg(test)]
mod planter_test;
pub mod opcode;

use crate::builder::Builder;
use crate::cell::{Cell, KeyCode};
use crate::engine::Engine;
use crate::heap::PROC_KEY_OFFSET_FROM_START;
use crate::mishap::Mishap;
use crate::roots::RootId;
use opcode::OpCode;

/// A branch target owned by the planter that emits jumps to it.
/// `plant_label`-style references made before the label is `set` are
/// recorded and back-patched once the target position is known; a
/// reference made after `set` computes its delta immediately. This single
/// scheme covers forward and backward branches.
#[derive(Debug, Default)]
pub struct Label {
    resolved: Option<usize>,
    pending: Vec<usize>,
}

impl Label {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Assembles exactly one procedure. Borrows the `Engine` mutably for its
/// whole lifetime: only one planter can be mid-construction at a time,
/// since there is a single execution context to assemble into. Its
/// `Drop` impl releases the extra-roots it registered — a scope-bound
/// guard in place of an intrusive list.
pub struct CodePlanter<'e> {
    engine: &'e mut Engine,
    builder: Builder,
    q_offsets: Vec<u64>,
    locals: Vec<String>,
    /// `(staging index of the placeholder, 1-based local position)`,
    /// rewritten to `max_level - i` once all locals are known.
    local_patches: Vec<(usize, u64)>,
    root_ids: Vec<RootId>,
}

impl<'e> CodePlanter<'e> {
    /// Begins a new procedure: stages the fixed header prelude (ProcName,
    /// Q-block offset, Length, ProcedureKey, NumLocals placeholders).
    pub fn new(engine: &'e mut Engine) -> Self {
        let mut builder = Builder::new();
        builder.add_cell(Cell::ZERO); // -3 ProcName
        builder.add_cell(Cell::ZERO); // -2 Q-block offset
        builder.add_cell(Cell::ZERO); // -1 Length
        builder.add_key(Cell::make_key(KeyCode::ProcedureKey)); // 0 Key
        builder.add_cell(Cell::ZERO); // +1 NumLocals
        Self {
            engine,
            builder,
            q_offsets: Vec::new(),
            locals: Vec::new(),
            local_patches: Vec::new(),
            root_ids: Vec::new(),
        }
    }

    fn emit(&mut self, op: OpCode, operands: &[Cell]) {
        self.builder.add_cell(Cell::make_raw_u64(op as u64));
        let mask = op.ptr_bitmask();
        for (i, &operand) in operands.iter().enumerate() {
            if mask & (1 << i) != 0 {
                let q = self.builder.size() as u64 - PROC_KEY_OFFSET_FROM_START as u64;
                self.q_offsets.push(q);
            }
            self.builder.add_cell(operand);
        }
    }

    fn local_index(&mut self, name: &str) -> u64 {
        if let Some(pos) = self.locals.iter().position(|n| n == name) {
            (pos + 1) as u64
        } else {
            self.locals.push(name.to_string());
            self.locals.len() as u64
        }
    }

    fn emit_local_ref(&mut self, op: OpCode, name: &str) {
        let i = self.local_index(name);
        self.builder.add_cell(Cell::make_raw_u64(op as u64));
        let idx = self.builder.size();
        self.builder.add_cell(Cell::make_raw_u64(i));
        self.local_patches.push((idx, i));
    }

    /// Explicitly declares a new local in this procedure's single scope.
    /// Redeclaring an existing name fails with `DuplicateLocal`.
    pub fn local(&mut self, name: &str) -> Result<(), Mishap> {
        if self.locals.iter().any(|n| n == name) {
            return Err(Mishap::duplicate_local().culprit("name", name));
        }
        self.locals.push(name.to_string());
        Ok(())
    }

    fn has_local(&self, name: &str) -> bool {
        self.locals.iter().any(|n| n == name)
    }

    // --- mnemonic surface ------------------------------------------------

    pub fn pushq(&mut self, cell: Cell) {
        self.emit(OpCode::PushQ, &[cell]);
    }

    pub fn pushq_int(&mut self, n: i64) {
        self.pushq(Cell::make_small(n));
    }

    pub fn pushs(&mut self) {
        self.emit(OpCode::PushS, &[]);
    }

    pub fn add(&mut self) {
        self.emit(OpCode::Add, &[]);
    }

    pub fn sub(&mut self) {
        self.emit(OpCode::Sub, &[]);
    }

    pub fn mul(&mut self) {
        self.emit(OpCode::Mul, &[]);
    }

    pub fn ret(&mut self) {
        self.emit(OpCode::Return, &[]);
    }

    pub fn halt(&mut self) {
        self.emit(OpCode::Halt, &[]);
    }

    pub fn push_global(&mut self, name: &str) {
        let id = self.engine.identifiers.resolve_or_declare(name);
        self.emit(OpCode::PushGlobal, &[Cell::make_raw_u64(id.as_u64())]);
    }

    pub fn push_local(&mut self, name: &str) {
        self.emit_local_ref(OpCode::PushLocal, name);
    }

    /// Resolving shorthand: prefers a local binding, falling back to the
    /// global form if none exists.
    pub fn push(&mut self, name: &str) {
        if self.has_local(name) {
            self.push_local(name);
        } else {
            self.push_global(name);
        }
    }

    pub fn pop_global(&mut self, name: &str) {
        let id = self.engine.identifiers.resolve_or_declare(name);
        self.emit(OpCode::PopGlobal, &[Cell::make_raw_u64(id.as_u64())]);
    }

    pub fn pop_local(&mut self, name: &str) {
        self.emit_local_ref(OpCode::PopLocal, name);
    }

    pub fn pop(&mut self, name: &str) {
        if self.has_local(name) {
            self.pop_local(name);
        } else {
            self.pop_global(name);
        }
    }

    pub fn passign(&mut self, name: &str, procedure: Cell) {
        let id = self.engine.identifiers.resolve_or_declare(name);
        self.emit(
            OpCode::Passign,
            &[Cell::make_raw_u64(id.as_u64()), procedure],
        );
    }

    pub fn call_global(&mut self, name: &str) {
        let id = self.engine.identifiers.resolve_or_declare(name);
        self.emit(OpCode::CallGlobal, &[Cell::make_raw_u64(id.as_u64())]);
    }

    pub fn call_local(&mut self, name: &str) {
        self.emit_local_ref(OpCode::CallLocal, name);
    }

    pub fn call(&mut self, name: &str) {
        if self.has_local(name) {
            self.call_local(name);
        } else {
            self.call_global(name);
        }
    }

    fn plant_branch(&mut self, op: OpCode, label: &mut Label) {
        let delta_cell_index = self.builder.size() + 1;
        match label.resolved {
            Some(target) => {
                let delta = target as i64 - delta_cell_index as i64;
                self.emit(op, &[Cell::make_raw_u64(delta as u64)]);
            }
            None => {
                label.pending.push(delta_cell_index);
                self.emit(op, &[Cell::make_raw_u64(0)]);
            }
        }
    }

    pub fn goto(&mut self, label: &mut Label) {
        self.plant_branch(OpCode::Goto, label);
    }

    pub fn ifso(&mut self, label: &mut Label) {
        self.plant_branch(OpCode::IfSo, label);
    }

    pub fn ifnot(&mut self, label: &mut Label) {
        self.plant_branch(OpCode::IfNot, label);
    }

    /// Sets `label`'s target to "the next cell to be planted" and
    /// back-patches every reference made before this call.
    pub fn set_label(&mut self, label: &mut Label) {
        let target = self.builder.size();
        label.resolved = Some(target);
        for &idx in &label.pending {
            let delta = target as i64 - idx as i64;
            self.builder.set_at(idx, Cell::make_raw_u64(delta as u64));
        }
        label.pending.clear();
    }

    // --- finalization ----------------------------------------------------

    fn finish(&mut self, name: Option<&str>) -> Result<Cell, Mishap> {
        let max_level = self.locals.len() as u64;
        for &(idx, i) in &self.local_patches {
            self.builder
                .set_at(idx, Cell::make_raw_u64(max_level - i));
        }

        let qblock_offset = self.builder.size() as u64 - PROC_KEY_OFFSET_FROM_START as u64;
        let q_offsets = std::mem::take(&mut self.q_offsets);
        for q in q_offsets {
            self.builder.add_cell(Cell::make_raw_u64(q));
        }
        let length = self.builder.size() as u64 - PROC_KEY_OFFSET_FROM_START as u64;

        let symbol_index = self.engine.symbols.intern(name.unwrap_or("<anonymous>"));
        self.builder.set_at(0, Cell::make_symbol(symbol_index));
        self.builder
            .set_at(1, Cell::make_small(qblock_offset as i64));
        self.builder.set_at(2, Cell::make_small(length as i64));
        self.builder.set_at(4, Cell::make_raw_u64(max_level));

        let key_ptr = self.builder.object(&mut self.engine.heap)?;
        let cell = Cell::make_tagged_ptr(key_ptr);
        let root_id = self.engine.extra_roots.register(cell);
        self.root_ids.push(root_id);

        if let Some(name) = name {
            let id = self.engine.identifiers.declare(name);
            self.engine.identifiers.set(id, cell);
        }
        Ok(cell)
    }

    /// Commits the procedure to the heap and pins it in the extra-roots
    /// registry for this planter's remaining lifetime.
    pub fn build(&mut self) -> Result<Cell, Mishap> {
        self.finish(None)
    }

    /// As `build`, additionally writing the pointer into `name`'s
    /// identifier cell.
    pub fn build_and_bind(&mut self, name: &str) -> Result<Cell, Mishap> {
        self.finish(Some(name))
    }

    /// Dumps the staged cells, numbered — useful while debugging a
    /// miscompiled Q-block.
    pub fn debug_display(&self) -> String {
        let mut out = String::new();
        for i in 0..self.builder.size() {
            out.push_str(&format!("{i}. {:?}\n", self.builder.get_at(i)));
        }
        out
    }
}

impl Drop for CodePlanter<'_> {
    fn drop(&mut self) {
        for &id in &self.root_ids {
            self.engine.extra_roots.deregister(id);
        }
    }
}
