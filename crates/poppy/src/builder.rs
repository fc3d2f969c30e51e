// SPDX-License-Identifier: MIT
// Copyright 2026 Poppy contributors

//! Append-only object assembly. A `Builder` accumulates a staging list of
//! cells that is not yet part of the heap; `PlaceHolder` gives a
//! back-patchable handle onto one staged cell. `object()` commits the
//! whole staging list to the heap in one bump-allocation.

#[cfg(test)]
mod builder_test;

use crate::cell::Cell;
use crate::heap::{Heap, HeapPtr};
use crate::mishap::Mishap;

#[derive(Debug, Default)]
pub struct Builder {
    codelist: Vec<Cell>,
    key_offset: usize,
}

/// A handle onto a single staged cell, valid only for the `Builder` it was
/// taken from and only until that builder's staging list is committed via
/// `object()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceHolder(usize);

impl Builder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.codelist.len()
    }

    pub fn add_cell(&mut self, cell: Cell) {
        self.codelist.push(cell);
    }

    /// Appends `cell` and records its staging index as the object's key,
    /// so `object()` knows where to return a pointer into.
    pub fn add_key(&mut self, cell: Cell) {
        self.key_offset = self.codelist.len();
        self.codelist.push(cell);
    }

    /// A handle onto the cell just appended by `add_cell`/`add_key`.
    pub fn place_holder_just_planted(&self) -> Result<PlaceHolder, Mishap> {
        if self.codelist.is_empty() {
            return Err(Mishap::new(crate::mishap::Kind::NotAProcedure)
                .with_message("no cell planted yet"));
        }
        Ok(PlaceHolder(self.codelist.len() - 1))
    }

    #[must_use]
    pub fn get(&self, placeholder: PlaceHolder) -> Cell {
        self.codelist[placeholder.0]
    }

    pub fn set(&mut self, placeholder: PlaceHolder, cell: Cell) {
        self.codelist[placeholder.0] = cell;
    }

    /// Raw staging-index access, used by `CodePlanter` to back-patch
    /// local-reference and Q-block header cells whose index it already
    /// tracks without going through a `PlaceHolder`.
    #[must_use]
    pub(crate) fn get_at(&self, index: usize) -> Cell {
        self.codelist[index]
    }

    pub(crate) fn set_at(&mut self, index: usize, cell: Cell) {
        self.codelist[index] = cell;
    }

    /// Bulk-copies the staging list into `heap`, returning a pointer to
    /// the cell that was the key in staging. Fails with `HeapOverflow` if
    /// the heap cannot accommodate the request; the caller should drive a
    /// GC and retry.
    pub fn object(&self, heap: &mut Heap) -> Result<HeapPtr, Mishap> {
        let base = heap.allocate_object(&self.codelist)?;
        Ok(base + self.key_offset)
    }
}
