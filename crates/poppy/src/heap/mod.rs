// SPDX-License-Identifier: MIT
// Copyright 2026 Poppy contributors

//! The semispace heap: a single allocation of cells split into two equal
//! halves, bump-allocated from `working_tip` up to `working_limit`, with
//! `scan_queue` tracking the Cheney grey-pointer during collection.
//!
//! Heap references are cell indices into the flat `Vec<Cell>` backing the
//! whole block, never raw pointers — a raw pointer into a heap that a GC
//! can relocate doesn't survive across any call that might allocate.

#[cfg(test)]
mod heap_test;

use crate::cell::{Cell, KeyCode};
use crate::mishap::Mishap;

/// Distance, in cells, from a `ProcedureKey` object's start to its key
/// cell. Three header cells (ProcName, Q-block offset, Length) precede
/// the key.
pub const PROC_KEY_OFFSET_FROM_START: usize = 3;

/// A heap cell index. Indices are only comparable within the same `Heap`.
pub type HeapPtr = usize;

pub struct Heap {
    cells: Vec<Cell>,
    half_len: usize,
    active_base: usize,
    working_tip: usize,
    working_limit: usize,
    scan_queue: usize,
}

impl Heap {
    /// Allocates a block of `2 * half_len_cells` cells, split into two
    /// equal halves; the first half starts out active.
    #[must_use]
    pub fn new(half_len_cells: usize) -> Self {
        Self {
            cells: vec![Cell::ZERO; half_len_cells * 2],
            half_len: half_len_cells,
            active_base: 0,
            working_tip: 0,
            working_limit: half_len_cells,
            scan_queue: 0,
        }
    }

    #[must_use]
    pub fn half_len(&self) -> usize {
        self.half_len
    }

    #[must_use]
    pub fn active_base(&self) -> HeapPtr {
        self.active_base
    }

    #[must_use]
    pub fn working_tip(&self) -> HeapPtr {
        self.working_tip
    }

    #[must_use]
    pub fn working_limit(&self) -> HeapPtr {
        self.working_limit
    }

    #[must_use]
    pub fn scan_queue(&self) -> HeapPtr {
        self.scan_queue
    }

    #[must_use]
    pub fn get(&self, idx: HeapPtr) -> Cell {
        self.cells[idx]
    }

    pub fn set(&mut self, idx: HeapPtr, cell: Cell) {
        self.cells[idx] = cell;
    }

    /// Appends `staging` to the active half's bump pointer, failing with
    /// `HeapOverflow` if it would not fit. Returns the index `staging`
    /// landed at.
    pub fn allocate_object(&mut self, staging: &[Cell]) -> Result<HeapPtr, Mishap> {
        let start = self.working_tip;
        let end = start + staging.len();
        if end > self.working_limit {
            return Err(Mishap::heap_overflow()
                .culprit("requested", staging.len())
                .culprit("available", self.working_limit - self.working_tip));
        }
        self.cells[start..end].copy_from_slice(staging);
        self.working_tip = end;
        Ok(start)
    }

    /// Scans from the start of the active half for the first `Key` cell.
    #[must_use]
    pub fn first_object(&self) -> Option<HeapPtr> {
        self.find_key_from(self.active_base)
    }

    /// Given a key cell, finds the next object's key by jumping to this
    /// object's tail (via its layout) and resuming the forward scan.
    pub fn next_object(&self, key: HeapPtr) -> Result<Option<HeapPtr>, Mishap> {
        let (_, end) = self.object_boundaries(key)?;
        Ok(self.find_key_from(end))
    }

    fn find_key_from(&self, mut p: HeapPtr) -> Option<HeapPtr> {
        while p < self.working_tip {
            if self.cells[p].is_key() {
                return Some(p);
            }
            p += 1;
        }
        None
    }

    /// Cheney grey-pointer dequeue: advances `scan_queue` past the next
    /// object and returns its `[start, end)` boundaries, or `None` once it
    /// has caught up with `working_tip`.
    pub fn pop_enqueued_object(&mut self) -> Result<Option<(HeapPtr, HeapPtr)>, Mishap> {
        if self.scan_queue >= self.working_tip {
            return Ok(None);
        }
        let key = self
            .find_key_from(self.scan_queue)
            .ok_or_else(|| Mishap::invalid_key().culprit("scan_queue", self.scan_queue))?;
        let (start, end) = self.object_boundaries(key)?;
        self.scan_queue = end;
        Ok(Some((start, end)))
    }

    /// The `[start, end)` cell range an object's key cell denotes, keyed
    /// by `KeyCode`. Only `ProcedureKey` has a defined layout; any other
    /// key code is a fatal `InvalidKey`.
    pub fn object_boundaries(&self, key: HeapPtr) -> Result<(HeapPtr, HeapPtr), Mishap> {
        let cell = self.cells[key];
        match cell.key_code() {
            Some(KeyCode::ProcedureKey) => {
                let length = self.cells[key - 1].get_small();
                let length = usize::try_from(length)
                    .map_err(|_| Mishap::invalid_key().culprit("negative length", length))?;
                Ok((key - PROC_KEY_OFFSET_FROM_START, key + length))
            }
            _ => Err(Mishap::invalid_key().culprit("key", cell.bits())),
        }
    }

    /// Bump-copies `self.cells[start..end]` into the active half's current
    /// tip, returning the copy's new start index.
    pub fn copy_range(&mut self, start: HeapPtr, end: HeapPtr) -> Result<HeapPtr, Mishap> {
        let len = end - start;
        let new_start = self.working_tip;
        if new_start + len > self.working_limit {
            return Err(Mishap::heap_overflow()
                .culprit("requested", len)
                .culprit("available", self.working_limit - self.working_tip));
        }
        self.cells.copy_within(start..end, new_start);
        self.working_tip = new_start + len;
        Ok(new_start)
    }

    /// Bulk-copies another heap's used active range into this heap's
    /// active half, resetting this heap's tip to match.
    pub fn overwrite(&mut self, other: &Self) {
        let used = other.working_tip - other.active_base;
        let src = other.active_base..other.working_tip;
        let dst_start = self.active_base;
        self.cells[dst_start..dst_start + used].copy_from_slice(&other.cells[src]);
        self.working_tip = dst_start + used;
    }

    /// Resets the active half's tip and queue, keeping its limit.
    pub fn clear(&mut self) {
        self.working_tip = self.active_base;
        self.scan_queue = self.active_base;
        self.working_limit = self.active_base + self.half_len;
    }

    /// Swaps which half is active and clears it, making it ready to
    /// receive the collector's copies. The half that was active becomes
    /// from-space: its contents stay put (and readable by absolute index)
    /// until the collection overwrites or abandons them.
    pub fn flip(&mut self) {
        self.active_base = if self.active_base == 0 {
            self.half_len
        } else {
            0
        };
        self.clear();
    }

    /// Installs a forwarding cell over `from`'s key position, pointing at
    /// `to_key`.
    pub fn forward(&mut self, from_key: HeapPtr, to_key: HeapPtr) {
        self.cells[from_key] = Cell::make_forwarded(to_key);
    }
}
