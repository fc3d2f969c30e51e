// SPDX-License-Identifier: MIT
// Copyright 2026 Poppy contributors

//! The collector: a Cheney-style semispace copying GC.
//!
//! `collect` drives the whole cycle: flip to a cleared to-space, evacuate
//! every root, then drain the grey queue by walking each copied object's
//! Q-block and evacuating the tagged pointers it names. Root presentation
//! is a plain sweep over the four root sources rather than a `Scanner`
//! trait object; nothing here needs to decouple the collector from the
//! engine at link time the way a C++ abstract interface would.

#[cfg(test)]
mod collector_test;

use crate::cell::Cell;
use crate::heap::{Heap, PROC_KEY_OFFSET_FROM_START};
use crate::identifier::IdentifierTable;
use crate::mishap::Mishap;
use crate::roots::ExtraRoots;

/// Evacuates `*cell` if it is a tagged pointer: follows an existing
/// forwarding cell, or copies the pointee into to-space and leaves a
/// forwarding cell behind.
fn evacuate_if_needed(heap: &mut Heap, cell: &mut Cell) -> Result<(), Mishap> {
    if !cell.is_tagged_ptr() {
        return Ok(());
    }
    let from_key = cell.deref();
    let target = heap.get(from_key);
    if target.is_forwarded() {
        *cell = Cell::make_tagged_ptr(target.deref());
        return Ok(());
    }
    let (start, end) = heap.object_boundaries(from_key)?;
    let new_start = heap.copy_range(start, end)?;
    let new_key = new_start + (from_key - start);
    heap.forward(from_key, new_key);
    *cell = Cell::make_tagged_ptr(new_key);
    Ok(())
}

/// Runs one full collection. `value_stack` and `locals_stack` are the
/// scanned portions of the engine's two stacks — call-frame metadata
/// (previous procedure, return PC) is not a `Cell` and never passed here.
pub fn collect(
    heap: &mut Heap,
    value_stack: &mut [Cell],
    locals_stack: &mut [Cell],
    identifiers: &mut IdentifierTable,
    extra_roots: &mut ExtraRoots,
) -> Result<(), Mishap> {
    heap.flip();

    for cell in value_stack.iter_mut() {
        evacuate_if_needed(heap, cell)?;
    }
    for cell in locals_stack.iter_mut() {
        evacuate_if_needed(heap, cell)?;
    }
    for cell in identifiers.roots_mut() {
        evacuate_if_needed(heap, cell)?;
    }
    for cell in extra_roots.roots_mut() {
        evacuate_if_needed(heap, cell)?;
    }

    while let Some((start, _end)) = heap.pop_enqueued_object()? {
        let key = start + PROC_KEY_OFFSET_FROM_START;
        let qblock_offset = heap.get(key - 2).get_small();
        let length = heap.get(key - 1).get_small();
        let qblock_offset = usize::try_from(qblock_offset)
            .map_err(|_| Mishap::invalid_key().culprit("qblock_offset", qblock_offset))?;
        let length = usize::try_from(length)
            .map_err(|_| Mishap::invalid_key().culprit("length", length))?;
        for i in qblock_offset..length {
            // `i` is an index *into* the Q-block; the cell it names holds
            // the actual offset (relative to `key`) of a pointer operand
            // in the instruction stream.
            let q = heap.get(key + i).raw_u64() as usize;
            let mut cell = heap.get(key + q);
            evacuate_if_needed(heap, &mut cell)?;
            heap.set(key + q, cell);
        }
    }

    Ok(())
}
