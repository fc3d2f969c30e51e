use super::*;
use crate::engine::Engine;

#[test]
fn duplicate_local_fails() {
    let mut engine = Engine::new(64);
    let mut p = CodePlanter::new(&mut engine);
    p.local("a").unwrap();
    let err = p.local("a").unwrap_err();
    assert_eq!(err.kind(), crate::mishap::Kind::DuplicateLocal);
}

#[test]
fn build_and_bind_writes_the_fixed_header_prelude() {
    let mut engine = Engine::new(64);
    {
        let mut p = CodePlanter::new(&mut engine);
        p.pushq_int(1);
        p.halt();
        p.build_and_bind("one").unwrap();
    }
    let cell = engine.global("one").unwrap();
    assert!(engine.is_procedure(cell));
    let key = cell.deref();
    assert_eq!(engine.heap().get(key + 1).raw_u64(), 0); // NumLocals
    let length = engine.heap().get(key - 1).get_small();
    let qblock_offset = engine.heap().get(key - 2).get_small();
    assert!(qblock_offset <= length);
}

#[test]
fn pushq_records_exactly_one_qblock_offset_for_its_operand() {
    let mut engine = Engine::new(64);
    let inner = {
        let mut p = CodePlanter::new(&mut engine);
        p.pushq_int(7);
        p.ret();
        p.build().unwrap()
    };
    let outer = {
        let mut p = CodePlanter::new(&mut engine);
        p.pushq(inner);
        p.ret();
        p.build().unwrap()
    };
    let key = outer.deref();
    let qblock_offset = engine.heap().get(key - 2).get_small() as usize;
    let length = engine.heap().get(key - 1).get_small() as usize;
    assert_eq!(length - qblock_offset, 1);

    let q = engine.heap().get(key + qblock_offset).raw_u64() as usize;
    assert_eq!(engine.heap().get(key + q), inner);
}

#[test]
fn instructions_with_no_pointer_operands_leave_the_qblock_empty() {
    let mut engine = Engine::new(64);
    {
        let mut p = CodePlanter::new(&mut engine);
        // PUSH_GLOBAL/POP_GLOBAL/HALT all carry ptr_bitmask 0.
        p.push_global("x");
        p.pop_global("x");
        p.halt();
        p.build_and_bind("no_ptrs").unwrap();
    }
    let cell = engine.global("no_ptrs").unwrap();
    let key = cell.deref();
    let qblock_offset = engine.heap().get(key - 2).get_small();
    let length = engine.heap().get(key - 1).get_small();
    assert_eq!(qblock_offset, length);
}

#[test]
fn forward_goto_skips_to_the_cell_following_the_label() {
    let mut engine = Engine::new(64);
    {
        let mut p = CodePlanter::new(&mut engine);
        let mut end = Label::new();
        p.goto(&mut end);
        p.pushq_int(99); // skipped
        p.halt();
        p.set_label(&mut end);
        p.pushq_int(1);
        p.halt();
        p.build_and_bind("forward").unwrap();
    }
    engine.run("forward").unwrap();
    assert_eq!(engine.value_stack(), &[Cell::make_small(1)]);
}

/// Exercises both halves of the two-pass label scheme in one procedure: a
/// `goto` back to an already-`set_label`'d target (the `Some(target)` arm
/// of `plant_branch`) and an `ifnot` forward to a label set later (the
/// `None`/pending arm, back-patched by `set_label`). There is no
/// comparison opcode in this ISA, so the loop condition is carried in a
/// boolean local rather than derived from arithmetic.
#[test]
fn backward_goto_and_forward_ifnot_both_resolve_correctly() {
    let mut engine = Engine::new(64);
    {
        let mut p = CodePlanter::new(&mut engine);
        p.local("acc").unwrap();
        p.local("first").unwrap();
        p.pushq_int(0);
        p.pop_local("acc");
        p.pushq(Cell::make_true());
        p.pop_local("first");

        let mut top = Label::new();
        let mut done = Label::new();
        p.set_label(&mut top);
        p.push_local("acc");
        p.pushq_int(1);
        p.add();
        p.pop_local("acc");

        p.push_local("first");
        p.ifnot(&mut done); // forward reference: `done` unresolved so far
        p.pushq(Cell::make_false());
        p.pop_local("first");
        p.goto(&mut top); // backward reference: `top` already resolved

        p.set_label(&mut done);
        p.push_local("acc");
        p.ret();
        p.build_and_bind("twice_around").unwrap();
    }
    engine.run("twice_around").unwrap();
    assert_eq!(engine.value_stack().last(), Some(&Cell::make_small(2)));
}

#[test]
fn local_positions_are_rewritten_to_distance_from_the_frame_top() {
    let mut engine = Engine::new(64);
    {
        let mut p = CodePlanter::new(&mut engine);
        p.local("a").unwrap();
        p.local("b").unwrap();
        p.pushq_int(10);
        p.pop_local("a");
        p.pushq_int(20);
        p.pop_local("b");
        p.push_local("a");
        p.push_local("b");
        p.ret();
        p.build_and_bind("two_locals").unwrap();
    }
    engine.run("two_locals").unwrap();
    assert_eq!(
        engine.value_stack(),
        &[Cell::make_small(10), Cell::make_small(20)]
    );
}

#[test]
fn push_and_pop_shorthand_prefers_a_local_over_a_same_named_global() {
    let mut engine = Engine::new(64);
    engine.declare_global("x");
    {
        let mut p = CodePlanter::new(&mut engine);
        p.local("x").unwrap();
        p.pushq_int(5);
        p.pop("x"); // local, not global
        p.push("x");
        p.ret();
        p.build_and_bind("shadow").unwrap();
    }
    engine.run("shadow").unwrap();
    assert_eq!(engine.value_stack().last(), Some(&Cell::make_small(5)));
    // the global of the same name was never touched
    assert_eq!(engine.global("x"), Some(Cell::make_false()));
}

#[test]
fn dropping_the_planter_deregisters_its_extra_root() {
    let mut engine = Engine::new(64);
    let before = {
        let mut p = CodePlanter::new(&mut engine);
        p.pushq_int(1);
        p.halt();
        p.build().unwrap()
    };
    assert!(engine.is_procedure(before));
    // the planter's Drop already ran; a GC with no other roots to this
    // object must be free to reclaim it without tripping any invariant.
    engine.gc().unwrap();
}
