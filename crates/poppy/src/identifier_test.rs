use super::*;

#[test]
fn declare_is_idempotent_and_returns_the_same_id() {
    let mut table = IdentifierTable::new();
    let a = table.declare("x");
    let b = table.declare("x");
    assert_eq!(a, b);
}

#[test]
fn resolve_or_declare_creates_lazily() {
    let mut table = IdentifierTable::new();
    assert_eq!(table.lookup("y"), None);
    let id = table.resolve_or_declare("y");
    assert_eq!(table.lookup("y"), Some(id));
    assert_eq!(table.name(id), "y");
}

#[test]
fn get_set_round_trip() {
    let mut table = IdentifierTable::new();
    let id = table.declare("x");
    table.set(id, Cell::make_small(99));
    assert_eq!(table.get(id).get_small(), 99);
}

#[test]
fn roots_mut_visits_every_identifier_cell() {
    let mut table = IdentifierTable::new();
    let a = table.declare("a");
    let b = table.declare("b");
    table.set(a, Cell::make_small(1));
    table.set(b, Cell::make_small(2));

    let mut seen = Vec::new();
    for cell in table.roots_mut() {
        seen.push(cell.get_small());
    }
    assert_eq!(seen, vec![1, 2]);
}
