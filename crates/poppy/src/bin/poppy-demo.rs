// SPDX-License-Identifier: MIT
// Copyright 2026 Poppy contributors

//! Minimal CLI exercising a small planted procedure end to end: declares a
//! global, stores a doubled value into it via `CodePlanter`, runs it, and
//! prints the result. There is no reader or file format here — see
//! `lib.rs` for why.

use poppy::{CodePlanter, Engine};

fn main() {
    let mut engine = Engine::new(4096);
    engine.declare_global("result");

    {
        let mut planter = CodePlanter::new(&mut engine);
        planter.pushq_int(21);
        planter.pushs();
        planter.add();
        planter.pop_global("result");
        planter.halt();
        if let Err(mishap) = planter.build_and_bind("double_store") {
            eprintln!("error planting double_store: {mishap}");
            std::process::exit(1);
        }
    }

    if let Err(mishap) = engine.run("double_store") {
        eprintln!("error running double_store: {mishap}");
        std::process::exit(1);
    }

    match engine.global("result") {
        Some(cell) if cell.is_small() => println!("result = {}", cell.get_small()),
        Some(cell) => println!("result = {cell:?}"),
        None => println!("result is undeclared"),
    }
}
