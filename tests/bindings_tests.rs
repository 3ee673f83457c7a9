//! Whole-module tests: every interaction goes through the registered
//! [`Module`], the way an interpreter host drives it.

use pnrscript::{
    ArchFamily, Dynamic, ExceptionKind, GenericArchArgs, GenericFamily, Module, ObjectHeap,
    ScriptException, Settings, register_module,
};
use pnrscript_netlist::Context;

struct Session {
    module: Module,
    heap: ObjectHeap,
    ctx: Dynamic,
}

impl Session {
    fn new() -> Self {
        let module = register_module::<GenericFamily>(&Settings::default()).expect("registration failed");
        let mut heap = ObjectHeap::new();
        let db = heap.allocate(Context::new(GenericFamily::create_arch(&GenericArchArgs::default())));
        Self {
            module,
            heap,
            ctx: Dynamic::Object(db),
        }
    }

    fn call(&mut self, this: &Dynamic, method: &str, args: Vec<Dynamic>) -> Dynamic {
        self.try_call(this, method, args)
            .unwrap_or_else(|e| panic!("{method} raised {e}"))
    }

    fn try_call(&mut self, this: &Dynamic, method: &str, args: Vec<Dynamic>) -> Result<Dynamic, ScriptException> {
        self.module.call_method(&mut self.heap, this, method, args)
    }

    fn get(&mut self, this: &Dynamic, attr: &str) -> Dynamic {
        self.module
            .get_attr(&mut self.heap, this, attr)
            .unwrap_or_else(|e| panic!("reading {attr} raised {e}"))
    }

    fn set(&mut self, this: &Dynamic, attr: &str, value: Dynamic) -> Result<(), ScriptException> {
        self.module.set_attr(&mut self.heap, this, attr, value)
    }

    fn class_of(&self, value: &Dynamic) -> Option<&str> {
        self.module.class_name_of(value)
    }

    fn create_cell(&mut self, name: &str, cell_type: &str) -> Dynamic {
        let ctx = self.ctx.clone();
        self.call(&ctx, "createCell", vec![s(name), s(cell_type)])
    }

    fn add_bel(&mut self, name: &str, x: i64) {
        let loc = self
            .module
            .construct(&mut self.heap, "Loc", vec![Dynamic::Int(x), Dynamic::Int(0), Dynamic::Int(0)])
            .unwrap();
        let ctx = self.ctx.clone();
        self.call(&ctx, "addBel", vec![s(name), s("LUT4"), loc]);
    }
}

fn s(value: &str) -> Dynamic {
    Dynamic::String(value.to_owned())
}

fn strings(values: &[&str]) -> Dynamic {
    Dynamic::List(values.iter().map(|v| s(v)).collect())
}

// =============================================================================
// Entities
// =============================================================================

#[test]
fn test_created_cell_is_a_live_wrapper() {
    let mut session = Session::new();
    let cell = session.create_cell("c0", "LUT4");
    assert_eq!(session.class_of(&cell), Some("CellInfo"));
    assert_eq!(session.get(&cell, "name"), s("c0"));
    assert_eq!(session.get(&cell, "type"), s("LUT4"));

    session.set(&cell, "type", s("DFF")).unwrap();
    let ctx = session.ctx.clone();
    let cells = session.get(&ctx, "cells");
    let again = session.call(&cells, "__getitem__", vec![s("c0")]);
    assert_eq!(session.get(&again, "type"), s("DFF"));
}

#[test]
fn test_added_ports_appear_in_the_port_map() {
    let mut session = Session::new();
    let cell = session.create_cell("c0", "LUT4");
    session.call(&cell, "addInput", vec![s("A")]);
    session.call(&cell, "addOutput", vec![s("Q")]);

    let ports = session.get(&cell, "ports");
    assert_eq!(session.class_of(&ports), Some("PortMap"));
    assert_eq!(session.call(&ports, "__len__", vec![]), Dynamic::Int(2));
    assert_eq!(session.call(&ports, "keys", vec![]), strings(&["A", "Q"]));

    let a = session.call(&ports, "__getitem__", vec![s("A")]);
    assert_eq!(session.get(&a, "name"), s("A"));
    assert_eq!(session.get(&a, "type"), Dynamic::Int(0));
    assert_eq!(session.get(&a, "net"), Dynamic::NullHandle);
    let q = session.call(&ports, "__getitem__", vec![s("Q")]);
    assert_eq!(session.get(&q, "type"), Dynamic::Int(1));

    session.call(&cell, "addInout", vec![s("IO")]);
    let ports = session.get(&cell, "ports");
    assert_eq!(session.call(&ports, "keys", vec![]), strings(&["A", "Q", "IO"]));
}

#[test]
fn test_set_then_unset_attribute() {
    let mut session = Session::new();
    let cell = session.create_cell("c0", "LUT4");
    session.call(&cell, "setAttr", vec![s("keep"), s("1")]);
    session.call(&cell, "setAttr", vec![s("keep"), s("hello")]);

    let attrs = session.get(&cell, "attrs");
    assert_eq!(session.call(&attrs, "__len__", vec![]), Dynamic::Int(1));
    assert_eq!(session.call(&attrs, "__getitem__", vec![s("keep")]), s("hello"));

    session.call(&cell, "unsetAttr", vec![s("keep")]);
    let attrs = session.get(&cell, "attrs");
    assert_eq!(session.call(&attrs, "__contains__", vec![s("keep")]), Dynamic::Bool(false));
    assert_eq!(session.call(&attrs, "__len__", vec![]), Dynamic::Int(0));
}

#[test]
fn test_params_hold_bit_vectors() {
    let mut session = Session::new();
    let cell = session.create_cell("c0", "LUT4");
    session.call(&cell, "setParam", vec![s("INIT"), s("0110")]);
    let params = session.get(&cell, "params");
    assert_eq!(
        session.call(&params, "items", vec![]),
        Dynamic::List(vec![strings(&["INIT", "0110"])])
    );
    session.call(&cell, "unsetParam", vec![s("INIT")]);
    assert_eq!(session.call(&params, "__len__", vec![]), Dynamic::Int(0));
}

#[test]
fn test_driver_resolves_to_its_cell() {
    let mut session = Session::new();
    let ctx = session.ctx.clone();
    let net = session.call(&ctx, "createNet", vec![s("n")]);
    let ff = session.create_cell("ff", "DFF");
    session.call(&ff, "addOutput", vec![s("Q")]);
    session.call(&ctx, "connectPort", vec![s("n"), s("ff"), s("Q")]);

    let driver = session.get(&net, "driver");
    assert_eq!(session.class_of(&driver), Some("PortRef"));
    let cell = session.get(&driver, "cell");
    assert_eq!(session.get(&cell, "name"), s("ff"));
    assert_eq!(session.get(&driver, "port"), s("Q"));

    let ports = session.get(&ff, "ports");
    let q = session.call(&ports, "__getitem__", vec![s("Q")]);
    let q_net = session.get(&q, "net");
    assert_eq!(session.get(&q_net, "name"), s("n"));
}

#[test]
fn test_port_refs_compare_by_cell_and_port() {
    let mut session = Session::new();
    let ctx = session.ctx.clone();
    let a = session.call(&ctx, "createNet", vec![s("a")]);
    let b = session.call(&ctx, "createNet", vec![s("b")]);
    let ff = session.create_cell("ff", "DFF");
    session.call(&ff, "addOutput", vec![s("Q")]);
    session.call(&ctx, "connectPort", vec![s("a"), s("ff"), s("Q")]);

    let driver_a = session.get(&a, "driver");
    session.set(&b, "driver", driver_a.clone()).unwrap();
    let driver_b = session.get(&b, "driver");

    assert_ne!(driver_a, driver_b);
    assert!(session.module.equals(&mut session.heap, &driver_a, &driver_b).unwrap());

    let unconnected = session.call(&ctx, "createNet", vec![s("c")]);
    let driver_c = session.get(&unconnected, "driver");
    assert!(!session.module.equals(&mut session.heap, &driver_a, &driver_c).unwrap());
}

#[test]
fn test_users_are_indexable_from_both_ends() {
    let mut session = Session::new();
    let ctx = session.ctx.clone();
    let net = session.call(&ctx, "createNet", vec![s("n")]);
    for name in ["u0", "u1"] {
        let cell = session.create_cell(name, "LUT4");
        session.call(&cell, "addInput", vec![s("A")]);
        session.call(&ctx, "connectPort", vec![s("n"), s(name), s("A")]);
    }

    let users = session.get(&net, "users");
    assert_eq!(session.class_of(&users), Some("PortRefVector"));
    assert_eq!(session.call(&users, "__len__", vec![]), Dynamic::Int(2));
    let last = session.call(&users, "__getitem__", vec![Dynamic::Int(-1)]);
    let cell = session.get(&last, "cell");
    assert_eq!(session.get(&cell, "name"), s("u1"));

    let err = session
        .try_call(&users, "__getitem__", vec![Dynamic::Int(2)])
        .unwrap_err();
    assert_eq!(err.kind, ExceptionKind::IndexError);
}

// =============================================================================
// Identifiers and placement
// =============================================================================

#[test]
fn test_unknown_identifiers_raise() {
    let mut session = Session::new();
    let cell = session.create_cell("c0", "LUT4");
    let err = session
        .try_call(&cell, "unsetAttr", vec![s("never_interned")])
        .unwrap_err();
    assert_eq!(err.kind, ExceptionKind::InvalidIdentifier);
    assert!(err.message.contains("never_interned"));

    let ctx = session.ctx.clone();
    let cells = session.get(&ctx, "cells");
    let err = session.try_call(&cells, "__getitem__", vec![s("nope")]).unwrap_err();
    assert_eq!(err.kind, ExceptionKind::InvalidIdentifier);
    assert_eq!(
        session.call(&cells, "__contains__", vec![s("nope")]),
        Dynamic::Bool(false)
    );

    // Interned but not a cell.
    let err = session.try_call(&cells, "__getitem__", vec![s("LUT4")]).unwrap_err();
    assert_eq!(err.kind, ExceptionKind::KeyError);
}

#[test]
fn test_bel_names_round_trip() {
    let mut session = Session::new();
    session.add_bel("X0Y0/LC0", 0);
    session.add_bel("X1Y0/LC0", 1);
    let ctx = session.ctx.clone();
    assert_eq!(
        session.call(&ctx, "getBels", vec![]),
        strings(&["X0Y0/LC0", "X1Y0/LC0"])
    );
    assert_eq!(session.call(&ctx, "getBelByName", vec![s("X1Y0/LC0")]), s("X1Y0/LC0"));
    assert_eq!(session.call(&ctx, "getBelByName", vec![s("X9Y9/LC0")]), s(""));

    let cell = session.create_cell("c0", "LUT4");
    assert_eq!(session.get(&cell, "bel"), s(""));
    session.set(&cell, "bel", s("X1Y0/LC0")).unwrap();
    assert_eq!(session.get(&cell, "bel"), s("X1Y0/LC0"));

    let err = session.set(&cell, "bel", s("X9Y9/LC0")).unwrap_err();
    assert_eq!(err.kind, ExceptionKind::InvalidIdentifier);
}

#[test]
fn test_bind_bel_records_strength() {
    let mut session = Session::new();
    session.add_bel("X0Y0/LC0", 0);
    let cell = session.create_cell("c0", "LUT4");
    let strength = session.module.global("STRENGTH_USER").cloned().unwrap();
    let ctx = session.ctx.clone();
    session.call(&ctx, "bindBel", vec![s("X0Y0/LC0"), s("c0"), strength]);

    assert_eq!(session.get(&cell, "bel"), s("X0Y0/LC0"));
    assert_eq!(session.get(&cell, "belStrength"), Dynamic::Int(5));

    let err = session
        .try_call(&ctx, "bindBel", vec![s("X0Y0/LC0"), s("c0"), Dynamic::Int(1)])
        .unwrap_err();
    assert_eq!(err.kind, ExceptionKind::AssertionError);
    assert_eq!(err.message, "bel 'X0Y0/LC0' is already bound");

    session.call(&ctx, "unbindBel", vec![s("X0Y0/LC0")]);
    assert_eq!(session.get(&cell, "bel"), s(""));
}

#[test]
fn test_routing_through_pips() {
    let mut session = Session::new();
    let ctx = session.ctx.clone();
    session.call(&ctx, "addWire", vec![s("A"), s("LOCAL")]);
    session.call(&ctx, "addWire", vec![s("B"), s("LOCAL")]);
    session.call(&ctx, "addPip", vec![s("A->B"), s("A"), s("B")]);
    let net = session.call(&ctx, "createNet", vec![s("n")]);

    session.call(&ctx, "bindWire", vec![s("A"), s("n"), Dynamic::Int(1)]);
    session.call(&ctx, "bindPip", vec![s("A->B"), s("n"), Dynamic::Int(1)]);

    let wires = session.get(&net, "wires");
    assert_eq!(session.call(&wires, "keys", vec![]), strings(&["A", "B"]));
    let b = session.call(&wires, "__getitem__", vec![s("B")]);
    assert_eq!(session.class_of(&b), Some("PipMap"));
    assert_eq!(session.get(&b, "pip"), s("A->B"));

    session.call(&ctx, "lockNetRouting", vec![s("n")]);
    assert_eq!(session.get(&b, "strength"), Dynamic::Int(5));

    session.call(&ctx, "ripupNet", vec![s("n")]);
    assert_eq!(session.call(&wires, "__len__", vec![]), Dynamic::Int(0));
    let err = session.module.get_attr(&mut session.heap, &b, "pip").unwrap_err();
    assert_eq!(err.kind, ExceptionKind::ReferenceError);
}

#[test]
fn test_native_assertions_become_exceptions() {
    let mut session = Session::new();
    let ctx = session.ctx.clone();
    session.call(&ctx, "createNet", vec![s("n")]);
    let err = session.try_call(&ctx, "createNet", vec![s("n")]).unwrap_err();
    assert_eq!(err.kind, ExceptionKind::AssertionError);
    assert_eq!(err.message, "net 'n' already exists");
}

// =============================================================================
// Collections
// =============================================================================

#[test]
fn test_proxy_removal_reaches_the_database() {
    let mut session = Session::new();
    let ctx = session.ctx.clone();
    let attrs = session.get(&ctx, "attrs");
    session.call(&attrs, "__setitem__", vec![s("src"), s("top.v:1")]);
    session.call(&attrs, "__delitem__", vec![s("src")]);

    let fresh = session.get(&ctx, "attrs");
    assert_eq!(session.call(&fresh, "__contains__", vec![s("src")]), Dynamic::Bool(false));
    let err = session.try_call(&fresh, "remove", vec![s("src")]).unwrap_err();
    assert_eq!(err.kind, ExceptionKind::KeyError);
}

#[test]
fn test_region_bel_sets_are_mutable() {
    let mut session = Session::new();
    session.add_bel("X0Y0/LC0", 0);
    session.add_bel("X1Y0/LC0", 1);
    let ctx = session.ctx.clone();
    let region = session.call(&ctx, "createRegion", vec![s("left")]);
    session.call(&ctx, "addBelToRegion", vec![s("left"), s("X0Y0/LC0")]);
    session.set(&region, "constr_bels", Dynamic::Bool(true)).unwrap();

    let bels = session.get(&region, "bels");
    session.call(&bels, "add", vec![s("X1Y0/LC0")]);
    assert_eq!(
        session.call(&bels, "__iter__", vec![]),
        strings(&["X0Y0/LC0", "X1Y0/LC0"])
    );
    session.call(&bels, "remove", vec![s("X0Y0/LC0")]);

    let fresh = session.get(&region, "bels");
    assert_eq!(session.call(&fresh, "__len__", vec![]), Dynamic::Int(1));
    assert_eq!(session.get(&region, "constr_bels"), Dynamic::Bool(true));
    assert_eq!(session.get(&region, "constr_wires"), Dynamic::Bool(false));

    let cell = session.create_cell("c0", "LUT4");
    session.call(&ctx, "constrainCellToRegion", vec![s("c0"), s("left")]);
    assert_eq!(session.get(&cell, "name"), s("c0"));
}

#[test]
fn test_cell_map_values_are_wrappers() {
    let mut session = Session::new();
    session.create_cell("a", "LUT4");
    session.create_cell("b", "DFF");
    let ctx = session.ctx.clone();
    let cells = session.get(&ctx, "cells");
    let values = session.call(&cells, "values", vec![]);
    let values = values.as_list().unwrap().to_vec();
    assert_eq!(values.len(), 2);
    let types: Vec<Dynamic> = values.iter().map(|c| session.get(c, "type")).collect();
    assert_eq!(types, [s("LUT4"), s("DFF")]);
}

// =============================================================================
// Lifetimes
// =============================================================================

#[test]
fn test_wrappers_outliving_their_database_raise() {
    let mut session = Session::new();
    let cell = session.create_cell("c0", "LUT4");
    let Dynamic::Object(db) = session.ctx.clone() else {
        unreachable!()
    };
    assert!(session.heap.release(db));

    let err = session.module.get_attr(&mut session.heap, &cell, "name").unwrap_err();
    assert_eq!(err.kind, ExceptionKind::ReferenceError);
}

#[test]
fn test_held_user_raises_once_its_port_is_disconnected() {
    let mut session = Session::new();
    let ctx = session.ctx.clone();
    let net = session.call(&ctx, "createNet", vec![s("n")]);
    for name in ["u0", "u1"] {
        let cell = session.create_cell(name, "LUT4");
        session.call(&cell, "addInput", vec![s("A")]);
        session.call(&ctx, "connectPort", vec![s("n"), s(name), s("A")]);
    }
    let users = session.get(&net, "users");
    let first = session.call(&users, "__getitem__", vec![Dynamic::Int(0)]);
    let second = session.call(&users, "__getitem__", vec![Dynamic::Int(1)]);

    session.call(&ctx, "disconnectPort", vec![s("u0"), s("A")]);

    let err = session.module.get_attr(&mut session.heap, &first, "cell").unwrap_err();
    assert_eq!(err.kind, ExceptionKind::ReferenceError);
    let cell = session.get(&second, "cell");
    assert_eq!(session.get(&cell, "name"), s("u1"));
    assert_eq!(session.call(&users, "__len__", vec![]), Dynamic::Int(1));
}
