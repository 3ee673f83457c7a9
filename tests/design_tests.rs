//! `load_design` and `parse_json` as scripts call them.

use std::fs;
use std::path::{Path, PathBuf};

use pnrscript::{
    ArchFamily, Dynamic, ExceptionKind, GenericArchArgs, GenericFamily, Module, ObjectHeap, Settings,
    register_module,
};
use pnrscript_netlist::Context;
use tempdir::TempDir;

/// One LUT and the one net feeding it.
const MINIMAL: &str = r#"{
    "creator": "Yosys 0.38",
    "modules": {
        "top": {
            "attributes": { "top": "00000000000000000000000000000001" },
            "cells": {
                "lut": {
                    "type": "LUT4",
                    "parameters": { "INIT": "0101" },
                    "attributes": { "src": "top.v:3" },
                    "port_directions": { "I0": "input" },
                    "connections": { "I0": [2] }
                }
            },
            "netnames": {
                "n": { "hide_name": 0, "bits": [2], "attributes": {} }
            }
        }
    }
}"#;

fn module() -> Module {
    register_module::<GenericFamily>(&Settings::default()).expect("registration failed")
}

fn write_netlist(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

fn path_arg(path: &Path) -> Dynamic {
    Dynamic::String(path.to_string_lossy().into_owned())
}

fn s(value: &str) -> Dynamic {
    Dynamic::String(value.to_owned())
}

#[test]
fn test_load_design_returns_a_populated_database() {
    let dir = TempDir::new("design").unwrap();
    let path = write_netlist(&dir, "top.json", MINIMAL);
    let module = module();
    let mut heap = ObjectHeap::new();

    let ctx = module
        .call_function(&mut heap, "load_design", vec![path_arg(&path), Dynamic::NullHandle])
        .unwrap();
    assert!(matches!(ctx, Dynamic::Object(_)));
    assert_eq!(module.class_name_of(&ctx), Some("Context"));

    let cells = module.get_attr(&mut heap, &ctx, "cells").unwrap();
    assert_eq!(
        module.call_method(&mut heap, &cells, "keys", vec![]).unwrap(),
        Dynamic::List(vec![s("lut")])
    );
    let nets = module.get_attr(&mut heap, &ctx, "nets").unwrap();
    assert_eq!(
        module.call_method(&mut heap, &nets, "keys", vec![]).unwrap(),
        Dynamic::List(vec![s("n")])
    );

    let lut = module
        .call_method(&mut heap, &cells, "__getitem__", vec![s("lut")])
        .unwrap();
    let params = module.get_attr(&mut heap, &lut, "params").unwrap();
    assert_eq!(
        module.call_method(&mut heap, &params, "__getitem__", vec![s("INIT")]).unwrap(),
        s("0101")
    );
    let attrs = module.get_attr(&mut heap, &lut, "attrs").unwrap();
    assert_eq!(
        module.call_method(&mut heap, &attrs, "__getitem__", vec![s("src")]).unwrap(),
        s("top.v:3")
    );
    assert_eq!(module.get_attr(&mut heap, &ctx, "top_module").unwrap(), s("top"));
}

#[test]
fn test_hierarchy_lists_leaf_cells() {
    let dir = TempDir::new("design").unwrap();
    let path = write_netlist(&dir, "top.json", MINIMAL);
    let module = module();
    let mut heap = ObjectHeap::new();
    let ctx = module
        .call_function(&mut heap, "load_design", vec![path_arg(&path), Dynamic::Void])
        .unwrap();

    let hierarchy = module.get_attr(&mut heap, &ctx, "hierarchy").unwrap();
    let top = module
        .call_method(&mut heap, &hierarchy, "__getitem__", vec![s("top")])
        .unwrap();
    assert_eq!(module.class_name_of(&top), Some("HierarchicalCell"));
    assert_eq!(module.get_attr(&mut heap, &top, "fullpath").unwrap(), s("top"));
    let leaves = module.get_attr(&mut heap, &top, "leaf_cells").unwrap();
    assert_eq!(
        module.call_method(&mut heap, &leaves, "items", vec![]).unwrap(),
        Dynamic::List(vec![Dynamic::List(vec![s("lut"), s("lut")])])
    );
}

#[test]
fn test_arch_args_select_the_device() {
    let dir = TempDir::new("design").unwrap();
    let path = write_netlist(&dir, "top.json", MINIMAL);
    let module = module();
    let mut heap = ObjectHeap::new();

    let args = module.construct(&mut heap, "ArchArgs", vec![s("toy-1k")]).unwrap();
    assert_eq!(module.get_attr(&mut heap, &args, "chip").unwrap(), s("toy-1k"));
    let ctx = module
        .call_function(&mut heap, "load_design", vec![path_arg(&path), args])
        .unwrap();
    assert_eq!(
        module.call_method(&mut heap, &ctx, "getChipName", vec![]).unwrap(),
        s("toy-1k")
    );

    let err = module
        .call_function(&mut heap, "load_design", vec![path_arg(&path), Dynamic::Int(1)])
        .unwrap_err();
    assert_eq!(err.kind, ExceptionKind::TypeError);
}

#[test]
fn test_missing_file_raises_io_error() {
    let module = module();
    let mut heap = ObjectHeap::new();
    let err = module
        .call_function(
            &mut heap,
            "load_design",
            vec![s("/nonexistent/top.json"), Dynamic::NullHandle],
        )
        .unwrap_err();
    assert_eq!(err.kind, ExceptionKind::IoError);
    assert!(err.message.contains("/nonexistent/top.json"));
    assert!(heap.is_empty());
}

#[test]
fn test_parse_json_fills_an_existing_database() {
    let dir = TempDir::new("design").unwrap();
    let path = write_netlist(&dir, "top.json", MINIMAL);
    let module = module();
    let mut heap = ObjectHeap::new();
    let db = heap.allocate(Context::new(GenericFamily::create_arch(&GenericArchArgs::default())));
    let ctx = Dynamic::Object(db);

    let ret = module
        .call_function(&mut heap, "parse_json", vec![path_arg(&path), ctx.clone()])
        .unwrap();
    assert!(ret.is_void());
    assert_eq!(heap.get::<Context>(db).unwrap().cells.len(), 1);

    let err = module
        .call_function(&mut heap, "parse_json", vec![path_arg(&path), ctx.clone()])
        .unwrap_err();
    assert_eq!(err.kind, ExceptionKind::AssertionError);
    assert!(err.message.contains("already exists"));

    let bad = write_netlist(&dir, "bad.json", "{ \"modules\": [");
    let err = module
        .call_function(&mut heap, "parse_json", vec![path_arg(&bad), ctx])
        .unwrap_err();
    assert_eq!(err.kind, ExceptionKind::ParseError);
}
