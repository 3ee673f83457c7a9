//! The subset of Yosys `write_json` output that the importer reads.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct Netlist {
    #[serde(default)]
    pub modules: BTreeMap<String, Module>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Module {
    pub attributes: BTreeMap<String, AttrValue>,
    pub ports: BTreeMap<String, Port>,
    pub cells: BTreeMap<String, Cell>,
    pub netnames: BTreeMap<String, NetName>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Port {
    pub direction: String,
    #[serde(default)]
    pub bits: Vec<Bit>,
}

/// A signal bit: a net index, or one of the constants `0 1 x z`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum Bit {
    Net(i64),
    Const(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct Cell {
    #[serde(rename = "type")]
    pub cell_type: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, AttrValue>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,
    #[serde(default)]
    pub port_directions: BTreeMap<String, String>,
    #[serde(default)]
    pub connections: BTreeMap<String, Vec<Bit>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NetName {
    #[serde(default)]
    pub hide_name: u8,
    #[serde(default)]
    pub bits: Vec<Bit>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,
}

/// Attribute and parameter values. Older Yosys writes small integers as JSON
/// numbers; newer versions always write strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum AttrValue {
    Int(i64),
    Str(String),
}
