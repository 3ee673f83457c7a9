//! Cells, nets, ports and placement constraints.
//!
//! Entities refer to each other by name, never by pointer: a [`PortInfo`]
//! names the net it is connected to and a [`PortRef`] names the cell that
//! owns the port. The owning [`Context`](crate::Context) resolves those names
//! on demand, so the Cell/Net/Port graph has no ownership cycles.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ids::{BelId, IdString, PipId, WireId};
use crate::property::Property;

/// Timing budget attached to a net endpoint, in picoseconds.
pub type Delay = i64;

/// Direction of a cell port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(i64)]
pub enum PortType {
    In = 0,
    Out = 1,
    Inout = 2,
}

/// How firmly a placement or routing decision is held.
///
/// Stronger assignments may not be overridden by weaker passes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    IntoPrimitive,
    TryFromPrimitive,
)]
#[repr(i64)]
pub enum PlaceStrength {
    None = 0,
    Weak = 1,
    Strong = 2,
    Fixed = 3,
    Locked = 4,
    User = 5,
}

// `num_enum` treats `#[default]` as a catch-all, so defaults are spelled out.
impl Default for PortType {
    fn default() -> Self {
        PortType::In
    }
}

impl Default for PlaceStrength {
    fn default() -> Self {
        PlaceStrength::None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortInfo {
    pub name: IdString,
    /// Net this port connects to, if any.
    pub net: Option<IdString>,
    pub port_type: PortType,
}

/// A net endpoint: a port on a cell.
///
/// Equality is structural over `(cell, port)`; the budget is ignored.
#[derive(Debug, Clone, Default)]
pub struct PortRef {
    pub cell: Option<IdString>,
    pub port: IdString,
    pub budget: Delay,
}

impl PortRef {
    pub fn new(cell: IdString, port: IdString) -> Self {
        Self {
            cell: Some(cell),
            port,
            budget: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.cell.is_some()
    }
}

impl PartialEq for PortRef {
    fn eq(&self, other: &Self) -> bool {
        self.cell == other.cell && self.port == other.port
    }
}

impl Eq for PortRef {}

/// The pip driving a bound wire, and how firmly it is bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipMap {
    /// `None` for the net's source wire.
    pub pip: Option<PipId>,
    pub strength: PlaceStrength,
}

#[derive(Debug, Clone, Default)]
pub struct NetInfo {
    pub name: IdString,
    pub driver: PortRef,
    pub users: Vec<PortRef>,
    pub attrs: FxHashMap<IdString, Property>,
    pub wires: FxHashMap<WireId, PipMap>,
}

impl NetInfo {
    pub fn new(name: IdString) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CellInfo {
    pub name: IdString,
    pub cell_type: IdString,
    pub attrs: FxHashMap<IdString, Property>,
    pub params: FxHashMap<IdString, Property>,
    pub ports: FxHashMap<IdString, PortInfo>,
    pub bel: Option<BelId>,
    pub bel_strength: PlaceStrength,
    /// External pin name to internal port name.
    pub pins: FxHashMap<IdString, IdString>,
    /// Placement region this cell is constrained to.
    pub region: Option<IdString>,
}

impl CellInfo {
    pub fn new(name: IdString, cell_type: IdString) -> Self {
        Self {
            name,
            cell_type,
            ..Self::default()
        }
    }

    fn add_port(&mut self, name: IdString, port_type: PortType) {
        let port = self.ports.entry(name).or_default();
        port.name = name;
        port.port_type = port_type;
    }

    pub fn add_input(&mut self, name: IdString) {
        self.add_port(name, PortType::In);
    }

    pub fn add_output(&mut self, name: IdString) {
        self.add_port(name, PortType::Out);
    }

    pub fn add_inout(&mut self, name: IdString) {
        self.add_port(name, PortType::Inout);
    }

    pub fn set_param(&mut self, name: IdString, value: Property) {
        self.params.insert(name, value);
    }

    pub fn unset_param(&mut self, name: IdString) {
        self.params.remove(&name);
    }

    pub fn set_attr(&mut self, name: IdString, value: Property) {
        self.attrs.insert(name, value);
    }

    pub fn unset_attr(&mut self, name: IdString) {
        self.attrs.remove(&name);
    }
}

/// A placement constraint naming the resources a set of cells may use.
#[derive(Debug, Clone, Default)]
pub struct Region {
    pub name: IdString,
    pub constr_bels: bool,
    pub constr_wires: bool,
    pub constr_pips: bool,
    pub bels: FxHashSet<BelId>,
    pub wires: FxHashSet<WireId>,
}

/// One node of the design hierarchy, layered over the flat cell/net maps.
#[derive(Debug, Clone, Default)]
pub struct HierarchicalCell {
    pub name: IdString,
    pub cell_type: IdString,
    pub parent: IdString,
    pub fullpath: IdString,
    /// Local name to flat cell name.
    pub leaf_cells: FxHashMap<IdString, IdString>,
    /// Local name to flat net name.
    pub nets: FxHashMap<IdString, IdString>,
    /// Local name to child hierarchy node name.
    pub hier_cells: FxHashMap<IdString, IdString>,
}
