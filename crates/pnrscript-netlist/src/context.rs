//! The database that owns a design.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::arch::Arch;
use crate::assert::AssertionFailure;
use crate::ids::{BelId, IdString, IdStringTable, PipId, WireId};
use crate::netlist::{
    CellInfo, HierarchicalCell, NetInfo, PipMap, PlaceStrength, PortInfo, PortRef, PortType,
    Region,
};
use crate::property::Property;

pub type AttrMap = FxHashMap<IdString, Property>;
pub type PortMap = FxHashMap<IdString, PortInfo>;
pub type IdIdMap = FxHashMap<IdString, IdString>;
pub type WireMap = FxHashMap<WireId, PipMap>;
pub type CellMap = FxHashMap<IdString, CellInfo>;
pub type NetMap = FxHashMap<IdString, NetInfo>;
pub type RegionMap = FxHashMap<IdString, Region>;
pub type HierarchyMap = FxHashMap<IdString, HierarchicalCell>;

/// Sole owner of every entity in a design and of the tables that give its
/// identifiers meaning.
pub struct Context {
    ids: IdStringTable,
    arch: Box<dyn Arch>,
    pub cells: CellMap,
    pub nets: NetMap,
    pub region: RegionMap,
    pub hierarchy: HierarchyMap,
    pub top_module: IdString,
    /// Design-level attributes.
    pub attrs: AttrMap,
    bel_to_cell: FxHashMap<BelId, IdString>,
    wire_to_net: FxHashMap<WireId, IdString>,
}

impl Context {
    pub fn new(arch: Box<dyn Arch>) -> Self {
        Self {
            ids: IdStringTable::new(),
            arch,
            cells: CellMap::default(),
            nets: NetMap::default(),
            region: RegionMap::default(),
            hierarchy: HierarchyMap::default(),
            top_module: IdString::EMPTY,
            attrs: AttrMap::default(),
            bel_to_cell: FxHashMap::default(),
            wire_to_net: FxHashMap::default(),
        }
    }

    // =========================================================================
    // Identifiers
    // =========================================================================

    /// Intern `s`.
    pub fn id(&mut self, s: &str) -> IdString {
        self.ids.intern(s)
    }

    /// The identifier for `s` if it has been interned, without interning it.
    pub fn lookup_id(&self, s: &str) -> Option<IdString> {
        self.ids.lookup(s)
    }

    /// The text of an identifier interned by this context.
    pub fn name_of(&self, id: IdString) -> &str {
        id.str(&self.ids)
    }

    pub fn ids(&self) -> &IdStringTable {
        &self.ids
    }

    pub fn arch(&self) -> &dyn Arch {
        self.arch.as_ref()
    }

    pub fn arch_mut(&mut self) -> &mut dyn Arch {
        self.arch.as_mut()
    }

    // =========================================================================
    // Netlist construction
    // =========================================================================

    pub fn create_cell(
        &mut self,
        name: IdString,
        cell_type: IdString,
    ) -> Result<&mut CellInfo, AssertionFailure> {
        npnr_assert!(
            !self.cells.contains_key(&name),
            "cell '{}' already exists",
            self.name_of(name)
        );
        Ok(self
            .cells
            .entry(name)
            .or_insert_with(|| CellInfo::new(name, cell_type)))
    }

    pub fn create_net(&mut self, name: IdString) -> Result<&mut NetInfo, AssertionFailure> {
        npnr_assert!(
            !self.nets.contains_key(&name),
            "net '{}' already exists",
            self.name_of(name)
        );
        Ok(self.nets.entry(name).or_insert_with(|| NetInfo::new(name)))
    }

    /// Connect `cell.port` to `net`, as driver for outputs and as a user
    /// for inputs and inouts.
    pub fn connect_port(
        &mut self,
        net: IdString,
        cell: IdString,
        port: IdString,
    ) -> Result<(), AssertionFailure> {
        npnr_assert!(self.nets.contains_key(&net), "net '{}' does not exist", self.name_of(net));
        let Some(cell_info) = self.cells.get(&cell) else {
            npnr_assert_false!("cell '{}' does not exist", self.name_of(cell));
        };
        let Some(port_info) = cell_info.ports.get(&port) else {
            npnr_assert_false!(
                "cell '{}' has no port '{}'",
                self.name_of(cell),
                self.name_of(port)
            );
        };
        npnr_assert!(
            port_info.net.is_none(),
            "port '{}.{}' is already connected",
            self.name_of(cell),
            self.name_of(port)
        );
        let port_type = port_info.port_type;

        if port_type == PortType::Out {
            let driven = self.nets.get(&net).is_some_and(|n| n.driver.is_connected());
            npnr_assert!(!driven, "net '{}' already has a driver", self.name_of(net));
        }

        if let Some(info) = self.nets.get_mut(&net) {
            match port_type {
                PortType::Out => {
                    info.driver.cell = Some(cell);
                    info.driver.port = port;
                }
                PortType::In | PortType::Inout => info.users.push(PortRef::new(cell, port)),
            }
        }
        if let Some(p) = self.cells.get_mut(&cell).and_then(|c| c.ports.get_mut(&port)) {
            p.net = Some(net);
        }
        Ok(())
    }

    /// Detach `cell.port` from whatever net it is on. Unknown ports are ignored.
    pub fn disconnect_port(&mut self, cell: IdString, port: IdString) -> Result<(), AssertionFailure> {
        let Some(cell_info) = self.cells.get_mut(&cell) else {
            npnr_assert_false!("cell '{}' does not exist", self.name_of(cell));
        };
        let Some(port_info) = cell_info.ports.get_mut(&port) else {
            return Ok(());
        };
        let Some(net) = port_info.net.take() else {
            return Ok(());
        };
        if let Some(net_info) = self.nets.get_mut(&net) {
            let endpoint = PortRef::new(cell, port);
            net_info.users.retain(|u| *u != endpoint);
            if net_info.driver == endpoint {
                net_info.driver.cell = None;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Placement and routing state
    // =========================================================================

    pub fn bind_bel(
        &mut self,
        bel: BelId,
        cell: IdString,
        strength: PlaceStrength,
    ) -> Result<(), AssertionFailure> {
        npnr_assert!(self.arch.bel_name(bel).is_some(), "{} is not a bel of this device", bel);
        npnr_assert!(
            !self.bel_to_cell.contains_key(&bel),
            "bel '{}' is already bound",
            self.arch.bel_name(bel).unwrap_or_default()
        );
        let Some(cell_info) = self.cells.get_mut(&cell) else {
            npnr_assert_false!("cell '{}' does not exist", self.name_of(cell));
        };
        cell_info.bel = Some(bel);
        cell_info.bel_strength = strength;
        self.bel_to_cell.insert(bel, cell);
        Ok(())
    }

    pub fn unbind_bel(&mut self, bel: BelId) -> Result<(), AssertionFailure> {
        let Some(cell) = self.bel_to_cell.remove(&bel) else {
            npnr_assert_false!("{} is not bound", bel);
        };
        if let Some(cell_info) = self.cells.get_mut(&cell) {
            cell_info.bel = None;
            cell_info.bel_strength = PlaceStrength::None;
        }
        Ok(())
    }

    pub fn bound_bel_cell(&self, bel: BelId) -> Option<IdString> {
        self.bel_to_cell.get(&bel).copied()
    }

    /// Bind `wire` to `net` as a source wire (no driving pip).
    pub fn bind_wire(
        &mut self,
        wire: WireId,
        net: IdString,
        strength: PlaceStrength,
    ) -> Result<(), AssertionFailure> {
        self.bind_wire_with_pip(wire, None, net, strength)
    }

    pub fn bind_pip(
        &mut self,
        pip: PipId,
        net: IdString,
        strength: PlaceStrength,
    ) -> Result<(), AssertionFailure> {
        let Some(dst) = self.arch.pip_dst_wire(pip) else {
            npnr_assert_false!("{} is not a pip of this device", pip);
        };
        self.bind_wire_with_pip(dst, Some(pip), net, strength)
    }

    fn bind_wire_with_pip(
        &mut self,
        wire: WireId,
        pip: Option<PipId>,
        net: IdString,
        strength: PlaceStrength,
    ) -> Result<(), AssertionFailure> {
        npnr_assert!(self.arch.wire_name(wire).is_some(), "{} is not a wire of this device", wire);
        npnr_assert!(
            !self.wire_to_net.contains_key(&wire),
            "wire '{}' is already bound",
            self.arch.wire_name(wire).unwrap_or_default()
        );
        let Some(net_info) = self.nets.get_mut(&net) else {
            npnr_assert_false!("net '{}' does not exist", self.name_of(net));
        };
        net_info.wires.insert(wire, PipMap { pip, strength });
        self.wire_to_net.insert(wire, net);
        Ok(())
    }

    pub fn unbind_wire(&mut self, wire: WireId) -> Result<(), AssertionFailure> {
        let Some(net) = self.wire_to_net.remove(&wire) else {
            npnr_assert_false!("{} is not bound", wire);
        };
        if let Some(net_info) = self.nets.get_mut(&net) {
            net_info.wires.remove(&wire);
        }
        Ok(())
    }

    pub fn bound_wire_net(&self, wire: WireId) -> Option<IdString> {
        self.wire_to_net.get(&wire).copied()
    }

    /// Unbind every wire of a net.
    pub fn ripup_net(&mut self, net: IdString) -> Result<(), AssertionFailure> {
        let Some(net_info) = self.nets.get_mut(&net) else {
            npnr_assert_false!("net '{}' does not exist", self.name_of(net));
        };
        for (wire, _) in net_info.wires.drain() {
            self.wire_to_net.remove(&wire);
        }
        Ok(())
    }

    /// Raise every routing assignment of a net to user strength.
    pub fn lock_net_routing(&mut self, net: IdString) -> Result<(), AssertionFailure> {
        let Some(net_info) = self.nets.get_mut(&net) else {
            npnr_assert_false!("net '{}' does not exist", self.name_of(net));
        };
        for pip_map in net_info.wires.values_mut() {
            pip_map.strength = PlaceStrength::User;
        }
        Ok(())
    }

    // =========================================================================
    // Regions
    // =========================================================================

    pub fn create_region(&mut self, name: IdString) -> Result<&mut Region, AssertionFailure> {
        npnr_assert!(
            !self.region.contains_key(&name),
            "region '{}' already exists",
            self.name_of(name)
        );
        Ok(self.region.entry(name).or_insert_with(|| Region {
            name,
            ..Region::default()
        }))
    }

    pub fn add_bel_to_region(&mut self, name: IdString, bel: BelId) -> Result<(), AssertionFailure> {
        let Some(region) = self.region.get_mut(&name) else {
            npnr_assert_false!("region '{}' does not exist", self.name_of(name));
        };
        region.constr_bels = true;
        region.bels.insert(bel);
        Ok(())
    }

    pub fn constrain_cell_to_region(
        &mut self,
        cell: IdString,
        region: IdString,
    ) -> Result<(), AssertionFailure> {
        npnr_assert!(
            self.region.contains_key(&region),
            "region '{}' does not exist",
            self.name_of(region)
        );
        let Some(cell_info) = self.cells.get_mut(&cell) else {
            npnr_assert_false!("cell '{}' does not exist", self.name_of(cell));
        };
        cell_info.region = Some(region);
        Ok(())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("arch", &self.arch.family())
            .field("ids", &self.ids.len())
            .field("cells", &self.cells.len())
            .field("nets", &self.nets.len())
            .field("regions", &self.region.len())
            .field("hierarchy", &self.hierarchy.len())
            .finish()
    }
}
