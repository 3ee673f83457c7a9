//! Key paths from a [`Context`] to the entities and containers it owns.

use pnrscript_netlist::{
    AttrMap, BelId, CellInfo, CellMap, Context, HierarchicalCell, HierarchyMap, IdIdMap, IdString,
    NetInfo, NetMap, PipMap, PortInfo, PortMap, PortRef, Region, RegionMap, WireId, WireMap,
};
use rustc_hash::FxHashSet;

use crate::wrapper::EntityHandle;

fn name(ctx: &Context, id: IdString) -> &str {
    ctx.ids().resolve(id).unwrap_or("?")
}

/// The database itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextHandle;

impl EntityHandle for ContextHandle {
    type Target = Context;
    const KIND: &'static str = "Context";

    fn resolve<'c>(&self, ctx: &'c Context) -> Option<&'c Context> {
        Some(ctx)
    }

    fn resolve_mut<'c>(&self, ctx: &'c mut Context) -> Option<&'c mut Context> {
        Some(ctx)
    }

    fn describe(&self, _ctx: &Context) -> String {
        "context".to_owned()
    }
}

// ============================================================================
// Entities
// ============================================================================

macro_rules! named_entity {
    ($handle:ident, $target:ty, $kind:literal, $field:ident, $what:literal) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $handle(pub IdString);

        impl EntityHandle for $handle {
            type Target = $target;
            const KIND: &'static str = $kind;

            fn resolve<'c>(&self, ctx: &'c Context) -> Option<&'c $target> {
                ctx.$field.get(&self.0)
            }

            fn resolve_mut<'c>(&self, ctx: &'c mut Context) -> Option<&'c mut $target> {
                ctx.$field.get_mut(&self.0)
            }

            fn describe(&self, ctx: &Context) -> String {
                format!(concat!($what, " '{}'"), name(ctx, self.0))
            }
        }

        impl From<IdString> for $handle {
            fn from(id: IdString) -> Self {
                $handle(id)
            }
        }
    };
}

named_entity!(CellHandle, CellInfo, "CellInfo", cells, "cell");
named_entity!(NetHandle, NetInfo, "NetInfo", nets, "net");
named_entity!(RegionHandle, Region, "Region", region, "region");
named_entity!(HierCellHandle, HierarchicalCell, "HierarchicalCell", hierarchy, "hierarchy node");

/// A port on a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortHandle {
    pub cell: IdString,
    pub port: IdString,
}

impl EntityHandle for PortHandle {
    type Target = PortInfo;
    const KIND: &'static str = "PortInfo";

    fn resolve<'c>(&self, ctx: &'c Context) -> Option<&'c PortInfo> {
        ctx.cells.get(&self.cell)?.ports.get(&self.port)
    }

    fn resolve_mut<'c>(&self, ctx: &'c mut Context) -> Option<&'c mut PortInfo> {
        ctx.cells.get_mut(&self.cell)?.ports.get_mut(&self.port)
    }

    fn describe(&self, ctx: &Context) -> String {
        format!("port '{}.{}'", name(ctx, self.cell), name(ctx, self.port))
    }
}

/// Which endpoint of a net a [`PortRefHandle`] names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortRefSlot {
    Driver,
    /// The user endpoint on `(cell, port)`, wherever it sits in `users`.
    User { cell: Option<IdString>, port: IdString },
}

/// A driver or user endpoint stored on a net.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortRefHandle {
    pub net: IdString,
    pub slot: PortRefSlot,
}

impl EntityHandle for PortRefHandle {
    type Target = PortRef;
    const KIND: &'static str = "PortRef";

    fn resolve<'c>(&self, ctx: &'c Context) -> Option<&'c PortRef> {
        let net = ctx.nets.get(&self.net)?;
        match self.slot {
            PortRefSlot::Driver => Some(&net.driver),
            PortRefSlot::User { cell, port } => {
                net.users.iter().find(|u| u.cell == cell && u.port == port)
            }
        }
    }

    fn resolve_mut<'c>(&self, ctx: &'c mut Context) -> Option<&'c mut PortRef> {
        let net = ctx.nets.get_mut(&self.net)?;
        match self.slot {
            PortRefSlot::Driver => Some(&mut net.driver),
            PortRefSlot::User { cell, port } => {
                net.users.iter_mut().find(|u| u.cell == cell && u.port == port)
            }
        }
    }

    fn describe(&self, ctx: &Context) -> String {
        match self.slot {
            PortRefSlot::Driver => format!("driver of net '{}'", name(ctx, self.net)),
            PortRefSlot::User { cell, port } => format!(
                "user '{}.{}' of net '{}'",
                cell.map_or("", |c| name(ctx, c)),
                name(ctx, port),
                name(ctx, self.net)
            ),
        }
    }
}

/// The routing assignment of one wire of a net.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipMapHandle {
    pub net: IdString,
    pub wire: WireId,
}

impl EntityHandle for PipMapHandle {
    type Target = PipMap;
    const KIND: &'static str = "PipMap";

    fn resolve<'c>(&self, ctx: &'c Context) -> Option<&'c PipMap> {
        ctx.nets.get(&self.net)?.wires.get(&self.wire)
    }

    fn resolve_mut<'c>(&self, ctx: &'c mut Context) -> Option<&'c mut PipMap> {
        ctx.nets.get_mut(&self.net)?.wires.get_mut(&self.wire)
    }

    fn describe(&self, ctx: &Context) -> String {
        let wire = ctx.arch().wire_name(self.wire).unwrap_or("?");
        format!("wire '{}' of net '{}'", wire, name(ctx, self.net))
    }
}

// ============================================================================
// Containers
// ============================================================================

/// Which property map an [`AttrMapHandle`] names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttrOwner {
    Design,
    CellAttrs(IdString),
    CellParams(IdString),
    NetAttrs(IdString),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttrMapHandle(pub AttrOwner);

impl EntityHandle for AttrMapHandle {
    type Target = AttrMap;
    const KIND: &'static str = "AttrMap";

    fn resolve<'c>(&self, ctx: &'c Context) -> Option<&'c AttrMap> {
        match self.0 {
            AttrOwner::Design => Some(&ctx.attrs),
            AttrOwner::CellAttrs(cell) => ctx.cells.get(&cell).map(|c| &c.attrs),
            AttrOwner::CellParams(cell) => ctx.cells.get(&cell).map(|c| &c.params),
            AttrOwner::NetAttrs(net) => ctx.nets.get(&net).map(|n| &n.attrs),
        }
    }

    fn resolve_mut<'c>(&self, ctx: &'c mut Context) -> Option<&'c mut AttrMap> {
        match self.0 {
            AttrOwner::Design => Some(&mut ctx.attrs),
            AttrOwner::CellAttrs(cell) => ctx.cells.get_mut(&cell).map(|c| &mut c.attrs),
            AttrOwner::CellParams(cell) => ctx.cells.get_mut(&cell).map(|c| &mut c.params),
            AttrOwner::NetAttrs(net) => ctx.nets.get_mut(&net).map(|n| &mut n.attrs),
        }
    }

    fn describe(&self, ctx: &Context) -> String {
        match self.0 {
            AttrOwner::Design => "design attributes".to_owned(),
            AttrOwner::CellAttrs(cell) => format!("attributes of cell '{}'", name(ctx, cell)),
            AttrOwner::CellParams(cell) => format!("parameters of cell '{}'", name(ctx, cell)),
            AttrOwner::NetAttrs(net) => format!("attributes of net '{}'", name(ctx, net)),
        }
    }
}

/// Which identifier-to-identifier map an [`IdIdMapHandle`] names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdMapOwner {
    CellPins(IdString),
    HierLeafCells(IdString),
    HierNets(IdString),
    HierChildren(IdString),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IdIdMapHandle(pub IdMapOwner);

impl EntityHandle for IdIdMapHandle {
    type Target = IdIdMap;
    const KIND: &'static str = "IdIdMap";

    fn resolve<'c>(&self, ctx: &'c Context) -> Option<&'c IdIdMap> {
        match self.0 {
            IdMapOwner::CellPins(cell) => ctx.cells.get(&cell).map(|c| &c.pins),
            IdMapOwner::HierLeafCells(h) => ctx.hierarchy.get(&h).map(|h| &h.leaf_cells),
            IdMapOwner::HierNets(h) => ctx.hierarchy.get(&h).map(|h| &h.nets),
            IdMapOwner::HierChildren(h) => ctx.hierarchy.get(&h).map(|h| &h.hier_cells),
        }
    }

    fn resolve_mut<'c>(&self, ctx: &'c mut Context) -> Option<&'c mut IdIdMap> {
        match self.0 {
            IdMapOwner::CellPins(cell) => ctx.cells.get_mut(&cell).map(|c| &mut c.pins),
            IdMapOwner::HierLeafCells(h) => ctx.hierarchy.get_mut(&h).map(|h| &mut h.leaf_cells),
            IdMapOwner::HierNets(h) => ctx.hierarchy.get_mut(&h).map(|h| &mut h.nets),
            IdMapOwner::HierChildren(h) => ctx.hierarchy.get_mut(&h).map(|h| &mut h.hier_cells),
        }
    }

    fn describe(&self, ctx: &Context) -> String {
        match self.0 {
            IdMapOwner::CellPins(cell) => format!("pins of cell '{}'", name(ctx, cell)),
            IdMapOwner::HierLeafCells(h) => format!("leaf cells of '{}'", name(ctx, h)),
            IdMapOwner::HierNets(h) => format!("nets of '{}'", name(ctx, h)),
            IdMapOwner::HierChildren(h) => format!("children of '{}'", name(ctx, h)),
        }
    }
}

macro_rules! owned_container {
    ($handle:ident, $target:ty, $kind:literal, $what:literal, |$ctx:ident, $id:ident| $get:expr, |$ctx_mut:ident, $id_mut:ident| $get_mut:expr) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $handle(pub IdString);

        impl EntityHandle for $handle {
            type Target = $target;
            const KIND: &'static str = $kind;

            fn resolve<'c>(&self, $ctx: &'c Context) -> Option<&'c $target> {
                let $id = self.0;
                $get
            }

            fn resolve_mut<'c>(&self, $ctx_mut: &'c mut Context) -> Option<&'c mut $target> {
                let $id_mut = self.0;
                $get_mut
            }

            fn describe(&self, ctx: &Context) -> String {
                format!(concat!($what, " '{}'"), name(ctx, self.0))
            }
        }
    };
}

owned_container!(PortMapHandle, PortMap, "PortMap", "ports of cell",
    |ctx, id| ctx.cells.get(&id).map(|c| &c.ports),
    |ctx, id| ctx.cells.get_mut(&id).map(|c| &mut c.ports));
owned_container!(WireMapHandle, WireMap, "WireMap", "wires of net",
    |ctx, id| ctx.nets.get(&id).map(|n| &n.wires),
    |ctx, id| ctx.nets.get_mut(&id).map(|n| &mut n.wires));
owned_container!(PortRefVecHandle, Vec<PortRef>, "PortRefVector", "users of net",
    |ctx, id| ctx.nets.get(&id).map(|n| &n.users),
    |ctx, id| ctx.nets.get_mut(&id).map(|n| &mut n.users));
owned_container!(BelSetHandle, FxHashSet<BelId>, "BelSet", "bels of region",
    |ctx, id| ctx.region.get(&id).map(|r| &r.bels),
    |ctx, id| ctx.region.get_mut(&id).map(|r| &mut r.bels));
owned_container!(WireSetHandle, FxHashSet<WireId>, "WireSet", "wires of region",
    |ctx, id| ctx.region.get(&id).map(|r| &r.wires),
    |ctx, id| ctx.region.get_mut(&id).map(|r| &mut r.wires));

macro_rules! context_map {
    ($handle:ident, $target:ty, $kind:literal, $field:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $handle;

        impl EntityHandle for $handle {
            type Target = $target;
            const KIND: &'static str = $kind;

            fn resolve<'c>(&self, ctx: &'c Context) -> Option<&'c $target> {
                Some(&ctx.$field)
            }

            fn resolve_mut<'c>(&self, ctx: &'c mut Context) -> Option<&'c mut $target> {
                Some(&mut ctx.$field)
            }

            fn describe(&self, _ctx: &Context) -> String {
                stringify!($field).to_owned()
            }
        }
    };
}

context_map!(CellMapHandle, CellMap, "CellMap", cells);
context_map!(NetMapHandle, NetMap, "NetMap", nets);
context_map!(RegionMapHandle, RegionMap, "RegionMap", region);
context_map!(HierarchyMapHandle, HierarchyMap, "HierarchyMap", hierarchy);

// ============================================================================
// Parent/child relations used by collection proxies
// ============================================================================

/// A container handle whose values are entities.
///
/// The child handle is built from the key and the stored value together,
/// so that sequence elements are addressed by what they are rather than
/// by their current position.
pub trait KeyedChild<K, V>: EntityHandle {
    type Child: EntityHandle;

    fn child(&self, key: &K, value: &V) -> Self::Child;
}

impl KeyedChild<IdString, PortInfo> for PortMapHandle {
    type Child = PortHandle;

    fn child(&self, key: &IdString, _value: &PortInfo) -> PortHandle {
        PortHandle {
            cell: self.0,
            port: *key,
        }
    }
}

impl KeyedChild<WireId, PipMap> for WireMapHandle {
    type Child = PipMapHandle;

    fn child(&self, key: &WireId, _value: &PipMap) -> PipMapHandle {
        PipMapHandle {
            net: self.0,
            wire: *key,
        }
    }
}

macro_rules! keyed_by_name {
    ($($map:ident => $child:ident($value:ty)),*) => {
        $(
            impl KeyedChild<IdString, $value> for $map {
                type Child = $child;

                fn child(&self, key: &IdString, _value: &$value) -> $child {
                    $child(*key)
                }
            }
        )*
    };
}

keyed_by_name!(
    CellMapHandle => CellHandle(CellInfo),
    NetMapHandle => NetHandle(NetInfo),
    RegionMapHandle => RegionHandle(Region),
    HierarchyMapHandle => HierCellHandle(HierarchicalCell)
);

impl KeyedChild<usize, PortRef> for PortRefVecHandle {
    type Child = PortRefHandle;

    fn child(&self, _index: &usize, user: &PortRef) -> PortRefHandle {
        PortRefHandle {
            net: self.0,
            slot: PortRefSlot::User {
                cell: user.cell,
                port: user.port,
            },
        }
    }
}
