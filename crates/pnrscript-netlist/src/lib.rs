//! Native netlist and placement database.
//!
//! The [`Context`] owns every cell, net, region and hierarchy node of a
//! design, keyed by interned [`IdString`]s. Identifier values are opaque
//! without the context that interned them; placement handles ([`BelId`],
//! [`WireId`], [`PipId`]) are likewise only meaningful relative to the
//! context's [`Arch`].
//!
//! Mutating operations that can break a structural invariant return
//! [`AssertionFailure`] instead of panicking, so that callers on the far
//! side of a binding boundary can surface the failure as an exception.

#[macro_use]
mod assert;

mod arch;
mod context;
mod graphics;
mod ids;
mod netlist;
mod property;

pub use arch::Arch;
pub use assert::AssertionFailure;
pub use context::{
    AttrMap, CellMap, Context, HierarchyMap, IdIdMap, NetMap, PortMap, RegionMap, WireMap,
};
pub use graphics::{GraphicElement, GraphicElementStyle, GraphicElementType, Loc};
pub use ids::{BelId, IdString, IdStringTable, PipId, WireId};
pub use netlist::{
    CellInfo, Delay, HierarchicalCell, NetInfo, PipMap, PlaceStrength, PortInfo, PortRef,
    PortType, Region,
};
pub use property::{Property, PropertyState};
