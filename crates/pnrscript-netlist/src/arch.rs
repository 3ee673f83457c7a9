//! The architecture seam.
//!
//! Placement handles are plain indices; an [`Arch`] gives them names and
//! relates them to each other. Each target family provides its own
//! implementation and the [`Context`](crate::Context) holds it boxed.

use std::any::Any;

use crate::ids::{BelId, PipId, WireId};

pub trait Arch: Any {
    /// Short family name, e.g. `"generic"`.
    fn family(&self) -> &'static str;

    fn bel_by_name(&self, name: &str) -> Option<BelId>;
    fn bel_name(&self, bel: BelId) -> Option<&str>;
    fn bels(&self) -> Vec<BelId>;

    fn wire_by_name(&self, name: &str) -> Option<WireId>;
    fn wire_name(&self, wire: WireId) -> Option<&str>;
    fn wires(&self) -> Vec<WireId>;

    fn pip_by_name(&self, name: &str) -> Option<PipId>;
    fn pip_name(&self, pip: PipId) -> Option<&str>;
    fn pips(&self) -> Vec<PipId>;
    /// The wire a pip drives.
    fn pip_dst_wire(&self, pip: PipId) -> Option<WireId>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
