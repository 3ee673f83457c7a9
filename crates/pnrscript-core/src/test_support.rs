use std::any::Any;

use pnrscript_netlist::{Arch, BelId, Context, PipId, WireId};

/// Two tiles of two bels; wire `W<i>` feeds `W<i+1>` through pip `P<i>`.
pub(crate) struct GridArch {
    bels: Vec<String>,
    wires: Vec<String>,
    pips: Vec<String>,
}

impl GridArch {
    pub(crate) fn new() -> Self {
        let bels = (0..2)
            .flat_map(|x| (0..2).map(move |z| format!("X{x}Y0/LC{z}")))
            .collect();
        let wires = (0..4).map(|i| format!("W{i}")).collect();
        let pips = (0..3).map(|i| format!("P{i}")).collect();
        Self { bels, wires, pips }
    }
}

fn position(names: &[String], name: &str) -> Option<u32> {
    names.iter().position(|n| n == name).map(|i| i as u32)
}

impl Arch for GridArch {
    fn family(&self) -> &'static str {
        "grid"
    }

    fn bel_by_name(&self, name: &str) -> Option<BelId> {
        position(&self.bels, name).map(BelId::new)
    }

    fn bel_name(&self, bel: BelId) -> Option<&str> {
        self.bels.get(bel.index() as usize).map(String::as_str)
    }

    fn bels(&self) -> Vec<BelId> {
        (0..self.bels.len() as u32).map(BelId::new).collect()
    }

    fn wire_by_name(&self, name: &str) -> Option<WireId> {
        position(&self.wires, name).map(WireId::new)
    }

    fn wire_name(&self, wire: WireId) -> Option<&str> {
        self.wires.get(wire.index() as usize).map(String::as_str)
    }

    fn wires(&self) -> Vec<WireId> {
        (0..self.wires.len() as u32).map(WireId::new).collect()
    }

    fn pip_by_name(&self, name: &str) -> Option<PipId> {
        position(&self.pips, name).map(PipId::new)
    }

    fn pip_name(&self, pip: PipId) -> Option<&str> {
        self.pips.get(pip.index() as usize).map(String::as_str)
    }

    fn pips(&self) -> Vec<PipId> {
        (0..self.pips.len() as u32).map(PipId::new).collect()
    }

    fn pip_dst_wire(&self, pip: PipId) -> Option<WireId> {
        ((pip.index() as usize) < self.pips.len()).then(|| WireId::new(pip.index() + 1))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) fn test_context() -> Context {
    Context::new(Box::new(GridArch::new()))
}
