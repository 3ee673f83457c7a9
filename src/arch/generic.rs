//! The generic architecture family.
//!
//! A device with no built-in database: bels, wires and pips are added at
//! run time, usually by a script, before a design is placed onto it.

use std::any::Any;

use pnrscript_core::handles::{CellHandle, ContextHandle, NetHandle, RegionHandle};
use pnrscript_core::{
    ContextualWrapper, ConvFromStr, ConvToStr, DerefAndWrap, InternFromStr, ListOf, PassThrough,
};
use pnrscript_netlist::{
    Arch, AssertionFailure, BelId, Context, IdString, Loc, PipId, PlaceStrength, WireId,
    npnr_assert, npnr_assert_false,
};
use pnrscript_registry::{Module, RegistrationError};
use rustc_hash::FxHashMap;
use serde::Deserialize;

use super::ArchFamily;

/// Arguments selecting a generic device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenericArchArgs {
    /// Free-form device name, reported by `chip`.
    #[serde(default)]
    pub chip: String,
}

pnrscript_core::value_class!(GenericArchArgs);

#[derive(Debug, Clone)]
struct BelData {
    name: String,
    bel_type: String,
    loc: Loc,
}

#[derive(Debug, Clone)]
struct WireData {
    name: String,
    wire_type: String,
}

#[derive(Debug, Clone)]
struct PipData {
    name: String,
    src: WireId,
    dst: WireId,
}

#[derive(Debug, Default)]
pub struct GenericArch {
    chip: String,
    bels: Vec<BelData>,
    wires: Vec<WireData>,
    pips: Vec<PipData>,
    bel_names: FxHashMap<String, BelId>,
    wire_names: FxHashMap<String, WireId>,
    pip_names: FxHashMap<String, PipId>,
}

impl GenericArch {
    pub fn new(args: &GenericArchArgs) -> Self {
        Self {
            chip: args.chip.clone(),
            ..Self::default()
        }
    }

    pub fn chip(&self) -> &str {
        &self.chip
    }

    pub fn add_bel(&mut self, name: &str, bel_type: &str, loc: Loc) -> Result<BelId, AssertionFailure> {
        npnr_assert!(!self.bel_names.contains_key(name), "duplicate bel name '{}'", name);
        let bel = BelId::new(self.bels.len() as u32);
        self.bels.push(BelData {
            name: name.to_owned(),
            bel_type: bel_type.to_owned(),
            loc,
        });
        self.bel_names.insert(name.to_owned(), bel);
        Ok(bel)
    }

    pub fn add_wire(&mut self, name: &str, wire_type: &str) -> Result<WireId, AssertionFailure> {
        npnr_assert!(!self.wire_names.contains_key(name), "duplicate wire name '{}'", name);
        let wire = WireId::new(self.wires.len() as u32);
        self.wires.push(WireData {
            name: name.to_owned(),
            wire_type: wire_type.to_owned(),
        });
        self.wire_names.insert(name.to_owned(), wire);
        Ok(wire)
    }

    pub fn add_pip(&mut self, name: &str, src: WireId, dst: WireId) -> Result<PipId, AssertionFailure> {
        npnr_assert!(!self.pip_names.contains_key(name), "duplicate pip name '{}'", name);
        for wire in [src, dst] {
            npnr_assert!((wire.index() as usize) < self.wires.len(), "{} does not exist", wire);
        }
        let pip = PipId::new(self.pips.len() as u32);
        self.pips.push(PipData {
            name: name.to_owned(),
            src,
            dst,
        });
        self.pip_names.insert(name.to_owned(), pip);
        Ok(pip)
    }

    pub fn bel_type(&self, bel: BelId) -> Option<&str> {
        self.bels.get(bel.index() as usize).map(|b| b.bel_type.as_str())
    }

    pub fn bel_loc(&self, bel: BelId) -> Option<Loc> {
        self.bels.get(bel.index() as usize).map(|b| b.loc)
    }

    pub fn wire_type(&self, wire: WireId) -> Option<&str> {
        self.wires.get(wire.index() as usize).map(|w| w.wire_type.as_str())
    }

    pub fn pip_src_wire(&self, pip: PipId) -> Option<WireId> {
        self.pips.get(pip.index() as usize).map(|p| p.src)
    }
}

impl Arch for GenericArch {
    fn family(&self) -> &'static str {
        GenericFamily::NAME
    }

    fn bel_by_name(&self, name: &str) -> Option<BelId> {
        self.bel_names.get(name).copied()
    }

    fn bel_name(&self, bel: BelId) -> Option<&str> {
        self.bels.get(bel.index() as usize).map(|b| b.name.as_str())
    }

    fn bels(&self) -> Vec<BelId> {
        (0..self.bels.len() as u32).map(BelId::new).collect()
    }

    fn wire_by_name(&self, name: &str) -> Option<WireId> {
        self.wire_names.get(name).copied()
    }

    fn wire_name(&self, wire: WireId) -> Option<&str> {
        self.wires.get(wire.index() as usize).map(|w| w.name.as_str())
    }

    fn wires(&self) -> Vec<WireId> {
        (0..self.wires.len() as u32).map(WireId::new).collect()
    }

    fn pip_by_name(&self, name: &str) -> Option<PipId> {
        self.pip_names.get(name).copied()
    }

    fn pip_name(&self, pip: PipId) -> Option<&str> {
        self.pips.get(pip.index() as usize).map(|p| p.name.as_str())
    }

    fn pips(&self) -> Vec<PipId> {
        (0..self.pips.len() as u32).map(PipId::new).collect()
    }

    fn pip_dst_wire(&self, pip: PipId) -> Option<WireId> {
        self.pips.get(pip.index() as usize).map(|p| p.dst)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn generic_mut(ctx: &mut Context) -> Result<&mut GenericArch, AssertionFailure> {
    let Some(arch) = ctx.arch_mut().as_any_mut().downcast_mut::<GenericArch>() else {
        npnr_assert_false!("context is not built on a generic architecture");
    };
    Ok(arch)
}

pub struct GenericFamily;

impl ArchFamily for GenericFamily {
    const NAME: &'static str = "generic";
    type Args = GenericArchArgs;

    fn create_arch(args: &GenericArchArgs) -> Box<dyn Arch> {
        Box::new(GenericArch::new(args))
    }

    fn wrap_bindings(module: &mut Module) -> Result<(), RegistrationError> {
        module
            .register_class::<GenericArchArgs>("ArchArgs")
            .constructor(1, |call| {
                Ok(GenericArchArgs {
                    chip: call.arg(0)?,
                })
            })
            .readwrite::<PassThrough, PassThrough, _, _, _>(
                "chip",
                |a: &GenericArchArgs| &a.chip,
                |a, v| a.chip = v,
            )?
            .build()?;

        module
            .extend_class::<ContextualWrapper<ContextHandle>>()?
            // Netlist editing
            .method1::<DerefAndWrap<NetHandle>, InternFromStr, _, IdString, _>(
                "createNet",
                |ctx: &mut Context, name: IdString| {
                    ctx.create_net(name)?;
                    Ok(name)
                },
            )?
            .method2::<DerefAndWrap<CellHandle>, InternFromStr, InternFromStr, _, _, IdString, _>(
                "createCell",
                |ctx: &mut Context, name: IdString, cell_type: IdString| {
                    ctx.create_cell(name, cell_type)?;
                    Ok(name)
                },
            )?
            .method3_v::<ConvFromStr, ConvFromStr, ConvFromStr, _, _, _, _>(
                "connectPort",
                |ctx: &mut Context, net: IdString, cell: IdString, port: IdString| {
                    Ok(ctx.connect_port(net, cell, port)?)
                },
            )?
            .method2_v::<ConvFromStr, ConvFromStr, _, _, _>(
                "disconnectPort",
                |ctx: &mut Context, cell: IdString, port: IdString| {
                    Ok(ctx.disconnect_port(cell, port)?)
                },
            )?
            .method1_v::<ConvFromStr, _, _>("ripupNet", |ctx: &mut Context, net: IdString| {
                Ok(ctx.ripup_net(net)?)
            })?
            .method1_v::<ConvFromStr, _, _>("lockNetRouting", |ctx: &mut Context, net: IdString| {
                Ok(ctx.lock_net_routing(net)?)
            })?
            // Regions
            .method1::<DerefAndWrap<RegionHandle>, InternFromStr, _, IdString, _>(
                "createRegion",
                |ctx: &mut Context, name: IdString| {
                    ctx.create_region(name)?;
                    Ok(name)
                },
            )?
            .method2_v::<ConvFromStr, ConvFromStr, _, _, _>(
                "addBelToRegion",
                |ctx: &mut Context, region: IdString, bel: BelId| {
                    Ok(ctx.add_bel_to_region(region, bel)?)
                },
            )?
            .method2_v::<ConvFromStr, ConvFromStr, _, _, _>(
                "constrainCellToRegion",
                |ctx: &mut Context, cell: IdString, region: IdString| {
                    Ok(ctx.constrain_cell_to_region(cell, region)?)
                },
            )?
            // Placement and routing
            .method3_v::<ConvFromStr, ConvFromStr, PassThrough, _, _, _, _>(
                "bindBel",
                |ctx: &mut Context, bel: BelId, cell: IdString, strength: PlaceStrength| {
                    Ok(ctx.bind_bel(bel, cell, strength)?)
                },
            )?
            .method1_v::<ConvFromStr, _, _>("unbindBel", |ctx: &mut Context, bel: BelId| {
                Ok(ctx.unbind_bel(bel)?)
            })?
            .method3_v::<ConvFromStr, ConvFromStr, PassThrough, _, _, _, _>(
                "bindWire",
                |ctx: &mut Context, wire: WireId, net: IdString, strength: PlaceStrength| {
                    Ok(ctx.bind_wire(wire, net, strength)?)
                },
            )?
            .method3_v::<ConvFromStr, ConvFromStr, PassThrough, _, _, _, _>(
                "bindPip",
                |ctx: &mut Context, pip: PipId, net: IdString, strength: PlaceStrength| {
                    Ok(ctx.bind_pip(pip, net, strength)?)
                },
            )?
            .method1_v::<ConvFromStr, _, _>("unbindWire", |ctx: &mut Context, wire: WireId| {
                Ok(ctx.unbind_wire(wire)?)
            })?
            // Device construction
            .method3_v::<PassThrough, PassThrough, PassThrough, _, _, _, _>(
                "addBel",
                |ctx: &mut Context, name: String, bel_type: String, loc: Loc| {
                    generic_mut(ctx)?.add_bel(&name, &bel_type, loc)?;
                    Ok(())
                },
            )?
            .method2_v::<PassThrough, PassThrough, _, _, _>(
                "addWire",
                |ctx: &mut Context, name: String, wire_type: String| {
                    generic_mut(ctx)?.add_wire(&name, &wire_type)?;
                    Ok(())
                },
            )?
            .method3_v::<PassThrough, ConvFromStr, ConvFromStr, _, _, _, _>(
                "addPip",
                |ctx: &mut Context, name: String, src: WireId, dst: WireId| {
                    generic_mut(ctx)?.add_pip(&name, src, dst)?;
                    Ok(())
                },
            )?
            // Device queries
            .method0::<ListOf<ConvToStr>, Vec<BelId>, _>("getBels", |ctx: &mut Context| {
                Ok(ctx.arch().bels())
            })?
            .method0::<ListOf<ConvToStr>, Vec<WireId>, _>("getWires", |ctx: &mut Context| {
                Ok(ctx.arch().wires())
            })?
            .method0::<ListOf<ConvToStr>, Vec<PipId>, _>("getPips", |ctx: &mut Context| {
                Ok(ctx.arch().pips())
            })?
            .method1::<ConvToStr, PassThrough, String, Option<BelId>, _>(
                "getBelByName",
                |ctx: &mut Context, name: String| Ok(ctx.arch().bel_by_name(&name)),
            )?
            .method1::<PassThrough, ConvFromStr, BelId, Option<Loc>, _>(
                "getBelLocation",
                |ctx: &mut Context, bel: BelId| {
                    Ok(ctx.arch().as_any().downcast_ref::<GenericArch>().and_then(|a| a.bel_loc(bel)))
                },
            )?
            .method0::<PassThrough, String, _>("getChipName", |ctx: &mut Context| {
                Ok(generic_mut(ctx)?.chip().to_owned())
            })?
            .build()
    }
}
