//! The registration entry point.
//!
//! [`register_module`] builds the whole script namespace in dependency
//! order: enums, leaf value types, entity types, collections, the free
//! file-loading functions, and finally the architecture family's own
//! bindings.

use std::path::Path;

use pnrscript_core::handles::{
    AttrMapHandle, AttrOwner, BelSetHandle, CellHandle, CellMapHandle, ContextHandle,
    HierCellHandle, HierarchyMapHandle, IdIdMapHandle, IdMapOwner, NetHandle, NetMapHandle,
    PipMapHandle, PortHandle, PortMapHandle, PortRefHandle, PortRefSlot, PortRefVecHandle,
    RegionHandle, RegionMapHandle, WireMapHandle, WireSetHandle,
};
use pnrscript_core::{
    ContextualWrapper, ConvFromStr, ConvToStr, ConversionError, DerefAndWrap, Dynamic,
    InternFromStr, NativeError, PassThrough, UnwrapContext,
};
use pnrscript_netlist::{
    CellInfo, Context, GraphicElement, GraphicElementStyle, GraphicElementType, HierarchicalCell,
    Loc, NetInfo, PipMap, PlaceStrength, PortInfo, PortRef, PortType, Region,
};
use pnrscript_registry::{Converted, Module, RegistrationError, Wrapped};
use tracing::info;

use crate::arch::ArchFamily;
use crate::design;
use crate::settings::Settings;

/// Build the module for architecture family `F`.
///
/// Must be called once, before any script runs.
pub fn register_module<F: ArchFamily>(settings: &Settings) -> Result<Module, RegistrationError> {
    let mut module = Module::new(settings.module_name(F::NAME));

    register_enums(&mut module)?;
    register_value_types(&mut module)?;
    register_entities(&mut module)?;
    register_collections(&mut module)?;
    register_functions::<F>(&mut module)?;
    F::wrap_bindings(&mut module)?;

    info!(
        module = module.name(),
        classes = module.class_names().len(),
        "registered script bindings"
    );
    Ok(module)
}

fn register_enums(module: &mut Module) -> Result<(), RegistrationError> {
    module
        .register_enum::<GraphicElementType>("GraphicElementType")
        .value("TYPE_NONE", GraphicElementType::None)?
        .value("TYPE_LINE", GraphicElementType::Line)?
        .value("TYPE_ARROW", GraphicElementType::Arrow)?
        .value("TYPE_BOX", GraphicElementType::Box)?
        .value("TYPE_CIRCLE", GraphicElementType::Circle)?
        .value("TYPE_LABEL", GraphicElementType::Label)?
        .export_values()
        .build()?;

    module
        .register_enum::<GraphicElementStyle>("GraphicElementStyle")
        .value("STYLE_GRID", GraphicElementStyle::Grid)?
        .value("STYLE_FRAME", GraphicElementStyle::Frame)?
        .value("STYLE_HIDDEN", GraphicElementStyle::Hidden)?
        .value("STYLE_INACTIVE", GraphicElementStyle::Inactive)?
        .value("STYLE_ACTIVE", GraphicElementStyle::Active)?
        .export_values()
        .build()?;

    module
        .register_enum::<PortType>("PortType")
        .value("PORT_IN", PortType::In)?
        .value("PORT_OUT", PortType::Out)?
        .value("PORT_INOUT", PortType::Inout)?
        .export_values()
        .build()?;

    module
        .register_enum::<PlaceStrength>("PlaceStrength")
        .value("STRENGTH_NONE", PlaceStrength::None)?
        .value("STRENGTH_WEAK", PlaceStrength::Weak)?
        .value("STRENGTH_STRONG", PlaceStrength::Strong)?
        .value("STRENGTH_FIXED", PlaceStrength::Fixed)?
        .value("STRENGTH_LOCKED", PlaceStrength::Locked)?
        .value("STRENGTH_USER", PlaceStrength::User)?
        .export_values()
        .build()
}

fn register_value_types(module: &mut Module) -> Result<(), RegistrationError> {
    module
        .register_class::<GraphicElement>("GraphicElement")
        .constructor(7, |call| {
            Ok(GraphicElement::new(
                call.arg(0)?,
                call.arg(1)?,
                call.arg(2)?,
                call.arg(3)?,
                call.arg(4)?,
                call.arg(5)?,
                call.arg(6)?,
            ))
        })
        .readwrite::<PassThrough, PassThrough, _, _, _>(
            "type",
            |g: &GraphicElement| &g.element_type,
            |g, v| g.element_type = v,
        )?
        .readwrite::<PassThrough, PassThrough, _, _, _>("x1", |g: &GraphicElement| &g.x1, |g, v| g.x1 = v)?
        .readwrite::<PassThrough, PassThrough, _, _, _>("y1", |g: &GraphicElement| &g.y1, |g, v| g.y1 = v)?
        .readwrite::<PassThrough, PassThrough, _, _, _>("x2", |g: &GraphicElement| &g.x2, |g, v| g.x2 = v)?
        .readwrite::<PassThrough, PassThrough, _, _, _>("y2", |g: &GraphicElement| &g.y2, |g, v| g.y2 = v)?
        .readwrite::<PassThrough, PassThrough, _, _, _>(
            "text",
            |g: &GraphicElement| &g.text,
            |g, v| g.text = v,
        )?
        .build()?;

    module
        .register_class::<Loc>("Loc")
        .constructor(3, |call| Ok(Loc::new(call.arg(0)?, call.arg(1)?, call.arg(2)?)))
        .readwrite::<PassThrough, PassThrough, _, _, _>("x", |l: &Loc| &l.x, |l, v| l.x = v)?
        .readwrite::<PassThrough, PassThrough, _, _, _>("y", |l: &Loc| &l.y, |l, v| l.y = v)?
        .readwrite::<PassThrough, PassThrough, _, _, _>("z", |l: &Loc| &l.z, |l, v| l.z = v)?
        .build()?;

    module
        .register_class::<ContextualWrapper<PipMapHandle>>("PipMap")
        .readwrite::<ConvToStr, ConvFromStr, _, _, _>("pip", |p: &PipMap| &p.pip, |p, v| p.pip = v)?
        .readwrite::<PassThrough, PassThrough, _, _, _>(
            "strength",
            |p: &PipMap| &p.strength,
            |p, v| p.strength = v,
        )?
        .build()
}

fn register_entities(module: &mut Module) -> Result<(), RegistrationError> {
    module
        .register_class::<ContextualWrapper<ContextHandle>>("Context")
        .view("cells", |_: &ContextHandle| CellMapHandle)?
        .view("nets", |_: &ContextHandle| NetMapHandle)?
        .view("region", |_: &ContextHandle| RegionMapHandle)?
        .view("hierarchy", |_: &ContextHandle| HierarchyMapHandle)?
        .view("attrs", |_: &ContextHandle| AttrMapHandle(AttrOwner::Design))?
        .readwrite::<ConvToStr, InternFromStr, _, _, _>(
            "top_module",
            |c: &Context| &c.top_module,
            |c, v| c.top_module = v,
        )?
        .build()?;

    module
        .register_class::<ContextualWrapper<CellHandle>>("CellInfo")
        .readwrite::<ConvToStr, InternFromStr, _, _, _>("name", |c: &CellInfo| &c.name, |c, v| c.name = v)?
        .readwrite::<ConvToStr, InternFromStr, _, _, _>(
            "type",
            |c: &CellInfo| &c.cell_type,
            |c, v| c.cell_type = v,
        )?
        .view("attrs", |h: &CellHandle| AttrMapHandle(AttrOwner::CellAttrs(h.0)))?
        .view("params", |h: &CellHandle| AttrMapHandle(AttrOwner::CellParams(h.0)))?
        .view("ports", |h: &CellHandle| PortMapHandle(h.0))?
        .view("pins", |h: &CellHandle| IdIdMapHandle(IdMapOwner::CellPins(h.0)))?
        .readwrite::<ConvToStr, ConvFromStr, _, _, _>("bel", |c: &CellInfo| &c.bel, |c, v| c.bel = v)?
        .readwrite::<PassThrough, PassThrough, _, _, _>(
            "belStrength",
            |c: &CellInfo| &c.bel_strength,
            |c, v| c.bel_strength = v,
        )?
        .method1_v::<InternFromStr, _, _>("addInput", |c: &mut CellInfo, name| {
            c.add_input(name);
            Ok(())
        })?
        .method1_v::<InternFromStr, _, _>("addOutput", |c: &mut CellInfo, name| {
            c.add_output(name);
            Ok(())
        })?
        .method1_v::<InternFromStr, _, _>("addInout", |c: &mut CellInfo, name| {
            c.add_inout(name);
            Ok(())
        })?
        .method2_v::<InternFromStr, ConvFromStr, _, _, _>("setParam", |c: &mut CellInfo, name, value| {
            c.set_param(name, value);
            Ok(())
        })?
        .method1_v::<ConvFromStr, _, _>("unsetParam", |c: &mut CellInfo, name| {
            c.unset_param(name);
            Ok(())
        })?
        .method2_v::<InternFromStr, ConvFromStr, _, _, _>("setAttr", |c: &mut CellInfo, name, value| {
            c.set_attr(name, value);
            Ok(())
        })?
        .method1_v::<ConvFromStr, _, _>("unsetAttr", |c: &mut CellInfo, name| {
            c.unset_attr(name);
            Ok(())
        })?
        .build()?;

    module
        .register_class::<ContextualWrapper<PortHandle>>("PortInfo")
        .readwrite::<ConvToStr, InternFromStr, _, _, _>("name", |p: &PortInfo| &p.name, |p, v| p.name = v)?
        .readonly::<DerefAndWrap<NetHandle>, _, _>("net", |p: &PortInfo| &p.net)?
        .readwrite::<PassThrough, PassThrough, _, _, _>(
            "type",
            |p: &PortInfo| &p.port_type,
            |p, v| p.port_type = v,
        )?
        .build()?;

    module
        .register_class::<ContextualWrapper<NetHandle>>("NetInfo")
        .readwrite::<ConvToStr, InternFromStr, _, _, _>("name", |n: &NetInfo| &n.name, |n, v| n.name = v)?
        .view_rw::<_, UnwrapContext<PortRefHandle>, PortRef, _, _>(
            "driver",
            |h: &NetHandle| PortRefHandle {
                net: h.0,
                slot: PortRefSlot::Driver,
            },
            |n: &mut NetInfo, v| n.driver = v,
        )?
        .view("users", |h: &NetHandle| PortRefVecHandle(h.0))?
        .view("wires", |h: &NetHandle| WireMapHandle(h.0))?
        .view("attrs", |h: &NetHandle| AttrMapHandle(AttrOwner::NetAttrs(h.0)))?
        .build()?;

    module
        .register_class::<ContextualWrapper<PortRefHandle>>("PortRef")
        .readonly::<DerefAndWrap<CellHandle>, _, _>("cell", |r: &PortRef| &r.cell)?
        .readwrite::<ConvToStr, InternFromStr, _, _, _>("port", |r: &PortRef| &r.port, |r, v| r.port = v)?
        .readwrite::<PassThrough, PassThrough, _, _, _>(
            "budget",
            |r: &PortRef| &r.budget,
            |r, v| r.budget = v,
        )?
        .equality()?
        .build()?;

    module
        .register_class::<ContextualWrapper<RegionHandle>>("Region")
        .readwrite::<ConvToStr, InternFromStr, _, _, _>("name", |r: &Region| &r.name, |r, v| r.name = v)?
        .readwrite::<PassThrough, PassThrough, _, _, _>(
            "constr_bels",
            |r: &Region| &r.constr_bels,
            |r, v| r.constr_bels = v,
        )?
        .readwrite::<PassThrough, PassThrough, _, _, _>(
            "constr_wires",
            |r: &Region| &r.constr_wires,
            |r, v| r.constr_wires = v,
        )?
        .readwrite::<PassThrough, PassThrough, _, _, _>(
            "constr_pips",
            |r: &Region| &r.constr_pips,
            |r, v| r.constr_pips = v,
        )?
        .view("bels", |h: &RegionHandle| BelSetHandle(h.0))?
        .view("wires", |h: &RegionHandle| WireSetHandle(h.0))?
        .build()?;

    module
        .register_class::<ContextualWrapper<HierCellHandle>>("HierarchicalCell")
        .readwrite::<ConvToStr, InternFromStr, _, _, _>(
            "name",
            |h: &HierarchicalCell| &h.name,
            |h, v| h.name = v,
        )?
        .readwrite::<ConvToStr, InternFromStr, _, _, _>(
            "type",
            |h: &HierarchicalCell| &h.cell_type,
            |h, v| h.cell_type = v,
        )?
        .readwrite::<ConvToStr, InternFromStr, _, _, _>(
            "parent",
            |h: &HierarchicalCell| &h.parent,
            |h, v| h.parent = v,
        )?
        .readwrite::<ConvToStr, InternFromStr, _, _, _>(
            "fullpath",
            |h: &HierarchicalCell| &h.fullpath,
            |h, v| h.fullpath = v,
        )?
        .view("leaf_cells", |h: &HierCellHandle| IdIdMapHandle(IdMapOwner::HierLeafCells(h.0)))?
        .view("nets", |h: &HierCellHandle| IdIdMapHandle(IdMapOwner::HierNets(h.0)))?
        .view("hier_cells", |h: &HierCellHandle| IdIdMapHandle(IdMapOwner::HierChildren(h.0)))?
        .build()
}

fn register_collections(module: &mut Module) -> Result<(), RegistrationError> {
    module
        .register_class::<ContextualWrapper<AttrMapHandle>>("AttrMap")
        .map_proxy::<ConvToStr, ConvFromStr, Converted<ConvToStr>>()?
        .map_setitem::<InternFromStr, ConvFromStr>()?
        .map_delitem::<ConvFromStr>()?
        .build()?;

    module
        .register_class::<ContextualWrapper<PortMapHandle>>("PortMap")
        .map_proxy::<ConvToStr, ConvFromStr, Wrapped>()?
        .build()?;

    module
        .register_class::<ContextualWrapper<IdIdMapHandle>>("IdIdMap")
        .map_proxy::<ConvToStr, ConvFromStr, Converted<ConvToStr>>()?
        .map_setitem::<InternFromStr, InternFromStr>()?
        .map_delitem::<ConvFromStr>()?
        .build()?;

    module
        .register_class::<ContextualWrapper<WireMapHandle>>("WireMap")
        .map_proxy::<ConvToStr, ConvFromStr, Wrapped>()?
        .build()?;

    module
        .register_class::<ContextualWrapper<RegionMapHandle>>("RegionMap")
        .map_proxy::<ConvToStr, ConvFromStr, Wrapped>()?
        .build()?;

    module
        .register_class::<ContextualWrapper<CellMapHandle>>("CellMap")
        .map_proxy::<ConvToStr, ConvFromStr, Wrapped>()?
        .build()?;

    module
        .register_class::<ContextualWrapper<NetMapHandle>>("NetMap")
        .map_proxy::<ConvToStr, ConvFromStr, Wrapped>()?
        .build()?;

    module
        .register_class::<ContextualWrapper<HierarchyMapHandle>>("HierarchyMap")
        .map_proxy::<ConvToStr, ConvFromStr, Wrapped>()?
        .build()?;

    module
        .register_class::<ContextualWrapper<PortRefVecHandle>>("PortRefVector")
        .vec_proxy::<Wrapped>()?
        .build()?;

    module
        .register_class::<ContextualWrapper<BelSetHandle>>("BelSet")
        .set_proxy::<ConvToStr, ConvFromStr>()?
        .set_mutation::<ConvFromStr>()?
        .build()?;

    module
        .register_class::<ContextualWrapper<WireSetHandle>>("WireSet")
        .set_proxy::<ConvToStr, ConvFromStr>()?
        .set_mutation::<ConvFromStr>()?
        .build()
}

fn register_functions<F: ArchFamily>(module: &mut Module) -> Result<(), RegistrationError> {
    module.function("parse_json", 2, |call| {
        let filename: String = call.arg(0)?;
        let ctx = ContextualWrapper::<ContextHandle>::from_dynamic(call.arg_slot(1)?)?;
        design::parse_json_file(Path::new(&filename), ctx.context_mut(call.heap_mut())?)
    })?;

    module.function("load_design", 2, |call| {
        let filename: String = call.arg(0)?;
        let args = arch_args::<F>(call.arg_slot(1)?)?;
        let ctx = design::load_design::<F>(Path::new(&filename), &args)?;
        let db = call.heap_mut().allocate(ctx);
        call.set_return_slot(Dynamic::Object(db));
        Ok(())
    })
}

/// `None` selects the family's default device.
fn arch_args<F: ArchFamily>(slot: &Dynamic) -> Result<F::Args, NativeError> {
    match slot {
        Dynamic::Void | Dynamic::NullHandle => Ok(F::Args::default()),
        Dynamic::Native(native) => native.cloned::<F::Args>().ok_or_else(|| {
            ConversionError::TypeMismatch {
                expected: "ArchArgs",
                actual: native.type_name(),
            }
            .into()
        }),
        other => Err(ConversionError::TypeMismatch {
            expected: "ArchArgs",
            actual: other.type_name(),
        }
        .into()),
    }
}
