//! Yosys JSON netlist front end.
//!
//! [`parse_json`] reads the top module of a `write_json` netlist into an
//! existing [`Context`]: one cell per instance, one net per connected bit,
//! an I/O buffer cell per top-level port bit, and a single hierarchy node for
//! the top module.

mod error;
mod schema;

use std::collections::BTreeMap;
use std::io::Read;

use pnrscript_netlist::{Context, HierarchicalCell, IdString, PortType, Property};
use tracing::{debug, info};

pub use error::JsonError;
use schema::{AttrValue, Bit, Module, Netlist};

/// Net names used for constant `"0"` and `"1"` bits.
pub const GND_NET: &str = "$PACKER_GND_NET";
pub const VCC_NET: &str = "$PACKER_VCC_NET";

/// Parse a JSON netlist from `reader` into `ctx`.
///
/// `filename` is only used in error messages.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn parse_json<R: Read>(reader: R, filename: &str, ctx: &mut Context) -> Result<(), JsonError> {
    let netlist: Netlist = serde_json::from_reader(reader).map_err(|source| JsonError::Syntax {
        filename: filename.to_owned(),
        source,
    })?;
    let (top_name, top) = select_top(&netlist, filename)?;
    info!(file = filename, module = top_name, "importing netlist");

    let mut importer = Importer {
        ctx,
        filename,
        nets: BTreeMap::new(),
    };
    importer.import(top_name, top)
}

fn select_top<'n>(netlist: &'n Netlist, filename: &str) -> Result<(&'n str, &'n Module), JsonError> {
    let marked: Vec<_> = netlist
        .modules
        .iter()
        .filter(|(_, m)| m.attributes.get("top").is_some_and(AttrValue::is_true))
        .map(|(name, module)| (name.as_str(), module))
        .collect();
    match (marked.as_slice(), netlist.modules.len()) {
        ([(name, module)], _) => Ok((*name, *module)),
        ([], 1) => netlist
            .modules
            .iter()
            .next()
            .map(|(name, module)| (name.as_str(), module))
            .ok_or_else(|| JsonError::NoModules {
                filename: filename.to_owned(),
            }),
        ([], 0) => Err(JsonError::NoModules {
            filename: filename.to_owned(),
        }),
        _ => Err(JsonError::NoTop {
            filename: filename.to_owned(),
        }),
    }
}

struct Importer<'c, 'f> {
    ctx: &'c mut Context,
    filename: &'f str,
    /// Yosys bit index to net name.
    nets: BTreeMap<i64, IdString>,
}

impl Importer<'_, '_> {
    fn import(&mut self, top_name: &str, top: &Module) -> Result<(), JsonError> {
        let top_id = self.ctx.id(top_name);
        self.ctx.top_module = top_id;
        for (key, value) in &top.attributes {
            let key = self.ctx.id(key);
            self.ctx.attrs.insert(key, value.to_property());
        }

        self.name_nets(top)?;

        let mut leaf_cells = Vec::new();
        for (name, cell) in &top.cells {
            let cell_id = self.ctx.id(name);
            let type_id = self.ctx.id(&cell.cell_type);
            self.ctx.create_cell(cell_id, type_id)?;
            self.import_props(cell_id, &cell.parameters, &cell.attributes);

            for (port, bits) in &cell.connections {
                let Some(direction) = cell.port_directions.get(port) else {
                    return Err(JsonError::MissingDirection {
                        filename: self.filename.to_owned(),
                        cell: name.clone(),
                        port: port.clone(),
                    });
                };
                let port_type = self.port_type(direction, name, port)?;
                for (i, bit) in bits.iter().enumerate() {
                    let port_name = bus_name(port, i, bits.len());
                    let port_id = self.ctx.id(&port_name);
                    self.add_port(cell_id, port_id, port_type);
                    if let Some(net) = self.net_for(bit)? {
                        self.ctx.connect_port(net, cell_id, port_id)?;
                    }
                }
            }
            leaf_cells.push(cell_id);
        }
        debug!(cells = top.cells.len(), nets = self.ctx.nets.len(), "imported cells");

        for (port, info) in &top.ports {
            let port_type = self.port_type(&info.direction, top_name, port)?;
            for (i, bit) in info.bits.iter().enumerate() {
                let Some(net) = self.net_for(bit)? else {
                    continue;
                };
                let name = self.ctx.id(&bus_name(port, i, info.bits.len()));
                self.insert_io_buffer(name, port_type, net)?;
                leaf_cells.push(name);
            }
        }

        let mut node = HierarchicalCell {
            name: top_id,
            cell_type: top_id,
            parent: IdString::EMPTY,
            fullpath: top_id,
            ..HierarchicalCell::default()
        };
        node.leaf_cells = leaf_cells.into_iter().map(|c| (c, c)).collect();
        node.nets = self.ctx.nets.keys().map(|n| (*n, *n)).collect();
        self.ctx.hierarchy.insert(top_id, node);
        Ok(())
    }

    /// Give every named bit its net name; visible names win over hidden ones.
    fn name_nets(&mut self, top: &Module) -> Result<(), JsonError> {
        let visible = top.netnames.iter().filter(|(_, n)| n.hide_name == 0);
        let hidden = top.netnames.iter().filter(|(_, n)| n.hide_name != 0);
        for (name, netname) in visible.chain(hidden) {
            let attrs: Vec<_> = netname
                .attributes
                .iter()
                .map(|(k, v)| (self.ctx.id(k), v.to_property()))
                .collect();
            for (i, bit) in netname.bits.iter().enumerate() {
                let Bit::Net(index) = bit else {
                    continue;
                };
                if self.nets.contains_key(index) {
                    continue;
                }
                let net_id = self.ctx.id(&bus_name(name, i, netname.bits.len()));
                let net = self.ctx.create_net(net_id)?;
                net.attrs.extend(attrs.iter().cloned());
                self.nets.insert(*index, net_id);
            }
        }
        Ok(())
    }

    fn import_props(
        &mut self,
        cell: IdString,
        params: &BTreeMap<String, AttrValue>,
        attrs: &BTreeMap<String, AttrValue>,
    ) {
        let params: Vec<_> = params.iter().map(|(k, v)| (self.ctx.id(k), v.to_property())).collect();
        let attrs: Vec<_> = attrs.iter().map(|(k, v)| (self.ctx.id(k), v.to_property())).collect();
        if let Some(info) = self.ctx.cells.get_mut(&cell) {
            info.params.extend(params);
            info.attrs.extend(attrs);
        }
    }

    fn add_port(&mut self, cell: IdString, port: IdString, port_type: PortType) {
        if let Some(info) = self.ctx.cells.get_mut(&cell) {
            match port_type {
                PortType::In => info.add_input(port),
                PortType::Out => info.add_output(port),
                PortType::Inout => info.add_inout(port),
            }
        }
    }

    fn port_type(&self, direction: &str, owner: &str, port: &str) -> Result<PortType, JsonError> {
        match direction {
            "input" => Ok(PortType::In),
            "output" => Ok(PortType::Out),
            "inout" => Ok(PortType::Inout),
            other => Err(JsonError::BadDirection {
                filename: self.filename.to_owned(),
                owner: owner.to_owned(),
                port: port.to_owned(),
                direction: other.to_owned(),
            }),
        }
    }

    /// The net a bit belongs to, creating anonymous and constant nets on
    /// first use. `x` and `z` bits are unconnected.
    fn net_for(&mut self, bit: &Bit) -> Result<Option<IdString>, JsonError> {
        match bit {
            Bit::Net(index) => {
                if let Some(net) = self.nets.get(index) {
                    return Ok(Some(*net));
                }
                let net = self.ctx.id(&format!("$net${index}"));
                self.ctx.create_net(net)?;
                self.nets.insert(*index, net);
                Ok(Some(net))
            }
            Bit::Const(value) => match value.as_str() {
                "0" => self.constant_net(GND_NET, "GND").map(Some),
                "1" => self.constant_net(VCC_NET, "VCC").map(Some),
                "x" | "z" => Ok(None),
                other => Err(self.invalid(&format!("unknown constant bit '{other}'"))),
            },
        }
    }

    /// A constant net with its driver cell, created once.
    fn constant_net(&mut self, net_name: &str, cell_type: &str) -> Result<IdString, JsonError> {
        let net = self.ctx.id(net_name);
        if self.ctx.nets.contains_key(&net) {
            return Ok(net);
        }
        self.ctx.create_net(net)?;
        let cell = self.ctx.id(&format!("$PACKER_{cell_type}"));
        let cell_type = self.ctx.id(cell_type);
        let output = self.ctx.id("Y");
        self.ctx.create_cell(cell, cell_type)?.add_output(output);
        self.ctx.connect_port(net, cell, output)?;
        Ok(net)
    }

    fn insert_io_buffer(
        &mut self,
        name: IdString,
        port_type: PortType,
        net: IdString,
    ) -> Result<(), JsonError> {
        let (buffer_type, port) = match port_type {
            PortType::In => ("$nextpnr_ibuf", "O"),
            PortType::Out => ("$nextpnr_obuf", "I"),
            PortType::Inout => ("$nextpnr_iobuf", "IO"),
        };
        let buffer_type = self.ctx.id(buffer_type);
        let port = self.ctx.id(port);
        let cell = self.ctx.create_cell(name, buffer_type)?;
        match port_type {
            PortType::In => cell.add_output(port),
            PortType::Out => cell.add_input(port),
            PortType::Inout => cell.add_inout(port),
        }
        self.ctx.connect_port(net, name, port)?;
        Ok(())
    }

    fn invalid(&self, message: &str) -> JsonError {
        JsonError::Invalid {
            filename: self.filename.to_owned(),
            message: message.to_owned(),
        }
    }
}

/// `name` for single-bit ports and nets, `name[i]` for buses.
fn bus_name(name: &str, index: usize, width: usize) -> String {
    if width == 1 {
        name.to_owned()
    } else {
        format!("{name}[{index}]")
    }
}

impl AttrValue {
    fn to_property(&self) -> Property {
        match self {
            AttrValue::Int(v) => Property::from_int(*v, 32),
            AttrValue::Str(s) => Property::from_string(s),
        }
    }

    fn is_true(&self) -> bool {
        self.to_property().as_bool()
    }
}
