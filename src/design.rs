//! Loading designs from JSON netlists.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use pnrscript_core::NativeError;
use pnrscript_json::parse_json;
use pnrscript_netlist::Context;
use tracing::info;

use crate::arch::ArchFamily;

/// Parse the netlist at `path` into an existing database.
///
/// Fails with [`NativeError::Io`] when the file cannot be opened; parse
/// failures are passed through unchanged.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn parse_json_file(path: &Path, ctx: &mut Context) -> Result<(), NativeError> {
    let file = File::open(path).map_err(|source| NativeError::Io {
        path: path.to_owned(),
        source,
    })?;
    parse_json(BufReader::new(file), &path.to_string_lossy(), ctx)?;
    Ok(())
}

/// Build a database for family `F` and load the netlist at `path` into it.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn load_design<F: ArchFamily>(path: &Path, args: &F::Args) -> Result<Context, NativeError> {
    let mut ctx = Context::new(F::create_arch(args));
    parse_json_file(path, &mut ctx)?;
    info!(
        path = %path.display(),
        family = F::NAME,
        cells = ctx.cells.len(),
        nets = ctx.nets.len(),
        "loaded design"
    );
    Ok(ctx)
}
