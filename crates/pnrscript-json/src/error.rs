use pnrscript_netlist::AssertionFailure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("{filename}: malformed JSON netlist: {source}")]
    Syntax {
        filename: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{filename}: netlist contains no modules")]
    NoModules { filename: String },

    #[error("{filename}: several modules and none marked as top")]
    NoTop { filename: String },

    #[error("{filename}: port '{port}' of '{owner}' has unknown direction '{direction}'")]
    BadDirection {
        filename: String,
        owner: String,
        port: String,
        direction: String,
    },

    #[error("{filename}: port '{port}' of cell '{cell}' has no direction")]
    MissingDirection {
        filename: String,
        cell: String,
        port: String,
    },

    #[error("{filename}: {message}")]
    Invalid { filename: String, message: String },

    #[error(transparent)]
    Netlist(#[from] AssertionFailure),
}
