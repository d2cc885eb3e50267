use dclass_schema::CodecError;
use thiserror::Error;

use crate::diagnostic::Diagnostic;

#[derive(Debug, Error)]
pub enum DcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Syntax error in field data at offset {pos}: {msg}")]
    Syntax {
        msg: String,
        pos: usize,
    },

    #[error("Unknown name '{0}'")]
    UnknownName(String),

    #[error("Schema has {} errors, first: {}", .diagnostics.len(), first(.diagnostics))]
    InvalidSchema {
        diagnostics: Vec<Diagnostic>,
    },
}

fn first(diagnostics: &[Diagnostic]) -> String {
    diagnostics.first().map(ToString::to_string).unwrap_or_default()
}

impl DcError {
    pub fn syntax(msg: impl Into<String>, pos: usize) -> DcError {
        DcError::Syntax { msg: msg.into(), pos }
    }
}
