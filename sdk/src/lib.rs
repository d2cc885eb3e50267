//! dclass
//!
//! Facade over the DC schema compiler and the field codec.
//!
//! - `compile` / `compile_schema` / `load` (re-exported from the compiler)
//! - `File`, `Value` and the schema model (re-exported from dclass-schema)
//! - `schema_to_json` for dumping a compiled schema
//! - `report::render` for printing diagnostics

use std::path::Path;

pub use dclass_compiler::{compile, compile_schema, format, hash, parse, Category, DcError, Diagnostic};
pub use dclass_schema::{CodecError, DataType, Field, FieldId, FieldKind, File, Type, TypeId, Value};

pub mod report;

/// Reads and compiles a `.dc` file.
pub fn load(path: impl AsRef<Path>) -> Result<File, DcError> {
    dclass_compiler::compile_path(path)
}

/// Finds a field by a `Type.field` path, searching the type's inherited
/// fields.
pub fn lookup(file: &File, path: &str) -> Result<FieldId, DcError> {
    let unknown = || DcError::UnknownName(path.to_owned());
    let (ty, field) = path.split_once('.').ok_or_else(unknown)?;
    let ty = file.type_by_name(ty).ok_or_else(unknown)?;
    file.find_field(ty, field).ok_or_else(unknown)
}

/// Pretty-prints a compiled schema as JSON.
pub fn schema_to_json(file: &File) -> String {
    // Serializing the owned model cannot fail: every map key is a string.
    serde_json::to_string_pretty(file).unwrap_or_default()
}

pub mod error {
    pub use dclass_compiler::DcError;
    pub use dclass_schema::CodecError;
}
