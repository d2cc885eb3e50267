use std::{fs, path::Path};

use dclass_schema::File;
use tracing::{debug, warn};

use crate::{
    diagnostic::{Category, Diagnostic},
    error::DcError,
    parser::Parser,
    verifier::verify_file,
};

/// Compiles DC source text. Always returns the File that was built, even
/// when diagnostics were produced; a File is only trustworthy when the
/// diagnostic list is empty.
pub fn compile(source: &str) -> (File, Vec<Diagnostic>) {
    let (file, mut diagnostics) = Parser::new(source).parse();
    debug!(
        types = file.types().len(),
        fields = file.fields().len(),
        diagnostics = diagnostics.len(),
        "parsed schema"
    );

    // Unresolved names already failed; the verifier only follows resolved
    // references, so it still runs.
    diagnostics.extend(verify_file(&file));

    // Lex and parse errors in the order they were found, then definition
    // errors. The sort is stable.
    diagnostics.sort_by_key(|d| d.category == Category::Definition);

    if !diagnostics.is_empty() {
        warn!(count = diagnostics.len(), "schema compiled with diagnostics");
    }
    (file, diagnostics)
}

/// Compiles DC source text, failing if any diagnostic was produced.
pub fn compile_schema(source: &str) -> Result<File, DcError> {
    let (file, diagnostics) = compile(source);
    if diagnostics.is_empty() {
        Ok(file)
    } else {
        Err(DcError::InvalidSchema { diagnostics })
    }
}

/// Reads and compiles a DC file.
pub fn compile_path(path: impl AsRef<Path>) -> Result<File, DcError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading dclass file");
    let source = fs::read_to_string(path)?;
    compile_schema(&source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_come_before_definition_errors() {
        let (_, diagnostics) = compile(
            "dclass A { int8 x; };\ndclass D : A { Missing m; int8 x; };\ndclass E : E {};",
        );
        let shown: Vec<_> = diagnostics.iter().map(ToString::to_string).collect();
        assert_eq!(
            shown,
            [
                "parse error(line: 3): dclass 'E' cannot inherit from itself",
                "parse error(line: 2): field 'x' in 'D' collides with a field inherited from 'A'",
                "definition error: used struct 'Missing', but 'Missing' was never defined (first used on line 2)",
            ]
        );
    }
}
