use std::collections::HashMap;

use dclass_schema::{DataType, FieldId, File, TypeId};
use tracing::debug;

use crate::diagnostic::Diagnostic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Active,
    Done,
}

/// Checks a parsed File for problems that need the whole schema: cycles in
/// class inheritance, field names that collide through inheritance, and
/// structs that contain themselves.
pub fn verify_file(file: &File) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let cyclic = check_inheritance(file, &mut diagnostics);
    for ty in file.types() {
        if ty.is_class() && !cyclic.contains(&ty.id) {
            check_collisions(file, ty.id, &mut diagnostics);
        }
    }
    check_recursion(file, &mut diagnostics);

    debug!(count = diagnostics.len(), "verified schema");
    diagnostics
}

/// Reports each inheritance cycle once and returns every type on one.
fn check_inheritance(file: &File, diagnostics: &mut Vec<Diagnostic>) -> Vec<TypeId> {
    fn visit(
        file: &File,
        id: TypeId,
        state: &mut HashMap<TypeId, Visit>,
        stack: &mut Vec<TypeId>,
        cyclic: &mut Vec<TypeId>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        match state.get(&id) {
            Some(Visit::Done) => return,
            Some(Visit::Active) => {
                let start = stack.iter().position(|t| *t == id).unwrap_or(0);
                let names: Vec<_> = stack[start..]
                    .iter()
                    .chain(std::iter::once(&id))
                    .map(|t| file.ty(*t).name.as_str())
                    .collect();
                let ty = file.ty(id);
                diagnostics.push(Diagnostic::definition(
                    format!("inheritance cycle: {}", names.join(" -> ")),
                    ty.line,
                ));
                cyclic.extend(&stack[start..]);
                return;
            }
            None => {}
        }

        state.insert(id, Visit::Active);
        stack.push(id);
        for parent in file.ty(id).parents() {
            visit(file, parent, state, stack, cyclic, diagnostics);
        }
        stack.pop();
        state.insert(id, Visit::Done);
    }

    let mut state = HashMap::new();
    let mut stack = Vec::new();
    let mut cyclic = Vec::new();
    for ty in file.types() {
        visit(file, ty.id, &mut state, &mut stack, &mut cyclic, diagnostics);
    }
    cyclic
}

/// A class's own fields may not reuse an inherited name, and two parents
/// may not contribute different fields with the same name.
fn check_collisions(file: &File, class: TypeId, diagnostics: &mut Vec<Diagnostic>) {
    let ty = file.ty(class);
    let mut inherited: HashMap<&str, (FieldId, TypeId)> = HashMap::new();

    for parent in ty.parents() {
        for field in file.field_view(parent) {
            let name = file.field(field).name.as_str();
            match inherited.get(name) {
                Some((existing, _)) if *existing == field => {}
                Some((_, other)) => diagnostics.push(Diagnostic::parse(
                    format!(
                        "field '{}' of '{}' is inherited from both '{}' and '{}'",
                        name,
                        ty.name,
                        file.ty(*other).name,
                        file.ty(parent).name
                    ),
                    ty.line,
                )),
                None => {
                    inherited.insert(name, (field, parent));
                }
            }
        }
    }

    for field in &ty.fields {
        let field = file.field(*field);
        if let Some((_, parent)) = inherited.get(field.name.as_str()) {
            diagnostics.push(Diagnostic::parse(
                format!(
                    "field '{}' in '{}' collides with a field inherited from '{}'",
                    field.name,
                    ty.name,
                    file.ty(*parent).name
                ),
                field.line,
            ));
        }
    }
}

/// A struct may only reach itself through an unsized array.
fn check_recursion(file: &File, diagnostics: &mut Vec<Diagnostic>) {
    fn visit(file: &File, id: TypeId, state: &mut HashMap<TypeId, Visit>, reported: &mut Vec<TypeId>) {
        match state.get(&id) {
            Some(Visit::Done) => return,
            Some(Visit::Active) => {
                if !reported.contains(&id) {
                    reported.push(id);
                }
                return;
            }
            None => {}
        }

        state.insert(id, Visit::Active);
        for field in &file.ty(id).fields {
            if let Some(param) = file.field(*field).as_parameter() {
                if let Some(nested) = embedded_struct(&param.data_type) {
                    visit(file, nested, state, reported);
                }
            }
        }
        state.insert(id, Visit::Done);
    }

    let mut state = HashMap::new();
    let mut reported = Vec::new();
    for ty in file.types() {
        if ty.is_struct() {
            visit(file, ty.id, &mut state, &mut reported);
        }
    }

    for id in reported {
        let ty = file.ty(id);
        diagnostics.push(Diagnostic::definition(
            format!("recursive nesting of '{}' is not allowed", ty.name),
            ty.line,
        ));
    }
}

/// The struct stored inline by a data type. Unsized arrays store nothing
/// inline.
fn embedded_struct(data_type: &DataType) -> Option<TypeId> {
    match data_type {
        DataType::Struct(id) => Some(*id),
        DataType::Array(elem, _) => embedded_struct(elem),
        _ => None,
    }
}
