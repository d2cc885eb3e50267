use serde::Serialize;
use std::collections::HashMap;

use crate::{
    data_type::{DataType, Range, Transform},
    keyword::KeywordSet,
};

/// Index of a Class or Struct in its File's type list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeId(pub usize);

/// A field's File-wide number, which is also its index in the File's flat
/// field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FieldId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeKind {
    Struct,
    /// Parents in declaration order. A `None` slot is a forward reference the
    /// parser has not patched yet.
    Class { parents: Vec<Option<TypeId>> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Type {
    pub name:   String,
    pub id:     TypeId,
    pub line:   usize,
    pub kind:   TypeKind,
    /// Fields declared directly in this type, in declaration order.
    pub fields: Vec<FieldId>,
}

impl Type {
    pub fn is_class(&self) -> bool {
        matches!(self.kind, TypeKind::Class { .. })
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.kind, TypeKind::Struct)
    }

    /// The keyword that declares this kind of type.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            TypeKind::Struct => "struct",
            TypeKind::Class { .. } => "dclass",
        }
    }

    /// Resolved parents in declaration order.
    pub fn parents(&self) -> impl Iterator<Item = TypeId> + '_ {
        let parents: &[Option<TypeId>] = match &self.kind {
            TypeKind::Class { parents } => parents,
            TypeKind::Struct => &[],
        };
        parents.iter().flatten().copied()
    }
}

/// A typed value slot: a struct member, class member or function argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub data_type: DataType,
    pub range:     Option<Range>,
    /// Element-count bound of an array parameter, always `Range::Length`.
    pub count:     Option<Range>,
    pub transform: Option<Transform>,
    /// Packed bytes of the default written in the source, if any.
    pub default:   Option<Vec<u8>>,
}

impl Parameter {
    pub fn new(data_type: DataType) -> Parameter {
        Parameter {
            data_type,
            range: None,
            count: None,
            transform: None,
            default: None,
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldKind {
    Parameter(Parameter),
    /// A remote-invocable function and its ordered arguments.
    Atomic { args: Vec<FieldId> },
    /// A composite of earlier fields, packed back to back.
    Molecular { components: Vec<FieldId> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:      String,
    pub number:    FieldId,
    pub owner:     TypeId,
    /// The atomic field this argument belongs to, if it is one.
    pub enclosing: Option<FieldId>,
    pub line:      usize,
    pub keywords:  KeywordSet,
    pub kind:      FieldKind,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> usize {
        self.number.0
    }

    /// Arguments of an atomic field, components of a molecular field, and
    /// nothing for a parameter.
    pub fn nested_fields(&self) -> &[FieldId] {
        match &self.kind {
            FieldKind::Parameter(_) => &[],
            FieldKind::Atomic { args } => args,
            FieldKind::Molecular { components } => components,
        }
    }

    pub fn as_parameter(&self) -> Option<&Parameter> {
        match &self.kind {
            FieldKind::Parameter(param) => Some(param),
            _ => None,
        }
    }

    pub fn as_parameter_mut(&mut self) -> Option<&mut Parameter> {
        match &mut self.kind {
            FieldKind::Parameter(param) => Some(param),
            _ => None,
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self.kind, FieldKind::Atomic { .. })
    }

    pub fn is_molecular(&self) -> bool {
        matches!(self.kind, FieldKind::Molecular { .. })
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            FieldKind::Parameter(_) => "parameter",
            FieldKind::Atomic { .. } => "atomic field",
            FieldKind::Molecular { .. } => "molecular field",
        }
    }

    /// Whether a default value was written in the source.
    pub fn has_default_value(&self) -> bool {
        self.as_parameter().is_some_and(Parameter::has_default)
    }

    // Keyword queries only see keywords written on this field; implied
    // keywords are never added.

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.has(keyword)
    }

    pub fn is_required(&self) -> bool {
        self.has_keyword("required")
    }

    pub fn is_ram(&self) -> bool {
        self.has_keyword("ram")
    }

    pub fn is_broadcast(&self) -> bool {
        self.has_keyword("broadcast")
    }

    pub fn is_clrecv(&self) -> bool {
        self.has_keyword("clrecv")
    }

    pub fn is_clsend(&self) -> bool {
        self.has_keyword("clsend")
    }

    pub fn is_ownrecv(&self) -> bool {
        self.has_keyword("ownrecv")
    }

    pub fn is_ownsend(&self) -> bool {
        self.has_keyword("ownsend")
    }

    pub fn is_airecv(&self) -> bool {
        self.has_keyword("airecv")
    }

    pub fn is_db(&self) -> bool {
        self.has_keyword("db")
    }
}

/// The root of a compiled DC schema.
///
/// Types and fields live in flat arenas owned by the File and refer to each
/// other through [`TypeId`] and [`FieldId`] handles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct File {
    keywords: KeywordSet,
    types:    Vec<Type>,
    fields:   Vec<Field>,
    #[serde(skip)]
    type_by_name: HashMap<String, TypeId>,
}

impl Default for File {
    fn default() -> Self {
        File::new()
    }
}

impl File {
    /// An empty File that knows only the built-in keywords.
    pub fn new() -> File {
        File {
            keywords:     KeywordSet::builtin(),
            types:        Vec::new(),
            fields:       Vec::new(),
            type_by_name: HashMap::new(),
        }
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    /// Declares a keyword; returns false if it was already declared.
    pub fn add_keyword(&mut self, keyword: &str) -> bool {
        self.keywords.add(keyword)
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.has(keyword)
    }

    pub fn types(&self) -> &[Type] {
        &self.types
    }

    /// Panics if `id` did not come from this File.
    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.0]
    }

    pub fn get_type(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.0)
    }

    pub fn type_by_name(&self, name: &str) -> Option<TypeId> {
        self.type_by_name.get(name).copied()
    }

    pub fn add_struct(&mut self, name: &str, line: usize) -> TypeId {
        self.add_type(name, line, TypeKind::Struct)
    }

    pub fn add_class(&mut self, name: &str, line: usize) -> TypeId {
        self.add_type(name, line, TypeKind::Class { parents: Vec::new() })
    }

    fn add_type(&mut self, name: &str, line: usize, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len());
        self.types.push(Type {
            name: name.to_owned(),
            id,
            line,
            kind,
            fields: Vec::new(),
        });
        self.type_by_name.insert(name.to_owned(), id);
        id
    }

    /// Appends a parent slot to `class` and returns the slot index. Does
    /// nothing for structs.
    pub fn add_parent(&mut self, class: TypeId, parent: Option<TypeId>) -> usize {
        match &mut self.types[class.0].kind {
            TypeKind::Class { parents } => {
                parents.push(parent);
                parents.len() - 1
            }
            TypeKind::Struct => 0,
        }
    }

    /// Fills a parent slot left empty by a forward reference.
    pub fn set_parent(&mut self, class: TypeId, slot: usize, parent: TypeId) {
        if let TypeKind::Class { parents } = &mut self.types[class.0].kind {
            if let Some(entry) = parents.get_mut(slot) {
                *entry = Some(parent);
            }
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Panics if `id` did not come from this File.
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    pub fn get_field(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(id.0)
    }

    pub fn field_mut(&mut self, id: FieldId) -> &mut Field {
        &mut self.fields[id.0]
    }

    /// Creates a field numbered after every field created so far. Top-level
    /// fields are listed on their owner; arguments are listed on their
    /// enclosing atomic field.
    pub fn add_field(
        &mut self,
        owner: TypeId,
        enclosing: Option<FieldId>,
        name: &str,
        line: usize,
        kind: FieldKind,
    ) -> FieldId {
        let number = FieldId(self.fields.len());
        self.fields.push(Field {
            name: name.to_owned(),
            number,
            owner,
            enclosing,
            line,
            keywords: KeywordSet::new(),
            kind,
        });

        match enclosing {
            Some(atomic) => {
                if let FieldKind::Atomic { args } = &mut self.fields[atomic.0].kind {
                    args.push(number);
                }
            }
            None => self.types[owner.0].fields.push(number),
        }
        number
    }

    /// Every field visible on a type: each parent's view in declaration
    /// order, then the type's own fields. A field shared through more than
    /// one parent appears once.
    pub fn field_view(&self, id: TypeId) -> Vec<FieldId> {
        let mut view = Vec::new();
        let mut visiting = Vec::new();
        self.collect_fields(id, &mut view, &mut visiting);
        view
    }

    fn collect_fields(&self, id: TypeId, view: &mut Vec<FieldId>, visiting: &mut Vec<TypeId>) {
        if visiting.contains(&id) {
            return;
        }
        visiting.push(id);
        for parent in self.ty(id).parents() {
            self.collect_fields(parent, view, visiting);
        }
        for field in &self.ty(id).fields {
            if !view.contains(field) {
                view.push(*field);
            }
        }
        visiting.pop();
    }

    /// Looks a field up by name in a type's inherited view.
    pub fn find_field(&self, id: TypeId, name: &str) -> Option<FieldId> {
        self.field_view(id)
            .into_iter()
            .find(|f| self.field(*f).name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(file: &mut File, owner: TypeId, name: &str) -> FieldId {
        file.add_field(owner, None, name, 1, FieldKind::Parameter(Parameter::new(DataType::Int8)))
    }

    #[test]
    fn numbers_follow_creation_order() {
        let mut file = File::new();
        let a = file.add_struct("A", 1);
        let b = file.add_class("B", 2);
        let x = param(&mut file, a, "x");
        let f = file.add_field(b, None, "f", 3, FieldKind::Atomic { args: vec![] });
        let arg = file.add_field(b, Some(f), "arg", 3, FieldKind::Parameter(Parameter::new(DataType::Uint8)));
        let y = param(&mut file, b, "y");

        assert_eq!([x.0, f.0, arg.0, y.0], [0, 1, 2, 3]);
        assert_eq!(file.ty(b).fields, vec![f, y]);
        assert_eq!(file.field(f).nested_fields(), &[arg]);
        assert_eq!(file.type_by_name("B"), Some(b));
        assert_eq!(file.ty(a).kind_name(), "struct");
    }

    #[test]
    fn field_view_puts_parents_first() {
        let mut file = File::new();
        let base = file.add_class("Base", 1);
        let other = file.add_class("Other", 2);
        let child = file.add_class("Child", 3);
        let b = param(&mut file, base, "b");
        let o = param(&mut file, other, "o");
        let c = param(&mut file, child, "c");
        file.add_parent(child, Some(base));
        let slot = file.add_parent(child, None);
        file.set_parent(child, slot, other);

        assert_eq!(file.field_view(child), vec![b, o, c]);
        assert_eq!(file.find_field(child, "o"), Some(o));
        assert_eq!(file.find_field(base, "c"), None);
    }

    #[test]
    fn diamond_does_not_duplicate() {
        let mut file = File::new();
        let root = file.add_class("Root", 1);
        let left = file.add_class("Left", 2);
        let right = file.add_class("Right", 3);
        let leaf = file.add_class("Leaf", 4);
        let r = param(&mut file, root, "r");
        file.add_parent(left, Some(root));
        file.add_parent(right, Some(root));
        file.add_parent(leaf, Some(left));
        file.add_parent(leaf, Some(right));

        assert_eq!(file.field_view(leaf), vec![r]);
    }

    #[test]
    fn only_written_keywords_are_reported() {
        let mut file = File::new();
        let c = file.add_class("C", 1);
        let f = param(&mut file, c, "x");
        file.field_mut(f).keywords.add("broadcast");

        let field = file.field(f);
        assert!(field.is_broadcast());
        assert!(!field.is_required());
        assert!(!field.is_ram());
        assert!(!field.is_clrecv());
        assert!(!field.is_clsend());
        assert!(!field.is_ownrecv());
        assert!(!field.is_ownsend());
        assert!(!field.is_airecv());
        assert!(!field.is_db());
    }
}
