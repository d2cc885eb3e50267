use crate::{
    data_type::{DataType, Range, TransformOp},
    schema::{Field, FieldKind, File, TypeKind},
};

const SEED: u64 = 0xcbf2_9ce4_8422_2325;
const PRIME: u64 = 0x0000_0100_0000_01b3;

/// Accumulates schema features into a 64-bit fingerprint.
///
/// Every feature is mixed in as `h = h * PRIME + feature` with wrapping
/// arithmetic. Strings are first reduced to their own FNV-1a digest.
#[derive(Debug, Clone, Copy)]
pub struct HashGenerator {
    hash: u64,
}

impl Default for HashGenerator {
    fn default() -> Self {
        HashGenerator::new()
    }
}

impl HashGenerator {
    pub fn new() -> HashGenerator {
        HashGenerator { hash: SEED }
    }

    pub fn add_u64(&mut self, feature: u64) {
        self.hash = self.hash.wrapping_mul(PRIME).wrapping_add(feature);
    }

    pub fn add_i64(&mut self, feature: i64) {
        self.add_u64(feature as u64);
    }

    pub fn add_f64(&mut self, feature: f64) {
        self.add_u64(feature.to_bits());
    }

    pub fn add_usize(&mut self, feature: usize) {
        self.add_u64(feature as u64);
    }

    pub fn add_str(&mut self, feature: &str) {
        self.add_bytes(feature.as_bytes());
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) {
        let digest = bytes.iter().fold(SEED, |h, b| (h ^ *b as u64).wrapping_mul(PRIME));
        self.add_u64(digest);
    }

    pub fn finish(&self) -> u64 {
        self.hash
    }
}

/// Computes the hash of a compiled schema. Two Files built from the same
/// source text always hash equal.
pub fn hash(file: &File) -> u64 {
    let mut h = HashGenerator::new();

    h.add_usize(file.keywords().len());
    for keyword in file.keywords().iter() {
        h.add_str(keyword);
    }

    h.add_usize(file.types().len());
    for ty in file.types() {
        match &ty.kind {
            TypeKind::Struct => {
                h.add_u64(1);
                h.add_str(&ty.name);
            }
            TypeKind::Class { parents } => {
                h.add_u64(2);
                h.add_str(&ty.name);
                h.add_usize(parents.len());
                for parent in parents {
                    // Unresolved parents only exist in schemas that failed.
                    h.add_u64(parent.map_or(u64::MAX, |p| p.0 as u64));
                }
            }
        }
    }

    h.add_usize(file.fields().len());
    for field in file.fields() {
        if field.enclosing.is_none() {
            add_field(file, field, &mut h);
        }
    }

    h.finish()
}

fn add_field(file: &File, field: &Field, h: &mut HashGenerator) {
    h.add_u64(match field.kind {
        FieldKind::Parameter(_) => 1,
        FieldKind::Atomic { .. } => 2,
        FieldKind::Molecular { .. } => 3,
    });
    h.add_str(&field.name);
    h.add_usize(field.owner.0);

    h.add_usize(field.keywords.len());
    for keyword in file.keywords().iter() {
        if field.has_keyword(keyword) {
            h.add_str(keyword);
        }
    }

    match &field.kind {
        FieldKind::Parameter(param) => {
            add_data_type(&param.data_type, h);

            add_range(param.range, h);
            add_range(param.count, h);

            let ops = param.transform.as_ref().map_or(&[][..], |t| t.ops());
            h.add_usize(ops.len());
            for op in ops {
                let (tag, operand) = match *op {
                    TransformOp::Add(k) => (1, k),
                    TransformOp::Sub(k) => (2, k),
                    TransformOp::Mul(k) => (3, k),
                    TransformOp::Div(k) => (4, k),
                    TransformOp::Mod(k) => (5, k),
                };
                h.add_u64(tag);
                h.add_f64(operand);
            }

            match &param.default {
                Some(bytes) => {
                    h.add_u64(1);
                    h.add_bytes(bytes);
                }
                None => h.add_u64(0),
            }
        }
        FieldKind::Atomic { args } => {
            h.add_usize(args.len());
            for arg in args {
                add_field(file, file.field(*arg), h);
            }
        }
        FieldKind::Molecular { components } => {
            h.add_usize(components.len());
            for component in components {
                h.add_usize(component.0);
            }
        }
    }
}

fn add_range(range: Option<Range>, h: &mut HashGenerator) {
    match range {
        None => h.add_u64(0),
        Some(Range::Int { min, max }) => {
            h.add_u64(1);
            h.add_i64(min);
            h.add_i64(max);
        }
        Some(Range::Uint { min, max }) => {
            h.add_u64(2);
            h.add_u64(min);
            h.add_u64(max);
        }
        Some(Range::Float { min, max }) => {
            h.add_u64(3);
            h.add_f64(min);
            h.add_f64(max);
        }
        Some(Range::Length { min, max }) => {
            h.add_u64(4);
            h.add_u64(min);
            h.add_u64(max);
        }
    }
}

fn add_data_type(data_type: &DataType, h: &mut HashGenerator) {
    h.add_u64(data_type.tag() as u64);
    match data_type {
        DataType::Struct(id) => h.add_usize(id.0),
        DataType::Array(elem, len) => {
            h.add_usize(*len);
            add_data_type(elem, h);
        }
        DataType::VarArray(elem) => add_data_type(elem, h),
        _ => {}
    }
}

impl File {
    pub fn hash(&self) -> u64 {
        hash(self)
    }
}
