use serde::Serialize;
use std::fmt;

use crate::schema::TypeId;

/// The declared type of a Parameter.
///
/// `Invalid` marks a struct reference that has not been resolved yet, or a
/// type that failed to parse. It never survives into a schema that compiled
/// without diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DataType {
    Invalid,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float64,
    String,
    Blob,
    Char,
    Struct(TypeId),
    Array(Box<DataType>, usize),
    VarArray(Box<DataType>),
}

impl DataType {
    pub fn is_signed(&self) -> bool {
        matches!(self, DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64)
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, DataType::Uint8 | DataType::Uint16 | DataType::Uint32 | DataType::Uint64)
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || *self == DataType::Float64
    }

    /// True for the byte-run types that carry a length prefix on the wire.
    pub fn is_sized(&self) -> bool {
        matches!(self, DataType::String | DataType::Blob)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, DataType::Array(..) | DataType::VarArray(_))
    }

    /// The type of a single element: the array's element type, or `self`.
    pub fn element(&self) -> &DataType {
        match self {
            DataType::Array(elem, _) | DataType::VarArray(elem) => elem.element(),
            other => other,
        }
    }

    pub fn element_mut(&mut self) -> &mut DataType {
        match self {
            DataType::Array(elem, _) | DataType::VarArray(elem) => elem.element_mut(),
            other => other,
        }
    }

    /// Inclusive bounds of an integer type.
    pub fn int_bounds(&self) -> Option<(i128, i128)> {
        let bounds = match self {
            DataType::Int8 => (i8::MIN as i128, i8::MAX as i128),
            DataType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            DataType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            DataType::Int64 => (i64::MIN as i128, i64::MAX as i128),
            DataType::Uint8 => (0, u8::MAX as i128),
            DataType::Uint16 => (0, u16::MAX as i128),
            DataType::Uint32 => (0, u32::MAX as i128),
            DataType::Uint64 => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(bounds)
    }

    /// Stable numeric tag used by the schema hash.
    pub fn tag(&self) -> u8 {
        match self {
            DataType::Invalid => 0,
            DataType::Int8 => 1,
            DataType::Int16 => 2,
            DataType::Int32 => 3,
            DataType::Int64 => 4,
            DataType::Uint8 => 5,
            DataType::Uint16 => 6,
            DataType::Uint32 => 7,
            DataType::Uint64 => 8,
            DataType::Float64 => 9,
            DataType::String => 10,
            DataType::Blob => 11,
            DataType::Char => 12,
            DataType::Struct(_) => 13,
            DataType::Array(..) => 14,
            DataType::VarArray(_) => 15,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Invalid => write!(f, "<invalid>"),
            DataType::Int8 => write!(f, "int8"),
            DataType::Int16 => write!(f, "int16"),
            DataType::Int32 => write!(f, "int32"),
            DataType::Int64 => write!(f, "int64"),
            DataType::Uint8 => write!(f, "uint8"),
            DataType::Uint16 => write!(f, "uint16"),
            DataType::Uint32 => write!(f, "uint32"),
            DataType::Uint64 => write!(f, "uint64"),
            DataType::Float64 => write!(f, "float64"),
            DataType::String => write!(f, "string"),
            DataType::Blob => write!(f, "blob"),
            DataType::Char => write!(f, "char"),
            DataType::Struct(id) => write!(f, "struct #{}", id.0),
            DataType::Array(elem, len) => write!(f, "{}[{}]", elem, len),
            DataType::VarArray(elem) => write!(f, "{}[]", elem),
        }
    }
}

/// A min/max constraint on a Parameter's values.
///
/// For arrays the range applies to every element; a bound on the number of
/// elements is kept separately as a `Length` count. `Float` is used for
/// `float64` and for any integer type carrying a [`Transform`], in which case
/// the bounds are compared against the transformed (human) value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Range {
    Int { min: i64, max: i64 },
    Uint { min: u64, max: u64 },
    Float { min: f64, max: f64 },
    Length { min: u64, max: u64 },
}

impl Range {
    pub fn contains_signed(&self, value: i64) -> bool {
        match *self {
            Range::Int { min, max } => min <= value && value <= max,
            _ => true,
        }
    }

    pub fn contains_unsigned(&self, value: u64) -> bool {
        match *self {
            Range::Uint { min, max } => min <= value && value <= max,
            _ => true,
        }
    }

    pub fn contains_float(&self, value: f64) -> bool {
        match *self {
            Range::Float { min, max } => min <= value && value <= max,
            _ => true,
        }
    }

    pub fn contains_length(&self, len: usize) -> bool {
        match *self {
            Range::Length { min, max } => min <= len as u64 && len as u64 <= max,
            _ => true,
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Range::Int { min, max } => write!(f, "({} - {})", min, max),
            Range::Uint { min, max } | Range::Length { min, max } => {
                write!(f, "({} - {})", min, max)
            }
            Range::Float { min, max } => write!(f, "({} - {})", min, max),
        }
    }
}

/// One arithmetic step of a [`Transform`], written `<op> <operand>` after the
/// data type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TransformOp {
    Add(f64),
    Sub(f64),
    Mul(f64),
    Div(f64),
    Mod(f64),
}

impl TransformOp {
    /// One step from the human value toward the wire value.
    fn invert(self, value: f64) -> f64 {
        match self {
            TransformOp::Add(k) => value - k,
            TransformOp::Sub(k) => value + k,
            TransformOp::Mul(k) => value / k,
            TransformOp::Div(k) => value * k,
            TransformOp::Mod(k) => value.rem_euclid(k),
        }
    }
}

/// Conversion between the packed wire number and the value a human reads and
/// writes. The ops are listed in wire-to-human order; `Mod` only wraps values
/// on the way to the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transform {
    ops: Vec<TransformOp>,
}

impl Transform {
    pub fn new() -> Transform {
        Transform { ops: Vec::new() }
    }

    pub fn push(&mut self, op: TransformOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[TransformOp] {
        &self.ops
    }

    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn to_human(&self, wire: f64) -> f64 {
        self.ops.iter().fold(wire, |value, op| match *op {
            TransformOp::Add(k) => value + k,
            TransformOp::Sub(k) => value - k,
            TransformOp::Mul(k) => value * k,
            TransformOp::Div(k) => value / k,
            TransformOp::Mod(_) => value,
        })
    }

    pub fn to_wire(&self, human: f64) -> f64 {
        self.ops.iter().rev().fold(human, |value, op| op.invert(value))
    }

    /// Whether a `Mod` step would change `wire` on its way back from the
    /// human value. Such values cannot be written by a human and are
    /// refused when packing.
    pub fn wraps(&self, wire: f64) -> bool {
        let mut value = self.to_human(wire);
        for op in self.ops.iter().rev() {
            if let TransformOp::Mod(k) = *op {
                if value.rem_euclid(k) != value {
                    return true;
                }
            }
            value = op.invert(value);
        }
        false
    }
}
