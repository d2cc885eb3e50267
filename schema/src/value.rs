use crate::{
    bb::{ByteBuffer, ByteBufferMut},
    data_type::{DataType, Range},
    error::CodecError,
    schema::{FieldId, FieldKind, File, Parameter},
};

use std::fmt::Write;

/// This type holds dynamic DC field data at the wire level.
///
/// Numbers are stored as they are packed, before any transform is applied.
/// `Tuple` holds the members of a struct, the arguments of an atomic field,
/// or the components of a molecular field, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Uint(u64),
    Float(f64),
    Char(u8),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    /// A short description of the value's shape, for error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Value::Int(_) => "a signed integer",
            Value::Uint(_) => "an unsigned integer",
            Value::Float(_) => "a float",
            Value::Char(_) => "a character",
            Value::Bytes(_) => "a byte string",
            Value::Array(_) => "an array",
            Value::Tuple(_) => "a value list",
        }
    }

    fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::Int(v) => Some(v as i128),
            Value::Uint(v) => Some(v as i128),
            _ => None,
        }
    }

    /// The zero value of `data_type`: numbers are 0, byte runs and unsized
    /// arrays are empty, fixed arrays and structs hold zero elements.
    pub fn zero(file: &File, data_type: &DataType) -> Value {
        match data_type {
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => Value::Int(0),
            DataType::Uint8 | DataType::Uint16 | DataType::Uint32 | DataType::Uint64 => {
                Value::Uint(0)
            }
            DataType::Float64 => Value::Float(0.0),
            DataType::Char => Value::Char(0),
            DataType::String | DataType::Blob => Value::Bytes(Vec::new()),
            DataType::VarArray(_) => Value::Array(Vec::new()),
            DataType::Array(elem, len) => Value::Array(vec![Value::zero(file, elem); *len]),
            DataType::Struct(id) => Value::Tuple(
                file.ty(*id)
                    .fields
                    .iter()
                    .filter_map(|f| file.field(*f).as_parameter())
                    .map(|p| Value::zero(file, &p.data_type))
                    .collect(),
            ),
            DataType::Invalid => Value::Tuple(Vec::new()),
        }
    }

    /// Decodes a value of `data_type` from `bb` starting at the current
    /// index. `name` is only used to label errors.
    pub fn decode_bb(
        file: &File,
        name: &str,
        data_type: &DataType,
        bb: &mut ByteBuffer,
    ) -> Result<Value, CodecError> {
        let end = || CodecError::UnexpectedEnd(name.to_owned());
        let value = match data_type {
            DataType::Int8 => Value::Int(bb.read_i8().map_err(|_| end())? as i64),
            DataType::Int16 => Value::Int(bb.read_i16().map_err(|_| end())? as i64),
            DataType::Int32 => Value::Int(bb.read_i32().map_err(|_| end())? as i64),
            DataType::Int64 => Value::Int(bb.read_i64().map_err(|_| end())?),
            DataType::Uint8 => Value::Uint(bb.read_byte().map_err(|_| end())? as u64),
            DataType::Uint16 => Value::Uint(bb.read_u16().map_err(|_| end())? as u64),
            DataType::Uint32 => Value::Uint(bb.read_u32().map_err(|_| end())? as u64),
            DataType::Uint64 => Value::Uint(bb.read_u64().map_err(|_| end())?),
            DataType::Float64 => Value::Float(bb.read_f64().map_err(|_| end())?),
            DataType::Char => Value::Char(bb.read_byte().map_err(|_| end())?),
            DataType::String | DataType::Blob => {
                Value::Bytes(bb.read_sized_bytes().map_err(|_| end())?.to_vec())
            }
            DataType::Array(elem, len) => {
                let mut array = Vec::with_capacity(*len);
                for _ in 0..*len {
                    array.push(Value::decode_bb(file, name, elem, bb)?);
                }
                Value::Array(array)
            }
            DataType::VarArray(elem) => {
                let len = bb.read_u16().map_err(|_| end())? as usize;
                let mut array = Vec::with_capacity(len.min(bb.remaining()));
                for _ in 0..len {
                    array.push(Value::decode_bb(file, name, elem, bb)?);
                }
                Value::Array(array)
            }
            DataType::Struct(id) => {
                let mut members = Vec::new();
                for f in &file.ty(*id).fields {
                    let field = file.field(*f);
                    if let Some(param) = field.as_parameter() {
                        members.push(Value::decode_bb(file, &field.name, &param.data_type, bb)?);
                    }
                }
                Value::Tuple(members)
            }
            DataType::Invalid => return Err(CodecError::InvalidType(name.to_owned())),
        };
        Ok(value)
    }

    /// Encodes this value to the end of `bb` as `param`'s data type,
    /// checking integer widths and the parameter's range.
    pub fn encode_bb(
        &self,
        file: &File,
        name: &str,
        param: &Parameter,
        bb: &mut ByteBufferMut,
    ) -> Result<(), CodecError> {
        if let Some(count) = &param.count {
            let len = match self {
                Value::Array(values) => Some(values.len()),
                Value::Bytes(bytes) if param.data_type.is_array() => Some(bytes.len()),
                _ => None,
            };
            if let Some(len) = len {
                if !count.contains_length(len) {
                    return Err(range_violation(name, format!("with {} elements", len), count));
                }
            }
        }
        self.encode_as(file, name, param, &param.data_type, bb)
    }

    fn encode_as(
        &self,
        file: &File,
        name: &str,
        param: &Parameter,
        data_type: &DataType,
        bb: &mut ByteBufferMut,
    ) -> Result<(), CodecError> {
        let mismatch = |expected: &str| CodecError::TypeMismatch {
            name:     name.to_owned(),
            expected: expected.to_owned(),
            found:    self.describe().to_owned(),
        };

        match (data_type, self) {
            (DataType::Invalid, _) => return Err(CodecError::InvalidType(name.to_owned())),

            (dt, Value::Int(_) | Value::Uint(_)) if dt.is_integer() => {
                let wide = self.as_i128().unwrap_or_default();
                let (min, max) = dt.int_bounds().unwrap_or((0, 0));
                if wide < min || wide > max {
                    return Err(CodecError::OutOfBounds {
                        name:      name.to_owned(),
                        value:     wide.to_string(),
                        data_type: dt.to_string(),
                    });
                }
                check_modulus(name, param, wide as f64)?;
                check_numeric_range(name, param, wide)?;
                match dt {
                    DataType::Int8 => bb.write_i8(wide as i8),
                    DataType::Int16 => bb.write_i16(wide as i16),
                    DataType::Int32 => bb.write_i32(wide as i32),
                    DataType::Int64 => bb.write_i64(wide as i64),
                    DataType::Uint8 => bb.write_byte(wide as u8),
                    DataType::Uint16 => bb.write_u16(wide as u16),
                    DataType::Uint32 => bb.write_u32(wide as u32),
                    _ => bb.write_u64(wide as u64),
                }
            }

            (DataType::Float64, Value::Float(v)) => {
                if !v.is_finite() {
                    return Err(CodecError::NotFinite {
                        name:  name.to_owned(),
                        value: v.to_string(),
                    });
                }
                check_modulus(name, param, *v)?;
                let human = param.transform.as_ref().map_or(*v, |t| t.to_human(*v));
                if let Some(range) = &param.range {
                    if !range.contains_float(human) {
                        return Err(range_violation(name, human.to_string(), range));
                    }
                }
                bb.write_f64(*v);
            }
            (DataType::Float64, Value::Int(v)) => {
                return Value::Float(*v as f64).encode_as(file, name, param, data_type, bb)
            }
            (DataType::Float64, Value::Uint(v)) => {
                return Value::Float(*v as f64).encode_as(file, name, param, data_type, bb)
            }

            (DataType::Char, Value::Char(c)) => bb.write_byte(*c),

            (DataType::String | DataType::Blob, Value::Bytes(bytes)) => {
                if let Some(range) = &param.range {
                    if !range.contains_length(bytes.len()) {
                        return Err(range_violation(name, format!("of length {}", bytes.len()), range));
                    }
                }
                bb.write_sized_bytes(bytes)
                    .map_err(|_| CodecError::TooLong(name.to_owned()))?;
            }

            (DataType::Array(elem, len), Value::Array(values)) => {
                if values.len() != *len {
                    return Err(CodecError::WrongCount {
                        name:     name.to_owned(),
                        expected: *len,
                        found:    values.len(),
                    });
                }
                for value in values {
                    value.encode_as(file, name, param, elem, bb)?;
                }
            }
            (DataType::Array(_, _), Value::Bytes(bytes)) | (DataType::VarArray(_), Value::Bytes(bytes))
                if *data_type.element() == DataType::Char =>
            {
                let chars = Value::Array(bytes.iter().map(|b| Value::Char(*b)).collect());
                return chars.encode_as(file, name, param, data_type, bb);
            }

            (DataType::VarArray(elem), Value::Array(values)) => {
                let len = u16::try_from(values.len())
                    .map_err(|_| CodecError::TooLong(name.to_owned()))?;
                bb.write_u16(len);
                for value in values {
                    value.encode_as(file, name, param, elem, bb)?;
                }
            }

            (DataType::Struct(id), Value::Tuple(values)) => {
                let members: Vec<_> = file
                    .ty(*id)
                    .fields
                    .iter()
                    .map(|f| file.field(*f))
                    .filter(|f| f.as_parameter().is_some())
                    .collect();
                if members.len() != values.len() {
                    return Err(CodecError::WrongCount {
                        name:     name.to_owned(),
                        expected: members.len(),
                        found:    values.len(),
                    });
                }
                for (member, value) in members.into_iter().zip(values) {
                    if let Some(member_param) = member.as_parameter() {
                        value.encode_bb(file, &member.name, member_param, bb)?;
                    }
                }
            }

            (dt, _) => return Err(mismatch(&expected_shape(dt))),
        }
        Ok(())
    }
}

fn expected_shape(data_type: &DataType) -> String {
    match data_type {
        DataType::Array(..) | DataType::VarArray(_) => "an array".to_owned(),
        DataType::Struct(_) => "a struct value list".to_owned(),
        dt => format!("a {} value", dt),
    }
}

fn range_violation(name: &str, value: String, range: &Range) -> CodecError {
    CodecError::RangeViolation {
        name: name.to_owned(),
        value,
        range: range.to_string(),
    }
}

fn check_modulus(name: &str, param: &Parameter, wire: f64) -> Result<(), CodecError> {
    match &param.transform {
        Some(transform) if transform.wraps(wire) => Err(CodecError::Unwrapped {
            name:  name.to_owned(),
            value: transform.to_human(wire).to_string(),
        }),
        _ => Ok(()),
    }
}

/// Integer range check. With a transform the range is on the human value.
fn check_numeric_range(name: &str, param: &Parameter, wide: i128) -> Result<(), CodecError> {
    let Some(range) = &param.range else {
        return Ok(());
    };
    let ok = match (&param.transform, range) {
        (Some(transform), _) => range.contains_float(transform.to_human(wide as f64)),
        (None, Range::Int { .. }) => range.contains_signed(wide as i64),
        (None, Range::Uint { .. }) => range.contains_unsigned(wide as u64),
        (None, _) => true,
    };
    if ok {
        Ok(())
    } else {
        let shown = match &param.transform {
            Some(transform) => transform.to_human(wide as f64).to_string(),
            None => wide.to_string(),
        };
        Err(range_violation(name, shown, range))
    }
}

/// Appends `bytes` as a quoted literal using the escapes the lexer accepts.
pub fn write_quoted(out: &mut String, bytes: &[u8], quote: char) {
    out.push(quote);
    for &b in bytes {
        match b {
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            b'\\' => out.push_str("\\\\"),
            b'"' if quote == '"' => out.push_str("\\\""),
            b'\'' if quote == '\'' => out.push_str("\\'"),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\x{:02x}", b);
            }
        }
    }
    out.push(quote);
}

impl File {
    /// Packs `value` as the data of `field`: a parameter's value, an atomic
    /// field's argument tuple, or a molecular field's component tuple.
    pub fn pack(&self, field: FieldId, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut bb = ByteBufferMut::new();
        self.pack_bb(field, value, &mut bb)?;
        Ok(bb.data())
    }

    fn pack_bb(&self, id: FieldId, value: &Value, bb: &mut ByteBufferMut) -> Result<(), CodecError> {
        let field = self.get_field(id).ok_or(CodecError::UnknownField(id.0))?;
        match &field.kind {
            FieldKind::Parameter(param) => value.encode_bb(self, &field.name, param, bb),
            FieldKind::Atomic { args: nested } | FieldKind::Molecular { components: nested } => {
                let Value::Tuple(values) = value else {
                    return Err(CodecError::TypeMismatch {
                        name:     field.name.clone(),
                        expected: "a value list".to_owned(),
                        found:    value.describe().to_owned(),
                    });
                };
                if values.len() != nested.len() {
                    return Err(CodecError::WrongCount {
                        name:     field.name.clone(),
                        expected: nested.len(),
                        found:    values.len(),
                    });
                }
                for (nested_id, value) in nested.iter().zip(values) {
                    self.pack_bb(*nested_id, value, bb)?;
                }
                Ok(())
            }
        }
    }

    /// Unpacks the data of `field`; every byte must be consumed.
    pub fn unpack(&self, field: FieldId, data: &[u8]) -> Result<Value, CodecError> {
        let mut bb = ByteBuffer::new(data);
        let value = self.unpack_bb(field, &mut bb)?;
        if bb.remaining() > 0 {
            return Err(CodecError::TrailingBytes(bb.remaining()));
        }
        Ok(value)
    }

    fn unpack_bb(&self, id: FieldId, bb: &mut ByteBuffer) -> Result<Value, CodecError> {
        let field = self.get_field(id).ok_or(CodecError::UnknownField(id.0))?;
        match &field.kind {
            FieldKind::Parameter(param) => Value::decode_bb(self, &field.name, &param.data_type, bb),
            FieldKind::Atomic { args: nested } | FieldKind::Molecular { components: nested } => {
                let mut values = Vec::with_capacity(nested.len());
                for nested_id in nested {
                    values.push(self.unpack_bb(*nested_id, bb)?);
                }
                Ok(Value::Tuple(values))
            }
        }
    }

    /// The packed default of a parameter: the written default, or the zero
    /// value of its type. Other field kinds pack their nested defaults.
    pub fn default_value(&self, id: FieldId) -> Result<Vec<u8>, CodecError> {
        let field = self.get_field(id).ok_or(CodecError::UnknownField(id.0))?;
        match &field.kind {
            FieldKind::Parameter(param) => match &param.default {
                Some(bytes) => Ok(bytes.clone()),
                None => {
                    let zero = Value::zero(self, &param.data_type);
                    let mut bb = ByteBufferMut::new();
                    zero.encode_bb(self, &field.name, &Parameter::new(param.data_type.clone()), &mut bb)?;
                    Ok(bb.data())
                }
            },
            FieldKind::Atomic { args: nested } | FieldKind::Molecular { components: nested } => {
                let mut out = Vec::new();
                for nested_id in nested {
                    out.extend(self.default_value(*nested_id)?);
                }
                Ok(out)
            }
        }
    }

    /// Formats packed field data as text in the literal syntax the compiler
    /// reads back. With `show_field_names` each value is written
    /// `name = value`.
    pub fn format_data(
        &self,
        field: FieldId,
        data: &[u8],
        show_field_names: bool,
    ) -> Result<String, CodecError> {
        let value = self.unpack(field, data)?;
        let mut out = String::new();
        self.write_field(field, &value, show_field_names, true, &mut out);
        Ok(out)
    }

    fn write_field(&self, id: FieldId, value: &Value, names: bool, top: bool, out: &mut String) {
        let field = self.field(id);
        match (&field.kind, value) {
            (FieldKind::Parameter(param), _) => {
                if names && !field.name.is_empty() {
                    let _ = write!(out, "{} = ", field.name);
                }
                self.write_value(param, &param.data_type, value, names, out);
            }
            (FieldKind::Atomic { args: nested } | FieldKind::Molecular { components: nested }, Value::Tuple(values)) => {
                // Only the outermost list is bare; an atomic component of a
                // molecular field is written as a parenthesized arg list.
                if !top {
                    if names {
                        let _ = write!(out, "{} = ", field.name);
                    }
                    out.push('(');
                }
                for (i, (nested_id, nested_value)) in nested.iter().zip(values).enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_field(*nested_id, nested_value, names, false, out);
                }
                if !top {
                    out.push(')');
                }
            }
            _ => {}
        }
    }

    fn write_value(&self, param: &Parameter, data_type: &DataType, value: &Value, names: bool, out: &mut String) {
        match (data_type, value) {
            (_, Value::Int(v)) => match &param.transform {
                Some(t) => {
                    let _ = write!(out, "{}", t.to_human(*v as f64));
                }
                None => {
                    let _ = write!(out, "{}", v);
                }
            },
            (_, Value::Uint(v)) => match &param.transform {
                Some(t) => {
                    let _ = write!(out, "{}", t.to_human(*v as f64));
                }
                None => {
                    let _ = write!(out, "{}", v);
                }
            },
            (_, Value::Float(v)) => {
                let human = param.transform.as_ref().map_or(*v, |t| t.to_human(*v));
                let _ = write!(out, "{}", human);
            }
            (_, Value::Char(c)) => write_quoted(out, &[*c], '\''),
            (_, Value::Bytes(bytes)) => write_quoted(out, bytes, '"'),
            (DataType::Array(elem, _) | DataType::VarArray(elem), Value::Array(values)) => {
                if **elem == DataType::Char {
                    let bytes: Vec<u8> = values
                        .iter()
                        .map(|v| match v {
                            Value::Char(c) => *c,
                            _ => 0,
                        })
                        .collect();
                    write_quoted(out, &bytes, '"');
                    return;
                }
                out.push('(');
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_value(param, elem, v, names, out);
                }
                out.push(')');
            }
            (DataType::Struct(id), Value::Tuple(values)) => {
                out.push('(');
                let members = self
                    .ty(*id)
                    .fields
                    .iter()
                    .map(|f| self.field(*f))
                    .filter_map(|f| Some((f.name.as_str(), f.as_parameter()?)));
                for (i, ((member_name, member_param), v)) in members.zip(values).enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if names {
                        let _ = write!(out, "{} = ", member_name);
                    }
                    self.write_value(member_param, &member_param.data_type, v, names, out);
                }
                out.push(')');
            }
            _ => {}
        }
    }
}
