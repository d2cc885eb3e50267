use dclass_schema::{ByteBufferMut, CodecError, DataType, FieldId, FieldKind, File, Parameter, Value};

use crate::{
    error::DcError,
    literal::{self, Element, Literal},
};

/// Formats packed data of `field` as text. See [`File::format_data`].
pub fn format(file: &File, field: FieldId, data: &[u8], show_field_names: bool) -> Result<String, DcError> {
    Ok(file.format_data(field, data, show_field_names)?)
}

/// Parses the text form of `field`'s data and packs it.
///
/// Accepts everything `format` produces, with or without field names, plus
/// integers in any radix and `true`/`false` for integer types.
pub fn parse(file: &File, field: FieldId, text: &str) -> Result<Vec<u8>, DcError> {
    let elements = literal::parse_text(text)?;
    let target = file.get_field(field).ok_or(CodecError::UnknownField(field.0))?;

    let value = match &target.kind {
        FieldKind::Parameter(_) => match elements.as_slice() {
            [element] => element_value(file, field, element)?,
            _ => {
                return Err(CodecError::WrongCount {
                    name:     target.name.clone(),
                    expected: 1,
                    found:    elements.len(),
                }
                .into())
            }
        },
        _ => nested_value(file, field, &elements)?,
    };

    Ok(file.pack(field, &value)?)
}

/// Converts an element written for `field`, checking its name if it has one.
fn element_value(file: &File, field: FieldId, element: &Element) -> Result<Value, CodecError> {
    let target = file.field(field);
    check_name(&target.name, element)?;
    match &target.kind {
        FieldKind::Parameter(param) => literal_value(file, &target.name, param, &element.value),
        FieldKind::Atomic { .. } | FieldKind::Molecular { .. } => match &element.value {
            Literal::List(elements) => nested_value(file, field, elements),
            other => Err(mismatch(&target.name, "a value list", other)),
        },
    }
}

fn nested_value(file: &File, field: FieldId, elements: &[Element]) -> Result<Value, CodecError> {
    let target = file.field(field);
    let nested = target.nested_fields();
    if nested.len() != elements.len() {
        return Err(CodecError::WrongCount {
            name:     target.name.clone(),
            expected: nested.len(),
            found:    elements.len(),
        });
    }
    let values = nested
        .iter()
        .zip(elements)
        .map(|(id, element)| element_value(file, *id, element))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Tuple(values))
}

fn check_name(expected: &str, element: &Element) -> Result<(), CodecError> {
    match &element.name {
        Some(name) if name != expected => Err(CodecError::TypeMismatch {
            name:     expected.to_owned(),
            expected: format!("a value for '{}'", expected),
            found:    format!("a value for '{}'", name),
        }),
        _ => Ok(()),
    }
}

fn mismatch(name: &str, expected: &str, found: &Literal) -> CodecError {
    CodecError::TypeMismatch {
        name:     name.to_owned(),
        expected: expected.to_owned(),
        found:    found.describe(),
    }
}

/// Converts a literal to the wire value of `param`. Numbers are read as
/// human values and pass through the parameter's transform.
pub fn literal_value(file: &File, name: &str, param: &Parameter, literal: &Literal) -> Result<Value, CodecError> {
    convert(file, name, param, &param.data_type, literal)
}

fn convert(
    file: &File,
    name: &str,
    param: &Parameter,
    data_type: &DataType,
    literal: &Literal,
) -> Result<Value, CodecError> {
    match data_type {
        DataType::Invalid => Err(CodecError::InvalidType(name.to_owned())),

        dt if dt.is_integer() => {
            let wide = match (&param.transform, literal) {
                (Some(transform), Literal::Number { .. }) => {
                    let human = literal
                        .as_float()
                        .ok_or_else(|| mismatch(name, &format!("a {} value", dt), literal))?;
                    transform.to_wire(human).round() as i128
                }
                _ => literal
                    .as_integer()
                    .ok_or_else(|| mismatch(name, &format!("a {} value", dt), literal))?,
            };
            if wide < 0 {
                i64::try_from(wide).map(Value::Int).map_err(|_| out_of_bounds(name, wide, dt))
            } else {
                u64::try_from(wide).map(Value::Uint).map_err(|_| out_of_bounds(name, wide, dt))
            }
        }

        DataType::Float64 => {
            let human = literal
                .as_float()
                .ok_or_else(|| mismatch(name, "a float64 value", literal))?;
            Ok(Value::Float(param.transform.as_ref().map_or(human, |t| t.to_wire(human))))
        }

        DataType::Char => match literal {
            Literal::Char(c) => Ok(Value::Char(*c)),
            other => Err(mismatch(name, "a character constant", other)),
        },

        DataType::String | DataType::Blob => match literal {
            Literal::Str(bytes) => Ok(Value::Bytes(bytes.clone())),
            other => Err(mismatch(name, "a quoted string", other)),
        },

        DataType::Array(elem, _) | DataType::VarArray(elem) => match literal {
            Literal::Str(bytes) if **elem == DataType::Char => Ok(Value::Bytes(bytes.clone())),
            Literal::List(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    if let Some(element_name) = &element.name {
                        return Err(CodecError::TypeMismatch {
                            name:     name.to_owned(),
                            expected: "an unnamed array element".to_owned(),
                            found:    format!("an element named '{}'", element_name),
                        });
                    }
                    values.push(convert(file, name, param, elem, &element.value)?);
                }
                Ok(Value::Array(values))
            }
            other => Err(mismatch(name, "an array", other)),
        },

        DataType::Struct(id) => {
            let Literal::List(elements) = literal else {
                return Err(mismatch(name, "a struct value list", literal));
            };
            let members: Vec<_> = file
                .ty(*id)
                .fields
                .iter()
                .map(|f| file.field(*f))
                .filter_map(|f| Some((f.name.as_str(), f.as_parameter()?)))
                .collect();
            if members.len() != elements.len() {
                return Err(CodecError::WrongCount {
                    name:     name.to_owned(),
                    expected: members.len(),
                    found:    elements.len(),
                });
            }
            let mut values = Vec::with_capacity(members.len());
            for ((member_name, member_param), element) in members.into_iter().zip(elements) {
                check_name(member_name, element)?;
                values.push(literal_value(file, member_name, member_param, &element.value)?);
            }
            Ok(Value::Tuple(values))
        }

        _ => Err(CodecError::InvalidType(name.to_owned())),
    }
}

fn out_of_bounds(name: &str, value: i128, data_type: &DataType) -> CodecError {
    CodecError::OutOfBounds {
        name:      name.to_owned(),
        value:     value.to_string(),
        data_type: data_type.to_string(),
    }
}

/// Packs a default value literal for `param`, applying width and range
/// checks.
pub fn pack_default(file: &File, name: &str, param: &Parameter, literal: &Literal) -> Result<Vec<u8>, CodecError> {
    let value = literal_value(file, name, param, literal)?;
    let mut bb = ByteBufferMut::new();
    value.encode_bb(file, name, param, &mut bb)?;
    Ok(bb.data())
}
