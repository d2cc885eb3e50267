use thiserror::Error;

/// Errors raised while packing or unpacking field data. They are local to a
/// single codec call and never affect the schema itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("unexpected end of data while reading '{0}'")]
    UnexpectedEnd(String),

    #[error("{0} trailing bytes after field data")]
    TrailingBytes(usize),

    #[error("no field numbered {0}")]
    UnknownField(usize),

    #[error("'{0}' has no usable data type")]
    InvalidType(String),

    #[error("expected {expected} for '{name}', found {found}")]
    TypeMismatch {
        name:     String,
        expected: String,
        found:    String,
    },

    #[error("value {value} of '{name}' does not fit in {data_type}")]
    OutOfBounds {
        name:      String,
        value:     String,
        data_type: String,
    },

    #[error("value {value} of '{name}' is outside its range {range}")]
    RangeViolation {
        name:  String,
        value: String,
        range: String,
    },

    #[error("'{name}' needs {expected} values, found {found}")]
    WrongCount {
        name:     String,
        expected: usize,
        found:    usize,
    },

    #[error("value {value} of '{name}' is not a finite number")]
    NotFinite {
        name:  String,
        value: String,
    },

    #[error("value {value} of '{name}' lies outside the modulus of its transform")]
    Unwrapped {
        name:  String,
        value: String,
    },

    #[error("'{0}' is too long for a uint16 length prefix")]
    TooLong(String),
}
