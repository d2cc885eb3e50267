//! Runtime side of the DC distributed-class format: the compiled schema
//! model, wire values, the text form of field data and the schema hash.
//!
//! Schemas are normally produced by `dclass-compiler`, but they can also be
//! built by hand:
//!
//! ```
//! use dclass_schema::*;
//!
//! let mut file = File::new();
//! let avatar = file.add_class("Avatar", 1);
//! let hp = file.add_field(
//!     avatar,
//!     None,
//!     "hp",
//!     2,
//!     FieldKind::Parameter(Parameter::new(DataType::Uint16)),
//! );
//!
//! let packed = file.pack(hp, &Value::Uint(300)).unwrap();
//! assert_eq!(packed, [44, 1]);
//! assert_eq!(file.format_data(hp, &packed, true).unwrap(), "hp = 300");
//! ```

pub mod bb;
pub mod data_type;
pub mod error;
pub mod hash;
pub mod keyword;
pub mod schema;
pub mod value;

pub use bb::*;
pub use data_type::*;
pub use error::*;
pub use hash::*;
pub use keyword::*;
pub use schema::*;
pub use value::*;
