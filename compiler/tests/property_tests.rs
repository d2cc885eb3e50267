//! Property-based tests for the lexer and the field codec.

use proptest::prelude::*;

use dclass_compiler::{compile_schema, format, lex, parse, TokenKind};
use dclass_schema::{File, FieldId, Value};

const FRAGMENTS: &[&str] = &[
    "dclass", "struct", "keyword", "uint32", "string", "x", "{", "}", "(", ")", ";", ":", ",",
    "=", "[2]", "[]", "0x1F", "-3", "1.5", "'a'", "\"s\"", "/", "%", " ", "\n", "// c\n", "/* c */",
];

fn fragments() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..40).prop_map(|parts| parts.concat())
}

const SCHEMA: &str = "
dclass A {
    uint32 v;
    setV(uint32 v) broadcast;
    float64 f;
    int16 % 360 heading;
    int32 / 100 speed;
    uint8 ids[] (1-3);
};
";

fn schema_field(name: &str) -> (File, FieldId) {
    let file = compile_schema(SCHEMA).unwrap();
    let a = file.type_by_name("A").unwrap();
    let field = file.find_field(a, name).unwrap();
    (file, field)
}

fn assert_round_trip(file: &File, field: FieldId, packed: &[u8], names: bool) -> Result<(), TestCaseError> {
    let text = format(file, field, packed, names).unwrap();
    prop_assert_eq!(parse(file, field, &text).unwrap(), packed.to_vec(), "text was {:?}", text);
    Ok(())
}

proptest! {
    #[test]
    fn lexer_never_panics(input in "\\PC*") {
        let tokens = lex(&input);
        prop_assert!(tokens.last().map_or(false, |t| t.is_terminal()));
    }

    #[test]
    fn lexer_ends_on_fragments(input in fragments()) {
        let tokens = lex(&input);
        let errors = tokens.iter().filter(|t| t.kind == TokenKind::Error).count();
        prop_assert!(errors <= 1);
        prop_assert!(tokens.last().map_or(false, |t| t.is_terminal()));
    }

    #[test]
    fn compile_never_panics(input in fragments()) {
        let _ = dclass_compiler::compile(&input);
    }

    #[test]
    fn uint32_round_trip(v in any::<u32>(), names in any::<bool>()) {
        let (file, field) = schema_field("v");
        let packed = file.pack(field, &Value::Uint(v as u64)).unwrap();
        prop_assert_eq!(&packed, &v.to_le_bytes().to_vec());
        assert_round_trip(&file, field, &packed, names)?;
    }

    #[test]
    fn float64_round_trip(v in any::<f64>().prop_filter("finite", |v| v.is_finite()), names in any::<bool>()) {
        let (file, field) = schema_field("f");
        let packed = file.pack(field, &Value::Float(v)).unwrap();
        prop_assert_eq!(&packed, &v.to_le_bytes().to_vec());
        assert_round_trip(&file, field, &packed, names)?;
    }

    #[test]
    fn fractional_transform_round_trip(v in any::<i32>(), names in any::<bool>()) {
        let (file, field) = schema_field("speed");
        let packed = file.pack(field, &Value::Int(v as i64)).unwrap();
        assert_round_trip(&file, field, &packed, names)?;
    }

    #[test]
    fn modulus_round_trip(v in any::<i16>(), names in any::<bool>()) {
        let (file, field) = schema_field("heading");
        match file.pack(field, &Value::Int(v as i64)) {
            Ok(packed) => {
                prop_assert!((0..360).contains(&v));
                assert_round_trip(&file, field, &packed, names)?;
            }
            Err(_) => prop_assert!(!(0..360).contains(&v)),
        }
    }

    #[test]
    fn element_count_round_trip(ids in prop::collection::vec(any::<u8>(), 0..6)) {
        let (file, field) = schema_field("ids");
        let value = Value::Array(ids.iter().map(|id| Value::Uint(*id as u64)).collect());
        match file.pack(field, &value) {
            Ok(packed) => {
                prop_assert!((1..=3).contains(&ids.len()));
                assert_round_trip(&file, field, &packed, false)?;
            }
            Err(_) => prop_assert!(!(1..=3).contains(&ids.len())),
        }
    }
}
