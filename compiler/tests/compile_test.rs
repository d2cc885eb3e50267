use dclass_compiler::{
    compile, compile_schema, format, hash, lex, parse, Category, DcError, TokenKind,
};
use dclass_schema::{FieldId, File, Value};

const AVATAR: &str = r#"
keyword ownrecv;
keyword ownrecv;

struct Point {
    int16 / 10 x;
    int16 / 10 y;
};

dclass DistributedObject {
    setZone(uint32 zone) broadcast ram;
};

dclass DistributedAvatar : DistributedObject {
    string(1-32) name = "nobody" required db;
    uint16(0-500) hp broadcast;
    setPos(Point pos) broadcast;
    setName(string) ownrecv;
    setNameAndHp : name, hp;
    Point path[];
};
"#;

fn field(file: &File, ty: &str, name: &str) -> FieldId {
    let ty = file.type_by_name(ty).unwrap();
    file.find_field(ty, name).unwrap()
}

#[test]
fn test_compile_full_file() {
    let file = compile_schema(AVATAR).expect("schema should compile");

    // The duplicate keyword declaration is ignored.
    assert!(file.has_keyword("ownrecv"));
    assert_eq!(file.types().len(), 3);

    let avatar = file.type_by_name("DistributedAvatar").unwrap();
    let view: Vec<_> = file
        .field_view(avatar)
        .into_iter()
        .map(|f| file.field(f).name.clone())
        .collect();
    assert_eq!(view, ["setZone", "name", "hp", "setPos", "setName", "setNameAndHp", "path"]);

    let name = file.field(field(&file, "DistributedAvatar", "name"));
    assert!(name.is_required() && name.is_db());
    assert!(name.has_default_value());
    assert_eq!(file.default_value(name.number).unwrap(), b"\x06\x00nobody");
}

#[test]
fn test_forward_references_compile_cleanly() {
    let (file, diagnostics) = compile("dclass A : B { } ; struct B { int8 x; } ;");
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert_eq!(file.types().len(), 2);
}

#[test]
fn test_undefined_struct_reported_once() {
    let (_, diagnostics) = compile("dclass A { B x; }");
    assert_eq!(diagnostics.len(), 1, "{:?}", diagnostics);
    assert_eq!(diagnostics[0].category, Category::Definition);
    assert_eq!(
        diagnostics[0].to_string(),
        "definition error: used struct 'B', but 'B' was never defined (first used on line 1)"
    );

    match compile_schema("dclass A { B x; }") {
        Err(DcError::InvalidSchema { diagnostics }) => assert_eq!(diagnostics.len(), 1),
        other => panic!("expected an invalid schema, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_recovery_keeps_later_fields() {
    let (file, diagnostics) = compile("struct S { int8 ; int8 y; }");
    assert_eq!(diagnostics.len(), 1, "{:?}", diagnostics);
    assert_eq!(diagnostics[0].category, Category::Parse);

    let s = file.type_by_name("S").unwrap();
    assert!(file.find_field(s, "y").is_some());
}

#[test]
fn test_broadcast_only() {
    let file = compile_schema("dclass A { setX(int8 x) broadcast; };").unwrap();
    let set_x = file.field(field(&file, "A", "setX"));

    assert!(set_x.is_broadcast());
    assert!(!set_x.is_required());
    assert!(!set_x.is_ram());
    assert!(!set_x.is_db());
    assert!(!set_x.is_airecv());
    assert!(!set_x.is_ownrecv());
    assert!(!set_x.is_ownsend());
    assert!(!set_x.is_clsend());
    assert!(!set_x.is_clrecv());
}

#[test]
fn test_hash_is_deterministic() {
    let first = compile_schema(AVATAR).unwrap();
    let second = compile_schema(AVATAR).unwrap();
    assert_eq!(hash(&first), hash(&second));

    let changed = compile_schema(&AVATAR.replace("uint16(0-500) hp", "uint16(0-400) hp")).unwrap();
    assert_ne!(hash(&first), hash(&changed));
}

#[test]
fn test_lexer_cases() {
    let tokens = lex("0b110");
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[1].kind, TokenKind::Eof);

    let tokens = lex("3k");
    let error = tokens.last().unwrap();
    assert_eq!(error.kind, TokenKind::Error);
    assert_eq!(error.text, "bad number syntax: \"3k\"");

    let tokens = lex("(3");
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, [TokenKind::LeftParen, TokenKind::Number, TokenKind::Error]);
    assert_eq!(tokens[2].text, "unclosed left paren");
}

#[test]
fn test_fractional_values() {
    let file = compile_schema(
        "dclass A { float64 half = 0.25; float64 f; int16 / 10 x = -0.5; uint8 ids[] (1-2); };",
    )
    .unwrap();

    let half = field(&file, "A", "half");
    assert_eq!(file.default_value(half).unwrap(), 0.25f64.to_le_bytes());

    let f = field(&file, "A", "f");
    let packed = file.pack(f, &Value::Float(0.5)).unwrap();
    assert_eq!(format(&file, f, &packed, false).unwrap(), "0.5");
    assert_eq!(parse(&file, f, "0.5").unwrap(), packed);
    assert_eq!(parse(&file, f, "-0.125").unwrap(), (-0.125f64).to_le_bytes());

    let x = field(&file, "A", "x");
    assert_eq!(file.default_value(x).unwrap(), (-5i16).to_le_bytes());
    assert_eq!(format(&file, x, &(-5i16).to_le_bytes(), true).unwrap(), "x = -0.5");

    let ids = field(&file, "A", "ids");
    assert_eq!(parse(&file, ids, "(7, 8)").unwrap(), [2, 0, 7, 8]);
    assert!(parse(&file, ids, "(7, 8, 9)").is_err());
    assert!(parse(&file, ids, "()").is_err());
}

#[test]
fn test_field_codec() {
    let file = compile_schema(AVATAR).unwrap();

    let set_pos = field(&file, "DistributedAvatar", "setPos");
    let packed = parse(&file, set_pos, "(x = 1.5, y = -2)").unwrap();
    assert_eq!(packed, [15, 0, 0xec, 0xff]);
    assert_eq!(format(&file, set_pos, &packed, false).unwrap(), "(1.5, -2)");
    assert_eq!(
        format(&file, set_pos, &packed, true).unwrap(),
        "pos = (x = 1.5, y = -2)"
    );

    let both = field(&file, "DistributedAvatar", "setNameAndHp");
    let packed = file
        .pack(both, &Value::Tuple(vec![Value::Bytes(b"Flip".to_vec()), Value::Uint(120)]))
        .unwrap();
    let text = format(&file, both, &packed, false).unwrap();
    assert_eq!(text, "\"Flip\", 120");
    assert_eq!(parse(&file, both, &text).unwrap(), packed);

    let hp = field(&file, "DistributedAvatar", "hp");
    assert!(parse(&file, hp, "501").is_err());
    assert!(format(&file, hp, &[1, 0, 0], false).is_err());
}
