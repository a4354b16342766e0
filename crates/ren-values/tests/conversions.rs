use ren_values::{load, Function, Kind, Value, ValueError, Word, WordKind};
use ren_abi::RenEngineHandle;

#[test]
fn test_value_conversions() {
    let int_val = Value::Integer(42);
    let num_val = Value::Decimal(3.15);
    let bool_val = Value::Logic(true);
    let str_val = Value::String("hello".to_string());

    assert_eq!(Value::from(42), int_val);
    assert_eq!(Value::from(3.15), num_val);
    assert_eq!(Value::from(true), bool_val);
    assert_eq!(Value::from("hello"), str_val);

    use std::convert::TryInto;
    assert_eq!((&int_val).try_into(), Ok(42i64));
    assert_eq!((&int_val).try_into(), Ok(42i32));
    assert_eq!((&num_val).try_into(), Ok(3.15f64));
    assert_eq!((&bool_val).try_into(), Ok(true));
    assert_eq!((&str_val).try_into(), Ok("hello".to_string()));
}

#[test]
fn test_mismatches_name_both_sides() {
    use std::convert::TryFrom;
    let err = bool::try_from(&Value::Integer(1)).unwrap_err();
    assert_eq!(err, ValueError::mismatch("logic!", Kind::Integer));
    assert_eq!(err.to_string(), "expected logic!, found integer!");
}

#[test]
fn test_function_values() {
    let f = Function { engine: RenEngineHandle(0), index: 2 };
    let v = Value::from(f);
    assert_eq!(v.kind(), Kind::Function);
    assert_eq!(v.to_string(), "#[function! 2]");
}

#[test]
fn test_spec_block_shape() {
    let values = load(r#""Adds two numbers" a [integer!] "first" 'b :c"#).unwrap();
    assert_eq!(values.len(), 6);
    assert_eq!(values[0], Value::from("Adds two numbers"));
    assert_eq!(values[2], Value::Block(vec![Value::Datatype(Kind::Integer)]));
    assert_eq!(values[4], Value::Word(Word::with_kind("b", WordKind::Lit)));
    assert_eq!(values[5], Value::Word(Word::with_kind("c", WordKind::Get)));
}

#[test]
fn test_kind_serde_names() {
    let json = serde_json::to_string(&Kind::SetWord).unwrap();
    assert_eq!(json, "\"set-word\"");
    let back: Kind = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Kind::SetWord);
}
