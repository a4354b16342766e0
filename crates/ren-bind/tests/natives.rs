use ren_bind::{
    bind_natives, native_definitions, BindError, Engine, EngineConfig, EvalError, Loadable,
    NativeFailure, Value,
};
use ren_macros::native;

#[native(doc = "Sum three integers")]
fn sum3(a: i64, b: i64, c: i64) -> i64 {
    a + b + c
}

#[native(name = "shout", spec = "text [string!] \"What to shout\"")]
fn shout(text: String) -> String {
    text.to_uppercase()
}

#[native]
fn is_even(n: i64) -> bool {
    n % 2 == 0
}

#[native(name = "checked-div")]
fn checked_div(a: i64, b: i64) -> Result<i64, String> {
    a.checked_div(b).ok_or_else(|| "division by zero".to_string())
}

fn eval(engine: &Engine, text: &str) -> Result<Value, EvalError> {
    engine.evaluate(&[Loadable::from(text)])
}

// Each definition owns one trampoline, so everything runs in one test.
#[test]
fn test_collected_natives_bind_once() {
    let names: Vec<_> = native_definitions().iter().map(|d| d.name).collect();
    for expected in ["sum3", "shout", "is-even", "checked-div"] {
        assert!(names.contains(&expected), "missing {expected}");
    }

    let engine = Engine::create(EngineConfig::default()).unwrap();
    let bound = bind_natives(&engine, engine.user_context()).unwrap();
    assert_eq!(bound.len(), names.len());

    assert_eq!(eval(&engine, "sum3 1 2 3").unwrap(), Value::Integer(6));
    assert_eq!(eval(&engine, "shout \"hi\"").unwrap(), Value::from("HI"));
    assert_eq!(eval(&engine, "is-even 4").unwrap(), Value::Logic(true));
    assert_eq!(eval(&engine, "checked-div 9 3").unwrap(), Value::Integer(3));
    match eval(&engine, "checked-div 1 0") {
        Err(EvalError::Native { function, failure }) => {
            assert_eq!(function, "checked-div");
            assert_eq!(failure, NativeFailure::Callable("division by zero".into()));
        }
        other => panic!("unexpected {other:?}"),
    }

    let sum3 = match engine.get_word(engine.user_context(), "sum3").unwrap() {
        Some(Value::Function(f)) => f,
        other => panic!("sum3 bound to {other:?}"),
    };
    let record = engine.record(&sum3).unwrap();
    assert_eq!(
        record.spec.to_string(),
        "\"Sum three integers\" a [integer!] b [integer!] c [integer!]"
    );

    let other = Engine::create(EngineConfig::default()).unwrap();
    let err = bind_natives(&other, other.user_context()).unwrap_err();
    assert!(matches!(err, BindError::Configuration(_)));
}
