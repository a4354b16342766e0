// Lives in its own binary: the `(i64) -> i64` table must start empty.

use ren_bind::{register, ren_shim, Engine, EngineConfig, ShimId, Specification, Value};

#[test]
fn test_fresh_signature_hands_out_sequential_ids() {
    let engine = Engine::create(EngineConfig::default()).unwrap();
    let spec = Specification::parse("n [integer!]").unwrap();

    let first = register(&engine, &spec, ren_shim!(), |n: i64| n + 1).unwrap();
    let second = register(&engine, &spec, ren_shim!(), |n: i64| n * 100).unwrap();
    assert_eq!(first.id, ShimId(0));
    assert_eq!(second.id, ShimId(1));

    for i in 0..100 {
        assert_eq!(
            engine.apply(&first.function, &[Value::Integer(i)]).unwrap(),
            Value::Integer(i + 1)
        );
    }
    assert_eq!(
        engine.apply(&second.function, &[Value::Integer(3)]).unwrap(),
        Value::Integer(300)
    );
}
