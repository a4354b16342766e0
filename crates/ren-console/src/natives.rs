//! Natives the console offers on top of whatever the linked crates submit.

use ren_bind::Value;
use ren_macros::native;

#[native(doc = "Add two integers")]
fn add(a: i64, b: i64) -> Result<i64, String> {
    a.checked_add(b).ok_or_else(|| format!("{a} + {b} overflows"))
}

#[native(name = "join", spec = "\"Concatenate two strings\" left [string!] right [string!]")]
fn join_strings(left: String, right: String) -> String {
    left + &right
}

#[native(doc = "Return the argument unchanged")]
fn echo(value: Value) -> Value {
    value
}

#[native(doc = "Milliseconds since the Unix epoch")]
fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
