//! Type-erased Ren values.
//!
//! `Value` is the host-side view of a runtime cell. It converts to and from
//! native Rust types with `From`/`TryFrom`, and to and from [`RenCell`]s through
//! the codecs in [`cell`]. Strings, words and blocks live in an engine's cell
//! heap, so every cell conversion goes through a [`CellHeap`].

use std::convert::TryFrom;
use std::fmt;

use ren_abi::{RenEngineHandle, RenKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod cell;
pub mod load;

pub use cell::{cell_series, CellHeap, FromCell, IntoCell, Series};
pub use load::{load, LoadError};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unset,
    None,
    Logic(bool),
    Integer(i64),
    Decimal(f64),
    Char(char),
    String(String),
    Word(Word),
    Block(Vec<Value>),
    // A datatype used as a value, e.g. `integer!` inside a spec block
    Datatype(Kind),
    Function(Function),
}

/// Datatypes known to the binding, spelled `integer!`, `block!`, ... in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
    Unset,
    None,
    Logic,
    Integer,
    Decimal,
    Char,
    String,
    Word,
    SetWord,
    GetWord,
    LitWord,
    Refinement,
    Block,
    Datatype,
    Function,
}

impl Kind {
    pub const ALL: [Kind; 15] = [
        Kind::Unset,
        Kind::None,
        Kind::Logic,
        Kind::Integer,
        Kind::Decimal,
        Kind::Char,
        Kind::String,
        Kind::Word,
        Kind::SetWord,
        Kind::GetWord,
        Kind::LitWord,
        Kind::Refinement,
        Kind::Block,
        Kind::Datatype,
        Kind::Function,
    ];

    /// Source spelling, e.g. `integer!`.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Unset => "unset!",
            Kind::None => "none!",
            Kind::Logic => "logic!",
            Kind::Integer => "integer!",
            Kind::Decimal => "decimal!",
            Kind::Char => "char!",
            Kind::String => "string!",
            Kind::Word => "word!",
            Kind::SetWord => "set-word!",
            Kind::GetWord => "get-word!",
            Kind::LitWord => "lit-word!",
            Kind::Refinement => "refinement!",
            Kind::Block => "block!",
            Kind::Datatype => "datatype!",
            Kind::Function => "function!",
        }
    }

    pub fn from_name(name: &str) -> Option<Kind> {
        Kind::ALL.iter().copied().find(|k| k.name() == name)
    }

    pub fn to_raw(self) -> RenKind {
        match self {
            Kind::Unset => RenKind::Unset,
            Kind::None => RenKind::None,
            Kind::Logic => RenKind::Logic,
            Kind::Integer => RenKind::Integer,
            Kind::Decimal => RenKind::Decimal,
            Kind::Char => RenKind::Char,
            Kind::String => RenKind::String,
            Kind::Word => RenKind::Word,
            Kind::SetWord => RenKind::SetWord,
            Kind::GetWord => RenKind::GetWord,
            Kind::LitWord => RenKind::LitWord,
            Kind::Refinement => RenKind::Refinement,
            Kind::Block => RenKind::Block,
            Kind::Datatype => RenKind::Datatype,
            Kind::Function => RenKind::Function,
        }
    }

    pub fn from_raw(raw: RenKind) -> Kind {
        match raw {
            RenKind::Unset => Kind::Unset,
            RenKind::None => Kind::None,
            RenKind::Logic => Kind::Logic,
            RenKind::Integer => Kind::Integer,
            RenKind::Decimal => Kind::Decimal,
            RenKind::Char => Kind::Char,
            RenKind::String => Kind::String,
            RenKind::Word => Kind::Word,
            RenKind::SetWord => Kind::SetWord,
            RenKind::GetWord => Kind::GetWord,
            RenKind::LitWord => Kind::LitWord,
            RenKind::Refinement => Kind::Refinement,
            RenKind::Block => Kind::Block,
            RenKind::Datatype => Kind::Datatype,
            RenKind::Function => Kind::Function,
        }
    }

    pub fn is_word(self) -> bool {
        matches!(
            self,
            Kind::Word | Kind::SetWord | Kind::GetWord | Kind::LitWord | Kind::Refinement
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A word together with its flavor (`foo`, `foo:`, `:foo`, `'foo`, `/foo`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Word {
    pub name: String,
    pub kind: WordKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordKind {
    Word,
    Set,
    Get,
    Lit,
    Refinement,
}

impl Word {
    pub fn new(name: impl Into<String>) -> Self {
        Word { name: name.into(), kind: WordKind::Word }
    }

    pub fn with_kind(name: impl Into<String>, kind: WordKind) -> Self {
        Word { name: name.into(), kind }
    }

    pub fn datatype(&self) -> Kind {
        match self.kind {
            WordKind::Word => Kind::Word,
            WordKind::Set => Kind::SetWord,
            WordKind::Get => Kind::GetWord,
            WordKind::Lit => Kind::LitWord,
            WordKind::Refinement => Kind::Refinement,
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            WordKind::Word => write!(f, "{}", self.name),
            WordKind::Set => write!(f, "{}:", self.name),
            WordKind::Get => write!(f, ":{}", self.name),
            WordKind::Lit => write!(f, "'{}", self.name),
            WordKind::Refinement => write!(f, "/{}", self.name),
        }
    }
}

/// Handle to a native function record owned by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Function {
    pub engine: RenEngineHandle,
    pub index: u32,
}

/// The canonical "no value" result of natives that return nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Unset;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: Kind },

    #[error("{value} is out of range for {target}")]
    OutOfRange { value: i64, target: &'static str },

    #[error("cell refers to missing series {0}")]
    DanglingSeries(u32),

    #[error("cell has unknown datatype tag {0}")]
    CorruptTag(u32),

    #[error("cell holds invalid code point {0:#x}")]
    InvalidChar(u32),
}

impl ValueError {
    pub fn mismatch(expected: impl Into<String>, found: Kind) -> Self {
        ValueError::TypeMismatch { expected: expected.into(), found }
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Unset => Kind::Unset,
            Value::None => Kind::None,
            Value::Logic(_) => Kind::Logic,
            Value::Integer(_) => Kind::Integer,
            Value::Decimal(_) => Kind::Decimal,
            Value::Char(_) => Kind::Char,
            Value::String(_) => Kind::String,
            Value::Word(w) => w.datatype(),
            Value::Block(_) => Kind::Block,
            Value::Datatype(_) => Kind::Datatype,
            Value::Function(_) => Kind::Function,
        }
    }

    pub fn word(name: impl Into<String>) -> Self {
        Value::Word(Word::new(name))
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    /// Rebol truthiness: only `none` and `false` are falsey.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::None | Value::Logic(false))
    }
}

// From implementations for Value
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Decimal(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Logic(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Word> for Value {
    fn from(w: Word) -> Self {
        Value::Word(w)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Block(items)
    }
}

impl From<Kind> for Value {
    fn from(k: Kind) -> Self {
        Value::Datatype(k)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Unset> for Value {
    fn from(_: Unset) -> Self {
        Value::Unset
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::None,
        }
    }
}

// TryFrom implementations for extracting native types
impl TryFrom<&Value> for i64 {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Integer(i) => Ok(*i),
            _ => Err(ValueError::mismatch("integer!", v.kind())),
        }
    }
}

impl TryFrom<&Value> for i32 {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Integer(i) => i32::try_from(*i).map_err(|_| ValueError::OutOfRange {
                value: *i,
                target: "i32",
            }),
            _ => Err(ValueError::mismatch("integer!", v.kind())),
        }
    }
}

impl TryFrom<&Value> for f64 {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Decimal(n) => Ok(*n),
            Value::Integer(i) => Ok(*i as f64),
            _ => Err(ValueError::mismatch("decimal!", v.kind())),
        }
    }
}

impl TryFrom<&Value> for bool {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Logic(b) => Ok(*b),
            _ => Err(ValueError::mismatch("logic!", v.kind())),
        }
    }
}

impl TryFrom<&Value> for char {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Char(c) => Ok(*c),
            _ => Err(ValueError::mismatch("char!", v.kind())),
        }
    }
}

impl TryFrom<&Value> for String {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::String(s) => Ok(s.clone()),
            _ => Err(ValueError::mismatch("string!", v.kind())),
        }
    }
}

impl TryFrom<&Value> for Word {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Word(w) => Ok(w.clone()),
            _ => Err(ValueError::mismatch("word!", v.kind())),
        }
    }
}

impl TryFrom<&Value> for Vec<Value> {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Block(items) => Ok(items.clone()),
            _ => Err(ValueError::mismatch("block!", v.kind())),
        }
    }
}

impl TryFrom<&Value> for Function {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Function(f) => Ok(*f),
            _ => Err(ValueError::mismatch("function!", v.kind())),
        }
    }
}

impl TryFrom<&Value> for Kind {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Datatype(k) => Ok(*k),
            _ => Err(ValueError::mismatch("datatype!", v.kind())),
        }
    }
}

impl TryFrom<&Value> for Unset {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Unset => Ok(Unset),
            _ => Err(ValueError::mismatch("unset!", v.kind())),
        }
    }
}

impl TryFrom<&Value> for Value {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        Ok(v.clone())
    }
}

// ----------------------
// Display implementations
// ----------------------

fn format_decimal(value: f64) -> String {
    if value.is_nan() {
        return "1.#NaN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_negative() { "-1.#INF" } else { "1.#INF" }.to_string();
    }
    let s = format!("{value}");
    // Decimals always show a point so they load back as decimal!
    if s.contains('.') || s.contains('e') || s.contains('E') {
        s
    } else {
        format!("{s}.0")
    }
}

fn format_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in s.chars() {
        match ch {
            '"' => f.write_str("^\"")?,
            '^' => f.write_str("^^")?,
            '\n' => f.write_str("^/")?,
            '\t' => f.write_str("^-")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

fn format_block(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    f.write_str("[")?;
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{v}")?;
    }
    f.write_str("]")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unset => f.write_str("unset"),
            Value::None => f.write_str("none"),
            Value::Logic(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(n) => f.write_str(&format_decimal(*n)),
            Value::Char(c) => write!(f, "#\"{c}\""),
            Value::String(s) => format_string(f, s),
            Value::Word(w) => write!(f, "{w}"),
            Value::Block(items) => format_block(f, items),
            Value::Datatype(k) => write!(f, "{k}"),
            Value::Function(func) => write!(f, "#[function! {}]", func.index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in Kind::ALL {
            assert_eq!(Kind::from_name(kind.name()), Some(kind));
            assert_eq!(Kind::from_raw(kind.to_raw()), kind);
        }
        assert_eq!(Kind::from_name("matrix!"), None);
    }

    #[test]
    fn strict_integer_extraction() {
        assert_eq!(i64::try_from(&Value::Integer(4)), Ok(4));
        assert_eq!(
            i64::try_from(&Value::from("x")),
            Err(ValueError::mismatch("integer!", Kind::String))
        );
        assert!(matches!(
            i32::try_from(&Value::Integer(i64::MAX)),
            Err(ValueError::OutOfRange { .. })
        ));
    }

    #[test]
    fn decimal_widens_integers() {
        assert_eq!(f64::try_from(&Value::Integer(2)), Ok(2.0));
        assert_eq!(f64::try_from(&Value::Decimal(2.5)), Ok(2.5));
    }

    #[test]
    fn display_molds_source_form() {
        let block = Value::Block(vec![
            Value::Integer(1),
            Value::Decimal(2.0),
            Value::from("a\"b"),
            Value::Word(Word::with_kind("x", WordKind::Set)),
            Value::Datatype(Kind::Integer),
            Value::Char('z'),
        ]);
        assert_eq!(block.to_string(), "[1 2.0 \"a^\"b\" x: integer! #\"z\"]");
        assert_eq!(Value::None.to_string(), "none");
    }

    #[test]
    fn truthiness() {
        assert!(Value::Integer(0).is_truthy());
        assert!(!Value::None.is_truthy());
        assert!(!Value::Logic(false).is_truthy());
    }

    #[test]
    fn option_into_value() {
        assert_eq!(Value::from(Some(3i64)), Value::Integer(3));
        assert_eq!(Value::from(None::<i64>), Value::None);
    }
}
