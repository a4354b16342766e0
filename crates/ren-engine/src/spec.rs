//! Native function specifications.
//!
//! A specification is the block a native is made from, e.g.
//!
//! ```text
//! "Add two integers" a [integer!] "left operand" b [integer!]
//! ```
//!
//! An optional leading description string is followed by one entry per
//! parameter: a word (`a`), lit-word (`'a`) or get-word (`:a`) giving the
//! passing mode, an optional block of accepted datatypes and an optional
//! doc string.

use std::fmt;
use std::str::FromStr;

use ren_values::{load, Kind, LoadError, Value, Word, WordKind};
use thiserror::Error;

/// How the evaluator gathers one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassingMode {
    /// Evaluate the next expression.
    Normal,
    /// Take the next item as written.
    Literal,
    /// Fetch a word's value without applying it.
    Get,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub mode: PassingMode,
    /// Accepted datatypes; empty means any.
    pub kinds: Vec<Kind>,
    pub doc: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, mode: PassingMode, kinds: &[Kind]) -> Self {
        Param {
            name: name.into(),
            mode,
            kinds: kinds.to_vec(),
            doc: None,
        }
    }

    pub fn accepts_any(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Specification {
    description: Option<String>,
    params: Vec<Param>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("refinement /{0} is not supported in native specifications")]
    Refinement(String),

    #[error("unexpected {found} at position {index}")]
    Unexpected { index: usize, found: String },

    #[error("{0} is not a datatype")]
    NotADatatype(String),

    #[error("duplicate parameter {0}")]
    Duplicate(String),
}

impl Specification {
    pub fn builder() -> SpecBuilder {
        SpecBuilder::default()
    }

    pub fn parse(text: &str) -> Result<Self, SpecError> {
        Self::from_block(&load(text)?)
    }

    /// Build from already loaded spec items.
    pub fn from_block(items: &[Value]) -> Result<Self, SpecError> {
        let mut builder = SpecBuilder::default();
        let mut iter = items.iter().enumerate().peekable();

        if let Some((_, Value::String(desc))) = iter.peek() {
            builder = builder.description(desc.clone());
            iter.next();
        }

        while let Some((index, item)) = iter.next() {
            let (name, mode) = match item {
                Value::Word(Word { name, kind: WordKind::Word }) => (name, PassingMode::Normal),
                Value::Word(Word { name, kind: WordKind::Lit }) => (name, PassingMode::Literal),
                Value::Word(Word { name, kind: WordKind::Get }) => (name, PassingMode::Get),
                Value::Word(Word { name, kind: WordKind::Refinement }) => {
                    return Err(SpecError::Refinement(name.clone()))
                }
                other => {
                    return Err(SpecError::Unexpected {
                        index,
                        found: other.to_string(),
                    })
                }
            };

            let mut kinds = Vec::new();
            if let Some((_, Value::Block(types))) = iter.peek() {
                kinds = datatypes(types)?;
                iter.next();
            }
            builder = builder.push(Param::new(name.clone(), mode, &kinds));

            if let Some((_, Value::String(doc))) = iter.peek() {
                builder = builder.doc(doc.clone());
                iter.next();
            }
        }

        builder.build()
    }

    /// Replace the description.
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// The spec as a block of values, in the form `from_block` reads.
    pub fn to_block(&self) -> Vec<Value> {
        let mut out = Vec::new();
        if let Some(desc) = &self.description {
            out.push(Value::String(desc.clone()));
        }
        for param in &self.params {
            let kind = match param.mode {
                PassingMode::Normal => WordKind::Word,
                PassingMode::Literal => WordKind::Lit,
                PassingMode::Get => WordKind::Get,
            };
            out.push(Value::Word(Word::with_kind(param.name.clone(), kind)));
            if !param.kinds.is_empty() {
                out.push(Value::Block(
                    param.kinds.iter().map(|k| Value::Datatype(*k)).collect(),
                ));
            }
            if let Some(doc) = &param.doc {
                out.push(Value::String(doc.clone()));
            }
        }
        out
    }
}

// `any-type!` is accepted as the explicit spelling of "no restriction"
fn datatypes(items: &[Value]) -> Result<Vec<Kind>, SpecError> {
    let mut kinds = Vec::new();
    for item in items {
        match item {
            Value::Datatype(kind) => kinds.push(*kind),
            Value::Word(w) if w.kind == WordKind::Word && w.name == "any-type!" => {
                return Ok(Vec::new())
            }
            other => return Err(SpecError::NotADatatype(other.to_string())),
        }
    }
    Ok(kinds)
}

impl FromStr for Specification {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Specification::parse(s)
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = self.to_block();
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct SpecBuilder {
    spec: Specification,
}

impl SpecBuilder {
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.spec.description = Some(text.into());
        self
    }

    /// Normally evaluated parameter.
    pub fn param(self, name: impl Into<String>, kinds: &[Kind]) -> Self {
        self.push(Param::new(name, PassingMode::Normal, kinds))
    }

    pub fn literal(self, name: impl Into<String>) -> Self {
        self.push(Param::new(name, PassingMode::Literal, &[]))
    }

    pub fn get(self, name: impl Into<String>) -> Self {
        self.push(Param::new(name, PassingMode::Get, &[]))
    }

    pub fn push(mut self, param: Param) -> Self {
        self.spec.params.push(param);
        self
    }

    /// Document the most recently added parameter.
    pub fn doc(mut self, text: impl Into<String>) -> Self {
        if let Some(last) = self.spec.params.last_mut() {
            last.doc = Some(text.into());
        }
        self
    }

    pub fn build(self) -> Result<Specification, SpecError> {
        for (i, param) in self.spec.params.iter().enumerate() {
            if self.spec.params[..i].iter().any(|p| p.name == param.name) {
                return Err(SpecError::Duplicate(param.name.clone()));
            }
        }
        Ok(self.spec)
    }
}
