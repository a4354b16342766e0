//! Prefix evaluator over loaded blocks.
//!
//! Handles literals, words, set-words, get-words, lit-words and application
//! of function values with the argument passing modes of their specification.
//! There are no infix operators, paths or parens.

use std::cell::Cell;

use ren_abi::RenContextHandle;
use ren_values::{load, Function, Value, Word, WordKind};

use crate::spec::PassingMode;
use crate::{run_finder, Engine, EvalError};

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Counts nested evaluations on the current thread.
pub(crate) struct DepthGuard;

impl DepthGuard {
    pub(crate) fn enter(limit: usize) -> Result<Self, EvalError> {
        DEPTH.with(|depth| {
            if depth.get() >= limit {
                Err(EvalError::DepthExceeded(limit))
            } else {
                depth.set(depth.get() + 1);
                Ok(DepthGuard)
            }
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Something that can be handed to `evaluate`: source text, which is
/// loaded and spliced in, or a value, which is inserted as is.
#[derive(Debug, Clone, PartialEq)]
pub enum Loadable {
    Text(String),
    Value(Value),
}

impl From<&str> for Loadable {
    fn from(text: &str) -> Self {
        Loadable::Text(text.to_string())
    }
}

impl From<String> for Loadable {
    fn from(text: String) -> Self {
        Loadable::Text(text)
    }
}

impl From<Value> for Loadable {
    fn from(value: Value) -> Self {
        Loadable::Value(value)
    }
}

impl From<Function> for Loadable {
    fn from(function: Function) -> Self {
        Loadable::Value(Value::Function(function))
    }
}

impl Engine {
    /// Evaluate in the user context.
    pub fn evaluate(&self, loadables: &[Loadable]) -> Result<Value, EvalError> {
        self.evaluate_in(self.user_context(), loadables)
    }

    /// Evaluate in `context`; the result is the value of the last expression.
    pub fn evaluate_in(
        &self,
        context: RenContextHandle,
        loadables: &[Loadable],
    ) -> Result<Value, EvalError> {
        let mut items = Vec::new();
        for loadable in loadables {
            match loadable {
                Loadable::Text(text) => items.extend(load(text)?),
                Loadable::Value(value) => items.push(value.clone()),
            }
        }
        self.do_block(context, &items)
    }

    /// Evaluate already loaded items.
    pub fn do_block(&self, context: RenContextHandle, items: &[Value]) -> Result<Value, EvalError> {
        self.context(context)?;
        let _depth = DepthGuard::enter(self.config().max_eval_depth)?;

        let mut evaluator = Evaluator {
            engine: self,
            context,
            items,
            pos: 0,
        };
        let mut last = Value::Unset;
        while !evaluator.at_end() {
            last = evaluator.expression()?;
        }
        Ok(last)
    }
}

/// Evaluate with the engine returned by the engine finder.
pub fn evaluate(loadables: &[Loadable]) -> Result<Value, EvalError> {
    let engine = run_finder().ok_or(EvalError::NoEngine)?;
    engine.evaluate(loadables)
}

struct Evaluator<'a> {
    engine: &'a Engine,
    context: RenContextHandle,
    items: &'a [Value],
    pos: usize,
}

impl Evaluator<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.items.len()
    }

    fn next_item(&mut self) -> Option<Value> {
        let item = self.items.get(self.pos).cloned();
        self.pos += 1;
        item
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        self.engine
            .get_word(self.context, name)?
            .ok_or_else(|| EvalError::NoValue(name.to_string()))
    }

    fn expression(&mut self) -> Result<Value, EvalError> {
        let _depth = DepthGuard::enter(self.engine.config().max_eval_depth)?;
        let Some(item) = self.next_item() else {
            return Ok(Value::Unset);
        };

        match item {
            Value::Word(Word { name, kind }) => match kind {
                WordKind::Word => match self.lookup(&name)? {
                    Value::Function(function) => self.apply(&name, function),
                    value => Ok(value),
                },
                WordKind::Set => {
                    if self.at_end() {
                        return Err(EvalError::NotEnoughArguments {
                            function: format!("{name}:"),
                            expected: "value".to_string(),
                        });
                    }
                    let value = self.expression()?;
                    self.engine.set_word(self.context, &name, value.clone())?;
                    Ok(value)
                }
                WordKind::Get => self.lookup(&name),
                WordKind::Lit => Ok(Value::Word(Word::new(name))),
                WordKind::Refinement => Ok(Value::Word(Word::with_kind(name, kind))),
            },
            Value::Function(function) => {
                let name = Value::Function(function).to_string();
                self.apply(&name, function)
            }
            other => Ok(other),
        }
    }

    fn apply(&mut self, name: &str, function: Function) -> Result<Value, EvalError> {
        let record = self
            .engine
            .record(&function)
            .ok_or_else(|| EvalError::InvalidFunction(name.to_string()))?;

        let mut args = Vec::with_capacity(record.spec.arity());
        for param in record.spec.params() {
            if self.at_end() {
                return Err(EvalError::NotEnoughArguments {
                    function: name.to_string(),
                    expected: param.name.clone(),
                });
            }
            let arg = match param.mode {
                PassingMode::Normal => self.expression()?,
                PassingMode::Literal => self.next_item().unwrap_or(Value::Unset),
                PassingMode::Get => match self.next_item() {
                    Some(Value::Word(w)) if matches!(w.kind, WordKind::Word | WordKind::Get) => {
                        self.lookup(&w.name)?
                    }
                    other => other.unwrap_or(Value::Unset),
                },
            };
            args.push(arg);
        }

        self.engine.apply_named(name, &function, &args)
    }
}
