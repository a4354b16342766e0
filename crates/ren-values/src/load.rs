//! Loader for the block mini-language used by specifications and the console.
//!
//! Supports words and their set/get/lit/refinement forms, `[` `]` blocks,
//! `"..."` and `{...}` strings with `^` escapes, `#"c"` chars, integers,
//! decimals, datatype words (`integer!`) and `;` line comments.

use thiserror::Error;

use crate::{Kind, Value, Word, WordKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("load error at offset {offset}: {message}")]
pub struct LoadError {
    pub offset: usize,
    pub message: String,
}

impl LoadError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        LoadError { offset, message: message.into() }
    }
}

/// Load `text` into the values of an implicit top-level block.
pub fn load(text: &str) -> Result<Vec<Value>, LoadError> {
    let mut scanner = Scanner { src: text, pos: 0 };
    let items = scanner.block_items()?;
    match scanner.peek() {
        None => Ok(items),
        Some(_) => Err(LoadError::new(scanner.pos, "unexpected ]")),
    }
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '[' | ']' | '"' | '{' | '}' | ';')
}

impl<'a> Scanner<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == ';' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    /// Items up to (not including) a closing `]` or end of input.
    fn block_items(&mut self) -> Result<Vec<Value>, LoadError> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None | Some(']') => return Ok(items),
                Some(_) => items.push(self.value()?),
            }
        }
    }

    fn value(&mut self) -> Result<Value, LoadError> {
        let start = self.pos;
        match self.peek() {
            Some('[') => {
                self.bump();
                let items = self.block_items()?;
                if self.bump() != Some(']') {
                    return Err(LoadError::new(start, "missing ] for block"));
                }
                Ok(Value::Block(items))
            }
            Some('"') => {
                self.bump();
                Ok(Value::String(self.quoted(start)?))
            }
            Some('{') => {
                self.bump();
                Ok(Value::String(self.braced(start)?))
            }
            Some('}') => Err(LoadError::new(start, "unexpected }")),
            _ => self.atom(),
        }
    }

    fn escape(&mut self, start: usize) -> Result<char, LoadError> {
        match self.bump() {
            Some('/') => Ok('\n'),
            Some('-') => Ok('\t'),
            Some(c) => Ok(c),
            None => Err(LoadError::new(start, "unterminated escape")),
        }
    }

    fn quoted(&mut self, start: usize) -> Result<String, LoadError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('^') => out.push(self.escape(start)?),
                Some('\n') | None => return Err(LoadError::new(start, "unterminated string")),
                Some(c) => out.push(c),
            }
        }
    }

    fn braced(&mut self, start: usize) -> Result<String, LoadError> {
        let mut out = String::new();
        let mut depth = 1usize;
        loop {
            match self.bump() {
                Some('{') => {
                    depth += 1;
                    out.push('{');
                }
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push('}');
                }
                Some('^') => out.push(self.escape(start)?),
                Some(c) => out.push(c),
                None => return Err(LoadError::new(start, "missing } for string")),
            }
        }
    }

    fn atom(&mut self) -> Result<Value, LoadError> {
        let start = self.pos;

        // #"c"
        if self.rest().starts_with("#\"") {
            self.pos += 2;
            let c = match self.bump() {
                Some('^') => self.escape(start)?,
                Some(c) => c,
                None => return Err(LoadError::new(start, "unterminated char")),
            };
            if self.bump() != Some('"') {
                return Err(LoadError::new(start, "char literal must hold one character"));
            }
            return Ok(Value::Char(c));
        }

        while let Some(c) = self.peek() {
            if is_delimiter(c) {
                break;
            }
            self.bump();
        }
        let token = &self.src[start..self.pos];
        token_value(token).ok_or_else(|| LoadError::new(start, format!("invalid token {token}")))
    }
}

fn is_word_text(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => false,
        Some(c) if matches!(c, ':' | '\'' | '/' | '#' | '$' | '@' | '%' | ',') => false,
        Some(_) => text.chars().all(|c| !matches!(c, ':' | '/' | '\'' | ',')),
        None => false,
    }
}

fn number(token: &str) -> Option<Value> {
    let digits = token.trim_start_matches(['-', '+']);
    if !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if let Ok(i) = token.parse::<i64>() {
        return Some(Value::Integer(i));
    }
    if token.contains(['.', 'e', 'E']) {
        if let Ok(n) = token.parse::<f64>() {
            return Some(Value::Decimal(n));
        }
    }
    None
}

fn token_value(token: &str) -> Option<Value> {
    if let Some(n) = number(token) {
        return Some(n);
    }
    if let Some(kind) = Kind::from_name(token) {
        return Some(Value::Datatype(kind));
    }
    let (name, flavor) = if let Some(name) = token.strip_suffix(':') {
        (name, WordKind::Set)
    } else if let Some(name) = token.strip_prefix(':') {
        (name, WordKind::Get)
    } else if let Some(name) = token.strip_prefix('\'') {
        (name, WordKind::Lit)
    } else if let Some(name) = token.strip_prefix('/') {
        (name, WordKind::Refinement)
    } else {
        (token, WordKind::Word)
    };
    // A lone `/` is the division word
    if token == "/" {
        return Some(Value::word("/"));
    }
    is_word_text(name).then(|| Value::Word(Word::with_kind(name, flavor)))
}
