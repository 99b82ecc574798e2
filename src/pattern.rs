//! Representation of message selectors.
//!
//! A Pattern is what gets sent and what keys a Generator's table. Patterns
//! marked as reifiers are only ever bound to reifier attributes, which receive
//! the sender's live Context rather than evaluated arguments.

use std::fmt;

use serde::{Deserialize, Serialize};


#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Pattern {
    kind: PatternKind,
    reifier: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum PatternKind {
    Unary(String),
    Operator(String),
    /// Colon-terminated keywords, in order.
    Keyword(Vec<String>),
}


impl Pattern {
    pub fn new(kind: PatternKind, reifier: bool) -> Self {
        Self { kind, reifier }
    }

    pub fn unary<S: AsRef<str>>(name: S) -> Self {
        Self::new(PatternKind::Unary(name.as_ref().to_string()), false)
    }

    pub fn operator<S: AsRef<str>>(op: S) -> Self {
        Self::new(PatternKind::Operator(op.as_ref().to_string()), false)
    }

    /// Keywords missing their trailing colon get one.
    pub fn keyword<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| {
                let k = k.as_ref();
                if k.ends_with(':') {
                    k.to_string()
                } else {
                    format!("{}:", k)
                }
            })
            .collect();
        Self::new(PatternKind::Keyword(keywords), false)
    }

    /// Same content, marked as a reifier.
    pub fn reified(self) -> Self {
        Self {
            kind: self.kind,
            reifier: true,
        }
    }

    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    pub fn is_reifier(&self) -> bool {
        self.reifier
    }

    pub fn arity(&self) -> usize {
        match &self.kind {
            PatternKind::Unary(_) => 0,
            PatternKind::Operator(_) => 1,
            PatternKind::Keyword(keywords) => keywords.len(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        match &self.kind {
            PatternKind::Keyword(keywords) => keywords,
            _ => &[],
        }
    }

    /// Write pattern of a variable: `x` -> `x:`.
    pub fn writer(&self) -> Option<Pattern> {
        match &self.kind {
            PatternKind::Unary(name) => Some(Pattern::new(
                PatternKind::Keyword(vec![format!("{}:", name)]),
                self.reifier,
            )),
            _ => None,
        }
    }

    /// Read pattern of a variable write pattern: `x:` -> `x`.
    pub fn reader(&self) -> Option<Pattern> {
        match &self.kind {
            PatternKind::Keyword(keywords) if keywords.len() == 1 => {
                let name = keywords[0].trim_end_matches(':');
                Some(Pattern::new(
                    PatternKind::Unary(name.to_string()),
                    self.reifier,
                ))
            }
            _ => None,
        }
    }
}


impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PatternKind::Unary(name) => write!(f, "{}", name),
            PatternKind::Operator(op) => write!(f, "{}", op),
            PatternKind::Keyword(keywords) => {
                for keyword in keywords {
                    write!(f, "{}", keyword)?;
                }
                Ok(())
            }
        }
    }
}


#[cfg(test)]
#[path = "./pattern_test.rs"]
mod pattern_test;
