//! Expression trees produced by the parser.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bridge::HostValue;
use crate::error::Error;
use crate::model::{AgoraObject, Context};
use crate::pattern::{Pattern, PatternKind};
use crate::universe::{Universe, STACK_GROW_SIZE, STACK_RED_ZONE};


// Binding strength, tightest first; used to decide where unparse needs
// parentheses.
const PRIMARY: u8 = 0;
const UNARY: u8 = 1;
const BINARY: u8 = 2;
const KEYWORD: u8 = 3;
const ASSIGN: u8 = 4;

pub const ASSIGN_OPERATOR: &str = ":=";

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Expression {
    Literal(Literal),
    Message(Box<Message>),
    /// Message whose pattern is a reifier pattern.
    Reifier(Box<Message>),
    /// `[ ... ]`, evaluated in a nested scope.
    Block(Vec<Expression>),
    /// `{ ... }`, evaluated into a new object.
    Aggregate(Vec<Expression>),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Text(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Message {
    receiver: Option<Expression>,
    pattern: Pattern,
    arguments: Vec<Expression>,
}


impl Expression {
    /// Message or Reifier node, depending on the pattern.
    pub fn message(receiver: Option<Expression>, pattern: Pattern, arguments: Vec<Expression>) -> Self {
        let reifier = pattern.is_reifier();
        let message = Box::new(Message {
            receiver,
            pattern,
            arguments,
        });
        if reifier {
            Expression::Reifier(message)
        } else {
            Expression::Message(message)
        }
    }

    /// Receiverless unary reifier such as `SELF`.
    pub fn is_reifier_named(&self, name: &str) -> bool {
        match self {
            Expression::Reifier(m) => {
                m.receiver.is_none()
                    && m.arguments.is_empty()
                    && matches!(m.pattern.kind(), PatternKind::Unary(n) if n == name)
            }
            _ => false,
        }
    }

    /// `x` in `x VARIABLE: 3`.
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Expression::Message(m) if m.receiver.is_none() => match m.pattern.kind() {
                PatternKind::Unary(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// Receiverless user message, optionally qualified by PUBLIC.
    pub fn is_pattern_form(&self) -> bool {
        match self {
            Expression::Message(m) => m.receiver.is_none(),
            Expression::Reifier(m) if m.pattern == Pattern::unary("PUBLIC").reified() => {
                matches!(&m.receiver, Some(Expression::Message(inner)) if inner.receiver.is_none())
            }
            _ => false,
        }
    }

    pub fn eval(&self, universe: &mut Universe, context: &Context) -> Result<AgoraObject, Error> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(universe, context))
    }

    fn eval_inner(&self, universe: &mut Universe, context: &Context) -> Result<AgoraObject, Error> {
        match self {
            Expression::Literal(literal) => universe.up(literal.host_value()),
            Expression::Message(message) => universe.send_message(message, context),
            Expression::Reifier(message) => universe.send_reifier(message, context),
            Expression::Block(body) => universe.eval_block(body, context),
            Expression::Aggregate(body) => universe.eval_aggregate(body, context),
        }
    }

    fn level(&self) -> u8 {
        match self {
            Expression::Literal(_) | Expression::Block(_) | Expression::Aggregate(_) => PRIMARY,
            Expression::Message(m) | Expression::Reifier(m) => match m.pattern.kind() {
                PatternKind::Unary(_) if m.receiver.is_none() => PRIMARY,
                PatternKind::Unary(_) => UNARY,
                PatternKind::Operator(op) if op == ASSIGN_OPERATOR => ASSIGN,
                PatternKind::Operator(_) => BINARY,
                PatternKind::Keyword(_) => KEYWORD,
            },
        }
    }

    /// Source text that parses back to this expression.
    pub fn unparse(&self, indent: usize) -> String {
        match self {
            Expression::Literal(literal) => literal.to_string(),
            Expression::Message(m) | Expression::Reifier(m) => m.unparse(indent),
            Expression::Block(body) => unparse_body("[", body, "]", indent),
            Expression::Aggregate(body) => unparse_body("{", body, "}", indent),
        }
    }

    fn unparse_within(&self, indent: usize, max_level: u8) -> String {
        let text = self.unparse(indent);
        if self.level() > max_level {
            format!("({})", text)
        } else {
            text
        }
    }
}

impl Message {
    pub fn receiver(&self) -> Option<&Expression> {
        self.receiver.as_ref()
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn arguments(&self) -> &[Expression] {
        &self.arguments
    }

    fn unparse(&self, indent: usize) -> String {
        let (receiver_level, text) = match self.pattern.kind() {
            PatternKind::Unary(name) => (UNARY, name.clone()),
            PatternKind::Operator(op) => {
                let max_level = if op == ASSIGN_OPERATOR { ASSIGN } else { UNARY };
                let argument = self
                    .arguments
                    .iter()
                    .map(|a| a.unparse_within(indent, max_level))
                    .collect::<Vec<_>>()
                    .join(" ");
                (BINARY, format!("{} {}", op, argument))
            }
            PatternKind::Keyword(keywords) => {
                let parts = keywords
                    .iter()
                    .zip(self.arguments.iter())
                    .map(|(k, a)| format!("{} {}", k, a.unparse_within(indent, BINARY)))
                    .collect::<Vec<_>>();
                (BINARY, parts.join(" "))
            }
        };
        match &self.receiver {
            Some(receiver) => format!("{} {}", receiver.unparse_within(indent, receiver_level), text),
            None => text,
        }
    }
}

impl Literal {
    pub fn host_value(&self) -> HostValue {
        match self {
            Literal::Integer(i) => HostValue::Integer(*i),
            Literal::Float(v) => HostValue::Float(*v),
            Literal::Text(s) => HostValue::Text(s.clone()),
        }
    }
}

/// Statements separated the way the parser reads them back.
pub fn unparse_sequence(body: &[Expression], indent: usize) -> String {
    body.iter()
        .map(|e| format!("{}{}", "  ".repeat(indent), e.unparse(indent)))
        .collect::<Vec<_>>()
        .join(";\n")
}

fn unparse_body(open: &str, body: &[Expression], close: &str, indent: usize) -> String {
    if body.is_empty() {
        return format!("{}{}", open, close);
    }
    format!(
        "{}\n{}\n{}{}",
        open,
        unparse_sequence(body, indent + 1),
        "  ".repeat(indent),
        close
    )
}


impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::Text(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        _ => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.unparse(0))
    }
}
