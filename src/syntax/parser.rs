//! Module for parsing Agora tokens into expression trees.
//!
//! Recursive descent with Smalltalk precedence: unary binds tighter than
//! operators, operators tighter than keywords, and `:=` loosest of all.

use std::fmt;
use std::iter::Peekable;

use super::ast::{Expression, Literal, ASSIGN_OPERATOR};
use super::token::{Token, TokenKind};
use crate::error::{Error, ErrorKind};
use crate::pattern::{Pattern, PatternKind};

use self::ParseErrorReason::*;

const MAX_DEPTH: usize = 128;


pub struct Parser<I: Iterator<Item = Token>> {
    tokens: Peekable<I>,
    depth: usize,
}

#[derive(Debug)]
pub struct ParseError {
    reason: ParseErrorReason,
    token: Option<Token>,
}

#[derive(Debug)]
pub enum ParseErrorReason {
    DepthOverflow,
    UnexpectedToken,
    UnexpectedEnd,
    UnmatchedClose,
    MixedKeywords,
}


impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new<T: IntoIterator<IntoIter = I, Item = Token>>(tokens: T) -> Self {
        Self {
            tokens: tokens.into_iter().peekable(),
            depth: 0,
        }
    }

    /// Parses every remaining token as one toplevel sequence.
    pub fn parse_all(&mut self) -> Result<Vec<Expression>, ParseError> {
        let sequence = self.sequence()?;
        match self.next() {
            None => Ok(sequence),
            Some(token) => Err(ParseError {
                reason: match token.kind {
                    TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                        UnmatchedClose
                    }
                    _ => UnexpectedToken,
                },
                token: Some(token),
            }),
        }
    }

    fn peek(&mut self) -> Option<&TokenKind> {
        while let Some(Token {
            kind: TokenKind::Comment(_),
            ..
        }) = self.tokens.peek()
        {
            self.tokens.next();
        }
        self.tokens.peek().map(|t| &t.kind)
    }

    fn next(&mut self) -> Option<Token> {
        self.peek();
        self.tokens.next()
    }

    fn expect(&mut self, expected: TokenKind) -> Result<(), ParseError> {
        match self.next() {
            Some(token) if token.kind == expected => Ok(()),
            Some(token) => Err(ParseError {
                reason: UnexpectedToken,
                token: Some(token),
            }),
            None => Err(ParseError {
                reason: UnexpectedEnd,
                token: None,
            }),
        }
    }

    // sequence := [expr (';' expr)*] [';']
    fn sequence(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut sequence = vec![];
        loop {
            match self.peek() {
                None
                | Some(TokenKind::RightParen)
                | Some(TokenKind::RightBracket)
                | Some(TokenKind::RightBrace) => break,
                _ => {}
            }
            sequence.push(self.expression()?);
            if let Some(TokenKind::Semicolon) = self.peek() {
                self.next();
            } else {
                break;
            }
        }
        Ok(sequence)
    }

    // expr := operand? (KEYWORD operand)+ | operand [':=' expr]
    fn expression(&mut self) -> Result<Expression, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError {
                reason: DepthOverflow,
                token: self.next(),
            });
        }
        self.depth += 1;
        let result = self.expression_inner();
        self.depth -= 1;
        result
    }

    fn expression_inner(&mut self) -> Result<Expression, ParseError> {
        if let Some(TokenKind::Keyword(_)) | Some(TokenKind::ReifierKeyword(_)) = self.peek() {
            return self.keywords(None);
        }

        let operand = self.operand()?;
        match self.peek() {
            Some(TokenKind::ReifierOperator(op)) if op == ASSIGN_OPERATOR => {
                self.next();
                let value = self.expression()?;
                Ok(Expression::message(
                    Some(operand),
                    Pattern::operator(ASSIGN_OPERATOR).reified(),
                    vec![value],
                ))
            }
            Some(TokenKind::Keyword(_)) | Some(TokenKind::ReifierKeyword(_)) => {
                self.keywords(Some(operand))
            }
            _ => Ok(operand),
        }
    }

    fn keywords(&mut self, receiver: Option<Expression>) -> Result<Expression, ParseError> {
        let mut keywords = vec![];
        let mut arguments = vec![];
        let mut reifier = None;
        loop {
            let (keyword, is_reifier) = match self.peek() {
                Some(TokenKind::Keyword(k)) => (k.clone(), false),
                Some(TokenKind::ReifierKeyword(k)) => (k.clone(), true),
                _ => break,
            };
            let token = self.next();
            match reifier {
                Some(r) if r != is_reifier => {
                    return Err(ParseError {
                        reason: MixedKeywords,
                        token,
                    });
                }
                _ => reifier = Some(is_reifier),
            }
            keywords.push(keyword);
            arguments.push(self.operand()?);
        }

        let pattern = Pattern::new(
            PatternKind::Keyword(keywords),
            reifier.unwrap_or(false),
        );
        Ok(Expression::message(receiver, pattern, arguments))
    }

    // operand := (OPERATOR unary | unary) (OPERATOR unary)*
    fn operand(&mut self) -> Result<Expression, ParseError> {
        let mut current = match self.operator()? {
            Some(pattern) => {
                let argument = self.unary()?;
                Expression::message(None, pattern, vec![argument])
            }
            None => self.unary()?,
        };
        while let Some(pattern) = self.operator()? {
            let argument = self.unary()?;
            current = Expression::message(Some(current), pattern, vec![argument]);
        }
        Ok(current)
    }

    /// Consumes an operator, leaving `:=` for the expression level.
    fn operator(&mut self) -> Result<Option<Pattern>, ParseError> {
        let pattern = match self.peek() {
            Some(TokenKind::Operator(op)) => Pattern::operator(op),
            Some(TokenKind::ReifierOperator(op)) if op != ASSIGN_OPERATOR => {
                Pattern::operator(op).reified()
            }
            _ => return Ok(None),
        };
        self.next();
        Ok(Some(pattern))
    }

    // unary := primary IDENT*
    fn unary(&mut self) -> Result<Expression, ParseError> {
        let mut current = self.primary()?;
        loop {
            let pattern = match self.peek() {
                Some(TokenKind::Identifier(name)) => Pattern::unary(name),
                Some(TokenKind::ReifierIdentifier(name)) => Pattern::unary(name).reified(),
                _ => break,
            };
            self.next();
            current = Expression::message(Some(current), pattern, vec![]);
        }
        Ok(current)
    }

    // primary := literal | IDENT | '(' expr ')' | '[' sequence ']' | '{' sequence '}'
    fn primary(&mut self) -> Result<Expression, ParseError> {
        let token = match self.next() {
            Some(token) => token,
            None => {
                return Err(ParseError {
                    reason: UnexpectedEnd,
                    token: None,
                })
            }
        };

        match token.kind {
            TokenKind::Integer(i) => Ok(Expression::Literal(Literal::Integer(i))),
            TokenKind::Float(v) => Ok(Expression::Literal(Literal::Float(v))),
            TokenKind::Text(s) => Ok(Expression::Literal(Literal::Text(s))),
            TokenKind::Identifier(name) => {
                Ok(Expression::message(None, Pattern::unary(name), vec![]))
            }
            TokenKind::ReifierIdentifier(name) => Ok(Expression::message(
                None,
                Pattern::unary(name).reified(),
                vec![],
            )),
            TokenKind::LeftParen => {
                let inner = self.expression()?;
                self.expect(TokenKind::RightParen)?;
                Ok(inner)
            }
            TokenKind::LeftBracket => {
                let body = self.nested()?;
                self.expect(TokenKind::RightBracket)?;
                Ok(Expression::Block(body))
            }
            TokenKind::LeftBrace => {
                let body = self.nested()?;
                self.expect(TokenKind::RightBrace)?;
                Ok(Expression::Aggregate(body))
            }
            TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                Err(ParseError {
                    reason: UnmatchedClose,
                    token: Some(token),
                })
            }
            _ => Err(ParseError {
                reason: UnexpectedToken,
                token: Some(token),
            }),
        }
    }

    fn nested(&mut self) -> Result<Vec<Expression>, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError {
                reason: DepthOverflow,
                token: None,
            });
        }
        self.depth += 1;
        let result = self.sequence();
        self.depth -= 1;
        result
    }
}


impl ParseError {
    pub fn reason(&self) -> &ParseErrorReason {
        &self.reason
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Parse Error]: {:?}", self.reason)?;
        match &self.token {
            Some(token) => write!(f, " at {}", token),
            None => write!(f, " at end of input"),
        }
    }
}

impl From<ParseError> for Error {
    fn from(error: ParseError) -> Self {
        Error::no_cont(ErrorKind::Parse(error.to_string()))
    }
}


#[cfg(test)]
#[path = "./parser_test.rs"]
mod parser_test;
