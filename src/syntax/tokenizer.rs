//! Module for breaking Agora text into tokens.

use std::collections::VecDeque;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use super::token::{Token, TokenKind};
use crate::error::{Error, ErrorKind};

use self::TokenizerState::*;


lazy_static! {
    static ref REIFIER_NAME: Regex = Regex::new(r"^[A-Z][A-Z0-9_]+$").unwrap();
}

const OPERATOR_CHARS: &str = "+-*/<>=~!&|%\\@?,";

/// Essentially a Mealy machine that outputs and accumulates Tokens
/// given string-like input.
pub struct Tokenizer {
    // Mealy machine state.
    state: TokenizerState,
    depth: usize,
    // Decides whether a '-' before a digit is a sign or an operator.
    after_operand: bool,

    line_count: usize,
    tokens: VecDeque<Token>,
}

#[derive(Debug)]
enum TokenizerState {
    Base,
    // (String accumulated so far, (line, col) of the opening quote).
    InString(String, (usize, usize)),
    InStringEscaped(String, (usize, usize)),
}


#[derive(Debug)]
pub struct TokenizeError {
    line: usize,
    col: usize,
    kind: TokenizeErrorKind,
}

#[derive(Debug)]
pub enum TokenizeErrorKind {
    UnexpectedChar(char),
    InvalidNumber(String),
    UnterminatedString,
}


pub fn is_reifier_name(name: &str) -> bool {
    REIFIER_NAME.is_match(name)
}

pub fn is_operator_char(c: char) -> bool {
    OPERATOR_CHARS.contains(c)
}

/// Tokens of a complete source text.
pub fn tokenize_str<S: AsRef<str>>(input: S) -> Result<Vec<Token>, TokenizeError> {
    let mut tokenizer = Tokenizer::new();
    tokenizer.tokenize(input)?;
    tokenizer.finish()?;
    Ok(tokenizer.tokens.into_iter().collect())
}


impl Tokenizer {
    pub fn new() -> Self {
        Self {
            state: Base,
            depth: 0,
            after_operand: false,

            line_count: 0,
            tokens: Default::default(),
        }
    }

    pub fn clear(&mut self) {
        self.state = Base;
        self.depth = 0;
        self.after_operand = false;

        self.tokens.clear();
    }

    /// Open brackets not yet closed; an open string counts as one.
    pub fn depth(&self) -> usize {
        let in_string = !matches!(self.state, Base);
        std::cmp::max(self.depth, in_string as usize)
    }

    pub fn tokenize<S: AsRef<str>>(&mut self, input: S) -> Result<(), TokenizeError> {
        for line in input.as_ref().split('\n') {
            self.tokenize_line(line)?;
        }
        Ok(())
    }

    /// Errors if input ended inside a string.
    pub fn finish(&self) -> Result<(), TokenizeError> {
        match &self.state {
            Base => Ok(()),
            InString(_, (line, col)) | InStringEscaped(_, (line, col)) => Err(TokenizeError {
                line: *line,
                col: *col,
                kind: TokenizeErrorKind::UnterminatedString,
            }),
        }
    }

    fn tokenize_line(&mut self, line: &str) -> Result<(), TokenizeError> {
        let chars = line.chars().collect::<Vec<_>>();
        let mut i = 0;
        while i < chars.len() {
            if matches!(self.state, Base) {
                i = self.scan(&chars, i)?;
                continue;
            }

            let c = chars[i];
            i += 1;
            match &mut self.state {
                InString(s, start) => match c {
                    '\\' => {
                        let curr_str = std::mem::take(s);
                        self.state = InStringEscaped(curr_str, *start);
                    }
                    '"' => {
                        let (line, col) = *start;
                        let curr_str = std::mem::take(s);
                        self.tokens.push_back(Token {
                            kind: TokenKind::Text(curr_str),
                            line,
                            col,
                        });
                        self.after_operand = true;
                        self.state = Base;
                    }
                    _ => s.push(c),
                },
                InStringEscaped(s, start) => {
                    let mut curr_str = std::mem::take(s);
                    curr_str.push(unescape_char(c));
                    self.state = InString(curr_str, *start);
                }
                Base => {}
            }
        }

        // EOL handling.
        match &mut self.state {
            InString(s, _) => s.push('\n'),
            InStringEscaped(s, start) => {
                // \ followed by EOL simply means ignore the newline.
                let curr_str = std::mem::take(s);
                self.state = InString(curr_str, *start);
            }
            Base => {}
        }

        self.line_count += 1;
        Ok(())
    }

    /// Consumes one token (or whitespace) starting at `start`; returns the
    /// index just past it.
    fn scan(&mut self, chars: &[char], start: usize) -> Result<usize, TokenizeError> {
        let c = chars[start];
        let next = chars.get(start + 1).copied();

        if c.is_whitespace() {
            return Ok(start + 1);
        }

        let punctuation = match c {
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            '[' => Some(TokenKind::LeftBracket),
            ']' => Some(TokenKind::RightBracket),
            '{' => Some(TokenKind::LeftBrace),
            '}' => Some(TokenKind::RightBrace),
            ';' => Some(TokenKind::Semicolon),
            _ => None,
        };
        if let Some(kind) = punctuation {
            match kind {
                TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => {
                    self.depth += 1
                }
                TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                    self.depth = self.depth.saturating_sub(1)
                }
                _ => {}
            }
            self.emit(kind, start);
            return Ok(start + 1);
        }

        match c {
            '#' => {
                let comment = chars[start..].iter().collect();
                self.tokens.push_back(Token {
                    kind: TokenKind::Comment(comment),
                    line: self.line_count,
                    col: start,
                });
                Ok(chars.len())
            }
            '"' => {
                self.state = InString(String::default(), (self.line_count, start));
                Ok(start + 1)
            }
            ':' if next == Some('=') => {
                self.emit(TokenKind::ReifierOperator(":=".to_string()), start);
                Ok(start + 2)
            }
            _ if c.is_ascii_digit() => self.scan_number(chars, start),
            '-' if !self.after_operand && next.map_or(false, |n| n.is_ascii_digit()) => {
                self.scan_number(chars, start)
            }
            _ if c.is_ascii_alphabetic() || c == '_' => Ok(self.scan_word(chars, start)),
            _ if is_operator_char(c) => {
                let end = start
                    + chars[start..]
                        .iter()
                        .take_while(|c| is_operator_char(**c))
                        .count();
                let op = chars[start..end].iter().collect();
                self.emit(TokenKind::Operator(op), start);
                Ok(end)
            }
            _ => Err(TokenizeError {
                line: self.line_count,
                col: start,
                kind: TokenizeErrorKind::UnexpectedChar(c),
            }),
        }
    }

    fn scan_number(&mut self, chars: &[char], start: usize) -> Result<usize, TokenizeError> {
        let digits_from = |from: usize| {
            from + chars[from..]
                .iter()
                .take_while(|c| c.is_ascii_digit())
                .count()
        };

        let mut end = digits_from(start + 1);
        let mut float = false;
        if end + 1 < chars.len() && chars[end] == '.' && chars[end + 1].is_ascii_digit() {
            float = true;
            end = digits_from(end + 1);
        }

        let text = chars[start..end].iter().collect::<String>();
        let trailing = chars.get(end).map_or(false, |c| c.is_ascii_alphabetic() || *c == '_');
        let kind = if trailing {
            None
        } else if float {
            text.parse::<f64>().ok().map(TokenKind::Float)
        } else {
            text.parse::<i64>().ok().map(TokenKind::Integer)
        };

        match kind {
            Some(kind) => {
                self.emit(kind, start);
                Ok(end)
            }
            None => Err(TokenizeError {
                line: self.line_count,
                col: start,
                kind: TokenizeErrorKind::InvalidNumber(text),
            }),
        }
    }

    fn scan_word(&mut self, chars: &[char], start: usize) -> usize {
        let end = start
            + chars[start..]
                .iter()
                .take_while(|c| c.is_ascii_alphanumeric() || **c == '_')
                .count();
        let word = chars[start..end].iter().collect::<String>();
        let reifier = is_reifier_name(&word);

        // `x:=` is an assignment, not the keyword `x:`.
        let keyword = chars.get(end) == Some(&':') && chars.get(end + 1) != Some(&'=');
        if keyword {
            let keyword = format!("{}:", word);
            let kind = if reifier {
                TokenKind::ReifierKeyword(keyword)
            } else {
                TokenKind::Keyword(keyword)
            };
            self.emit(kind, start);
            return end + 1;
        }

        let kind = if reifier {
            TokenKind::ReifierIdentifier(word)
        } else {
            TokenKind::Identifier(word)
        };
        self.emit(kind, start);
        end
    }

    fn emit(&mut self, kind: TokenKind, col: usize) {
        self.after_operand = kind.ends_operand();
        self.tokens.push_back(Token {
            kind,
            line: self.line_count,
            col,
        });
    }
}

fn unescape_char(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        _ => c,
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Tokenizer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }
}


impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Tokenize Error]: {:?} @ ({}, {})",
            self.kind, self.line, self.col
        )
    }
}

impl From<TokenizeError> for Error {
    fn from(error: TokenizeError) -> Self {
        Error::no_cont(ErrorKind::Parse(error.to_string()))
    }
}


#[cfg(test)]
#[path = "./tokenizer_test.rs"]
mod tokenizer_test;
