//! Agora surface syntax: tokens, expression trees and the parser.

use crate::error::Error;

// Public exports.
pub use ast::{unparse_sequence, Expression, Literal, Message};
pub use parser::{ParseError, ParseErrorReason, Parser};
pub use token::{Token, TokenKind};
pub use tokenizer::{is_reifier_name, tokenize_str, TokenizeError, Tokenizer};

// Public mods.
pub mod ast;
pub mod token;

#[cfg(feature = "cli")]
pub mod cli_stream;

// Private mods.
mod parser;
mod tokenizer;


/// Parses a complete source text into its toplevel statements.
pub fn parse<S: AsRef<str>>(source: S) -> Result<Vec<Expression>, Error> {
    let tokens = tokenize_str(source)?;
    Ok(Parser::new(tokens).parse_all()?)
}
