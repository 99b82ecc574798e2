use std::fmt;


#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Integer(i64),
    Float(f64),
    Text(String),

    Identifier(String),
    /// Identifier with its trailing colon.
    Keyword(String),
    Operator(String),
    ReifierIdentifier(String),
    ReifierKeyword(String),
    ReifierOperator(String),

    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Semicolon,
    Comment(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}


impl TokenKind {
    /// Whether an operand may end with this token.
    pub fn ends_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Integer(_)
                | TokenKind::Float(_)
                | TokenKind::Text(_)
                | TokenKind::Identifier(_)
                | TokenKind::ReifierIdentifier(_)
                | TokenKind::RightParen
                | TokenKind::RightBracket
                | TokenKind::RightBrace
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Integer(i) => write!(f, "{}", i)?,
            TokenKind::Float(v) => write!(f, "{:?}", v)?,
            TokenKind::Text(s) => write!(f, "{:?}", s)?,
            TokenKind::Identifier(s)
            | TokenKind::Keyword(s)
            | TokenKind::Operator(s)
            | TokenKind::ReifierIdentifier(s)
            | TokenKind::ReifierKeyword(s)
            | TokenKind::ReifierOperator(s) => write!(f, "{}", s)?,
            other => write!(f, "{:?}", other)?,
        }
        write!(f, " @ ({}, {})", self.line, self.col)
    }
}
