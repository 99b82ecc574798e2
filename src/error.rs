//! Representation of errors which can surface from evaluating Agora.
//!
//! Only ErrorKind::Exception can be intercepted by a TRY:CATCH: frame; every
//! other kind unwinds to the outermost caller.

use std::borrow::Cow;
use std::fmt;
use std::io;

use derivative::Derivative;
use serde::{de, ser};

use crate::continuation::SendCont;
use crate::model::AgoraObject;
use crate::pattern::Pattern;


/// Creates an Error carrying the Universe's in-flight sends, wrapped in Err.
#[macro_export]
macro_rules! err {
    ($universe:expr, $($kind:tt)+) => {
        Err($crate::error::Error::with_cont(
            $universe.sends().clone(),
            $($kind)+,
        ))
    };
}

/// Creates a stateless Error wrapped in Err.
///
/// Dispatch attaches the send trace when the Error passes through it.
#[macro_export]
macro_rules! err_nost {
    ($($kind:tt)+) => {
        Err($crate::error::Error::no_cont($($kind)+))
    };
}


#[derive(Derivative)]
#[derivative(PartialEq)]
pub struct Error {
    #[derivative(PartialEq = "ignore")]
    cont: Option<SendCont>,
    kind: ErrorKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ErrorKind {
    MessageNotUnderstood {
        pattern: Pattern,
        receiver: AgoraObject,
    },
    ProgramError(Cow<'static, str>),
    ReifierMisused {
        pattern: Pattern,
        reason: Cow<'static, str>,
    },
    PrimException {
        operation: String,
        message: String,
    },
    Halt(String),
    Exception(ExceptionRecord),
    Parse(String),
}

/// A raised language-level exception.
///
/// `handler` is the id of the handler active where RAISE ran; only the
/// TRY:CATCH: that installed it may intercept the record.
#[derive(Clone, Debug, PartialEq)]
pub struct ExceptionRecord {
    pub pattern: Pattern,
    pub actuals: Vec<AgoraObject>,
    pub handler: Option<u64>,
}


impl Error {
    /// Prefer using err! for convenience.
    pub fn with_cont(cont: SendCont, kind: ErrorKind) -> Self {
        Self {
            cont: Some(cont),
            kind,
        }
    }

    /// Prefer using stateful Error when possible.
    pub fn no_cont(kind: ErrorKind) -> Self {
        Self { cont: None, kind }
    }

    pub fn prim<S: Into<String>, T: fmt::Display>(operation: S, message: T) -> Self {
        Self::no_cont(ErrorKind::PrimException {
            operation: operation.into(),
            message: message.to_string(),
        })
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn cont(&self) -> Option<&SendCont> {
        self.cont.as_ref()
    }

    pub fn consume(self) -> ErrorKind {
        self.kind
    }

    pub fn set_cont(&mut self, cont: SendCont) {
        self.cont = Some(cont)
    }

    pub fn has_cont(&self) -> bool {
        self.cont.is_some()
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// Pattern involved in the failure, if any.
    pub fn pattern(&self) -> Option<&Pattern> {
        match &self.kind {
            ErrorKind::MessageNotUnderstood { pattern, .. } => Some(pattern),
            ErrorKind::ReifierMisused { pattern, .. } => Some(pattern),
            ErrorKind::Exception(record) => Some(&record.pattern),
            _ => None,
        }
    }

    /// Language objects the error carries out of the sends it unwinds.
    pub fn objects(&self) -> Vec<&AgoraObject> {
        match &self.kind {
            ErrorKind::MessageNotUnderstood { receiver, .. } => vec![receiver],
            ErrorKind::Exception(record) => record.actuals.iter().collect(),
            _ => vec![],
        }
    }

    pub fn receiver(&self) -> Option<&AgoraObject> {
        match &self.kind {
            ErrorKind::MessageNotUnderstood { receiver, .. } => Some(receiver),
            _ => None,
        }
    }
}


impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MessageNotUnderstood { pattern, receiver } => {
                write!(f, "Message not understood: {} by {}", pattern, receiver)
            }
            ErrorKind::ProgramError(message) => write!(f, "{}", message),
            ErrorKind::ReifierMisused { pattern, reason } => {
                write!(f, "Reifier {} misused: {}", pattern, reason)
            }
            ErrorKind::PrimException { operation, message } => {
                write!(f, "Primitive {} failed: {}", operation, message)
            }
            ErrorKind::Halt(message) => write!(f, "{}", message),
            ErrorKind::Exception(record) => {
                if record.handler.is_none() {
                    write!(f, "Uncaught exception ")?;
                } else {
                    write!(f, "Exception ")?;
                }
                write!(f, "{}", record.pattern)
            }
            ErrorKind::Parse(message) => write!(f, "Parse error: {}", message),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(cont) = &self.cont {
            write!(f, "; {}", cont)?;
        }
        Ok(())
    }
}


impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::prim("io", error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::prim("image", error)
    }
}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::prim("store", msg)
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::prim("load", msg)
    }
}
