//! Behaviors bound to patterns in a Generator's table.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::generator::CellId;
use crate::bridge::Level;
use crate::syntax::Expression;


#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Attribute {
    VarGet(Slot),
    VarSet(Slot),
    PrimFunction(NativeRef),
    PrimMethod(NativeRef),
    PrimCloning(NativeRef),
    /// Named entry of the reifier table.
    PrimReifierMethod(String),
    UserMethod(UserMethod),
}

/// Storage behind a variable attribute.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Slot {
    Cell(CellId),
    /// Named field of the receiver's host instance.
    Field(String),
}

/// Reference to a native by owning class, level and selector, resolved
/// through the ClassRegistry at call time.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct NativeRef {
    class: String,
    level: Level,
    selector: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct UserMethod {
    formals: Vec<String>,
    body: Expression,
}


impl Attribute {
    pub fn is_reifier(&self) -> bool {
        matches!(self, Attribute::PrimReifierMethod(_))
    }

    /// Cell this attribute reads or writes, if any.
    pub fn cell(&self) -> Option<CellId> {
        match self {
            Attribute::VarGet(Slot::Cell(cell)) | Attribute::VarSet(Slot::Cell(cell)) => {
                Some(*cell)
            }
            _ => None,
        }
    }

    pub fn with_cell(&self, cell: CellId) -> Self {
        match self {
            Attribute::VarGet(Slot::Cell(_)) => Attribute::VarGet(Slot::Cell(cell)),
            Attribute::VarSet(Slot::Cell(_)) => Attribute::VarSet(Slot::Cell(cell)),
            other => other.clone(),
        }
    }
}

impl NativeRef {
    pub fn new<S: Into<String>, T: Into<String>>(class: S, level: Level, selector: T) -> Self {
        Self {
            class: class.into(),
            level,
            selector: selector.into(),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }
}

impl UserMethod {
    pub fn new(formals: Vec<String>, body: Expression) -> Self {
        Self { formals, body }
    }

    pub fn formals(&self) -> &[String] {
        &self.formals
    }

    pub fn body(&self) -> &Expression {
        &self.body
    }
}


impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::VarGet(slot) => write!(f, "VarGet({})", slot),
            Attribute::VarSet(slot) => write!(f, "VarSet({})", slot),
            Attribute::PrimFunction(native) => write!(f, "PrimFunction({})", native),
            Attribute::PrimMethod(native) => write!(f, "PrimMethod({})", native),
            Attribute::PrimCloning(native) => write!(f, "PrimCloning({})", native),
            Attribute::PrimReifierMethod(name) => write!(f, "PrimReifierMethod({})", name),
            Attribute::UserMethod(method) => {
                write!(f, "UserMethod({})", method.formals.join(", "))
            }
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Cell(cell) => write!(f, "{}", cell),
            Slot::Field(name) => write!(f, "field {}", name),
        }
    }
}

impl fmt::Display for NativeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}>>{}", self.class, self.level, self.selector)
    }
}
