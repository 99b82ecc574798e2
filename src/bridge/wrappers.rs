//! Built-in wrapper types for host primitives.
//!
//! Each wrapper declares its exact surface rather than going through
//! pattern derivation. Object is the base of every reflected class.

use std::borrow::Cow;

use super::class::{ClassSpec, SurfaceEntry};
use super::host_value::{HostValue, Instances};
use crate::error::{Error, ErrorKind};
use crate::pattern::Pattern;
use crate::surface;


pub const WRAPPER_PACKAGE: &str = "lang";
pub const OBJECT: &str = "Object";


pub fn wrapper_specs() -> Vec<ClassSpec> {
    vec![
        ClassSpec::declared(OBJECT, WRAPPER_PACKAGE, object_surface()),
        ClassSpec::declared("Nil", WRAPPER_PACKAGE, nil_surface()).extends(OBJECT),
        ClassSpec::declared("Boolean", WRAPPER_PACKAGE, boolean_surface()).extends(OBJECT),
        ClassSpec::declared("True", WRAPPER_PACKAGE, true_surface()).extends("Boolean"),
        ClassSpec::declared("False", WRAPPER_PACKAGE, false_surface()).extends("Boolean"),
        ClassSpec::declared("Integer", WRAPPER_PACKAGE, number_surface()).extends(OBJECT),
        ClassSpec::declared("Float", WRAPPER_PACKAGE, number_surface()).extends(OBJECT),
        ClassSpec::declared("String", WRAPPER_PACKAGE, string_surface()).extends(OBJECT),
        ClassSpec::declared("Package", WRAPPER_PACKAGE, package_surface()).extends(OBJECT),
    ]
}

/// Wrapper class answering for a primitive host value, if any.
pub fn wrapper_for(value: &HostValue) -> Option<&'static str> {
    match value {
        HostValue::Nil => Some("Nil"),
        HostValue::Boolean(true) => Some("True"),
        HostValue::Boolean(false) => Some("False"),
        HostValue::Integer(_) => Some("Integer"),
        HostValue::Float(_) => Some("Float"),
        HostValue::Text(_) => Some("String"),
        HostValue::Package(_) => Some("Package"),
        HostValue::Class(_) | HostValue::Instance(_) => None,
    }
}

fn object_surface() -> Vec<SurfaceEntry> {
    surface![
        Instance Method Pattern::unary("primitive") => answer_false,
        Instance Method Pattern::unary("isNil") => answer_false,
        Instance Method Pattern::unary("printString") => print_string,
        Instance Method Pattern::operator("=") => equal,
    ]
}

fn nil_surface() -> Vec<SurfaceEntry> {
    surface![
        Instance Method Pattern::unary("primitive") => answer_true,
        Instance Method Pattern::unary("isNil") => answer_true,
    ]
}

fn boolean_surface() -> Vec<SurfaceEntry> {
    surface![
        Instance Method Pattern::unary("primitive") => answer_true,
        Instance Method Pattern::unary("not") => not,
        Instance Method Pattern::operator("&") => and,
        Instance Method Pattern::operator("|") => or,
    ]
}

/// Each truth value picks its branch by which generator answers.
fn true_surface() -> Vec<SurfaceEntry> {
    surface![
        Instance Reifier Pattern::keyword(vec!["IFTRUE:", "IFFALSE:"]).reified() => "True>>IFTRUE:IFFALSE:",
        Instance Reifier Pattern::keyword(vec!["IFTRUE:"]).reified() => "True>>IFTRUE:",
        Instance Reifier Pattern::keyword(vec!["IFFALSE:"]).reified() => "True>>IFFALSE:",
    ]
}

fn false_surface() -> Vec<SurfaceEntry> {
    surface![
        Instance Reifier Pattern::keyword(vec!["IFTRUE:", "IFFALSE:"]).reified() => "False>>IFTRUE:IFFALSE:",
        Instance Reifier Pattern::keyword(vec!["IFTRUE:"]).reified() => "False>>IFTRUE:",
        Instance Reifier Pattern::keyword(vec!["IFFALSE:"]).reified() => "False>>IFFALSE:",
    ]
}

fn number_surface() -> Vec<SurfaceEntry> {
    surface![
        Instance Method Pattern::unary("primitive") => answer_true,
        Instance Method Pattern::operator("+") => add,
        Instance Method Pattern::operator("-") => sub,
        Instance Method Pattern::operator("*") => mul,
        Instance Method Pattern::operator("/") => div,
        Instance Method Pattern::operator("<") => less,
        Instance Method Pattern::operator(">") => greater,
        Instance Method Pattern::unary("abs") => abs,
    ]
}

fn string_surface() -> Vec<SurfaceEntry> {
    surface![
        Instance Method Pattern::unary("primitive") => answer_true,
        Instance Method Pattern::operator("+") => concat,
        Instance Method Pattern::unary("size") => size,
    ]
}

fn package_surface() -> Vec<SurfaceEntry> {
    surface![
        Instance Method Pattern::unary("name") => package_name,
    ]
}


fn illegal(op: &str) -> Error {
    Error::no_cont(ErrorKind::ProgramError(Cow::Owned(format!(
        "Illegal Argument for {}",
        op
    ))))
}

fn receiver<'a>(op: &str, receiver: Option<&'a HostValue>) -> Result<&'a HostValue, Error> {
    receiver.ok_or_else(|| Error::prim(op, "missing receiver"))
}

fn single(op: &str, args: Vec<HostValue>) -> Result<HostValue, Error> {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(arg), None) => Ok(arg),
        _ => Err(Error::prim(op, "expected exactly one argument")),
    }
}


fn answer_true(_: &mut Instances, _: Option<&HostValue>, _: Vec<HostValue>) -> Result<HostValue, Error> {
    Ok(HostValue::Boolean(true))
}

fn answer_false(_: &mut Instances, _: Option<&HostValue>, _: Vec<HostValue>) -> Result<HostValue, Error> {
    Ok(HostValue::Boolean(false))
}

fn print_string(
    instances: &mut Instances,
    recv: Option<&HostValue>,
    _: Vec<HostValue>,
) -> Result<HostValue, Error> {
    let text = match receiver("printString", recv)? {
        HostValue::Instance(id) => format!("a {}", instances.get(*id)?.class()),
        HostValue::Text(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(HostValue::Text(text))
}

fn equal(_: &mut Instances, recv: Option<&HostValue>, args: Vec<HostValue>) -> Result<HostValue, Error> {
    let lhs = receiver("=", recv)?;
    let rhs = single("=", args)?;
    let result = match (lhs, &rhs) {
        (HostValue::Integer(a), HostValue::Float(b)) => (*a as f64) == *b,
        (HostValue::Float(a), HostValue::Integer(b)) => *a == (*b as f64),
        (a, b) => a == b,
    };
    Ok(HostValue::Boolean(result))
}

fn not(_: &mut Instances, recv: Option<&HostValue>, _: Vec<HostValue>) -> Result<HostValue, Error> {
    match receiver("not", recv)? {
        HostValue::Boolean(b) => Ok(HostValue::Boolean(!b)),
        _ => Err(illegal("not")),
    }
}

fn logical(op: &str, recv: Option<&HostValue>, args: Vec<HostValue>) -> Result<(bool, bool), Error> {
    match (receiver(op, recv)?, single(op, args)?) {
        (HostValue::Boolean(a), HostValue::Boolean(b)) => Ok((*a, b)),
        _ => Err(illegal(op)),
    }
}

fn and(_: &mut Instances, recv: Option<&HostValue>, args: Vec<HostValue>) -> Result<HostValue, Error> {
    let (a, b) = logical("&", recv, args)?;
    Ok(HostValue::Boolean(a && b))
}

fn or(_: &mut Instances, recv: Option<&HostValue>, args: Vec<HostValue>) -> Result<HostValue, Error> {
    let (a, b) = logical("|", recv, args)?;
    Ok(HostValue::Boolean(a || b))
}


enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    fn of(op: &str, value: &HostValue) -> Result<Self, Error> {
        match value {
            HostValue::Integer(i) => Ok(Number::Integer(*i)),
            HostValue::Float(v) => Ok(Number::Float(*v)),
            _ => Err(illegal(op)),
        }
    }

    fn as_float(&self) -> f64 {
        match self {
            Number::Integer(i) => *i as f64,
            Number::Float(v) => *v,
        }
    }
}

/// Integer op Integer stays Integer; any Float operand widens to Float.
fn arithmetic(
    op: &'static str,
    recv: Option<&HostValue>,
    args: Vec<HostValue>,
) -> Result<HostValue, Error> {
    let lhs = Number::of(op, receiver(op, recv)?)?;
    let rhs = Number::of(op, &single(op, args)?)?;

    if let (Number::Integer(a), Number::Integer(b)) = (&lhs, &rhs) {
        let (a, b) = (*a, *b);
        let result = match op {
            "+" => a.checked_add(b),
            "-" => a.checked_sub(b),
            "*" => a.checked_mul(b),
            "/" if b == 0 => {
                return Err(Error::no_cont(ErrorKind::ProgramError(
                    "Division by zero".into(),
                )))
            }
            "/" => a.checked_div(b),
            "<" => return Ok(HostValue::Boolean(a < b)),
            ">" => return Ok(HostValue::Boolean(a > b)),
            _ => return Err(Error::prim(op, "unknown arithmetic operator")),
        };
        return result
            .map(HostValue::Integer)
            .ok_or_else(|| Error::prim(op, "Integer overflow"));
    }

    let (a, b) = (lhs.as_float(), rhs.as_float());
    match op {
        "+" => Ok(HostValue::Float(a + b)),
        "-" => Ok(HostValue::Float(a - b)),
        "*" => Ok(HostValue::Float(a * b)),
        "/" => Ok(HostValue::Float(a / b)),
        "<" => Ok(HostValue::Boolean(a < b)),
        ">" => Ok(HostValue::Boolean(a > b)),
        _ => Err(Error::prim(op, "unknown arithmetic operator")),
    }
}

macro_rules! arithmetic_natives {
    [$($name:ident $op:literal),* $(,)?] => {
        $(
            fn $name(
                _: &mut Instances,
                recv: Option<&HostValue>,
                args: Vec<HostValue>,
            ) -> Result<HostValue, Error> {
                arithmetic($op, recv, args)
            }
        )*
    };
}

arithmetic_natives![add "+", sub "-", mul "*", div "/", less "<", greater ">"];

fn abs(_: &mut Instances, recv: Option<&HostValue>, _: Vec<HostValue>) -> Result<HostValue, Error> {
    match Number::of("abs", receiver("abs", recv)?)? {
        Number::Integer(i) => i
            .checked_abs()
            .map(HostValue::Integer)
            .ok_or_else(|| Error::prim("abs", "Integer overflow")),
        Number::Float(v) => Ok(HostValue::Float(v.abs())),
    }
}


fn concat(_: &mut Instances, recv: Option<&HostValue>, args: Vec<HostValue>) -> Result<HostValue, Error> {
    match (receiver("+", recv)?, single("+", args)?) {
        (HostValue::Text(a), HostValue::Text(b)) => Ok(HostValue::Text(format!("{}{}", a, b))),
        _ => Err(illegal("+")),
    }
}

fn size(_: &mut Instances, recv: Option<&HostValue>, _: Vec<HostValue>) -> Result<HostValue, Error> {
    match receiver("size", recv)? {
        HostValue::Text(s) => Ok(HostValue::Integer(s.chars().count() as i64)),
        _ => Err(illegal("size")),
    }
}

fn package_name(
    _: &mut Instances,
    recv: Option<&HostValue>,
    _: Vec<HostValue>,
) -> Result<HostValue, Error> {
    match receiver("name", recv)? {
        HostValue::Package(path) => Ok(HostValue::Text(path.clone())),
        _ => Err(illegal("name")),
    }
}
