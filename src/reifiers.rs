//! Reified control operators.
//!
//! Reifiers receive the sender's live Context and their operands
//! unevaluated, so they decide what gets evaluated, where, and whether at
//! all.

use std::borrow::Cow;
use std::collections::HashMap;

use lazy_static::lazy_static;
use log::debug;

use crate::bridge::HostValue;
use crate::error::{Error, ErrorKind, ExceptionRecord};
use crate::model::{AgoraObject, Attribute, Category, Context, GeneratorId, Handler, Table, UserMethod};
use crate::pattern::Pattern;
use crate::syntax::Expression;
use crate::universe::Universe;


pub type ReifierFn = fn(&mut Universe, Invocation<'_>) -> Result<AgoraObject, Error>;

/// Everything a reifier gets to work with.
#[derive(Clone, Copy, Debug)]
pub struct Invocation<'a> {
    /// Object the reifier pattern was dispatched to.
    pub receiver: &'a AgoraObject,
    pub pattern: &'a Pattern,
    /// Unevaluated receiver, when it was a pattern form the scope handed
    /// over instead of evaluating.
    pub form: Option<&'a Expression>,
    pub actuals: &'a [Expression],
    /// The sender's context.
    pub context: &'a Context,
}


macro_rules! reifiers {
    [$($name:literal => $f:expr),* $(,)?] => {
        {
            let mut m: HashMap<&'static str, ReifierFn> = HashMap::new();
            $(
                m.insert($name, $f);
            )*
            m
        }
    };
}

lazy_static! {
    static ref REIFIERS: HashMap<&'static str, ReifierFn> = reifiers![
        "SELF" => reify_self,
        "SUPER" => reify_super,
        "PUBLIC" => reify_public,
        "HALT" => halt,
        "RAISE" => raise,
        "TRY:CATCH:" => try_catch,
        "VARIABLE:" => variable,
        "CONSTANT:" => constant,
        "METHOD:" => method,
        ":=" => assign,
        "CLONE" => clone,
        "True>>IFTRUE:IFFALSE:" => first_branch,
        "True>>IFTRUE:" => first_branch,
        "True>>IFFALSE:" => no_branch,
        "False>>IFTRUE:IFFALSE:" => second_branch,
        "False>>IFTRUE:" => no_branch,
        "False>>IFFALSE:" => first_branch,
    ];
}

pub fn lookup(name: &str) -> Result<ReifierFn, Error> {
    REIFIERS
        .get(name)
        .copied()
        .ok_or_else(|| Error::prim("reify", format!("Unknown reifier {}", name)))
}

/// Reifiers every object understands through the root.
pub fn root_table() -> Table {
    let patterns = vec![
        Pattern::unary("SELF"),
        Pattern::unary("SUPER"),
        Pattern::unary("PUBLIC"),
        Pattern::unary("HALT"),
        Pattern::unary("RAISE"),
        Pattern::unary("CLONE"),
        Pattern::keyword(vec!["TRY:", "CATCH:"]),
        Pattern::keyword(vec!["VARIABLE:"]),
        Pattern::keyword(vec!["CONSTANT:"]),
        Pattern::keyword(vec!["METHOD:"]),
        Pattern::operator(":="),
    ];
    Table::from(
        patterns
            .into_iter()
            .map(|p| {
                let attribute = Attribute::PrimReifierMethod(p.to_string());
                (p.reified(), attribute)
            })
            .collect::<Vec<_>>(),
    )
}


fn misused<S: Into<Cow<'static, str>>>(
    universe: &Universe,
    invocation: Invocation<'_>,
    reason: S,
) -> Result<AgoraObject, Error> {
    err!(
        universe,
        ErrorKind::ReifierMisused {
            pattern: invocation.pattern.clone(),
            reason: reason.into(),
        }
    )
}

fn argument<'a>(universe: &Universe, invocation: Invocation<'a>, i: usize) -> Result<&'a Expression, Error> {
    match invocation.actuals.get(i) {
        Some(actual) => Ok(actual),
        None => err!(
            universe,
            ErrorKind::ReifierMisused {
                pattern: invocation.pattern.clone(),
                reason: Cow::Owned(format!("missing operand {}", i + 1)),
            }
        ),
    }
}

/// The evaluated receiver form, or the receiver itself.
fn subject(universe: &mut Universe, invocation: Invocation<'_>) -> Result<AgoraObject, Error> {
    match invocation.form {
        Some(form) => form.eval(universe, invocation.context),
        None => Ok(invocation.receiver.clone()),
    }
}

/// Splits `x PUBLIC` into (`x`, true).
fn unwrap_public(form: &Expression) -> (&Expression, bool) {
    if let Expression::Reifier(message) = form {
        if message.pattern() == &Pattern::unary("PUBLIC").reified() {
            if let Some(inner) = message.receiver() {
                return (inner, true);
            }
        }
    }
    (form, false)
}

/// Generator a declaration made from `context` lands in.
fn declaration_target(
    universe: &Universe,
    invocation: Invocation<'_>,
    public: bool,
) -> Result<Option<GeneratorId>, Error> {
    let scope = *invocation.context.scope();
    if public {
        return match invocation.context.category() {
            Category::Aggregate | Category::Toplevel => Ok(Some(scope)),
            _ => Ok(None),
        };
    }
    Ok(Some(universe.heap().get(scope)?.private().unwrap_or(scope)))
}


fn reify_self(_: &mut Universe, invocation: Invocation<'_>) -> Result<AgoraObject, Error> {
    Ok(invocation.context.identity().clone())
}

fn reify_super(universe: &mut Universe, invocation: Invocation<'_>) -> Result<AgoraObject, Error> {
    misused(universe, invocation, "SUPER must qualify a message")
}

fn reify_public(universe: &mut Universe, invocation: Invocation<'_>) -> Result<AgoraObject, Error> {
    misused(universe, invocation, "PUBLIC must qualify a declaration")
}

fn halt(universe: &mut Universe, invocation: Invocation<'_>) -> Result<AgoraObject, Error> {
    let subject = subject(universe, invocation)?;
    let message = match subject.payload() {
        Some(HostValue::Text(text)) => text.clone(),
        _ => universe.print_string(&subject)?,
    };
    err!(universe, ErrorKind::Halt(message))
}

fn raise(universe: &mut Universe, invocation: Invocation<'_>) -> Result<AgoraObject, Error> {
    let message = match invocation.form {
        Some(Expression::Message(message)) if message.receiver().is_none() => message,
        _ => return misused(universe, invocation, "RAISE needs a receiverless message"),
    };

    let mut actuals = Vec::with_capacity(message.arguments().len());
    for argument in message.arguments() {
        actuals.push(argument.eval(universe, invocation.context)?);
    }
    let record = ExceptionRecord {
        pattern: message.pattern().clone(),
        actuals,
        handler: invocation.context.handler().as_ref().map(Handler::id),
    };
    debug!("Raising {} to handler {:?}", record.pattern, record.handler);
    err!(universe, ErrorKind::Exception(record))
}

fn try_catch(universe: &mut Universe, invocation: Invocation<'_>) -> Result<AgoraObject, Error> {
    let protected = argument(universe, invocation, 0)?;
    let catch = argument(universe, invocation, 1)?;
    let context = invocation.context;

    let handler = Handler::new(universe.next_handler_id(), catch.clone());
    let record = match protected.eval(universe, &context.with_handler(handler.clone())) {
        Err(err) => match err.kind() {
            ErrorKind::Exception(record) if record.handler == Some(handler.id()) => record.clone(),
            _ => return Err(err),
        },
        ok => return ok,
    };

    debug!("Handler {} caught {}", handler.id(), record.pattern);
    let catcher = handler
        .catch()
        .eval(universe, &context.with_category(Category::Handler))?;
    let client = context.client(record.actuals.clone());
    match universe.dispatch(catcher.clone(), catcher.generator(), false, &record.pattern, client) {
        // Catch code that does not answer the pattern passes it outward.
        Err(err)
            if matches!(err.kind(), ErrorKind::MessageNotUnderstood { pattern, receiver }
                if *pattern == record.pattern && *receiver == catcher) =>
        {
            err!(
                universe,
                ErrorKind::Exception(ExceptionRecord {
                    handler: context.handler().as_ref().map(Handler::id),
                    ..record
                })
            )
        }
        result => result,
    }
}

fn declare(
    universe: &mut Universe,
    invocation: Invocation<'_>,
    writable: bool,
) -> Result<AgoraObject, Error> {
    let (form, public) = match invocation.form {
        Some(form) => unwrap_public(form),
        None => return misused(universe, invocation, "declarations need a name"),
    };
    let name = match form.variable_name() {
        Some(name) => name,
        None => return misused(universe, invocation, "declarations need a plain name"),
    };
    let target = match declaration_target(universe, invocation, public)? {
        Some(target) => target,
        None => {
            return misused(
                universe,
                invocation,
                "PUBLIC declarations belong in aggregates or at toplevel",
            )
        }
    };

    let value = argument(universe, invocation, 0)?.eval(universe, invocation.context)?;
    universe.declare(target, name, value.clone(), writable)?;
    Ok(value)
}

fn variable(universe: &mut Universe, invocation: Invocation<'_>) -> Result<AgoraObject, Error> {
    declare(universe, invocation, true)
}

fn constant(universe: &mut Universe, invocation: Invocation<'_>) -> Result<AgoraObject, Error> {
    declare(universe, invocation, false)
}

fn method(universe: &mut Universe, invocation: Invocation<'_>) -> Result<AgoraObject, Error> {
    let (form, public) = match invocation.form {
        Some(form) => unwrap_public(form),
        None => return misused(universe, invocation, "METHOD: needs a message pattern"),
    };
    let message = match form {
        Expression::Message(message) if message.receiver().is_none() => message,
        Expression::Reifier(_) => {
            return misused(universe, invocation, "reifier patterns cannot be declared")
        }
        _ => return misused(universe, invocation, "METHOD: needs a message pattern"),
    };
    let formals = match message
        .arguments()
        .iter()
        .map(|a| a.variable_name().map(str::to_string))
        .collect::<Option<Vec<_>>>()
    {
        Some(formals) => formals,
        None => return misused(universe, invocation, "formal parameters must be plain names"),
    };
    let target = match declaration_target(universe, invocation, public)? {
        Some(target) => target,
        None => {
            return misused(
                universe,
                invocation,
                "PUBLIC declarations belong in aggregates or at toplevel",
            )
        }
    };

    let body = argument(universe, invocation, 0)?.clone();
    universe.heap_mut().install(
        target,
        message.pattern().clone(),
        Attribute::UserMethod(UserMethod::new(formals, body)),
    )?;
    Ok(universe.nil())
}

fn assign(universe: &mut Universe, invocation: Invocation<'_>) -> Result<AgoraObject, Error> {
    let writer = match invocation.form.and_then(Expression::variable_name) {
        Some(name) => Pattern::keyword(vec![name]),
        None => return misused(universe, invocation, "assignment needs a variable name"),
    };
    let context = invocation.context;
    let value = argument(universe, invocation, 0)?.eval(universe, context)?;
    universe.dispatch(
        context.identity().clone(),
        *context.scope(),
        true,
        &writer,
        context.client(vec![value]),
    )
}

fn clone(universe: &mut Universe, invocation: Invocation<'_>) -> Result<AgoraObject, Error> {
    let subject = subject(universe, invocation)?;
    universe.clone_object(&subject)
}


fn first_branch(universe: &mut Universe, invocation: Invocation<'_>) -> Result<AgoraObject, Error> {
    argument(universe, invocation, 0)?.eval(universe, invocation.context)
}

fn second_branch(universe: &mut Universe, invocation: Invocation<'_>) -> Result<AgoraObject, Error> {
    argument(universe, invocation, 1)?.eval(universe, invocation.context)
}

fn no_branch(universe: &mut Universe, _: Invocation<'_>) -> Result<AgoraObject, Error> {
    Ok(universe.nil())
}
