//! Process-scoped Agora state and the evaluation loop.
//!
//! A Universe owns the generator arena, the bridge and the class registry.
//! Everything that evaluates takes it by `&mut`; there is no other global
//! state.

use std::borrow::Cow;
use std::io::{stdout, BufWriter, Write};

use colored::*;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::bridge::{Bridge, ClassRegistry, HostValue};
use crate::continuation::{SendCont, SendFrame};
use crate::error::{Error, ErrorKind};
use crate::model::{
    AgoraObject, Attribute, Category, Client, Context, Generator, GeneratorId, Heap, Resolution,
    Slot, UserMethod,
};
use crate::pattern::Pattern;
use crate::reifiers::{self, Invocation};
use crate::syntax::{self, Expression, Message};


/// Nested sends allowed before evaluation gives up.
const MAX_SEND_DEPTH: usize = 1024;

/// Remaining native stack below which a send continues on a fresh segment.
pub(crate) const STACK_RED_ZONE: usize = 256 * 1024;
pub(crate) const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

pub struct Universe {
    globals: Globals,
    bridge: Bridge,
    registry: ClassRegistry,

    sends: SendCont,
}

/// Global root structures; persisted together with the bridge.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Globals {
    heap: Heap,
    roots: Roots,
    next_handler: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Roots {
    public_top: GeneratorId,
    private_top: GeneratorId,
    root_public: GeneratorId,
    root_private: GeneratorId,
    nil: AgoraObject,
}


impl Universe {
    /// Bootstraps the root generators and the toplevel constants.
    pub fn new(registry: ClassRegistry) -> Result<Self, Error> {
        let mut heap = Heap::new();
        let public_top = heap.alloc(Generator::Empty);
        let private_top = heap.alloc(Generator::Empty);
        let root_private = heap.alloc(Generator::internal(private_top, None));
        let root_public = heap.alloc(Generator::with_table(
            reifiers::root_table(),
            public_top,
            Some(root_private),
        ));
        let root_link = heap.alloc(Generator::Wrapping {
            identity: AgoraObject::new(root_public),
        });

        let mut universe = Self {
            globals: Globals {
                heap,
                roots: Roots {
                    public_top,
                    private_top,
                    root_public,
                    root_private,
                    // Placeholder until the Nil wrapper exists.
                    nil: AgoraObject::new(public_top),
                },
                next_handler: 0,
            },
            bridge: Bridge::new(root_link),
            registry,
            sends: SendCont::default(),
        };

        let nil = universe.up(HostValue::Nil)?;
        universe.globals.roots.nil = nil.clone();
        let constants = vec![
            ("null", nil),
            ("true", universe.up(HostValue::Boolean(true))?),
            ("false", universe.up(HostValue::Boolean(false))?),
            ("host", universe.up(HostValue::Package(String::new()))?),
            ("root", universe.root()),
        ];
        for (name, value) in constants {
            universe.declare(root_private, name, value, false)?;
        }

        info!(
            "Bootstrapped universe with {} generators",
            universe.globals.heap.len()
        );
        Ok(universe)
    }

    pub(crate) fn from_parts(globals: Globals, bridge: Bridge, registry: ClassRegistry) -> Self {
        Self {
            globals,
            bridge,
            registry,
            sends: SendCont::default(),
        }
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn heap(&self) -> &Heap {
        &self.globals.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.globals.heap
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut Bridge {
        &mut self.bridge
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn sends(&self) -> &SendCont {
        &self.sends
    }

    pub fn nil(&self) -> AgoraObject {
        self.globals.roots.nil.clone()
    }

    /// The root identity.
    pub fn root(&self) -> AgoraObject {
        AgoraObject::new(self.globals.roots.root_public)
    }

    pub fn next_handler_id(&mut self) -> u64 {
        self.globals.next_handler += 1;
        self.globals.next_handler
    }

    pub fn toplevel_context(&self) -> Context {
        let root_public = self.globals.roots.root_public;
        Context::new(self.root(), root_public, root_public, Category::Toplevel, None)
    }


    /// Parses and evaluates `source` at toplevel, answering the value of the
    /// last statement (nil if there is none).
    pub fn evaluate<S: AsRef<str>>(&mut self, source: S) -> Result<AgoraObject, Error> {
        let statements = syntax::parse(source)?;
        let context = self.toplevel_context();
        self.eval_sequence(&statements, &context)
    }

    /// Sends `pattern` to the public view of `receiver`.
    pub fn send(
        &mut self,
        receiver: &AgoraObject,
        pattern: &Pattern,
        actuals: Vec<AgoraObject>,
    ) -> Result<AgoraObject, Error> {
        let client = Client::Ordinary {
            actuals,
            handler: None,
        };
        self.dispatch(receiver.clone(), receiver.generator(), false, pattern, client)
    }

    /// Looks `pattern` up from `start` and runs what it finds on behalf of
    /// `receiver`.
    pub fn dispatch(
        &mut self,
        receiver: AgoraObject,
        start: GeneratorId,
        from_private: bool,
        pattern: &Pattern,
        client: Client,
    ) -> Result<AgoraObject, Error> {
        let resolution = match self.globals.heap.resolve(start, pattern, from_private)? {
            Some(resolution) => resolution,
            None => {
                return err!(
                    self,
                    ErrorKind::MessageNotUnderstood {
                        pattern: pattern.clone(),
                        receiver,
                    }
                )
            }
        };
        if self.sends.depth() > MAX_SEND_DEPTH {
            return err!(
                self,
                ErrorKind::ProgramError(Cow::Borrowed("Maximum send depth exceeded"))
            );
        }

        debug!(
            "Dispatching {} to {} (found in {})",
            pattern, receiver, resolution.holder
        );
        self.sends
            .push(SendFrame::new(pattern.clone(), resolution.holder));
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.invoke(receiver, pattern, resolution, client)
        });
        let result = match result {
            Err(mut err) => {
                if !err.has_cont() {
                    err.set_cont(self.sends.clone());
                }
                Err(err)
            }
            ok => ok,
        };
        self.sends.pop();
        result
    }

    fn invoke(
        &mut self,
        receiver: AgoraObject,
        pattern: &Pattern,
        resolution: Resolution,
        client: Client,
    ) -> Result<AgoraObject, Error> {
        let Resolution { attribute, holder } = resolution;
        let actuals = match &client {
            Client::Reifier {
                receiver: form,
                actuals,
                context,
            } => {
                return match attribute {
                    Attribute::PrimReifierMethod(name) => {
                        let reifier = reifiers::lookup(&name)?;
                        reifier(
                            self,
                            Invocation {
                                receiver: &receiver,
                                pattern,
                                form: form.as_ref(),
                                actuals,
                                context,
                            },
                        )
                    }
                    _ => err!(
                        self,
                        ErrorKind::ReifierMisused {
                            pattern: pattern.clone(),
                            reason: Cow::Borrowed("bound to an ordinary attribute"),
                        }
                    ),
                };
            }
            Client::Ordinary { actuals, .. } => actuals.clone(),
        };

        if actuals.len() != pattern.arity() {
            return err!(
                self,
                ErrorKind::ProgramError(Cow::Owned(format!(
                    "{} expects {} arguments, got {}",
                    pattern,
                    pattern.arity(),
                    actuals.len()
                )))
            );
        }

        match attribute {
            Attribute::VarGet(Slot::Cell(cell)) => Ok(self.globals.heap.cell(cell)?.clone()),
            Attribute::VarSet(Slot::Cell(cell)) => {
                let value = actuals.into_iter().next().unwrap_or_else(|| self.nil());
                self.globals.heap.set_cell(cell, value.clone())?;
                Ok(value)
            }
            Attribute::VarGet(Slot::Field(name)) => {
                let host = receiver.down()?;
                let value = self.bridge.read_field(&host, &name)?;
                self.up(value)
            }
            Attribute::VarSet(Slot::Field(name)) => {
                let host = receiver.down()?;
                let args = self.down_arguments(pattern, &actuals)?;
                for value in args {
                    self.bridge.write_field(&host, &name, value)?;
                }
                Ok(actuals.into_iter().next().unwrap_or_else(|| self.nil()))
            }
            Attribute::PrimMethod(native) | Attribute::PrimCloning(native) => {
                let f = self.registry.native(&native)?;
                let host = receiver.down()?;
                let args = self.down_arguments(pattern, &actuals)?;
                let value = f(self.bridge.instances_mut(), Some(&host), args)?;
                self.up(value)
            }
            Attribute::PrimFunction(native) => {
                let f = self.registry.native(&native)?;
                let args = self.down_arguments(pattern, &actuals)?;
                let value = f(self.bridge.instances_mut(), None, args)?;
                self.up(value)
            }
            Attribute::PrimReifierMethod(_) => err!(
                self,
                ErrorKind::ReifierMisused {
                    pattern: pattern.clone(),
                    reason: Cow::Borrowed("sent as an ordinary message"),
                }
            ),
            Attribute::UserMethod(method) => {
                self.activate(receiver, holder, &method, actuals, &client)
            }
        }
    }

    /// Runs a user method in a fresh activation scope whose locals hold the
    /// actuals under the formal names.
    fn activate(
        &mut self,
        receiver: AgoraObject,
        holder: GeneratorId,
        method: &UserMethod,
        actuals: Vec<AgoraObject>,
        client: &Client,
    ) -> Result<AgoraObject, Error> {
        self.scoped(|universe| {
            let locals = universe.locals()?;
            for (formal, actual) in method.formals().iter().zip(actuals) {
                universe.declare(locals, formal, actual, false)?;
            }
            let scope = universe
                .globals
                .heap
                .alloc(Generator::internal(holder, Some(locals)));
            let context = client.context(receiver, scope, holder, Category::Method);
            method.body().eval(universe, &context)
        })
    }

    /// Runs `f` in a heap scope. Its allocations are released afterwards
    /// unless the answer, the error or an older structure refers to them.
    fn scoped<F>(&mut self, f: F) -> Result<AgoraObject, Error>
    where
        F: FnOnce(&mut Self) -> Result<AgoraObject, Error>,
    {
        self.globals.heap.enter();
        let result = f(self);
        match &result {
            Ok(object) => self.globals.heap.leave(&[object]),
            Err(err) => self.globals.heap.leave(&err.objects()),
        }
        result
    }

    fn locals(&mut self) -> Result<GeneratorId, Error> {
        let private_top = self.globals.roots.private_top;
        Ok(self
            .globals
            .heap
            .alloc(Generator::internal(private_top, None)))
    }


    /// Evaluates a user message.
    ///
    /// Receiverless messages and messages to SELF start from the private
    /// view; SUPER resends from the parent of the running attribute's holder.
    pub fn send_message(&mut self, message: &Message, context: &Context) -> Result<AgoraObject, Error> {
        let pattern = message.pattern();
        let (receiver, start, from_private) = match message.receiver() {
            None => (context.identity().clone(), *context.scope(), true),
            Some(form) if form.is_reifier_named("SELF") => {
                let identity = context.identity().clone();
                let start = identity.generator();
                (identity, start, true)
            }
            Some(form) if form.is_reifier_named("SUPER") => {
                match self.globals.heap.get(*context.holder())?.parent() {
                    Some(parent) => (context.identity().clone(), parent, false),
                    None => {
                        return err!(
                            self,
                            ErrorKind::ReifierMisused {
                                pattern: Pattern::unary("SUPER").reified(),
                                reason: Cow::Borrowed("no parent to resend to"),
                            }
                        )
                    }
                }
            }
            Some(form) => {
                let receiver = form.eval(self, context)?;
                let start = receiver.generator();
                (receiver, start, false)
            }
        };

        let mut actuals = Vec::with_capacity(message.arguments().len());
        for argument in message.arguments() {
            actuals.push(argument.eval(self, context)?);
        }
        self.dispatch(receiver, start, from_private, pattern, context.client(actuals))
    }

    /// Evaluates a reifier message.
    ///
    /// A receiver that is a pattern form is handed over unevaluated when the
    /// current scope understands the reifier; otherwise it is evaluated and
    /// the reifier is sent to the result.
    pub fn send_reifier(&mut self, message: &Message, context: &Context) -> Result<AgoraObject, Error> {
        let pattern = message.pattern();
        let actuals = message.arguments().to_vec();
        let scope = *context.scope();
        match message.receiver() {
            None => {
                let client = context.reifier_client(None, actuals);
                self.dispatch(context.identity().clone(), scope, true, pattern, client)
            }
            Some(form)
                if form.is_pattern_form()
                    && self.globals.heap.resolve(scope, pattern, true)?.is_some() =>
            {
                let client = context.reifier_client(Some(form.clone()), actuals);
                self.dispatch(context.identity().clone(), scope, true, pattern, client)
            }
            Some(form) => {
                let receiver = form.eval(self, context)?;
                let start = receiver.generator();
                let client = context.reifier_client(None, actuals);
                self.dispatch(receiver, start, false, pattern, client)
            }
        }
    }

    /// Evaluates `body` in a nested scope with its own locals.
    pub fn eval_block(&mut self, body: &[Expression], context: &Context) -> Result<AgoraObject, Error> {
        self.scoped(|universe| {
            let locals = universe.locals()?;
            let scope = universe
                .globals
                .heap
                .alloc(Generator::internal(*context.scope(), Some(locals)));
            let block = Context::new(
                context.identity().clone(),
                scope,
                *context.holder(),
                Category::Block,
                context.handler().clone(),
            );
            universe.eval_sequence(body, &block)
        })
    }

    /// Evaluates `body` as the declarations of a new object delegating to
    /// the current scope, and answers that object.
    pub fn eval_aggregate(
        &mut self,
        body: &[Expression],
        context: &Context,
    ) -> Result<AgoraObject, Error> {
        let private = self.locals()?;
        let public = self
            .globals
            .heap
            .alloc(Generator::internal(*context.scope(), Some(private)));
        let object = AgoraObject::new(public);
        let aggregate = Context::new(
            object.clone(),
            public,
            public,
            Category::Aggregate,
            context.handler().clone(),
        );
        self.eval_sequence(body, &aggregate)?;
        Ok(object)
    }

    fn eval_sequence(&mut self, body: &[Expression], context: &Context) -> Result<AgoraObject, Error> {
        let mut last = self.nil();
        for expression in body {
            last = expression.eval(self, context)?;
        }
        Ok(last)
    }


    /// Binds `name` (and `name:` when writable) to a fresh cell in `target`.
    pub fn declare(
        &mut self,
        target: GeneratorId,
        name: &str,
        value: AgoraObject,
        writable: bool,
    ) -> Result<(), Error> {
        let cell = self.globals.heap.alloc_cell(value);
        let reader = Pattern::unary(name);
        if writable {
            if let Some(writer) = reader.writer() {
                self.globals
                    .heap
                    .install(target, writer, Attribute::VarSet(Slot::Cell(cell)))?;
            }
        }
        self.globals
            .heap
            .install(target, reader, Attribute::VarGet(Slot::Cell(cell)))
    }

    /// Copy of `object` with its own state.
    ///
    /// Host instances are copied field by field; language objects get their
    /// public and private tables duplicated with fresh variable cells.
    /// Other host values are immutable and answered as is.
    pub fn clone_object(&mut self, object: &AgoraObject) -> Result<AgoraObject, Error> {
        match object.payload() {
            Some(HostValue::Instance(id)) => {
                let copy = self.bridge.instances_mut().duplicate(*id)?;
                Ok(object.with_payload(HostValue::Instance(copy)))
            }
            Some(_) => Ok(object.clone()),
            None => {
                let source = object.generator();
                let private = match self.globals.heap.get(source)? {
                    Generator::Internal { private, .. } => *private,
                    _ => {
                        return err!(
                            self,
                            ErrorKind::ProgramError(Cow::Owned(format!(
                                "Cannot clone {}",
                                object
                            )))
                        )
                    }
                };
                let private = match private {
                    Some(private) => {
                        let inner = self.globals.heap.get(private)?.private();
                        Some(self.globals.heap.duplicate(private, inner)?)
                    }
                    None => None,
                };
                let copy = self.globals.heap.duplicate(source, private)?;
                debug!("Cloned {} as {}", source, copy);
                Ok(AgoraObject::new(copy))
            }
        }
    }


    /// Short human-readable rendering of an object.
    pub fn print_string(&self, object: &AgoraObject) -> Result<String, Error> {
        match object.payload() {
            None if *object == self.root() => Ok("root".to_string()),
            None => Ok(format!("<object {}>", object.generator())),
            Some(HostValue::Instance(id)) => {
                Ok(format!("a {}", self.bridge.instances().get(*id)?.class()))
            }
            Some(value) => Ok(value.to_string()),
        }
    }

    /// Listing of the attributes an object's generator declares itself,
    /// private ones included.
    pub fn inspect(&self, object: &AgoraObject) -> Result<String, Error> {
        let generator = self.globals.heap.get(object.generator())?;
        let mut lines = vec![];
        if let Some(key) = self.bridge.key_of(object.generator()) {
            lines.push(format!("# {}", key));
        }
        match generator {
            Generator::Empty => lines.push("# empty".to_string()),
            Generator::Wrapping { identity } => lines.push(format!("# wraps {}", identity)),
            Generator::Internal { table, private, .. } => {
                for (pattern, attribute) in table.iter() {
                    lines.push(format!("{} -> {}", pattern, attribute));
                }
                if let Some(table) = private.and_then(|p| self.globals.heap.get(p).ok()?.table()) {
                    for (pattern, attribute) in table.iter() {
                        lines.push(format!("private {} -> {}", pattern, attribute));
                    }
                }
            }
        }
        Ok(lines.join("\n"))
    }
}


// Print functionality.
impl Universe {
    /// Prints the sends that were in flight when `err` was raised,
    /// innermost first.
    pub fn trace_error(&self, err: &Error) {
        if let Some(cont) = err.cont() {
            let mut writer = BufWriter::new(stdout());
            if let Err(err) = self.write_trace(&mut writer, cont) {
                println!("trace_error error: {:?}", err);
            }
        }
    }

    fn write_trace<W: Write>(&self, w: &mut W, cont: &SendCont) -> std::io::Result<()> {
        fn frame_color(depth: usize) -> (u8, u8, u8) {
            match depth % 6 {
                0 => (0, 255, 204),
                1 => (204, 51, 0),
                2 => (153, 255, 102),
                3 => (153, 102, 255),
                4 => (255, 255, 102),
                _ => (255, 179, 179),
            }
        }

        writeln!(w)?;
        writeln!(w, "  --TRACE--")?;
        let depth = cont.depth();
        for (i, frame) in cont.iter().enumerate() {
            if frame.pattern().is_none() {
                break;
            }
            let (r, g, b) = frame_color(depth - i);
            let description = match frame.holder().and_then(|h| self.bridge.key_of(h)) {
                Some(key) => format!("{} in {}", frame, key),
                None => frame.to_string(),
            };
            writeln!(w, "   {})  {}", i, description.truecolor(r, g, b))?;
        }
        w.flush()
    }
}


impl Globals {
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn roots(&self) -> &Roots {
        &self.roots
    }
}

impl Roots {
    pub fn root_public(&self) -> GeneratorId {
        self.root_public
    }

    pub fn root_private(&self) -> GeneratorId {
        self.root_private
    }

    pub fn public_top(&self) -> GeneratorId {
        self.public_top
    }

    pub fn private_top(&self) -> GeneratorId {
        self.private_top
    }
}
