//! Evaluation contexts and the clients that carry them across sends.

use std::rc::Rc;

use derive_getters::Getters;

use super::generator::GeneratorId;
use super::object::AgoraObject;
use crate::syntax::Expression;


#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Category {
    Toplevel,
    Method,
    Block,
    Aggregate,
    Handler,
}

/// Installed by TRY:CATCH:; matched against raised exception records by id.
#[derive(Clone, Debug, PartialEq)]
pub struct Handler {
    id: u64,
    catch: Rc<Expression>,
}

/// One in-flight evaluation.
#[derive(Clone, Debug, Getters, PartialEq)]
pub struct Context {
    identity: AgoraObject,
    /// Where receiverless lookups start, private view first.
    scope: GeneratorId,
    /// Generator the running attribute was found in.
    holder: GeneratorId,
    category: Category,
    handler: Option<Handler>,
}

/// One in-flight send.
#[derive(Clone, Debug, PartialEq)]
pub enum Client {
    Ordinary {
        actuals: Vec<AgoraObject>,
        handler: Option<Handler>,
    },
    /// Unevaluated receiver form and arguments plus the sender's context.
    Reifier {
        receiver: Option<Expression>,
        actuals: Vec<Expression>,
        context: Context,
    },
}


impl Handler {
    pub fn new(id: u64, catch: Expression) -> Self {
        Self {
            id,
            catch: Rc::new(catch),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn catch(&self) -> &Expression {
        &self.catch
    }
}

impl Context {
    pub fn new(
        identity: AgoraObject,
        scope: GeneratorId,
        holder: GeneratorId,
        category: Category,
        handler: Option<Handler>,
    ) -> Self {
        Self {
            identity,
            scope,
            holder,
            category,
            handler,
        }
    }

    /// Client for an ordinary send made from this context.
    pub fn client(&self, actuals: Vec<AgoraObject>) -> Client {
        Client::Ordinary {
            actuals,
            handler: self.handler.clone(),
        }
    }

    /// Client for a reifier send made from this context.
    pub fn reifier_client(&self, receiver: Option<Expression>, actuals: Vec<Expression>) -> Client {
        Client::Reifier {
            receiver,
            actuals,
            context: self.clone(),
        }
    }

    pub fn with_handler(&self, handler: Handler) -> Self {
        Self {
            handler: Some(handler),
            ..self.clone()
        }
    }

    pub fn with_category(&self, category: Category) -> Self {
        Self {
            category,
            ..self.clone()
        }
    }
}

impl Client {
    /// Context for running an attribute found in `holder` on behalf of this
    /// client.
    pub fn context(
        &self,
        identity: AgoraObject,
        scope: GeneratorId,
        holder: GeneratorId,
        category: Category,
    ) -> Context {
        Context::new(identity, scope, holder, category, self.handler().cloned())
    }

    pub fn handler(&self) -> Option<&Handler> {
        match self {
            Client::Ordinary { handler, .. } => handler.as_ref(),
            Client::Reifier { context, .. } => context.handler.as_ref(),
        }
    }
}
