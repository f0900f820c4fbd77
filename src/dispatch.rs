//! Routing of decoded requests to handlers and the forwarding decision they return.

pub use {
    dispatcher::{Dispatched, Dispatcher},
    error::{DispatchError, ERROR_OPCODE, INVALID_METHOD, INVALID_OBJECT, protocol_error},
    resource::{Objects, Resource, Session},
};

use {
    crate::{
        codec::ArgValue,
        object::ObjectId,
        schema::{Interface, Message},
    },
    futures_util::future::BoxFuture,
    serde::{Deserialize, Serialize},
};

mod dispatcher;
mod error;
mod resource;

/// What happens to a request after its handler has run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NextAction {
    /// The request was handled locally.
    Nop,
    /// Forward the request to the peer and continue with the next request.
    Relay,
    /// Forward the request to the peer and process the next request only after the peer
    /// has accepted or rejected it.
    RelayWait,
}

/// The kind of host a set of handlers runs in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostRole {
    /// Sits between a client and a server and forwards what it does not answer itself.
    Interceptor,
    /// Watches traffic and never forwards.
    Observer,
}

impl HostRole {
    pub fn name(self) -> &'static str {
        match self {
            HostRole::Interceptor => "interceptor",
            HostRole::Observer => "observer",
        }
    }

    /// The action taken for requests that have no handler.
    pub fn default_action(self) -> NextAction {
        match self {
            HostRole::Interceptor => NextAction::Relay,
            HostRole::Observer => NextAction::Nop,
        }
    }

    pub fn resolve(self, action: NextAction) -> NextAction {
        match self {
            HostRole::Interceptor => action,
            HostRole::Observer => NextAction::Nop,
        }
    }
}

/// Selects the request a message with `opcode` refers to.
pub fn route<'a>(
    interface: &'a Interface,
    opcode: u16,
    payload: &[u8],
) -> Result<&'a Message, DispatchError> {
    interface
        .request(opcode)
        .ok_or_else(|| DispatchError::InvalidMethod {
            opcode,
            args: payload.to_vec(),
            source: None,
        })
}

/// A decoded request as seen by a handler.
pub struct Request<'a> {
    pub resource: &'a Resource,
    pub sender: ObjectId,
    pub message: &'a Message,
    pub args: &'a [ArgValue],
}

pub trait RequestHandler<S>: Send + Sync {
    fn handle<'a>(
        &'a self,
        session: &'a mut S,
        request: Request<'a>,
    ) -> BoxFuture<'a, Result<NextAction, DispatchError>>;
}

pub(crate) struct SyncHandler<F>(pub F);

impl<S, F> RequestHandler<S> for SyncHandler<F>
where
    S: Send,
    F: Fn(&mut S, Request<'_>) -> Result<NextAction, DispatchError> + Send + Sync,
{
    fn handle<'a>(
        &'a self,
        session: &'a mut S,
        request: Request<'a>,
    ) -> BoxFuture<'a, Result<NextAction, DispatchError>> {
        let res = (self.0)(session, request);
        Box::pin(async move { res })
    }
}
