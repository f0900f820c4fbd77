use {
    crate::{
        codec::{ArgValue, FdQueue, RawMessage, decode_args},
        dispatch::{
            DispatchError, HostRole, NextAction, Request, RequestHandler, Session, SyncHandler,
            route,
        },
        schema::Interface,
    },
    ahash::AHashMap,
    std::sync::Arc,
    uapi::OwnedFd,
};

/// The outcome of a successfully dispatched request.
pub struct Dispatched {
    /// Already resolved for the role of the dispatcher.
    pub action: NextAction,
    /// The descriptors the request consumed, in argument order.
    pub fds: Vec<Arc<OwnedFd>>,
}

/// The handlers of one host, indexed by interface and opcode.
pub struct Dispatcher<S> {
    role: HostRole,
    handlers: AHashMap<String, Vec<Option<Box<dyn RequestHandler<S>>>>>,
}

impl<S: Session> Dispatcher<S> {
    pub fn new(role: HostRole) -> Self {
        Self {
            role,
            handlers: Default::default(),
        }
    }

    pub fn role(&self) -> HostRole {
        self.role
    }

    pub fn register<H: RequestHandler<S> + 'static>(
        &mut self,
        interface: &Interface,
        request: &str,
        handler: H,
    ) -> Result<(), DispatchError> {
        let Some(message) = interface.request_by_name(request) else {
            return Err(DispatchError::UnknownRequest {
                interface: interface.name.clone(),
                request: request.to_string(),
            });
        };
        let handlers = self
            .handlers
            .entry(interface.name.clone())
            .or_insert_with(|| (0..interface.num_requests()).map(|_| None).collect());
        handlers[message.opcode as usize] = Some(Box::new(handler));
        Ok(())
    }

    pub fn register_fn<F>(
        &mut self,
        interface: &Interface,
        request: &str,
        f: F,
    ) -> Result<(), DispatchError>
    where
        F: Fn(&mut S, Request<'_>) -> Result<NextAction, DispatchError> + Send + Sync + 'static,
    {
        self.register(interface, request, SyncHandler(f))
    }

    fn handler(&self, interface: &str, opcode: u16) -> Option<&dyn RequestHandler<S>> {
        let handlers = self.handlers.get(interface)?;
        handlers.get(opcode as usize)?.as_deref()
    }

    /// Decodes a request and runs its handler.
    ///
    /// No descriptors are taken from `fds` if fewer are queued than the request carries.
    /// A request that fails to decode after that check has already consumed its
    /// descriptors. Requests without a handler resolve to the default action of the role. Destructor requests
    /// remove their object from the session.
    pub async fn dispatch(
        &self,
        session: &mut S,
        message: &RawMessage,
        fds: &mut FdQueue,
    ) -> Result<Dispatched, DispatchError> {
        let Some(resource) = session.objects().get(message.object).cloned() else {
            return Err(DispatchError::InvalidObject(message.object));
        };
        let interface = resource.interface().clone();
        let payload = message.payload();
        let request = route(&interface, message.opcode, payload)?;
        let args = match decode_args(request, payload, fds) {
            Ok(args) => args,
            Err(e) => {
                return Err(DispatchError::InvalidMethod {
                    opcode: message.opcode,
                    args: payload.to_vec(),
                    source: Some(e),
                });
            }
        };
        log::trace!(
            "{}@{}.{}({:?})",
            interface.name,
            message.object,
            request.name,
            &args[..],
        );
        let fds = args
            .iter()
            .filter_map(|a| match a {
                ArgValue::Fd(fd) => Some(fd.clone()),
                _ => None,
            })
            .collect();
        let action = match self.handler(&interface.name, message.opcode) {
            Some(handler) => {
                let request = Request {
                    resource: &resource,
                    sender: message.object,
                    message: request,
                    args: &args,
                };
                handler.handle(session, request).await?
            }
            None => self.role.default_action(),
        };
        if request.destructor {
            session.objects_mut().remove(message.object);
        }
        Ok(Dispatched {
            action: self.role.resolve(action),
            fds,
        })
    }
}
