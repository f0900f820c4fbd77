use {
    crate::{
        codec::{FdQueue, RawMessage},
        dispatch::{DispatchError, Dispatcher, NextAction, Session, protocol_error},
        object::ObjectId,
        relay::{
            events::{EventError, EventSink},
            peer::{Peer, RelayMessage},
        },
        utils::errorfmt::ErrorFmt,
    },
    std::sync::Arc,
    thiserror::Error,
    tokio::{
        sync::{mpsc, oneshot},
        task::{JoinError, JoinHandle},
    },
    uapi::OwnedFd,
};

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Could not send an event")]
    Events(#[from] EventError),
    #[error("Could not dispatch a request to object {0}")]
    Dispatch(ObjectId, #[source] Box<DispatchError>),
    #[error("The connection task did not complete")]
    Join(#[from] JoinError),
}

/// A message read from the transport together with the descriptors that arrived with it.
pub struct Inbound {
    pub message: RawMessage,
    pub fds: Vec<OwnedFd>,
}

type Forward = (RelayMessage, Option<oneshot::Sender<()>>);

/// Forwards relayed messages to the peer in the order they were queued.
struct RelayWriter {
    tx: Option<mpsc::UnboundedSender<Forward>>,
    task: JoinHandle<()>,
}

impl RelayWriter {
    fn spawn<P: Peer>(peer: P) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Some(tx),
            task: tokio::spawn(forward_all(peer, rx)),
        }
    }

    fn forward(&self, message: RelayMessage, ack: Option<oneshot::Sender<()>>) {
        if let Some(tx) = &self.tx {
            if tx.send((message, ack)).is_err() {
                log::error!("The relay writer has terminated");
            }
        }
    }

    /// Waits until every queued message has been forwarded.
    async fn drain(&mut self) {
        self.tx = None;
        if let Err(e) = (&mut self.task).await {
            log::error!("The relay writer did not complete: {}", ErrorFmt(e));
        }
    }
}

impl Drop for RelayWriter {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn forward_all<P: Peer>(mut peer: P, mut rx: mpsc::UnboundedReceiver<Forward>) {
    while let Some((message, ack)) = rx.recv().await {
        let len = message.bytes.len();
        if let Err(e) = peer.forward(message).await {
            log::error!("Could not relay a message of {} bytes: {}", len, ErrorFmt(e));
        }
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }
}

pub struct Connection<S> {
    session: S,
    dispatcher: Arc<Dispatcher<S>>,
    events: EventSink,
    fds: FdQueue,
}

/// Controls a spawned connection. Dropping the handle aborts the connection task.
pub struct ConnectionHandle<S> {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<S, ConnectionError>>,
}

impl<S> ConnectionHandle<S> {
    /// Stops processing requests. A running handler or pending `RelayWait` is abandoned
    /// and messages that have not yet been forwarded are dropped.
    pub fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    /// Waits for the connection to terminate and returns its session.
    pub async fn join(mut self) -> Result<S, ConnectionError> {
        (&mut self.task).await?
    }
}

impl<S> Drop for ConnectionHandle<S> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<S: Session> Connection<S> {
    pub fn new(session: S, dispatcher: Arc<Dispatcher<S>>, events: EventSink) -> Self {
        Self {
            session,
            dispatcher,
            events,
            fds: FdQueue::default(),
        }
    }

    /// Processes `inbound` in order until it is exhausted or the connection is closed.
    pub fn spawn<P: Peer>(self, peer: P, inbound: mpsc::Receiver<Inbound>) -> ConnectionHandle<S> {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let res = self.run(peer, inbound, shutdown_rx).await;
            if let Err(e) = &res {
                log::error!("Connection failed: {}", ErrorFmt(e));
            }
            res
        });
        ConnectionHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    async fn run<P: Peer>(
        mut self,
        peer: P,
        mut inbound: mpsc::Receiver<Inbound>,
        mut shutdown: oneshot::Receiver<()>,
    ) -> Result<S, ConnectionError> {
        let mut writer = RelayWriter::spawn(peer);
        loop {
            let next = tokio::select! {
                biased;
                _ = &mut shutdown => return Ok(self.session),
                next = inbound.recv() => next,
            };
            let Some(Inbound { message, fds }) = next else {
                break;
            };
            self.fds.extend(fds);
            let res = tokio::select! {
                biased;
                _ = &mut shutdown => return Ok(self.session),
                res = self.handle(message, &writer) => res,
            };
            let Some(ack) = res? else {
                continue;
            };
            tokio::select! {
                biased;
                _ = &mut shutdown => return Ok(self.session),
                _ = ack => { },
            }
        }
        if !self.fds.is_empty() {
            log::warn!("{} file descriptors were not claimed by any request", self.fds.len());
        }
        writer.drain().await;
        Ok(self.session)
    }

    /// Dispatches one request. Returns a receiver that completes once the peer has
    /// processed the request if the connection must wait for it.
    async fn handle(
        &mut self,
        message: RawMessage,
        writer: &RelayWriter,
    ) -> Result<Option<oneshot::Receiver<()>>, ConnectionError> {
        let res = self
            .dispatcher
            .dispatch(&mut self.session, &message, &mut self.fds)
            .await;
        let dispatched = match res {
            Ok(d) => d,
            Err(e) => {
                let Some((code, msg)) = e.protocol_error() else {
                    return Err(ConnectionError::Dispatch(message.object, Box::new(e)));
                };
                log::warn!(
                    "Object {} sent an invalid request: {}",
                    message.object,
                    ErrorFmt(&e),
                );
                self.events.send(protocol_error(message.object, code, &msg))?;
                return Ok(None);
            }
        };
        let relay = RelayMessage {
            bytes: message.bytes,
            fds: dispatched.fds,
        };
        match dispatched.action {
            NextAction::Nop => Ok(None),
            NextAction::Relay => {
                writer.forward(relay, None);
                Ok(None)
            }
            NextAction::RelayWait => {
                let (tx, rx) = oneshot::channel();
                writer.forward(relay, Some(tx));
                Ok(Some(rx))
            }
        }
    }
}
