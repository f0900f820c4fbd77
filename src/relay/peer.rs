use {
    futures_util::future::BoxFuture,
    std::{io, sync::Arc},
    thiserror::Error,
    tokio::sync::mpsc,
    uapi::OwnedFd,
};

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("The peer connection is closed")]
    Closed,
    #[error("Could not write to the peer")]
    Io(#[from] io::Error),
}

/// A request forwarded unchanged: the original header and payload plus the descriptors the
/// request consumed.
pub struct RelayMessage {
    pub bytes: Vec<u8>,
    pub fds: Vec<Arc<OwnedFd>>,
}

/// The secondary connection requests are forwarded to.
pub trait Peer: Send + 'static {
    /// Completes once the peer has accepted the message.
    fn forward(&mut self, message: RelayMessage) -> BoxFuture<'_, Result<(), PeerError>>;
}

impl Peer for mpsc::Sender<RelayMessage> {
    fn forward(&mut self, message: RelayMessage) -> BoxFuture<'_, Result<(), PeerError>> {
        Box::pin(async move { self.send(message).await.map_err(|_| PeerError::Closed) })
    }
}
