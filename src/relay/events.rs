use {
    crate::{
        codec::{ArgValue, EncodeError, EncodedMessage, encode},
        object::ObjectId,
        schema::Message,
    },
    thiserror::Error,
    tokio::sync::mpsc,
};

#[derive(Debug, Error)]
pub enum EventError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("The event stream is closed")]
    Closed,
}

/// Queues events for the sender of requests.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<EncodedMessage>,
}

pub fn event_channel() -> (EventSink, mpsc::UnboundedReceiver<EncodedMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, rx)
}

impl EventSink {
    pub fn send(&self, message: EncodedMessage) -> Result<(), EventError> {
        self.tx.send(message).map_err(|_| EventError::Closed)
    }

    pub fn event(
        &self,
        object: ObjectId,
        message: &Message,
        args: &[ArgValue],
    ) -> Result<(), EventError> {
        log::trace!("{}.{}({:?})", object, message.name, args);
        self.send(encode(object, message, args)?)
    }
}
