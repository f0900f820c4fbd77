use {
    crate::{
        codec::{EncodedMessage, MsgFormatter, MsgParserError},
        object::{DISPLAY_ID, ObjectId},
    },
    std::error::Error,
    thiserror::Error,
};

/// `wl_display.error`
pub const ERROR_OPCODE: u16 = 0;
pub const INVALID_OBJECT: u32 = 0;
pub const INVALID_METHOD: u32 = 1;

/// Longer messages are truncated so that the event always fits into one message.
const MAX_MESSAGE_LEN: usize = 4096;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("opcode={opcode} args={args:?} not found")]
    InvalidMethod {
        opcode: u16,
        args: Vec<u8>,
        #[source]
        source: Option<MsgParserError>,
    },
    #[error("object={0} not found")]
    InvalidObject(ObjectId),
    #[error("{interface}::{request} is not implemented yet")]
    NotImplemented { interface: String, request: String },
    #[error("Interface {interface} has no request named {request}")]
    UnknownRequest { interface: String, request: String },
    #[error("Interface {interface} is a global singleton and object {live} is still alive")]
    DuplicateSingleton { interface: String, live: ObjectId },
    #[error("The handler of {interface}::{request} failed")]
    Handler {
        interface: String,
        request: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl DispatchError {
    /// The error code and message reported to the sender of the request, if this error is
    /// a protocol error.
    pub fn protocol_error(&self) -> Option<(u32, String)> {
        let code = match self {
            DispatchError::InvalidMethod { .. } => INVALID_METHOD,
            DispatchError::NotImplemented { .. } => INVALID_METHOD,
            DispatchError::InvalidObject(_) => INVALID_OBJECT,
            _ => return None,
        };
        Some((code, self.to_string()))
    }
}

/// Encodes a `wl_display.error` event about `object`.
pub fn protocol_error(object: ObjectId, code: u32, mut message: &str) -> EncodedMessage {
    if message.len() > MAX_MESSAGE_LEN {
        let mut end = MAX_MESSAGE_LEN;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message = &message[..end];
    }
    let mut bytes = vec![];
    let mut fds = vec![];
    let mut fmt = MsgFormatter::new(&mut bytes, &mut fds);
    fmt.header(DISPLAY_ID, ERROR_OPCODE)
        .object(object)
        .uint(code)
        .string(message);
    fmt.write_len();
    EncodedMessage { bytes, fds }
}
