//! Byte layout of arguments and messages.

pub use {
    arg::{ArgValue, padded},
    fds::FdQueue,
    formatter::MsgFormatter,
    framing::{FrameError, FrameReader},
    message::{
        Args, EncodeError, EncodedMessage, HEADER_SIZE, MAX_MESSAGE_SIZE, MessageLayout,
        RawMessage, decode_args, encode,
    },
    parser::{MsgParser, MsgParserError},
};

mod arg;
mod fds;
mod formatter;
mod framing;
mod message;
mod parser;
