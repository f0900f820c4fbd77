use {
    crate::{
        codec::{
            arg::ArgValue,
            fds::FdQueue,
            formatter::MsgFormatter,
            parser::{MsgParser, MsgParserError},
        },
        object::ObjectId,
        schema::{ArgKind, Message},
    },
    byteorder::{ByteOrder, NativeEndian},
    smallvec::SmallVec,
    std::sync::Arc,
    thiserror::Error,
    uapi::OwnedFd,
};

pub const HEADER_SIZE: usize = 8;
/// Lengths are carried in the upper 16 bits of the second header word.
pub const MAX_MESSAGE_SIZE: usize = u16::MAX as usize;

pub type Args = SmallVec<[ArgValue; 8]>;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("The message would be {len} bytes long but at most 65535 bytes are allowed")]
    MessageTooLarge { len: usize },
    #[error("{message} takes {expected} arguments but {actual} were supplied")]
    ArgCount {
        message: String,
        expected: usize,
        actual: usize,
    },
    #[error("Argument {arg} of {message} has type {expected} but a {actual} was supplied")]
    KindMismatch {
        message: String,
        arg: String,
        expected: ArgKind,
        actual: ArgKind,
    },
    #[error("Argument {arg} of {message} is not nullable")]
    NullString { message: String, arg: String },
    #[error("Argument {arg} of {message} was written at offset {actual} instead of {expected}")]
    Layout {
        message: String,
        arg: String,
        expected: usize,
        actual: usize,
    },
}

/// A complete message as it appears on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawMessage {
    pub object: ObjectId,
    pub opcode: u16,
    /// The header followed by the payload.
    pub bytes: Vec<u8>,
}

impl RawMessage {
    /// Parses the header at the start of `bytes`. Returns the object, the opcode, and the
    /// length stored in the header.
    pub fn parse_header(bytes: &[u8]) -> Option<(ObjectId, u16, usize)> {
        if bytes.len() < HEADER_SIZE {
            return None;
        }
        let object = ObjectId::from_raw(NativeEndian::read_u32(&bytes[0..4]));
        let word = NativeEndian::read_u32(&bytes[4..8]);
        Some((object, word as u16, (word >> 16) as usize))
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// A message produced by `encode` together with the descriptors that must be sent with it.
pub struct EncodedMessage {
    pub bytes: Vec<u8>,
    pub fds: Vec<Arc<OwnedFd>>,
}

/// The byte offset of every argument of a message about to be encoded.
#[derive(Debug, Eq, PartialEq)]
pub struct MessageLayout {
    pub total_len: usize,
    pub offsets: SmallVec<[usize; 8]>,
}

impl MessageLayout {
    pub fn compute(values: &[ArgValue]) -> Result<Self, EncodeError> {
        let mut offsets = SmallVec::new();
        let mut pos = HEADER_SIZE;
        for value in values {
            offsets.push(pos);
            pos += value.encoded_len();
        }
        if pos > MAX_MESSAGE_SIZE {
            return Err(EncodeError::MessageTooLarge { len: pos });
        }
        Ok(Self {
            total_len: pos,
            offsets,
        })
    }
}

fn check_values(message: &Message, values: &[ArgValue]) -> Result<(), EncodeError> {
    if message.args.len() != values.len() {
        return Err(EncodeError::ArgCount {
            message: message.name.clone(),
            expected: message.args.len(),
            actual: values.len(),
        });
    }
    for (arg, value) in message.args.iter().zip(values) {
        if arg.kind != value.kind() {
            return Err(EncodeError::KindMismatch {
                message: message.name.clone(),
                arg: arg.name.clone(),
                expected: arg.kind,
                actual: value.kind(),
            });
        }
        if !arg.allow_null && matches!(value, ArgValue::String(None)) {
            return Err(EncodeError::NullString {
                message: message.name.clone(),
                arg: arg.name.clone(),
            });
        }
    }
    Ok(())
}

/// Encodes a message sent by `object`.
///
/// Nothing is produced unless the whole message can be encoded.
pub fn encode(
    object: ObjectId,
    message: &Message,
    values: &[ArgValue],
) -> Result<EncodedMessage, EncodeError> {
    check_values(message, values)?;
    let layout = MessageLayout::compute(values)?;
    let mut bytes = Vec::with_capacity(layout.total_len);
    let mut fds = vec![];
    let mut fmt = MsgFormatter::new(&mut bytes, &mut fds);
    fmt.header(object, message.opcode);
    for ((arg, value), &offset) in message.args.iter().zip(values).zip(&layout.offsets) {
        if fmt.pos() != offset {
            return Err(EncodeError::Layout {
                message: message.name.clone(),
                arg: arg.name.clone(),
                expected: offset,
                actual: fmt.pos(),
            });
        }
        fmt.arg(value);
    }
    fmt.write_len();
    Ok(EncodedMessage { bytes, fds })
}

/// Decodes the payload of a message.
///
/// If fewer descriptors are queued than the message carries, no descriptor is consumed.
pub fn decode_args(
    message: &Message,
    payload: &[u8],
    fds: &mut FdQueue,
) -> Result<Args, MsgParserError> {
    if fds.len() < message.fd_count() {
        return Err(MsgParserError::MissingFd);
    }
    let mut parser = MsgParser::new(fds, payload);
    let mut args = Args::new();
    for arg in &message.args {
        args.push(parser.arg(arg)?);
    }
    parser.eof()?;
    Ok(args)
}
