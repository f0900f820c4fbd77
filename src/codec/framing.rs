use {
    crate::codec::message::{HEADER_SIZE, RawMessage},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Message size is < 8 ({0})")]
    MessageSizeTooSmall(usize),
    #[error("Message size is not a multiple of 4 ({0})")]
    UnalignedMessage(usize),
}

/// Splits a byte stream into messages.
#[derive(Default)]
pub struct FrameReader {
    buf: Vec<u8>,
    pos: usize,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.drain(..self.pos);
        self.pos = 0;
        self.buf.extend_from_slice(bytes);
    }

    /// The number of buffered bytes that do not yet form a complete message.
    pub fn pending(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns the next complete message, or `None` if more bytes are needed.
    ///
    /// After an error the stream cannot be resynchronized.
    pub fn next(&mut self) -> Result<Option<RawMessage>, FrameError> {
        let rest = &self.buf[self.pos..];
        let Some((object, opcode, len)) = RawMessage::parse_header(rest) else {
            return Ok(None);
        };
        if len < HEADER_SIZE {
            return Err(FrameError::MessageSizeTooSmall(len));
        }
        if len % 4 != 0 {
            return Err(FrameError::UnalignedMessage(len));
        }
        if rest.len() < len {
            return Ok(None);
        }
        let bytes = rest[..len].to_vec();
        self.pos += len;
        Ok(Some(RawMessage {
            object,
            opcode,
            bytes,
        }))
    }
}
