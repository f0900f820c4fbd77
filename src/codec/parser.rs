use {
    crate::{
        codec::{
            arg::{ArgValue, padded},
            fds::FdQueue,
        },
        fixed::Fixed,
        object::ObjectId,
        schema::{Arg, ArgKind},
    },
    byteorder::{ByteOrder, NativeEndian},
    std::sync::Arc,
    thiserror::Error,
    uapi::OwnedFd,
};

#[derive(Debug, Error)]
pub enum MsgParserError {
    #[error("The message ended unexpectedly")]
    UnexpectedEof,
    #[error("The message contained a null string for a non-nullable argument")]
    NullString,
    #[error("String is not terminated by a nul byte")]
    MissingTerminator,
    #[error("Message is missing a required file descriptor")]
    MissingFd,
    #[error("There is trailing data after the message")]
    TrailingData,
    #[error("String is not UTF-8")]
    NonUtf8,
}

pub struct MsgParser<'a, 'b> {
    fds: &'a mut FdQueue,
    pos: usize,
    data: &'b [u8],
}

impl<'a, 'b> MsgParser<'a, 'b> {
    pub fn new(fds: &'a mut FdQueue, data: &'b [u8]) -> Self {
        Self { fds, pos: 0, data }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'b [u8], MsgParserError> {
        if self.data.len() - self.pos < len {
            return Err(MsgParserError::UnexpectedEof);
        }
        let res = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(res)
    }

    pub fn int(&mut self) -> Result<i32, MsgParserError> {
        self.take(4).map(NativeEndian::read_i32)
    }

    pub fn uint(&mut self) -> Result<u32, MsgParserError> {
        self.take(4).map(NativeEndian::read_u32)
    }

    pub fn object(&mut self) -> Result<ObjectId, MsgParserError> {
        self.uint().map(ObjectId::from_raw)
    }

    pub fn fixed(&mut self) -> Result<Fixed, MsgParserError> {
        self.int().map(Fixed)
    }

    pub fn optstr(&mut self) -> Result<Option<&'b str>, MsgParserError> {
        let len = self.uint()? as usize;
        if len == 0 {
            return Ok(None);
        }
        let s = self.take(padded(len))?;
        if s[len - 1] != 0 {
            return Err(MsgParserError::MissingTerminator);
        }
        match std::str::from_utf8(&s[..len - 1]) {
            Ok(s) => Ok(Some(s)),
            _ => Err(MsgParserError::NonUtf8),
        }
    }

    pub fn str(&mut self) -> Result<&'b str, MsgParserError> {
        self.optstr()?.ok_or(MsgParserError::NullString)
    }

    pub fn array(&mut self) -> Result<&'b [u8], MsgParserError> {
        let len = self.uint()? as usize;
        let a = self.take(padded(len))?;
        Ok(&a[..len])
    }

    pub fn fd(&mut self) -> Result<OwnedFd, MsgParserError> {
        self.fds.pop().ok_or(MsgParserError::MissingFd)
    }

    /// Decodes one argument as described by the schema.
    pub fn arg(&mut self, arg: &Arg) -> Result<ArgValue, MsgParserError> {
        let value = match arg.kind {
            ArgKind::Int => ArgValue::Int(self.int()?),
            ArgKind::Uint => ArgValue::Uint(self.uint()?),
            ArgKind::Fixed => ArgValue::Fixed(self.fixed()?),
            ArgKind::Object => ArgValue::Object(self.object()?),
            ArgKind::NewId => ArgValue::NewId(self.object()?),
            ArgKind::String => {
                let s = match arg.allow_null {
                    true => self.optstr()?,
                    false => Some(self.str()?),
                };
                ArgValue::String(s.map(|s| s.to_string()))
            }
            ArgKind::Array => ArgValue::Array(self.array()?.to_vec()),
            ArgKind::Fd => ArgValue::Fd(Arc::new(self.fd()?)),
        };
        Ok(value)
    }

    pub fn eof(&self) -> Result<(), MsgParserError> {
        if self.pos == self.data.len() {
            Ok(())
        } else {
            Err(MsgParserError::TrailingData)
        }
    }
}
