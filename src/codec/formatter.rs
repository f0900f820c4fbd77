use {
    crate::{
        codec::arg::{ArgValue, padded},
        fixed::Fixed,
        object::ObjectId,
    },
    byteorder::{ByteOrder, NativeEndian},
    std::sync::Arc,
    uapi::OwnedFd,
};

/// Appends one message to a byte buffer.
///
/// Call `header` first and `write_len` last. The length is patched into the header by
/// `write_len`.
pub struct MsgFormatter<'a> {
    buf: &'a mut Vec<u8>,
    start: usize,
    fds: &'a mut Vec<Arc<OwnedFd>>,
}

impl<'a> MsgFormatter<'a> {
    pub fn new(buf: &'a mut Vec<u8>, fds: &'a mut Vec<Arc<OwnedFd>>) -> Self {
        Self {
            start: buf.len(),
            buf,
            fds,
        }
    }

    /// The offset of the next write relative to the start of the message.
    pub fn pos(&self) -> usize {
        self.buf.len() - self.start
    }

    fn pad(&mut self) {
        let len = padded(self.buf.len()) - self.buf.len();
        self.buf.extend_from_slice(&[0; 4][..len]);
    }

    pub fn uint(&mut self, int: u32) -> &mut Self {
        let mut bytes = [0; 4];
        NativeEndian::write_u32(&mut bytes, int);
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn int(&mut self, int: i32) -> &mut Self {
        self.uint(int as u32)
    }

    pub fn fixed(&mut self, fixed: Fixed) -> &mut Self {
        self.int(fixed.0)
    }

    pub fn object(&mut self, obj: ObjectId) -> &mut Self {
        self.uint(obj.raw())
    }

    pub fn optstr(&mut self, s: Option<&str>) -> &mut Self {
        match s {
            Some(s) => self.string(s),
            _ => self.uint(0),
        }
    }

    pub fn string(&mut self, s: &str) -> &mut Self {
        self.uint(s.len() as u32 + 1);
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        self.pad();
        self
    }

    pub fn array(&mut self, a: &[u8]) -> &mut Self {
        self.uint(a.len() as u32);
        self.buf.extend_from_slice(a);
        self.pad();
        self
    }

    pub fn fd(&mut self, fd: Arc<OwnedFd>) -> &mut Self {
        self.fds.push(fd);
        self
    }

    pub fn arg(&mut self, arg: &ArgValue) -> &mut Self {
        match arg {
            ArgValue::Int(v) => self.int(*v),
            ArgValue::Uint(v) => self.uint(*v),
            ArgValue::Fixed(v) => self.fixed(*v),
            ArgValue::String(s) => self.optstr(s.as_deref()),
            ArgValue::Object(id) | ArgValue::NewId(id) => self.object(*id),
            ArgValue::Array(a) => self.array(a),
            ArgValue::Fd(fd) => self.fd(fd.clone()),
        }
    }

    pub fn header(&mut self, obj: ObjectId, opcode: u16) -> &mut Self {
        self.object(obj).uint(opcode as u32)
    }

    pub fn write_len(self) {
        let len = self.pos();
        assert!(len >= 8);
        assert!(len <= u16::MAX as usize);
        let word = &mut self.buf[self.start + 4..self.start + 8];
        let opcode = NativeEndian::read_u32(word);
        NativeEndian::write_u32(word, opcode | ((len as u32) << 16));
    }
}
