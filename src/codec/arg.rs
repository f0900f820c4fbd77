use {
    crate::{fixed::Fixed, object::ObjectId, schema::ArgKind},
    std::{
        fmt::{Debug, Formatter},
        sync::Arc,
    },
    uapi::OwnedFd,
};

/// Rounds a byte count up to the next multiple of 4.
pub const fn padded(len: usize) -> usize {
    (len + 3) & !3
}

impl ArgKind {
    /// The encoded size of arguments of this kind if it does not depend on the value.
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            ArgKind::Int | ArgKind::Uint | ArgKind::Fixed | ArgKind::Object | ArgKind::NewId => {
                Some(4)
            }
            ArgKind::Fd => Some(0),
            ArgKind::String | ArgKind::Array => None,
        }
    }
}

/// A decoded argument.
#[derive(Clone)]
pub enum ArgValue {
    Int(i32),
    Uint(u32),
    Fixed(Fixed),
    String(Option<String>),
    Object(ObjectId),
    NewId(ObjectId),
    Array(Vec<u8>),
    Fd(Arc<OwnedFd>),
}

impl ArgValue {
    pub fn kind(&self) -> ArgKind {
        match self {
            ArgValue::Int(_) => ArgKind::Int,
            ArgValue::Uint(_) => ArgKind::Uint,
            ArgValue::Fixed(_) => ArgKind::Fixed,
            ArgValue::String(_) => ArgKind::String,
            ArgValue::Object(_) => ArgKind::Object,
            ArgValue::NewId(_) => ArgKind::NewId,
            ArgValue::Array(_) => ArgKind::Array,
            ArgValue::Fd(_) => ArgKind::Fd,
        }
    }

    /// The number of payload bytes this value occupies.
    pub fn encoded_len(&self) -> usize {
        match self {
            ArgValue::String(None) => 4,
            ArgValue::String(Some(s)) => 4 + padded(s.len() + 1),
            ArgValue::Array(a) => 4 + padded(a.len()),
            _ => self.kind().fixed_len().unwrap_or_default(),
        }
    }
}

impl Debug for ArgValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgValue::Int(v) => write!(f, "{v}"),
            ArgValue::Uint(v) => write!(f, "{v}"),
            ArgValue::Fixed(v) => write!(f, "{v}"),
            ArgValue::String(None) => f.write_str("null"),
            ArgValue::String(Some(s)) => write!(f, "{s:?}"),
            ArgValue::Object(id) => write!(f, "object#{id}"),
            ArgValue::NewId(id) => write!(f, "new_id#{id}"),
            ArgValue::Array(a) => write!(f, "array[{}]", a.len()),
            ArgValue::Fd(fd) => write!(f, "fd({})", fd.raw()),
        }
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ArgValue::Int(l), ArgValue::Int(r)) => l == r,
            (ArgValue::Uint(l), ArgValue::Uint(r)) => l == r,
            (ArgValue::Fixed(l), ArgValue::Fixed(r)) => l == r,
            (ArgValue::String(l), ArgValue::String(r)) => l == r,
            (ArgValue::Object(l), ArgValue::Object(r)) => l == r,
            (ArgValue::NewId(l), ArgValue::NewId(r)) => l == r,
            (ArgValue::Array(l), ArgValue::Array(r)) => l == r,
            (ArgValue::Fd(l), ArgValue::Fd(r)) => l.raw() == r.raw(),
            _ => false,
        }
    }
}
