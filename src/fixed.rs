use std::fmt::{Debug, Display, Formatter};

/// A signed 24.8 fixed-point number as it appears on the wire.
///
/// The codec transports the raw word unchanged. Conversions are provided for handlers
/// that want to look at the value.
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Fixed(pub i32);

impl Fixed {
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub fn from_f64(f: f64) -> Self {
        Self((f * 256.0) as i32)
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 256.0
    }
}

impl Debug for Fixed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.to_f64(), f)
    }
}

impl Display for Fixed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.to_f64(), f)
    }
}
