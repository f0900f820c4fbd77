#![allow(clippy::len_zero, clippy::enum_variant_names)]

pub mod cli;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod emitter;
pub mod fixed;
pub mod logger;
pub mod object;
pub mod relay;
pub mod schema;
#[cfg(test)]
mod test_utils;
pub mod utils;
