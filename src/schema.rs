//! The validated in-memory model of one or more protocol documents.

pub use {
    builder::{SchemaError, build},
    model::{
        Arg, ArgKind, Description, Direction, Entry, Enum, Interface, Message, Protocol, Schema,
    },
    names::{is_reserved, safe_name, to_camel, to_upper},
};

mod builder;
mod model;
mod names;
#[cfg(test)]
mod tests;
