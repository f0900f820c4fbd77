pub use {
    ast::{Attribute, Element},
    parser::{AttributeError, ParserError, parse},
};

mod ast;
mod parser;
