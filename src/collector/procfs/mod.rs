//! Parsers for the Linux `/proc` counter files.

pub mod parser;

pub use parser::{CounterLine, ParseError};
