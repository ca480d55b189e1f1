//! Call scripts: a line-oriented text form of builder calls
//!
//! Each statement is exactly one builder call, so a script is a replayable
//! record of a builder session.

pub mod ast;
mod grammar;
mod interpret;
pub mod lexer;

pub use ast::*;
pub use grammar::parse;
pub use interpret::interpret;
