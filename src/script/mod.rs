//! The line-oriented scripting language for orchestrating packs: `bind`, `remove`, `copy`, `clone`.

mod interp;
mod lexer;
mod parser;

pub use interp::Interpreter;
pub use parser::{parse, Command, Ref, Script};
