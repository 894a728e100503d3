//! A small turtle-graphics language.
//!
//! Source text is tokenized by [`Lexer`], assembled into an arena syntax tree
//! by the recursive-descent [`parser`], and walked by [`Interpreter`], which
//! drives any [`Turtle`] implementation. [`Recorder`] is a headless turtle
//! that records what it draws.
//!
//! ```
//! use turtle_logo::{run_source, Completion, Interpreter, Recorder};
//!
//! let mut interpreter = Interpreter::new(Recorder::new());
//! let done = run_source("repeat 4 {\nforward 10\nleft 90\n}\n", &mut interpreter).unwrap();
//! assert_eq!(done, Completion::Finished);
//! assert_eq!(interpreter.turtle().lines().count(), 4);
//! ```

pub mod ast;
pub mod control;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod tree;
pub mod turtle;

pub use ast::{AstNode, KEYWORDS, Kind, Palette, Program};
pub use control::Control;
pub use error::{Error, RuntimeError, SyntaxError, TreeError};
pub use interpreter::{Completion, Interpreter, InterpreterConfig};
pub use lexer::Lexer;
pub use parser::{Parser, parse};
pub use token::{Token, TokenKind};
pub use tree::{NodeId, SubTree, Tree};
pub use turtle::{DrawCommand, Point, Recorder, Turtle};

/// Parses `source` and runs it on `interpreter`.
pub fn run_source<T: Turtle>(
    source: &str,
    interpreter: &mut Interpreter<T>,
) -> Result<Completion, Error> {
    let program = parse(source)?;
    Ok(interpreter.run(&program)?)
}
