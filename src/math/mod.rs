pub mod expr;
pub mod functions;
pub mod lexer;

pub use expr::{Expr, Notation};
pub use functions::{function, Function, FUNCTIONS};
pub use lexer::{identifier_names, tokenize, Token, TokenKind};

/// Symbol for the independent variable.
pub const TIME: &str = "t";
