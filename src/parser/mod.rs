//! PHP parser: Logos lexer, recursive-descent parser, spanned AST.
//!
//! The parser is error-recovering: malformed regions become [`ast::Stmt::Error`]
//! or [`ast::Expr::Error`] nodes and parsing continues, so a document always
//! yields a tree.

pub mod ast;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;

pub use ast::SourceFile;
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{Parse, SyntaxError, parse};
