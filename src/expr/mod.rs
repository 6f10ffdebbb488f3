pub mod expr;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use expr::{BinOp, Definition, Expr, ParsedExpression, UnOp};
pub use functions::Func;
pub use parser::parse;
