pub mod onemodel_parser;

pub use onemodel_parser::OneModelParser;
pub use onemodel_parser::Rule;

use pest::error::Error;

use crate::ast::Ast;

pub fn parse_onemodel_string(text: &str) -> Result<Ast<'_>, Box<Error<Rule>>> {
    onemodel_parser::parse_string(text)
}
