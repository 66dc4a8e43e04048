#![allow(clippy::empty_docs)]
#[derive(Parser)]
#[grammar = "parser/onemodel_grammar.pest"] // relative to src
pub struct OneModelParser;

use itertools::Itertools;
use pest::error::Error;
use pest::iterators::Pair;
use pest::Parser;
use std::boxed::Box;

use crate::ast;
use crate::ast::Ast;
use crate::ast::AstKind;
use crate::ast::RuleKind;
use crate::ast::StringSpan;

fn span_of(pair: &Pair<Rule>) -> Option<StringSpan> {
    Some(StringSpan {
        pos_start: pair.as_span().start(),
        pos_end: pair.as_span().end(),
    })
}

//name       = @{ !keyword ~ (ASCII_ALPHA | "_") ~ (ASCII_ALPHANUMERIC | "_")* }
fn parse_name(pair: Pair<'_, Rule>) -> &str {
    pair.as_str()
}

//dotted_name = { name ~ ("." ~ name)* }
fn parse_dotted_name(pair: Pair<'_, Rule>) -> ast::DottedName<'_> {
    let span = span_of(&pair);
    let mut qualifiers: Vec<&str> = pair.into_inner().map(parse_name).collect();
    let name = qualifiers.pop().unwrap();
    ast::DottedName {
        qualifiers,
        name,
        span,
    }
}

//species_list = { (name ~ ("+" ~ name)*)? }
fn parse_species_list(pair: Pair<'_, Rule>) -> Vec<&str> {
    pair.into_inner().map(parse_name).collect()
}

//expr_text  = { expr_chunk+ }
fn parse_expr_text(pair: Pair<'_, Rule>) -> String {
    pair.into_inner().map(|chunk| chunk.as_str()).join(" ")
}

// parameter  = { kw_parameter ~ dotted_name ~ ("=" ~ number)? ~ docstring? }
// species    = { kw_species ~ dotted_name ~ ("=" ~ number)? ~ docstring? }
fn parse_declaration(pair: Pair<'_, Rule>) -> ast::Declaration<'_> {
    let mut inner = pair.into_inner();
    inner.next(); // keyword
    let name = parse_dotted_name(inner.next().unwrap());
    let value = if inner
        .peek()
        .is_some_and(|p| matches!(p.as_rule(), Rule::float | Rule::integer))
    {
        Some(Box::new(parse_value(inner.next().unwrap())))
    } else {
        None
    };
    let documentation = inner.next().map(|p| Box::new(parse_value(p)));
    ast::Declaration {
        name,
        value,
        documentation,
    }
}

fn parse_value(pair: Pair<'_, Rule>) -> Ast<'_> {
    let span = span_of(&pair);
    match pair.as_rule() {
        // float      = @{ "-"? ~ ASCII_DIGIT+ ~ (("." ~ ASCII_DIGIT* ~ exponent?) | exponent) }
        Rule::float => Ast {
            kind: AstKind::Float(pair.as_str().parse().unwrap()),
            span,
        },

        // integer    = @{ "-"? ~ ASCII_DIGIT+ }
        Rule::integer => {
            let text = pair.as_str();
            let kind = match text.parse::<i64>() {
                Ok(value) => AstKind::Integer(value),
                // too large for an i64, keep it as a real
                Err(_) => AstKind::Float(text.parse().unwrap()),
            };
            Ast { kind, span }
        }

        // docstring  = @{ "\"\"\"" ~ (!"\"\"\"" ~ ANY)* ~ "\"\"\"" }
        Rule::docstring => {
            let text = pair.as_str();
            Ast {
                kind: AstKind::Docstring(&text[3..text.len() - 3]),
                span,
            }
        }

        // string     = @{ "\"" ~ (!"\"" ~ ANY)* ~ "\"" }
        Rule::string => {
            let text = pair.as_str();
            Ast {
                kind: AstKind::String(&text[1..text.len() - 1]),
                span,
            }
        }

        // list       = { "[" ~ (value ~ ("," ~ value)*)? ~ ","? ~ "]" }
        // program    = { statement* }
        Rule::list | Rule::program => Ast {
            kind: AstKind::Sequence(pair.into_inner().map(parse_value).collect()),
            span,
        },

        // new_object = { "{" ~ "}" }
        Rule::new_object => Ast {
            kind: AstKind::NewObject,
            span,
        },

        // access_name = { dotted_name }
        Rule::access_name => Ast {
            kind: AstKind::AccessName(parse_dotted_name(pair.into_inner().next().unwrap())),
            span,
        },

        Rule::parameter => Ast {
            kind: AstKind::Parameter(parse_declaration(pair)),
            span,
        },

        Rule::species => Ast {
            kind: AstKind::Species(parse_declaration(pair)),
            span,
        },

        // reaction   = { kw_reaction ~ dotted_name? ~ reaction_body? }
        // reaction_body = { "{" ~ species_list ~ "->" ~ species_list ~ ";" ~ expr_text ~ "}" }
        Rule::reaction => {
            let mut inner = pair.into_inner();
            inner.next(); // keyword
            let name = if inner.peek().is_some_and(|p| p.as_rule() == Rule::dotted_name) {
                Some(parse_dotted_name(inner.next().unwrap()))
            } else {
                None
            };
            let equation = inner.next().map(|body| {
                let mut body = body.into_inner();
                let reactants = parse_species_list(body.next().unwrap());
                let products = parse_species_list(body.next().unwrap());
                let kinetic_law = parse_expr_text(body.next().unwrap());
                ast::ReactionEquation {
                    reactants,
                    products,
                    kinetic_law,
                }
            });
            Ast {
                kind: AstKind::Reaction(ast::Reaction { name, equation }),
                span,
            }
        }

        // rule       = { kw_rule ~ dotted_name? ~ "{" ~ name ~ rule_op ~ expr_text ~ "}" }
        Rule::rule => {
            let mut inner = pair.into_inner();
            inner.next(); // keyword
            let name = if inner.peek().is_some_and(|p| p.as_rule() == Rule::dotted_name) {
                Some(parse_dotted_name(inner.next().unwrap()))
            } else {
                None
            };
            let variable = parse_name(inner.next().unwrap());
            let kind = match inner.next().unwrap().as_str() {
                ":=" => RuleKind::Assignment,
                _ => RuleKind::Algebraic,
            };
            let expression = parse_expr_text(inner.next().unwrap());
            Ast {
                kind: AstKind::Rule(ast::Rule {
                    name,
                    kind,
                    variable,
                    expression,
                }),
                span,
            }
        }

        // assign_name = { dotted_name ~ "=" ~ value }
        Rule::assign_name => {
            let mut inner = pair.into_inner();
            let name = parse_dotted_name(inner.next().unwrap());
            let value = Box::new(parse_value(inner.next().unwrap()));
            Ast {
                kind: AstKind::AssignName(ast::AssignName { name, value }),
                span,
            }
        }

        _ => unreachable!("{:?}", pair.to_string()),
    }
}

pub fn parse_string(text: &str) -> Result<Ast<'_>, Box<Error<Rule>>> {
    let main = OneModelParser::parse(Rule::main, text)?.next().unwrap();
    let program = parse_value(main.into_inner().next().unwrap());
    Ok(program)
}
