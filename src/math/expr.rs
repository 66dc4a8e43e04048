use std::fmt;

use crate::error::Error;

use super::lexer::{tokenize, Token, TokenKind};

/// Binary operator tree built from a token stream.
///
/// Parentheses written in the source are kept as [`Expr::Paren`] so that text
/// renderers reproduce the original grouping.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(String),
    Name(String),
    Binop {
        op: char,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Monop {
        op: char,
        child: Box<Expr>,
    },
    Call {
        fn_name: String,
        args: Vec<Expr>,
    },
    Paren(Box<Expr>),
}

fn precedence(op: char) -> u8 {
    match op {
        '+' | '-' => 1,
        '*' | '/' => 2,
        _ => 4,
    }
}

impl Expr {
    pub fn parse(text: &str) -> Result<Expr, Error> {
        let tokens = tokenize(text);
        let mut parser = ExprParser {
            text,
            tokens,
            pos: 0,
        };
        parser.parse()
    }

    pub fn binop(op: char, left: Expr, right: Expr) -> Expr {
        Expr::Binop {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn monop(op: char, child: Expr) -> Expr {
        Expr::Monop {
            op,
            child: Box::new(child),
        }
    }

    pub fn paren(child: Expr) -> Expr {
        Expr::Paren(Box::new(child))
    }

    /// Binding strength of the outermost node; leaves bind tightest.
    fn binding(&self) -> u8 {
        match self {
            Expr::Binop { op, .. } => precedence(*op),
            Expr::Monop { .. } => 3,
            _ => 5,
        }
    }

    /// Rebuild the expression with every symbol replaced by `f(symbol)`.
    pub fn map_names<F>(&self, f: &mut F) -> Result<Expr, Error>
    where
        F: FnMut(&str) -> Result<String, Error>,
    {
        Ok(match self {
            Expr::Number(text) => Expr::Number(text.clone()),
            Expr::Name(name) => Expr::Name(f(name)?),
            Expr::Binop { op, left, right } => {
                Expr::binop(*op, left.map_names(f)?, right.map_names(f)?)
            }
            Expr::Monop { op, child } => Expr::monop(*op, child.map_names(f)?),
            Expr::Call { fn_name, args } => Expr::Call {
                fn_name: fn_name.clone(),
                args: args
                    .iter()
                    .map(|arg| arg.map_names(f))
                    .collect::<Result<_, _>>()?,
            },
            Expr::Paren(child) => Expr::paren(child.map_names(f)?),
        })
    }

    /// Write the expression in infix form, spelled by `notation`.
    pub fn write_infix<N: Notation + ?Sized>(&self, out: &mut String, notation: &N) -> Result<(), Error> {
        self.write_node(out, notation)
            .map_err(|message| Error::Serialization {
                expression: self.to_string(),
                message,
            })
    }

    fn write_node<N: Notation + ?Sized>(&self, out: &mut String, notation: &N) -> Result<(), String> {
        match self {
            Expr::Number(text) => out.push_str(text),
            Expr::Name(symbol) => out.push_str(&notation.name(symbol)?),
            Expr::Binop { op, left, right } => {
                let prec = precedence(*op);
                // '^' is right associative, everything else left associative
                let (left_min, right_min) = if *op == '^' {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                left.write_operand(out, left_min, notation)?;
                out.push_str(&notation.operator(*op));
                right.write_operand(out, right_min, notation)?;
            }
            Expr::Monop { op, child } => {
                out.push(*op);
                child.write_operand(out, 3, notation)?;
            }
            Expr::Call { fn_name, args } => {
                out.push_str(&notation.function(fn_name, args.len())?);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    arg.write_node(out, notation)?;
                }
                out.push(')');
            }
            Expr::Paren(child) => {
                out.push('(');
                child.write_node(out, notation)?;
                out.push(')');
            }
        }
        Ok(())
    }

    fn write_operand<N: Notation + ?Sized>(
        &self,
        out: &mut String,
        min_binding: u8,
        notation: &N,
    ) -> Result<(), String> {
        if self.binding() < min_binding {
            out.push('(');
            self.write_node(out, notation)?;
            out.push(')');
        } else {
            self.write_node(out, notation)?;
        }
        Ok(())
    }
}

/// Spelling of symbols, operators and function names for a text renderer.
/// Errors are messages, [`Expr::write_infix`] attaches the expression.
pub trait Notation {
    fn name(&self, symbol: &str) -> Result<String, String>;
    fn operator(&self, op: char) -> String {
        op.to_string()
    }
    fn function(&self, fn_name: &str, _args: usize) -> Result<String, String> {
        Ok(fn_name.to_string())
    }
}

/// The expression as written.
struct Source;

impl Notation for Source {
    fn name(&self, symbol: &str) -> Result<String, String> {
        Ok(symbol.to_string())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut out = String::new();
        self.write_node(&mut out, &Source).map_err(|_| fmt::Error)?;
        write!(f, "{}", out)
    }
}

struct ExprParser<'a> {
    text: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn error(&self, message: String) -> Error {
        Error::Serialization {
            expression: self.text.to_string(),
            message,
        }
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_punct(&mut self, value: &str) -> Result<(), Error> {
        match self.next() {
            Some(token) if token.is_punct(value) => Ok(()),
            Some(token) => Err(self.error(format!(
                "expected '{}', found '{}'",
                value, token.value
            ))),
            None => Err(self.error(format!("expected '{}', found end of expression", value))),
        }
    }

    fn parse(&mut self) -> Result<Expr, Error> {
        if self.tokens.is_empty() {
            return Err(self.error("empty expression".to_string()));
        }
        let expr = self.expression()?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(self.error(format!("unexpected '{}'", token.value))),
        }
    }

    // expr := term (('+'|'-') term)*
    fn expression(&mut self) -> Result<Expr, Error> {
        let mut head = self.term()?;
        while let Some(op) = self.peek().filter(|t| t.is_operator("+") || t.is_operator("-")) {
            self.pos += 1;
            let rhs = self.term()?;
            head = Expr::binop(op.value.chars().next().unwrap_or('+'), head, rhs);
        }
        Ok(head)
    }

    // term := unary (('*'|'/') unary)*
    fn term(&mut self) -> Result<Expr, Error> {
        let mut head = self.unary()?;
        while let Some(op) = self.peek().filter(|t| t.is_operator("*") || t.is_operator("/")) {
            self.pos += 1;
            let rhs = self.unary()?;
            head = Expr::binop(op.value.chars().next().unwrap_or('*'), head, rhs);
        }
        Ok(head)
    }

    // unary := ('-'|'+') unary | power
    fn unary(&mut self) -> Result<Expr, Error> {
        match self.peek() {
            Some(token) if token.is_operator("-") || token.is_operator("+") => {
                self.pos += 1;
                let child = self.unary()?;
                Ok(Expr::monop(token.value.chars().next().unwrap_or('-'), child))
            }
            _ => self.power(),
        }
    }

    // power := primary ('^' unary)?
    fn power(&mut self) -> Result<Expr, Error> {
        let base = self.primary()?;
        if self.peek().is_some_and(|t| t.is_operator("^")) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Expr::binop('^', base, exponent));
        }
        Ok(base)
    }

    // primary := NUMBER | IDENT | IDENT '(' args ')' | '(' expr ')'
    fn primary(&mut self) -> Result<Expr, Error> {
        let token = match self.next() {
            Some(token) => token,
            None => return Err(self.error("unexpected end of expression".to_string())),
        };
        match token.kind {
            TokenKind::Number => Ok(Expr::Number(token.value.to_string())),
            TokenKind::Identifier => {
                if self.peek().is_some_and(|t| t.is_punct("(")) {
                    self.pos += 1;
                    let mut args = Vec::new();
                    if self.peek().is_some_and(|t| t.is_punct(")")) {
                        self.pos += 1;
                    } else {
                        loop {
                            args.push(self.expression()?);
                            if self.peek().is_some_and(|t| t.is_punct(",")) {
                                self.pos += 1;
                            } else {
                                self.expect_punct(")")?;
                                break;
                            }
                        }
                    }
                    Ok(Expr::Call {
                        fn_name: token.value.to_string(),
                        args,
                    })
                } else {
                    Ok(Expr::Name(token.value.to_string()))
                }
            }
            TokenKind::Punct if token.value == "(" => {
                let inner = self.expression()?;
                self.expect_punct(")")?;
                Ok(Expr::paren(inner))
            }
            TokenKind::Punct | TokenKind::Operator => {
                Err(self.error(format!("unexpected '{}'", token.value)))
            }
        }
    }
}
