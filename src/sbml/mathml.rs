use crate::error::Error;
use crate::math::{function, Expr, TIME};

use super::xml::XmlWriter;

pub const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";
pub const TIME_SYMBOL_URL: &str = "http://www.sbml.org/sbml/symbols/time";

fn operator_element(op: char) -> Option<&'static str> {
    match op {
        '+' => Some("plus"),
        '-' => Some("minus"),
        '*' => Some("times"),
        '/' => Some("divide"),
        '^' => Some("power"),
        _ => None,
    }
}

fn write_number(xml: &mut XmlWriter, text: &str) {
    if let Some(split) = text.find(['e', 'E']) {
        let (mantissa, exponent) = (&text[..split], &text[split + 1..]);
        let exponent = exponent.strip_prefix('+').unwrap_or(exponent);
        xml.line(&format!(
            "<cn type=\"e-notation\"> {} <sep/> {} </cn>",
            mantissa, exponent
        ));
    } else if text.bytes().all(|b| b.is_ascii_digit()) {
        xml.text_element("cn", &[("type", "integer")], text);
    } else {
        xml.text_element("cn", &[], text);
    }
}

struct Renderer<'a> {
    xml: &'a mut XmlWriter,
    root: &'a Expr,
}

impl Renderer<'_> {
    fn error(&self, message: String) -> Error {
        Error::Serialization {
            expression: self.root.to_string(),
            message,
        }
    }

    fn apply(&mut self, element: &str, args: &[&Expr]) -> Result<(), Error> {
        self.xml.start("apply", &[]);
        self.xml.empty(element, &[]);
        for arg in args {
            self.write(arg)?;
        }
        self.xml.end("apply");
        Ok(())
    }

    fn write(&mut self, expr: &Expr) -> Result<(), Error> {
        match expr {
            Expr::Number(text) => write_number(self.xml, text),
            Expr::Name(name) if name == TIME => self.xml.text_element(
                "csymbol",
                &[("encoding", "text"), ("definitionURL", TIME_SYMBOL_URL)],
                name,
            ),
            Expr::Name(name) => self.xml.text_element("ci", &[], name),
            Expr::Binop { op, left, right } => {
                let element = operator_element(*op)
                    .ok_or_else(|| self.error(format!("unknown operator '{}'", op)))?;
                self.apply(element, &[left.as_ref(), right.as_ref()])?;
            }
            Expr::Monop { op: '-', child } => self.apply("minus", &[child.as_ref()])?,
            Expr::Monop { child, .. } => self.write(child)?,
            Expr::Call { fn_name, args } => {
                let function = function(fn_name)
                    .ok_or_else(|| self.error(format!("unknown function '{}'", fn_name)))?;
                function
                    .check_arity(args.len())
                    .map_err(|message| self.error(message))?;
                let args: Vec<&Expr> = args.iter().collect();
                self.apply(function.mathml, &args)?;
            }
            Expr::Paren(child) => self.write(child)?,
        }
        Ok(())
    }
}

/// Write `expr` as a MathML `<math>` element.
pub fn write_math(xml: &mut XmlWriter, expr: &Expr) -> Result<(), Error> {
    xml.start("math", &[("xmlns", MATHML_NS)]);
    Renderer {
        xml: &mut *xml,
        root: expr,
    }
    .write(expr)?;
    xml.end("math");
    Ok(())
}
