//! Matlab implementation of a [`DaeModel`] for use with `ode15s`.
//!
//! Two layouts are supported, a set of plain function files and a single
//! `classdef`. Both share the expression rewrite, the state index and the
//! evaluation order of substitution states.

pub mod class;
pub mod functions;

use std::collections::HashSet;

use itertools::Itertools;
use log::info;

use crate::dae::{resolve, DaeModel, StateKind, StateOrder};
use crate::error::Error;
use crate::math::{function, Expr, Notation, FUNCTIONS, TIME};
use crate::GeneratedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatlabStyle {
    /// `<name>_param.m`, `<name>_ode.m`, `<name>_states.m` and `<name>_driver.m`.
    Functions,
    /// `<name>.m` holding a `classdef`, and `<name>_example.m`.
    Class,
}

/// Locals of the generated functions and scripts.
const LOCALS: &[&str] = &[TIME, "x", "p", "dx", "out", "ones_t", "x0", "M", "opt", "tspan"];

/// States become Matlab locals and fields of `out`, parameters become fields of
/// `p` and `out`.
fn check_names<M: DaeModel + ?Sized>(model: &M) -> Result<(), Error> {
    let usage = "generated Matlab code";
    for state in model.states() {
        let id = state.id.as_str();
        if LOCALS.contains(&id) || FUNCTIONS.iter().any(|f| f.matlab == id) {
            return Err(Error::ReservedName {
                name: state.id.clone(),
                usage,
            });
        }
    }
    if let Some(parameter) = model.parameters().iter().find(|p| p.id == TIME) {
        return Err(Error::ReservedName {
            name: parameter.id.clone(),
            usage,
        });
    }
    Ok(())
}

/// Render every file of `style` for `model`.
pub fn export<M: DaeModel + ?Sized>(model: &M, style: MatlabStyle) -> Result<Vec<GeneratedFile>, Error> {
    check_names(model)?;
    let order = resolve(model)?;
    let rewriter = Rewriter::new(model);
    let files = match style {
        MatlabStyle::Functions => functions::export(model, &order, &rewriter)?,
        MatlabStyle::Class => class::export(model, &order, &rewriter)?,
    };
    info!(
        "exported {} Matlab files for '{}'",
        files.len(),
        model.model_name()
    );
    Ok(files)
}

/// Translate equations into vectorised Matlab: parameters are read from the
/// struct `p`, `*`, `/`, `^` become element-wise and functions take their
/// Matlab names. Symbols that are neither parameters, states nor the time are
/// rejected.
pub struct Rewriter<'m> {
    parameters: HashSet<&'m str>,
    states: HashSet<&'m str>,
}

impl<'m> Rewriter<'m> {
    pub fn new<M: DaeModel + ?Sized>(model: &'m M) -> Self {
        Self {
            parameters: model.parameters().iter().map(|p| p.id.as_str()).collect(),
            states: model.states().iter().map(|s| s.id.as_str()).collect(),
        }
    }

    pub fn rewrite(&self, expression: &str) -> Result<String, Error> {
        let expr = Expr::parse(expression)?;
        let mut out = String::new();
        expr.write_infix(&mut out, self)?;
        Ok(out)
    }
}

impl Notation for Rewriter<'_> {
    fn name(&self, symbol: &str) -> Result<String, String> {
        if self.parameters.contains(symbol) {
            Ok(format!("p.{}", symbol))
        } else if self.states.contains(symbol) || symbol == TIME {
            Ok(symbol.to_string())
        } else {
            Err(format!("unknown symbol '{}'", symbol))
        }
    }

    fn operator(&self, op: char) -> String {
        match op {
            '*' | '/' | '^' => format!(".{}", op),
            _ => op.to_string(),
        }
    }

    fn function(&self, fn_name: &str, args: usize) -> Result<String, String> {
        let function = function(fn_name).ok_or_else(|| format!("unknown function '{}'", fn_name))?;
        function.check_arity(args)?;
        Ok(function.matlab.to_string())
    }
}

/// Tab indented source text.
#[derive(Debug, Default)]
pub(crate) struct Code {
    out: String,
    depth: usize,
}

impl Code {
    pub fn new(depth: usize) -> Self {
        Self {
            out: String::new(),
            depth,
        }
    }
    pub fn line<S: AsRef<str>>(&mut self, text: S) {
        for _ in 0..self.depth {
            self.out.push('\t');
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }
    pub fn blank(&mut self) {
        self.out.push('\n');
    }
    pub fn indent(&mut self) {
        self.depth += 1;
    }
    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
    pub fn finish(self) -> String {
        self.out
    }
}

/// Comments are kept on one line.
fn comment(text: &str) -> String {
    text.split_whitespace().join(" ")
}

fn annotated(line: String, text: &str) -> String {
    let text = comment(text);
    if text.is_empty() {
        line
    } else {
        format!("{} % {}", line, text)
    }
}

pub(crate) fn write_warning(code: &mut Code) {
    code.line("% This file was automatically generated by OneModel.");
    code.line("% Any changes you make to it will be overwritten the next time");
    code.line("% the file is generated.");
    code.blank();
}

pub(crate) fn write_parameters<M: DaeModel + ?Sized>(code: &mut Code, model: &M) {
    code.line("p = [];");
    for parameter in model.parameters() {
        code.line(annotated(
            format!("p.{} = {};", parameter.id, parameter.value),
            &parameter.comment,
        ));
    }
}

pub(crate) fn write_initial_conditions<M: DaeModel + ?Sized>(
    code: &mut Code,
    model: &M,
    order: &StateOrder,
) {
    code.line("x0 = [");
    code.indent();
    for &i in &order.indexed {
        let state = &model.states()[i];
        let suffix = match state.kind() {
            StateKind::Algebraic => " (algebraic)",
            _ => "",
        };
        code.line(format!("{} % {}{}", state.initial_condition, state.id, suffix));
    }
    code.dedent();
    code.line("];");
}

pub(crate) fn write_mass_matrix<M: DaeModel + ?Sized>(
    code: &mut Code,
    model: &M,
    order: &StateOrder,
) {
    code.line("M = [");
    code.indent();
    for row in order.mass_matrix(model).rows() {
        code.line(row.iter().join(" "));
    }
    code.dedent();
    code.line("];");
}

/// Bind every state as a local variable: solved states from the rows of `x`,
/// then the substitution states in dependency order.
pub(crate) fn write_local_states<M: DaeModel + ?Sized>(
    code: &mut Code,
    model: &M,
    order: &StateOrder,
    rewriter: &Rewriter,
) -> Result<(), Error> {
    code.line("% ODE and algebraic states.");
    for (row, &i) in order.indexed.iter().enumerate() {
        let state = &model.states()[i];
        let prefix = match state.kind() {
            StateKind::Algebraic => "(algebraic) ",
            _ => "",
        };
        code.line(annotated(
            format!("{} = x({},:);", state.id, row + 1),
            &format!("{}{}", prefix, state.comment),
        ));
    }
    code.blank();
    code.line("% Substitution states.");
    for &i in &order.substitutions {
        let state = &model.states()[i];
        code.line(annotated(
            format!(
                "{} = {};",
                state.id,
                rewriter.rewrite(&state.equation.expression)?
            ),
            &state.comment,
        ));
    }
    code.blank();
    Ok(())
}

/// One row of `dx` per solved state, algebraic states in residual form.
pub(crate) fn write_derivatives<M: DaeModel + ?Sized>(
    code: &mut Code,
    model: &M,
    order: &StateOrder,
    rewriter: &Rewriter,
) -> Result<(), Error> {
    code.line(format!("dx = zeros({},1);", order.indexed.len()));
    code.blank();
    for (row, &i) in order.indexed.iter().enumerate() {
        let state = &model.states()[i];
        let equation = rewriter.rewrite(&state.equation.expression)?;
        match state.kind() {
            StateKind::Algebraic => {
                code.line(format!(
                    "% der({}) (algebraic) \"{}\"",
                    state.id,
                    comment(&state.equation.comment)
                ));
                code.line(format!("dx({},1) = -{} + {};", row + 1, state.id, equation));
            }
            _ => {
                code.line(format!(
                    "% der({}) \"{}\"",
                    state.id,
                    comment(&state.equation.comment)
                ));
                code.line(format!("dx({},1) = {};", row + 1, equation));
            }
        }
        code.blank();
    }
    Ok(())
}

/// Fill `out` with the time, every state and every parameter as series over `t`.
pub(crate) fn write_outputs<M: DaeModel + ?Sized>(code: &mut Code, model: &M) {
    code.line("% Save simulation time.");
    code.line("out.t = t;");
    code.blank();
    code.line("% Vector for extending single-value states and parameters.");
    code.line("ones_t = ones(size(t));");
    code.blank();
    code.line("% Save states.");
    for state in model.states() {
        code.line(annotated(
            format!("out.{id} = {id}.*ones_t;", id = state.id),
            &state.comment,
        ));
    }
    code.blank();
    code.line("% Save parameters.");
    for parameter in model.parameters() {
        code.line(annotated(
            format!("out.{id} = p.{id}.*ones_t;", id = parameter.id),
            &parameter.comment,
        ));
    }
}
