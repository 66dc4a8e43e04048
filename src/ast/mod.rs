use std::fmt;

use itertools::Itertools;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringSpan {
    pub pos_start: usize,
    pub pos_end: usize,
}

impl fmt::Display for StringSpan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.pos_start, self.pos_end)
    }
}

/// A possibly qualified name, `foo.bar.B` has qualifiers `[foo, bar]` and name `B`.
#[derive(Debug, Clone, PartialEq)]
pub struct DottedName<'a> {
    pub qualifiers: Vec<&'a str>,
    pub name: &'a str,
    pub span: Option<StringSpan>,
}

impl<'a> DottedName<'a> {
    pub fn new(qualifiers: Vec<&'a str>, name: &'a str) -> Self {
        Self {
            qualifiers,
            name,
            span: None,
        }
    }
    pub fn path(&self) -> String {
        self.qualifiers
            .iter()
            .chain(std::iter::once(&self.name))
            .join(".")
    }
}

impl fmt::Display for DottedName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// `parameter` and `species` declarations share the same shape.
#[derive(Debug, Clone)]
pub struct Declaration<'a> {
    pub name: DottedName<'a>,
    pub value: Option<Box<Ast<'a>>>,
    pub documentation: Option<Box<Ast<'a>>>,
}

#[derive(Debug, Clone)]
pub struct ReactionEquation<'a> {
    pub reactants: Vec<&'a str>,
    pub products: Vec<&'a str>,
    pub kinetic_law: String,
}

#[derive(Debug, Clone)]
pub struct Reaction<'a> {
    pub name: Option<DottedName<'a>>,
    pub equation: Option<ReactionEquation<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// `x := expr`, the target is computed directly from known values.
    Assignment,
    /// `x = expr`, the target is solved jointly with the differential states.
    Algebraic,
}

#[derive(Debug, Clone)]
pub struct Rule<'a> {
    pub name: Option<DottedName<'a>>,
    pub kind: RuleKind,
    pub variable: &'a str,
    pub expression: String,
}

#[derive(Debug, Clone)]
pub struct AssignName<'a> {
    pub name: DottedName<'a>,
    pub value: Box<Ast<'a>>,
}

#[derive(Debug, Clone)]
pub enum AstKind<'a> {
    Parameter(Declaration<'a>),
    Species(Declaration<'a>),
    Reaction(Reaction<'a>),
    Rule(Rule<'a>),
    AssignName(AssignName<'a>),
    AccessName(DottedName<'a>),
    Float(f64),
    Integer(i64),
    String(&'a str),
    Docstring(&'a str),
    NewObject,
    Sequence(Vec<Ast<'a>>),
}

impl<'a> AstKind<'a> {
    pub fn as_sequence(&self) -> Option<&Vec<Ast<'a>>> {
        match self {
            AstKind::Sequence(items) => Some(items),
            _ => None,
        }
    }
    pub fn as_declaration(&self) -> Option<&Declaration<'a>> {
        match self {
            AstKind::Parameter(decl) | AstKind::Species(decl) => Some(decl),
            _ => None,
        }
    }
    pub fn as_reaction(&self) -> Option<&Reaction<'a>> {
        match self {
            AstKind::Reaction(reaction) => Some(reaction),
            _ => None,
        }
    }
    pub fn as_rule(&self) -> Option<&Rule<'a>> {
        match self {
            AstKind::Rule(rule) => Some(rule),
            _ => None,
        }
    }
    pub fn as_assign_name(&self) -> Option<&AssignName<'a>> {
        match self {
            AstKind::AssignName(assign) => Some(assign),
            _ => None,
        }
    }
    pub fn as_real(&self) -> Option<f64> {
        match self {
            AstKind::Float(value) => Some(*value),
            AstKind::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ast<'a> {
    pub kind: AstKind<'a>,
    pub span: Option<StringSpan>,
}

impl<'a> Ast<'a> {
    pub fn new(kind: AstKind<'a>) -> Self {
        Self { kind, span: None }
    }
}

fn fmt_declaration(f: &mut fmt::Formatter, keyword: &str, decl: &Declaration) -> fmt::Result {
    write!(f, "{} {}", keyword, decl.name)?;
    if let Some(value) = &decl.value {
        write!(f, " = {}", value)?;
    }
    if let Some(doc) = &decl.documentation {
        write!(f, " {}", doc)?;
    }
    Ok(())
}

impl fmt::Display for Ast<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            AstKind::Parameter(decl) => fmt_declaration(f, "parameter", decl),
            AstKind::Species(decl) => fmt_declaration(f, "species", decl),
            AstKind::Reaction(reaction) => {
                write!(f, "reaction")?;
                if let Some(name) = &reaction.name {
                    write!(f, " {}", name)?;
                }
                if let Some(eqn) = &reaction.equation {
                    write!(
                        f,
                        " {{ {} -> {}; {} }}",
                        eqn.reactants.join(" + "),
                        eqn.products.join(" + "),
                        eqn.kinetic_law
                    )?;
                }
                Ok(())
            }
            AstKind::Rule(rule) => {
                write!(f, "rule")?;
                if let Some(name) = &rule.name {
                    write!(f, " {}", name)?;
                }
                let op = match rule.kind {
                    RuleKind::Assignment => ":=",
                    RuleKind::Algebraic => "=",
                };
                write!(f, " {{ {} {} {} }}", rule.variable, op, rule.expression)
            }
            AstKind::AssignName(assign) => write!(f, "{} = {}", assign.name, assign.value),
            AstKind::AccessName(name) => write!(f, "{}", name),
            AstKind::Float(value) => write!(f, "{}", value),
            AstKind::Integer(value) => write!(f, "{}", value),
            AstKind::String(text) => write!(f, "\"{}\"", text),
            AstKind::Docstring(text) => write!(f, "\"\"\"{}\"\"\"", text),
            AstKind::NewObject => write!(f, "{{}}"),
            AstKind::Sequence(items) => {
                write!(f, "[{}]", items.iter().map(|item| item.to_string()).join(", "))
            }
        }
    }
}
