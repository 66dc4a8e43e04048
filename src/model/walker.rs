use itertools::Itertools;
use log::{debug, warn};

use crate::ast::{self, Ast, AstKind, DottedName, StringSpan};
use crate::error::Error;

use super::{AttributeMismatch, Object, ObjectKind, OneModel, Parameter, Reaction, Rule, Species, Value};

/// Recoverable events noticed while walking a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A binding replaced an existing one at the same path.
    Overwrite {
        path: String,
        span: Option<StringSpan>,
    },
}

/// State of a single compilation run.
///
/// Numbering of unnamed reactions and rules starts again for every context, so
/// compiling the same program twice gives the same names.
#[derive(Debug, Default)]
pub struct CompileContext {
    pub deny_overwrite: bool,
    unnamed_reactions: usize,
    unnamed_rules: usize,
    diagnostics: Vec<Diagnostic>,
}

impl CompileContext {
    pub fn new(deny_overwrite: bool) -> Self {
        Self {
            deny_overwrite,
            ..Default::default()
        }
    }
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.as_slice()
    }
    fn next_reaction_name(&mut self) -> String {
        self.unnamed_reactions += 1;
        format!("_J{}", self.unnamed_reactions)
    }
    fn next_rule_name(&mut self) -> String {
        self.unnamed_rules += 1;
        format!("_R{}", self.unnamed_rules)
    }
}

/// Build the namespace tree described by `program`.
pub fn walk(program: &Ast, context: &mut CompileContext) -> Result<OneModel, Error> {
    let mut walker = Walker {
        model: OneModel::new(),
        context,
    };
    walker.walk(program)?;
    Ok(walker.model)
}

/// Descend from `root` through every qualifier of `name`.
fn resolve_namespace_mut<'o>(
    root: &'o mut Object,
    name: &DottedName,
    span: Option<StringSpan>,
) -> Result<&'o mut Object, Error> {
    let mut namespace = root;
    for qualifier in &name.qualifiers {
        namespace = match namespace.child_mut(qualifier) {
            Some(child) => child,
            None => {
                return Err(Error::UndefinedNamespace {
                    path: name.path(),
                    qualifier: qualifier.to_string(),
                    span,
                })
            }
        };
    }
    Ok(namespace)
}

fn resolve_namespace<'o>(
    root: &'o Object,
    name: &DottedName,
    span: Option<StringSpan>,
) -> Result<&'o Object, Error> {
    name.qualifiers.iter().try_fold(root, |namespace, qualifier| {
        namespace
            .child(qualifier)
            .ok_or_else(|| Error::UndefinedNamespace {
                path: name.path(),
                qualifier: qualifier.to_string(),
                span,
            })
    })
}

fn invalid_attribute(
    path: String,
    key: &str,
    mismatch: AttributeMismatch,
    span: Option<StringSpan>,
) -> Error {
    Error::InvalidAttribute {
        path,
        key: key.to_string(),
        expected: mismatch.expected,
        found: mismatch.found,
        span,
    }
}

struct Walker<'c> {
    model: OneModel,
    context: &'c mut CompileContext,
}

impl Walker<'_> {
    fn walk(&mut self, node: &Ast) -> Result<Option<Value>, Error> {
        match &node.kind {
            AstKind::Parameter(decl) => {
                let kind = ObjectKind::Parameter(Parameter::default());
                self.walk_declaration(decl, kind, node.span)?;
                Ok(None)
            }
            AstKind::Species(decl) => {
                let kind = ObjectKind::Species(Species::default());
                self.walk_declaration(decl, kind, node.span)?;
                Ok(None)
            }
            AstKind::Reaction(reaction) => {
                self.walk_reaction(reaction, node.span)?;
                Ok(None)
            }
            AstKind::Rule(rule) => {
                self.walk_rule(rule, node.span)?;
                Ok(None)
            }
            AstKind::AssignName(assign) => {
                let value = self.eval(&assign.value)?;
                let span = assign.name.span.or(node.span);
                let path = assign.name.path();
                let namespace = resolve_namespace_mut(self.model.root_mut(), &assign.name, span)?;
                let previous = namespace
                    .set(assign.name.name, value)
                    .map_err(|m| invalid_attribute(path.clone(), assign.name.name, m, span))?;
                if previous.is_some() {
                    self.overwritten(path, span)?;
                }
                Ok(None)
            }
            AstKind::AccessName(name) => {
                let span = name.span.or(node.span);
                let namespace = resolve_namespace(self.model.root(), name, span)?;
                let value = namespace
                    .attribute(name.name)
                    .ok_or_else(|| Error::UndefinedName {
                        path: name.path(),
                        span,
                    })?;
                Ok(Some(value))
            }
            AstKind::Float(value) => Ok(Some(Value::Float(*value))),
            AstKind::Integer(value) => Ok(Some(Value::Integer(*value))),
            AstKind::String(text) => Ok(Some(Value::String(text.to_string()))),
            AstKind::Docstring(text) => {
                let text = text.split('\n').map(str::trim).join("\n");
                Ok(Some(Value::String(text)))
            }
            AstKind::NewObject => Ok(Some(Value::Object(Object::generic()))),
            AstKind::Sequence(items) => {
                let mut values = Vec::new();
                for item in items {
                    if let Some(value) = self.walk(item)? {
                        values.push(value);
                    }
                }
                Ok(Some(Value::List(values)))
            }
        }
    }

    /// Walk a node that must produce a value.
    fn eval(&mut self, node: &Ast) -> Result<Value, Error> {
        self.walk(node)?.ok_or_else(|| Error::InvalidAttribute {
            path: node.to_string(),
            key: "value".to_string(),
            expected: "a value",
            found: "a statement",
            span: node.span,
        })
    }

    fn overwritten(&mut self, path: String, span: Option<StringSpan>) -> Result<(), Error> {
        if self.context.deny_overwrite {
            return Err(Error::Overwrite { path, span });
        }
        warn!("'{}' is already defined, the previous definition is replaced", path);
        self.context
            .diagnostics
            .push(Diagnostic::Overwrite { path, span });
        Ok(())
    }

    /// Bind `object` at `name`, replacing whatever was there before.
    fn declare(
        &mut self,
        name: &DottedName,
        object: Object,
        span: Option<StringSpan>,
    ) -> Result<(), Error> {
        let path = name.path();
        let span = name.span.or(span);
        debug!("declare {:?} '{}'", object.kind(), path);
        let namespace = resolve_namespace_mut(self.model.root_mut(), name, span)?;
        if namespace.insert(name.name, Value::Object(object)).is_some() {
            self.overwritten(path, span)?;
        }
        Ok(())
    }

    fn walk_declaration(
        &mut self,
        decl: &ast::Declaration,
        kind: ObjectKind,
        span: Option<StringSpan>,
    ) -> Result<(), Error> {
        let mut object = Object::new(kind);
        if let Some(value) = &decl.value {
            let value = self.eval(value)?;
            object
                .set("value", value)
                .map_err(|m| invalid_attribute(decl.name.path(), "value", m, span))?;
        }
        if let Some(doc) = &decl.documentation {
            let doc = self.eval(doc)?;
            object
                .set(super::DOC_KEY, doc)
                .map_err(|m| invalid_attribute(decl.name.path(), super::DOC_KEY, m, span))?;
        }
        self.declare(&decl.name, object, span)
    }

    fn walk_reaction(&mut self, node: &ast::Reaction, span: Option<StringSpan>) -> Result<(), Error> {
        let mut reaction = Reaction::default();
        if let Some(eqn) = &node.equation {
            reaction.reactants = eqn.reactants.iter().map(|s| s.to_string()).collect();
            reaction.products = eqn.products.iter().map(|s| s.to_string()).collect();
            reaction.kinetic_law = eqn.kinetic_law.clone();
        }
        let object = Object::new(ObjectKind::Reaction(reaction));
        match &node.name {
            Some(name) => self.declare(name, object, span),
            None => {
                let name = self.context.next_reaction_name();
                self.declare(&DottedName::new(vec![], &name), object, span)
            }
        }
    }

    fn walk_rule(&mut self, node: &ast::Rule, span: Option<StringSpan>) -> Result<(), Error> {
        let object = Object::new(ObjectKind::Rule(Rule {
            kind: node.kind,
            variable: node.variable.to_string(),
            expression: node.expression.clone(),
        }));
        match &node.name {
            Some(name) => self.declare(name, object, span),
            None => {
                let name = self.context.next_rule_name();
                self.declare(&DottedName::new(vec![], &name), object, span)
            }
        }
    }
}
