use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::debug;

use crate::error::Error;
use crate::math::{Expr, TIME};

use super::{Object, ObjectKind, RuleKind, Value};

/// Joins scope names into qualified ids.
pub const SEPARATOR: &str = "__";

/// Qualified id of `name` declared in `scope` (root scope is empty).
pub fn qualified_id<S: AsRef<str>>(scope: &[S], name: &str) -> String {
    scope
        .iter()
        .map(AsRef::as_ref)
        .chain(std::iter::once(name))
        .join(SEPARATOR)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatParameter {
    pub id: String,
    pub value: f64,
    pub units: &'static str,
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatSpecies {
    pub id: String,
    pub initial_value: f64,
    pub documentation: Option<String>,
}

/// A species name as written in a reaction or rule, and the qualified id it
/// resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesReference {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatReaction {
    pub id: String,
    /// Names of the namespaces enclosing the reaction, outermost first.
    pub scope: Vec<String>,
    pub reactants: Vec<SpeciesReference>,
    pub products: Vec<SpeciesReference>,
    /// Kinetic law as written, symbols are resolved on demand by
    /// [`FlatModel::kinetic_law`].
    pub kinetic_law: String,
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatRule {
    pub id: String,
    pub scope: Vec<String>,
    pub kind: RuleKind,
    pub variable: SpeciesReference,
    pub expression: String,
    pub documentation: Option<String>,
}

/// Every entity of a namespace tree under its qualified id, in depth-first
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatModel {
    pub parameters: Vec<FlatParameter>,
    pub species: Vec<FlatSpecies>,
    pub reactions: Vec<FlatReaction>,
    pub rules: Vec<FlatRule>,
    species_ids: HashSet<String>,
    parameter_ids: HashSet<String>,
    /// Name each id was declared under in its own namespace.
    local_names: HashMap<String, String>,
}

/// Reaction or rule waiting for the species registry to be complete.
struct Pending<'o> {
    id: String,
    scope: Vec<String>,
    object: &'o Object,
}

#[derive(Default)]
struct Collector<'o> {
    flat: FlatModel,
    ids: HashSet<String>,
    reactions: Vec<Pending<'o>>,
    rules: Vec<Pending<'o>>,
}

impl<'o> Collector<'o> {
    fn register(&mut self, id: &str, name: &str) -> Result<(), Error> {
        if !self.ids.insert(id.to_string()) {
            return Err(Error::DuplicateQualifiedId { id: id.to_string() });
        }
        self.flat.local_names.insert(id.to_string(), name.to_string());
        Ok(())
    }

    fn visit(&mut self, namespace: &'o Object, scope: &mut Vec<String>) -> Result<(), Error> {
        for (name, value) in namespace.children() {
            let object = match value {
                Value::Object(object) => object,
                other => {
                    debug!("skip {} '{}' while flattening", other.kind_name(), name);
                    continue;
                }
            };
            let id = qualified_id(scope, name);
            let documentation = object.documentation().map(str::to_string);
            match object.kind() {
                ObjectKind::Generic => {}
                ObjectKind::Parameter(_) | ObjectKind::Species(_) if id == TIME => {
                    return Err(Error::ReservedName {
                        name: id,
                        usage: "the simulation time",
                    });
                }
                ObjectKind::Parameter(parameter) => {
                    self.register(&id, name)?;
                    self.flat.parameter_ids.insert(id.clone());
                    self.flat.parameters.push(FlatParameter {
                        id,
                        value: parameter.value,
                        units: parameter.units,
                        documentation,
                    });
                }
                ObjectKind::Species(species) => {
                    self.register(&id, name)?;
                    self.flat.species_ids.insert(id.clone());
                    self.flat.species.push(FlatSpecies {
                        id,
                        initial_value: species.initial_value,
                        documentation,
                    });
                }
                ObjectKind::Reaction(_) => {
                    self.register(&id, name)?;
                    self.reactions.push(Pending {
                        id,
                        scope: scope.clone(),
                        object,
                    });
                }
                ObjectKind::Rule(_) => {
                    self.register(&id, name)?;
                    self.rules.push(Pending {
                        id,
                        scope: scope.clone(),
                        object,
                    });
                }
            }
            scope.push(name.clone());
            self.visit(object, scope)?;
            scope.pop();
        }
        Ok(())
    }
}

impl FlatModel {
    /// Flatten the tree rooted at `root`, which itself contributes no scope name.
    pub fn from_object(root: &Object) -> Result<Self, Error> {
        let mut collector = Collector::default();
        collector.visit(root, &mut Vec::new())?;
        let Collector {
            mut flat,
            reactions,
            rules,
            ..
        } = collector;

        for pending in reactions {
            let reaction = match pending.object.kind() {
                ObjectKind::Reaction(reaction) => reaction,
                _ => continue,
            };
            let resolve = |names: &[String]| -> Result<Vec<SpeciesReference>, Error> {
                names
                    .iter()
                    .map(|name| flat.species_reference(&pending.scope, name, &pending.id))
                    .collect()
            };
            let reactants = resolve(&reaction.reactants)?;
            let products = resolve(&reaction.products)?;
            debug!(
                "reaction '{}': {} -> {}",
                pending.id,
                reactants.iter().map(|r| r.id.as_str()).join(" + "),
                products.iter().map(|r| r.id.as_str()).join(" + ")
            );
            flat.reactions.push(FlatReaction {
                id: pending.id,
                scope: pending.scope,
                reactants,
                products,
                kinetic_law: reaction.kinetic_law.clone(),
                documentation: pending.object.documentation().map(str::to_string),
            });
        }

        for pending in rules {
            let rule = match pending.object.kind() {
                ObjectKind::Rule(rule) => rule,
                _ => continue,
            };
            let variable = flat.species_reference(&pending.scope, &rule.variable, &pending.id)?;
            flat.rules.push(FlatRule {
                id: pending.id,
                scope: pending.scope,
                kind: rule.kind,
                variable,
                expression: rule.expression.clone(),
                documentation: pending.object.documentation().map(str::to_string),
            });
        }
        Ok(flat)
    }

    /// Every id in the flattened model.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .map(|p| p.id.as_str())
            .chain(self.species.iter().map(|s| s.id.as_str()))
            .chain(self.reactions.iter().map(|r| r.id.as_str()))
            .chain(self.rules.iter().map(|r| r.id.as_str()))
    }

    pub fn is_parameter(&self, id: &str) -> bool {
        self.parameter_ids.contains(id)
    }

    pub fn is_species(&self, id: &str) -> bool {
        self.species_ids.contains(id)
    }

    /// Search `scope` and then each enclosing scope out to the root for an
    /// entity declared there as `name` and accepted by `known`.
    fn lookup<F: Fn(&str) -> bool>(&self, scope: &[String], name: &str, known: F) -> Option<String> {
        (0..=scope.len())
            .rev()
            .map(|depth| qualified_id(&scope[..depth], name))
            .find(|id| {
                // a mangled name must not reach into a nested namespace
                self.local_names.get(id).is_some_and(|local| local == name) && known(id)
            })
    }

    fn species_reference(
        &self,
        scope: &[String],
        name: &str,
        context: &str,
    ) -> Result<SpeciesReference, Error> {
        let id = self.lookup(scope, name, |id| self.is_species(id)).ok_or_else(|| {
            Error::UnresolvedReference {
                context: context.to_string(),
                name: name.to_string(),
            }
        })?;
        Ok(SpeciesReference {
            name: name.to_string(),
            id,
        })
    }

    /// Resolve a symbol of an expression to a parameter or species id.
    pub fn resolve_symbol(&self, scope: &[String], name: &str, context: &str) -> Result<String, Error> {
        if let Some(id) = self.lookup(scope, name, |id| self.is_parameter(id) || self.is_species(id)) {
            return Ok(id);
        }
        // the time symbol stays free
        if name == TIME {
            return Ok(name.to_string());
        }
        Err(Error::UnresolvedReference {
            context: context.to_string(),
            name: name.to_string(),
        })
    }

    fn resolve_expression(&self, scope: &[String], text: &str, context: &str) -> Result<Expr, Error> {
        Expr::parse(text)?.map_names(&mut |name: &str| self.resolve_symbol(scope, name, context))
    }

    /// The kinetic law of `reaction` with every symbol replaced by its qualified
    /// id, `None` if the reaction has no kinetic law.
    pub fn kinetic_law(&self, reaction: &FlatReaction) -> Result<Option<Expr>, Error> {
        if reaction.kinetic_law.trim().is_empty() {
            return Ok(None);
        }
        self.resolve_expression(&reaction.scope, &reaction.kinetic_law, &reaction.id)
            .map(Some)
    }

    /// The expression of `rule` with every symbol replaced by its qualified id.
    pub fn rule_expression(&self, rule: &FlatRule) -> Result<Expr, Error> {
        self.resolve_expression(&rule.scope, &rule.expression, &rule.id)
    }
}
