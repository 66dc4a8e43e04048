pub mod dependency;

use std::collections::HashMap;

use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info};

use crate::error::Error;
use crate::model::{FlatModel, FlatRule, RuleKind};

pub use dependency::{resolve, StateOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Ode,
    Algebraic,
    Substitution,
}

impl StateKind {
    /// ODE and algebraic states are solved for and so own a slot in the state
    /// vector.
    pub fn is_indexed(&self) -> bool {
        matches!(self, StateKind::Ode | StateKind::Algebraic)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub kind: StateKind,
    pub expression: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: String,
    pub equation: Equation,
    pub initial_condition: f64,
    pub comment: String,
}

impl State {
    pub fn new(id: &str, kind: StateKind, expression: &str, initial_condition: f64) -> Self {
        Self {
            id: id.to_string(),
            equation: Equation {
                kind,
                expression: expression.to_string(),
                comment: String::new(),
            },
            initial_condition,
            comment: String::new(),
        }
    }
    pub fn kind(&self) -> StateKind {
        self.equation.kind
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub id: String,
    pub value: f64,
    pub comment: String,
}

/// Read access to a resolved DAE model, the input of the numerical exporters.
pub trait DaeModel {
    fn model_name(&self) -> &str;
    fn parameters(&self) -> &[ParameterInfo];
    fn states(&self) -> &[State];
    /// Simulation options and their default values, in emission order.
    fn options(&self) -> &IndexMap<String, f64>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationOptions {
    pub t_init: f64,
    pub t_end: f64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            t_init: 0.0,
            t_end: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DaeSystem {
    name: String,
    parameters: Vec<ParameterInfo>,
    states: Vec<State>,
    options: IndexMap<String, f64>,
}

impl DaeModel for DaeSystem {
    fn model_name(&self) -> &str {
        self.name.as_str()
    }
    fn parameters(&self) -> &[ParameterInfo] {
        self.parameters.as_slice()
    }
    fn states(&self) -> &[State] {
        self.states.as_slice()
    }
    fn options(&self) -> &IndexMap<String, f64> {
        &self.options
    }
}

impl DaeSystem {
    pub fn new(name: &str, options: SimulationOptions) -> Self {
        let options = IndexMap::from([
            ("t_init".to_string(), options.t_init),
            ("t_end".to_string(), options.t_end),
        ]);
        Self {
            name: name.to_string(),
            parameters: Vec::new(),
            states: Vec::new(),
            options,
        }
    }

    pub fn with_parameter(mut self, id: &str, value: f64) -> Self {
        self.parameters.push(ParameterInfo {
            id: id.to_string(),
            value,
            comment: String::new(),
        });
        self
    }

    pub fn with_state(mut self, state: State) -> Self {
        self.states.push(state);
        self
    }

    /// Derive the DAE system of a flattened model.
    ///
    /// A species targeted by a rule takes the rule as its equation, every other
    /// species gets the ODE given by the stoichiometric sum of the kinetic laws
    /// of the reactions it takes part in.
    pub fn from_flat_model(
        flat: &FlatModel,
        name: &str,
        options: SimulationOptions,
    ) -> Result<Self, Error> {
        let mut system = Self::new(name, options);
        system.parameters = flat
            .parameters
            .iter()
            .map(|parameter| ParameterInfo {
                id: parameter.id.clone(),
                value: parameter.value,
                comment: parameter.documentation.clone().unwrap_or_default(),
            })
            .collect();

        let mut rules: HashMap<&str, &FlatRule> = HashMap::new();
        for rule in &flat.rules {
            if rules.insert(rule.variable.id.as_str(), rule).is_some() {
                return Err(Error::DuplicateEquation {
                    state: rule.variable.id.clone(),
                });
            }
        }

        // (sign, rate, reaction id) per species, in reaction order
        let mut terms: HashMap<&str, Vec<(char, String, &str)>> = HashMap::new();
        for reaction in &flat.reactions {
            let references = reaction
                .reactants
                .iter()
                .map(|r| ('-', r))
                .chain(reaction.products.iter().map(|r| ('+', r)))
                .filter(|(_, r)| !rules.contains_key(r.id.as_str()))
                .collect::<Vec<_>>();
            if references.is_empty() {
                continue;
            }
            let law = flat
                .kinetic_law(reaction)?
                .ok_or_else(|| Error::MissingKineticLaw {
                    reaction: reaction.id.clone(),
                })?
                .to_string();
            for (sign, reference) in references {
                terms.entry(reference.id.as_str()).or_default().push((
                    sign,
                    law.clone(),
                    reaction.id.as_str(),
                ));
            }
        }

        for species in &flat.species {
            let equation = match rules.get(species.id.as_str()) {
                Some(rule) => Equation {
                    kind: match rule.kind {
                        RuleKind::Assignment => StateKind::Substitution,
                        RuleKind::Algebraic => StateKind::Algebraic,
                    },
                    expression: flat.rule_expression(rule)?.to_string(),
                    comment: rule.id.clone(),
                },
                None => {
                    let rates = terms.remove(species.id.as_str()).unwrap_or_default();
                    let expression = if rates.is_empty() {
                        "0".to_string()
                    } else {
                        let sum: String = rates
                            .iter()
                            .map(|(sign, law, _)| format!("{}({})", sign, law))
                            .collect();
                        sum.strip_prefix('+').unwrap_or(&sum).to_string()
                    };
                    Equation {
                        kind: StateKind::Ode,
                        expression,
                        comment: rates.iter().map(|(_, _, id)| id).unique().join(", "),
                    }
                }
            };
            debug!(
                "state '{}' ({:?}): {}",
                species.id, equation.kind, equation.expression
            );
            system.states.push(State {
                id: species.id.clone(),
                equation,
                initial_condition: species.initial_value,
                comment: species.documentation.clone().unwrap_or_default(),
            });
        }
        info!(
            "derived DAE system '{}' with {} states and {} parameters",
            name,
            system.states.len(),
            system.parameters.len()
        );
        Ok(system)
    }
}

#[cfg(test)]
mod tests {
    use super::{DaeModel, DaeSystem, SimulationOptions, StateKind};
    use crate::error::Error;
    use crate::model::{FlatModel, Object, RuleKind, Value};

    fn flat(root: &Object) -> FlatModel {
        FlatModel::from_object(root).unwrap()
    }

    #[test]
    fn stoichiometric_odes() {
        let mut root = Object::generic();
        root.insert("A", Value::Object(Object::species(1.0)));
        root.insert("B", Value::Object(Object::species(0.0)));
        root.insert("C", Value::Object(Object::species(0.0)));
        root.insert("k1", Value::Object(Object::parameter(1.0)));
        root.insert("k2", Value::Object(Object::parameter(0.5)));
        root.insert("J1", Value::Object(Object::reaction(&["A"], &["B"], "k1*A")));
        root.insert("J2", Value::Object(Object::reaction(&["B", "B"], &["A"], "k2*B^2")));

        let dae = DaeSystem::from_flat_model(&flat(&root), "chain", SimulationOptions::default())
            .unwrap();
        assert_eq!(dae.model_name(), "chain");
        let equations: Vec<_> = dae
            .states()
            .iter()
            .map(|s| (s.id.as_str(), s.kind(), s.equation.expression.as_str()))
            .collect();
        assert_eq!(
            equations,
            vec![
                ("A", StateKind::Ode, "-(k1*A)+(k2*B^2)"),
                ("B", StateKind::Ode, "(k1*A)-(k2*B^2)-(k2*B^2)"),
                ("C", StateKind::Ode, "0"),
            ]
        );
        assert_eq!(dae.states()[0].equation.comment, "J1, J2");
        assert_eq!(dae.states()[0].initial_condition, 1.0);
        assert_eq!(dae.parameters().len(), 2);
        assert_eq!(dae.options().get("t_end"), Some(&10.0));
    }

    #[test]
    fn rules_become_states() {
        let mut root = Object::generic();
        root.insert("A", Value::Object(Object::species(1.0)));
        root.insert("C", Value::Object(Object::species(0.0)));
        root.insert("D", Value::Object(Object::species(0.0)));
        root.insert("r1", Value::Object(Object::rule(RuleKind::Assignment, "C", "2*A")));
        root.insert("r2", Value::Object(Object::rule(RuleKind::Algebraic, "D", "A-D^2")));
        // production of C is ignored, its rule defines it
        root.insert("J1", Value::Object(Object::reaction(&[], &["C"], "")));

        let dae = DaeSystem::from_flat_model(&flat(&root), "m", SimulationOptions::default())
            .unwrap();
        let kinds: Vec<_> = dae.states().iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec![StateKind::Ode, StateKind::Substitution, StateKind::Algebraic]
        );
        assert_eq!(dae.states()[1].equation.expression, "2*A");
        assert_eq!(dae.states()[1].equation.comment, "r1");
    }

    #[test]
    fn derivation_errors() {
        let mut root = Object::generic();
        root.insert("A", Value::Object(Object::species(0.0)));
        root.insert("J1", Value::Object(Object::reaction(&["A"], &[], "")));
        let err = DaeSystem::from_flat_model(&flat(&root), "m", SimulationOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::MissingKineticLaw { reaction } if reaction == "J1"));

        let mut root = Object::generic();
        root.insert("A", Value::Object(Object::species(0.0)));
        root.insert("r1", Value::Object(Object::rule(RuleKind::Assignment, "A", "1")));
        root.insert("r2", Value::Object(Object::rule(RuleKind::Algebraic, "A", "2")));
        let err = DaeSystem::from_flat_model(&flat(&root), "m", SimulationOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEquation { state } if state == "A"));
    }
}
