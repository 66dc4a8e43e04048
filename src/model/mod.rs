pub mod flatten;
pub mod walker;

use indexmap::IndexMap;

pub use crate::ast::RuleKind;
pub use flatten::{FlatModel, FlatParameter, FlatReaction, FlatRule, FlatSpecies, SpeciesReference};
pub use walker::{walk, CompileContext, Diagnostic};

/// Units of every parameter: kinetic rate constants.
pub const PER_SECOND: &str = "per_second";

/// Attribute key holding the documentation of an object.
pub const DOC_KEY: &str = "__doc__";

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub value: f64,
    pub units: &'static str,
}

impl Default for Parameter {
    fn default() -> Self {
        Self {
            value: 0.0,
            units: PER_SECOND,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Species {
    pub initial_value: f64,
}

/// Reactants and products are the names visible from the reaction, they are
/// only resolved when the model is flattened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reaction {
    pub reactants: Vec<String>,
    pub products: Vec<String>,
    pub kinetic_law: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub kind: RuleKind,
    pub variable: String,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Generic,
    Parameter(Parameter),
    Species(Species),
    Reaction(Reaction),
    Rule(Rule),
}

/// Anything that can be bound to a name in a namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Object(Object),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "an integer",
            Value::Float(_) => "a float",
            Value::String(_) => "a string",
            Value::List(_) => "a list",
            Value::Object(_) => "an object",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }
}

/// A reserved attribute was assigned a value of the wrong kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeMismatch {
    pub expected: &'static str,
    pub found: &'static str,
}

fn number(value: Value) -> Result<f64, AttributeMismatch> {
    value.as_f64().ok_or(AttributeMismatch {
        expected: "a number",
        found: value.kind_name(),
    })
}

fn string(value: Value) -> Result<String, AttributeMismatch> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(AttributeMismatch {
            expected: "a string",
            found: other.kind_name(),
        }),
    }
}

fn names(value: Value) -> Result<Vec<String>, AttributeMismatch> {
    let mismatch = |found| AttributeMismatch {
        expected: "a list of names",
        found,
    };
    match value {
        Value::String(name) => Ok(vec![name]),
        Value::List(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Ok(name),
                other => Err(mismatch(other.kind_name())),
            })
            .collect(),
        other => Err(mismatch(other.kind_name())),
    }
}

/// A namespace node. Children keep their insertion order, which is the order
/// every exporter emits them in.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    name: String,
    kind: ObjectKind,
    children: IndexMap<String, Value>,
    documentation: Option<String>,
}

impl Object {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            name: String::new(),
            kind,
            children: IndexMap::new(),
            documentation: None,
        }
    }
    pub fn generic() -> Self {
        Self::new(ObjectKind::Generic)
    }
    pub fn parameter(value: f64) -> Self {
        Self::new(ObjectKind::Parameter(Parameter {
            value,
            ..Default::default()
        }))
    }
    pub fn species(initial_value: f64) -> Self {
        Self::new(ObjectKind::Species(Species { initial_value }))
    }
    pub fn reaction(reactants: &[&str], products: &[&str], kinetic_law: &str) -> Self {
        Self::new(ObjectKind::Reaction(Reaction {
            reactants: reactants.iter().map(|s| s.to_string()).collect(),
            products: products.iter().map(|s| s.to_string()).collect(),
            kinetic_law: kinetic_law.to_string(),
        }))
    }
    pub fn rule(kind: RuleKind, variable: &str, expression: &str) -> Self {
        Self::new(ObjectKind::Rule(Rule {
            kind,
            variable: variable.to_string(),
            expression: expression.to_string(),
        }))
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }
    pub fn kind_mut(&mut self) -> &mut ObjectKind {
        &mut self.kind
    }
    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }
    pub fn set_documentation(&mut self, documentation: impl Into<String>) {
        self.documentation = Some(documentation.into());
    }
    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.set_documentation(documentation);
        self
    }

    pub fn children(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.children.iter()
    }
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.children.get(name)
    }
    pub fn child(&self, name: &str) -> Option<&Object> {
        self.children.get(name).and_then(Value::as_object)
    }
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Object> {
        self.children.get_mut(name).and_then(Value::as_object_mut)
    }

    /// Bind `value` to `name`, replacing (not merging) any previous binding,
    /// which is returned. The binding keeps its original position.
    pub fn insert(&mut self, name: &str, mut value: Value) -> Option<Value> {
        if let Value::Object(object) = &mut value {
            object.name = name.to_string();
        }
        self.children.insert(name.to_string(), value)
    }

    /// Assign `key`, treating the reserved attribute keys of this object's kind
    /// as field updates and everything else as a child binding.
    pub fn set(&mut self, key: &str, value: Value) -> Result<Option<Value>, AttributeMismatch> {
        if key == DOC_KEY {
            self.documentation = Some(string(value)?);
            return Ok(None);
        }
        match (&mut self.kind, key) {
            (ObjectKind::Parameter(parameter), "value") => {
                parameter.value = number(value)?;
                return Ok(None);
            }
            (ObjectKind::Species(species), "value") => {
                species.initial_value = number(value)?;
                return Ok(None);
            }
            (ObjectKind::Reaction(reaction), "reactants") => {
                reaction.reactants = names(value)?;
                return Ok(None);
            }
            (ObjectKind::Reaction(reaction), "products") => {
                reaction.products = names(value)?;
                return Ok(None);
            }
            (ObjectKind::Reaction(reaction), "kinetic_law") => {
                reaction.kinetic_law = string(value)?;
                return Ok(None);
            }
            (ObjectKind::Rule(rule), "variable") => {
                rule.variable = string(value)?;
                return Ok(None);
            }
            (ObjectKind::Rule(rule), "expression") => {
                rule.expression = string(value)?;
                return Ok(None);
            }
            _ => {}
        }
        Ok(self.insert(key, value))
    }

    /// Read `key`, the counterpart of [`Object::set`].
    pub fn attribute(&self, key: &str) -> Option<Value> {
        let string_list = |items: &[String]| {
            Value::List(items.iter().cloned().map(Value::String).collect())
        };
        match (&self.kind, key) {
            (_, DOC_KEY) => self.documentation.clone().map(Value::String),
            (ObjectKind::Parameter(parameter), "value") => Some(Value::Float(parameter.value)),
            (ObjectKind::Species(species), "value") => Some(Value::Float(species.initial_value)),
            (ObjectKind::Reaction(reaction), "reactants") => Some(string_list(&reaction.reactants)),
            (ObjectKind::Reaction(reaction), "products") => Some(string_list(&reaction.products)),
            (ObjectKind::Reaction(reaction), "kinetic_law") => {
                Some(Value::String(reaction.kinetic_law.clone()))
            }
            (ObjectKind::Rule(rule), "variable") => Some(Value::String(rule.variable.clone())),
            (ObjectKind::Rule(rule), "expression") => Some(Value::String(rule.expression.clone())),
            _ => self.children.get(key).cloned(),
        }
    }
}

/// The root of a compiled model.
#[derive(Debug, Clone, PartialEq)]
pub struct OneModel {
    root: Object,
}

impl Default for OneModel {
    fn default() -> Self {
        Self::new()
    }
}

impl OneModel {
    pub fn new() -> Self {
        Self {
            root: Object::generic(),
        }
    }
    pub fn root(&self) -> &Object {
        &self.root
    }
    pub fn root_mut(&mut self) -> &mut Object {
        &mut self.root
    }
    pub fn flatten(&self) -> Result<FlatModel, crate::Error> {
        FlatModel::from_object(&self.root)
    }
}
