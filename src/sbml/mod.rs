pub mod mathml;
pub mod xml;

use log::{debug, info};

use crate::error::Error;
use crate::math::Expr;
use crate::model::{FlatModel, RuleKind, SpeciesReference, PER_SECOND};

use self::mathml::write_math;
use self::xml::XmlWriter;

pub const SBML_NS: &str = "http://www.sbml.org/sbml/level3/version2/core";
pub const MODEL_ID: &str = "main";
pub const COMPARTMENT_ID: &str = "default_compartment";

fn write_species_references(xml: &mut XmlWriter, list: &str, references: &[SpeciesReference]) {
    if references.is_empty() {
        return;
    }
    xml.start(list, &[]);
    for reference in references {
        xml.empty(
            "speciesReference",
            &[("species", reference.id.as_str()), ("constant", "true")],
        );
    }
    xml.end(list);
}

fn write_units(xml: &mut XmlWriter) {
    xml.start("listOfUnitDefinitions", &[]);
    xml.start("unitDefinition", &[("id", PER_SECOND)]);
    xml.start("listOfUnits", &[]);
    xml.empty(
        "unit",
        &[
            ("kind", "second"),
            ("exponent", "-1"),
            ("scale", "0"),
            ("multiplier", "1"),
        ],
    );
    xml.end("listOfUnits");
    xml.end("unitDefinition");
    xml.end("listOfUnitDefinitions");

    xml.start("listOfCompartments", &[]);
    xml.empty(
        "compartment",
        &[
            ("id", COMPARTMENT_ID),
            ("spatialDimensions", "3"),
            ("size", "1"),
            ("units", "litre"),
            ("constant", "true"),
        ],
    );
    xml.end("listOfCompartments");
}

fn write_species(xml: &mut XmlWriter, flat: &FlatModel) {
    if flat.species.is_empty() {
        return;
    }
    xml.start("listOfSpecies", &[]);
    for species in &flat.species {
        let initial = species.initial_value.to_string();
        xml.empty(
            "species",
            &[
                ("id", species.id.as_str()),
                ("compartment", COMPARTMENT_ID),
                ("initialConcentration", initial.as_str()),
                ("substanceUnits", "mole"),
                ("hasOnlySubstanceUnits", "false"),
                ("boundaryCondition", "false"),
                ("constant", "false"),
            ],
        );
    }
    xml.end("listOfSpecies");
}

fn write_parameters(xml: &mut XmlWriter, flat: &FlatModel) {
    if flat.parameters.is_empty() {
        return;
    }
    xml.start("listOfParameters", &[]);
    for parameter in &flat.parameters {
        let value = parameter.value.to_string();
        xml.empty(
            "parameter",
            &[
                ("id", parameter.id.as_str()),
                ("value", value.as_str()),
                ("units", parameter.units),
                ("constant", "true"),
            ],
        );
    }
    xml.end("listOfParameters");
}

fn write_rules(xml: &mut XmlWriter, flat: &FlatModel) -> Result<(), Error> {
    if flat.rules.is_empty() {
        return Ok(());
    }
    xml.start("listOfRules", &[]);
    for rule in &flat.rules {
        let expression = flat.rule_expression(rule)?;
        let target = rule.variable.id.as_str();
        match rule.kind {
            RuleKind::Assignment => {
                xml.start("assignmentRule", &[("variable", target)]);
                write_math(xml, &expression)?;
                xml.end("assignmentRule");
            }
            RuleKind::Algebraic => {
                // 0 = -target + expression
                let residual = Expr::binop(
                    '+',
                    Expr::monop('-', Expr::Name(target.to_string())),
                    expression,
                );
                xml.start("algebraicRule", &[]);
                write_math(xml, &residual)?;
                xml.end("algebraicRule");
            }
        }
    }
    xml.end("listOfRules");
    Ok(())
}

fn write_reactions(xml: &mut XmlWriter, flat: &FlatModel) -> Result<(), Error> {
    if flat.reactions.is_empty() {
        return Ok(());
    }
    xml.start("listOfReactions", &[]);
    for reaction in &flat.reactions {
        xml.start(
            "reaction",
            &[("id", reaction.id.as_str()), ("reversible", "false")],
        );
        write_species_references(xml, "listOfReactants", &reaction.reactants);
        write_species_references(xml, "listOfProducts", &reaction.products);
        match flat.kinetic_law(reaction)? {
            Some(law) => {
                xml.start("kineticLaw", &[]);
                write_math(xml, &law)?;
                xml.end("kineticLaw");
            }
            None => debug!("reaction '{}' has no kinetic law", reaction.id),
        }
        xml.end("reaction");
    }
    xml.end("listOfReactions");
    Ok(())
}

/// Render a flattened model as an SBML level 3 version 2 document.
pub fn to_sbml_string(flat: &FlatModel) -> Result<String, Error> {
    info!(
        "exporting SBML: {} species, {} parameters, {} rules, {} reactions",
        flat.species.len(),
        flat.parameters.len(),
        flat.rules.len(),
        flat.reactions.len()
    );
    let mut xml = XmlWriter::new();
    xml.declaration();
    xml.start("sbml", &[("xmlns", SBML_NS), ("level", "3"), ("version", "2")]);
    xml.start(
        "model",
        &[
            ("id", MODEL_ID),
            ("name", MODEL_ID),
            ("substanceUnits", "mole"),
            ("timeUnits", "second"),
            ("extentUnits", "mole"),
        ],
    );
    write_units(&mut xml);
    write_species(&mut xml, flat);
    write_parameters(&mut xml, flat);
    write_rules(&mut xml, flat)?;
    write_reactions(&mut xml, flat)?;
    xml.end("model");
    xml.end("sbml");
    Ok(xml.finish())
}

#[cfg(test)]
mod tests {
    use super::to_sbml_string;
    use crate::model::{FlatModel, Object, RuleKind, Value};

    #[test]
    fn rules_between_parameters_and_reactions() {
        let mut root = Object::generic();
        root.insert("A", Value::Object(Object::species(1.0)));
        root.insert("C", Value::Object(Object::species(0.0)));
        root.insert("D", Value::Object(Object::species(0.0)));
        root.insert("k", Value::Object(Object::parameter(2.0)));
        root.insert("r1", Value::Object(Object::rule(RuleKind::Assignment, "C", "2*A")));
        root.insert("r2", Value::Object(Object::rule(RuleKind::Algebraic, "D", "k*A")));
        let flat = FlatModel::from_object(&root).unwrap();
        let sbml = to_sbml_string(&flat).unwrap();

        let expect = r#"    <listOfRules>
      <assignmentRule variable="C">
        <math xmlns="http://www.w3.org/1998/Math/MathML">
          <apply>
            <times/>
            <cn type="integer"> 2 </cn>
            <ci> A </ci>
          </apply>
        </math>
      </assignmentRule>
      <algebraicRule>
        <math xmlns="http://www.w3.org/1998/Math/MathML">
          <apply>
            <plus/>
            <apply>
              <minus/>
              <ci> D </ci>
            </apply>
            <apply>
              <times/>
              <ci> k </ci>
              <ci> A </ci>
            </apply>
          </apply>
        </math>
      </algebraicRule>
    </listOfRules>
"#;
        assert!(sbml.contains(expect), "{}", sbml);
        let parameters = sbml.find("</listOfParameters>").unwrap();
        let rules = sbml.find("<listOfRules>").unwrap();
        assert!(parameters < rules);
        assert!(!sbml.contains("listOfReactions"));
    }

    #[test]
    fn reaction_without_kinetic_law() {
        let mut root = Object::generic();
        root.insert("A", Value::Object(Object::species(0.0)));
        root.insert("J1", Value::Object(Object::reaction(&["A"], &[], "")));
        let flat = FlatModel::from_object(&root).unwrap();
        let sbml = to_sbml_string(&flat).unwrap();
        assert!(sbml.contains("<listOfReactants>"));
        assert!(!sbml.contains("<listOfProducts>"));
        assert!(!sbml.contains("<kineticLaw>"));
    }
}
