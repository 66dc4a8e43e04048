use approx::assert_relative_eq;
use onemodel::model::{Object, Value};
use onemodel::sbml::to_sbml_string;
use onemodel::{compile_string, CompilerOptions, DaeModel, DaeSystem, Error, OneModel};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sbml_of(text: &str) -> String {
    let options = CompilerOptions {
        matlab: None,
        ..Default::default()
    };
    let compiled = compile_string(text, &options).unwrap();
    assert_eq!(compiled.files.len(), 1);
    compiled.files[0].contents.clone()
}

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sbml xmlns="http://www.sbml.org/sbml/level3/version2/core" level="3" version="2">
  <model id="main" name="main" substanceUnits="mole" timeUnits="second" extentUnits="mole">
    <listOfUnitDefinitions>
      <unitDefinition id="per_second">
        <listOfUnits>
          <unit kind="second" exponent="-1" scale="0" multiplier="1"/>
        </listOfUnits>
      </unitDefinition>
    </listOfUnitDefinitions>
    <listOfCompartments>
      <compartment id="default_compartment" spatialDimensions="3" size="1" units="litre" constant="true"/>
    </listOfCompartments>
"#;

const FLAT_BODY: &str = r#"    <listOfSpecies>
      <species id="A" compartment="default_compartment" initialConcentration="0" substanceUnits="mole" hasOnlySubstanceUnits="false" boundaryCondition="false" constant="false"/>
      <species id="B" compartment="default_compartment" initialConcentration="0" substanceUnits="mole" hasOnlySubstanceUnits="false" boundaryCondition="false" constant="false"/>
    </listOfSpecies>
    <listOfParameters>
      <parameter id="k" value="0" units="per_second" constant="true"/>
    </listOfParameters>
    <listOfReactions>
      <reaction id="J1" reversible="false">
        <listOfReactants>
          <speciesReference species="A" constant="true"/>
        </listOfReactants>
        <listOfProducts>
          <speciesReference species="B" constant="true"/>
        </listOfProducts>
        <kineticLaw>
          <math xmlns="http://www.w3.org/1998/Math/MathML">
            <apply>
              <times/>
              <ci> k </ci>
              <ci> A </ci>
            </apply>
          </math>
        </kineticLaw>
      </reaction>
    </listOfReactions>
  </model>
</sbml>
"#;

const NESTED_BODY: &str = r#"    <listOfSpecies>
      <species id="foo__B" compartment="default_compartment" initialConcentration="0" substanceUnits="mole" hasOnlySubstanceUnits="false" boundaryCondition="false" constant="false"/>
      <species id="A" compartment="default_compartment" initialConcentration="0" substanceUnits="mole" hasOnlySubstanceUnits="false" boundaryCondition="false" constant="false"/>
    </listOfSpecies>
    <listOfParameters>
      <parameter id="foo__k" value="0" units="per_second" constant="true"/>
    </listOfParameters>
    <listOfReactions>
      <reaction id="foo__J1" reversible="false">
        <listOfReactants>
          <speciesReference species="A" constant="true"/>
        </listOfReactants>
        <listOfProducts>
          <speciesReference species="foo__B" constant="true"/>
        </listOfProducts>
        <kineticLaw>
          <math xmlns="http://www.w3.org/1998/Math/MathML">
            <apply>
              <times/>
              <ci> foo__k </ci>
              <ci> A </ci>
            </apply>
          </math>
        </kineticLaw>
      </reaction>
    </listOfReactions>
  </model>
</sbml>
"#;

#[test]
fn sbml_from_object_tree() {
    init_logging();
    let mut model = OneModel::new();
    let root = model.root_mut();
    root.insert("A", Value::Object(Object::species(0.0)));
    root.insert("B", Value::Object(Object::species(0.0)));
    root.insert("k", Value::Object(Object::parameter(0.0)));
    root.insert("J1", Value::Object(Object::reaction(&["A"], &["B"], "k*A")));

    let sbml = to_sbml_string(&model.flatten().unwrap()).unwrap();
    assert_eq!(sbml, format!("{}{}", HEADER, FLAT_BODY));
}

#[test]
fn sbml_from_source() {
    init_logging();
    let sbml = sbml_of(
        r#"
        species A
        species B
        parameter k
        reaction J1
        J1.reactants = ["A"]
        J1.products = ["B"]
        J1.kinetic_law = "k*A"
        "#,
    );
    assert_eq!(sbml, format!("{}{}", HEADER, FLAT_BODY));
}

#[test]
fn sbml_reference_nested() {
    init_logging();
    let sbml = sbml_of(
        r#"
        foo = {}
        species A
        species foo.B
        parameter foo.k
        reaction foo.J1 { A -> B; k*A }
        "#,
    );
    assert_eq!(sbml, format!("{}{}", HEADER, NESTED_BODY));
}

#[test]
fn sbml_is_well_formed() {
    init_logging();
    let sbml = sbml_of(
        r#"
        parameter kf = 1.5 """forward rate"""
        parameter kr = 2e-3
        species P
        cell = {}
        cell.nucleus = {}
        species cell.nucleus.mRNA = 3
        species cell.C
        reaction cell.nucleus.tx { -> mRNA; kf }
        reaction cell.nucleus.tl { mRNA -> P; kf*mRNA/(1 + P) }
        reaction { P -> ; kr*P^2 }
        rule cell.r { C := 2*P }
        "#,
    );
    let doc = roxmltree::Document::parse(&sbml).unwrap();
    let ids = |tag: &str| -> Vec<String> {
        doc.descendants()
            .filter(|n| n.has_tag_name(tag))
            .filter_map(|n| n.attribute("id").map(str::to_string))
            .collect()
    };
    assert_eq!(ids("species"), vec!["P", "cell__nucleus__mRNA", "cell__C"]);
    assert_eq!(ids("parameter"), vec!["kf", "kr"]);
    assert_eq!(
        ids("reaction"),
        vec!["cell__nucleus__tx", "cell__nucleus__tl", "_J1"]
    );

    let references: Vec<_> = doc
        .descendants()
        .filter(|n| n.has_tag_name("speciesReference"))
        .filter_map(|n| n.attribute("species"))
        .collect();
    assert_eq!(
        references,
        vec!["cell__nucleus__mRNA", "cell__nucleus__mRNA", "P", "P"]
    );

    let values: Vec<f64> = doc
        .descendants()
        .filter(|n| n.has_tag_name("parameter"))
        .filter_map(|n| n.attribute("value"))
        .map(|v| v.parse().unwrap())
        .collect();
    assert_relative_eq!(values[0], 1.5);
    assert_relative_eq!(values[1], 2e-3);

    let rule = doc
        .descendants()
        .find(|n| n.has_tag_name("assignmentRule"))
        .unwrap();
    assert_eq!(rule.attribute("variable"), Some("cell__C"));
    let ci: Vec<_> = rule
        .descendants()
        .filter(|n| n.has_tag_name("ci"))
        .filter_map(|n| n.text())
        .map(str::trim)
        .collect();
    assert_eq!(ci, vec!["P"]);
}

#[test]
fn compilation_is_reproducible() {
    init_logging();
    let text = r#"
        parameter k = 0.3
        species A = 1
        species B
        species C
        reaction { A -> B; k*A }
        rule { C := A + B }
        reaction { B -> ; k*B }
    "#;
    let first = compile_string(text, &CompilerOptions::default()).unwrap();
    let second = compile_string(text, &CompilerOptions::default()).unwrap();
    assert_eq!(first.files, second.files);
    assert_eq!(first.files.len(), 5);
}

#[test]
fn inner_names_are_not_visible_outside() {
    init_logging();
    let text = r#"
        foo = {}
        species foo.D
        species A
        reaction { A -> D; A }
    "#;
    let err = compile_string(text, &CompilerOptions::default()).unwrap_err();
    assert!(matches!(err, Error::UnresolvedReference { ref name, .. } if name == "D"));
}

#[test]
fn qualified_ids_are_not_names() {
    init_logging();
    let text = r#"
        foo = {}
        species foo.D
        species A
        reaction J { A -> foo__D; A }
    "#;
    let err = compile_string(text, &CompilerOptions::default()).unwrap_err();
    assert!(matches!(err, Error::UnresolvedReference { ref name, .. } if name == "foo__D"));
}

#[test]
fn time_is_a_symbol_in_both_outputs() {
    init_logging();
    let compiled = compile_string(
        "species A = 1\nreaction J { A -> ; exp(-t)*A }\n",
        &CompilerOptions::default(),
    )
    .unwrap();
    let sbml = &compiled.files[0].contents;
    assert!(!sbml.contains("<ci> t </ci>"));
    let doc = roxmltree::Document::parse(sbml).unwrap();
    let time = doc
        .descendants()
        .find(|n| n.has_tag_name("csymbol"))
        .unwrap();
    assert_eq!(
        time.attribute("definitionURL"),
        Some("http://www.sbml.org/sbml/symbols/time")
    );
    assert_eq!(time.text().map(str::trim), Some("t"));

    let ode = &compiled.files[2].contents;
    assert!(ode.contains("dx(1,1) = -(exp(-t).*A);\n"));

    let err = compile_string("parameter t = 1\n", &CompilerOptions::default()).unwrap_err();
    assert!(matches!(err, Error::ReservedName { .. }));
}

#[test]
fn functions_agree_across_outputs() {
    init_logging();
    let compiled = compile_string(
        "species A = 1\nreaction J { A -> ; ln(A) + ceiling(A) + log(A) }\n",
        &CompilerOptions::default(),
    )
    .unwrap();
    let doc = roxmltree::Document::parse(&compiled.files[0].contents).unwrap();
    let applied: Vec<_> = doc
        .descendants()
        .filter(|n| n.has_tag_name("apply"))
        .filter_map(|n| n.first_element_child())
        .map(|n| n.tag_name().name().to_string())
        .collect();
    assert_eq!(applied, vec!["plus", "plus", "ln", "ceiling", "log"]);

    let ode = &compiled.files[2].contents;
    assert!(ode.contains("dx(1,1) = -(log(A)+ceil(A)+log10(A));\n"));

    let err = compile_string(
        "species A\nreaction J { A -> ; gamma(A) }\n",
        &CompilerOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Serialization { .. }));
}

#[test]
fn state_names_must_not_shadow_matlab_locals() {
    init_logging();
    let text = "species x\nreaction J { x -> ; x }\n";
    let err = compile_string(text, &CompilerOptions::default()).unwrap_err();
    assert!(matches!(err, Error::ReservedName { ref name, .. } if name == "x"));

    let options = CompilerOptions {
        matlab: None,
        ..Default::default()
    };
    assert!(compile_string(text, &options).is_ok());
}

#[test]
fn dae_from_source() {
    init_logging();
    let text = r#"
        parameter k1 = 1
        parameter k2 = 2
        species A = 1
        species B
        species C
        species S
        reaction J1 { A -> B; k1/k2*A }
        rule { C = B - C^3 }
        rule { S := A + C }
    "#;
    let program = onemodel::parser::parse_onemodel_string(text).unwrap();
    let mut context = onemodel::CompileContext::default();
    let model = onemodel::model::walk(&program, &mut context).unwrap();
    let flat = model.flatten().unwrap();
    let dae = DaeSystem::from_flat_model(&flat, "main", Default::default()).unwrap();

    let order = onemodel::dae::resolve(&dae).unwrap();
    let ids = |indices: &[usize]| -> Vec<&str> {
        indices.iter().map(|&i| dae.states()[i].id.as_str()).collect()
    };
    assert_eq!(ids(&order.indexed), vec!["A", "B", "C"]);
    assert_eq!(ids(&order.substitutions), vec!["S"]);
    let diagonal: Vec<f64> = order.mass_matrix(&dae).diag().to_vec();
    assert_eq!(diagonal, vec![1.0, 1.0, 0.0]);

    let compiled = compile_string(text, &CompilerOptions::default()).unwrap();
    let ode = &compiled
        .files
        .iter()
        .find(|f| f.name == "main_ode.m")
        .unwrap()
        .contents;
    assert!(ode.contains("dx(1,1) = -(p.k1./p.k2.*A);\n"));
    assert!(ode.contains("dx(2,1) = (p.k1./p.k2.*A);\n"));
    assert!(ode.contains("dx(3,1) = -C + B-C.^3;\n"));
    assert!(ode.contains("S = A+C;\n"));
    let param = &compiled
        .files
        .iter()
        .find(|f| f.name == "main_param.m")
        .unwrap()
        .contents;
    assert!(param.contains("x0 = [\n\t1 % A\n\t0 % B\n\t0 % C (algebraic)\n];\n"));
}
