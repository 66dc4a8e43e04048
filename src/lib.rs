extern crate pest;
#[macro_use]
extern crate pest_derive;

pub mod ast;
pub mod dae;
pub mod error;
pub mod math;
pub mod matlab;
pub mod model;
pub mod parser;
pub mod sbml;

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::info;

pub use dae::{DaeModel, DaeSystem, SimulationOptions};
pub use error::Error;
pub use matlab::MatlabStyle;
pub use model::{CompileContext, Diagnostic, FlatModel, OneModel};

/// A rendered output file, `name` is relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: String,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilerOptions {
    /// Base name of the Matlab files, and of the SBML file.
    pub model_name: String,
    pub sbml: bool,
    pub matlab: Option<MatlabStyle>,
    /// Fail instead of warning when a name is declared twice.
    pub deny_overwrite: bool,
    pub t_init: f64,
    pub t_end: f64,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        let simulation = SimulationOptions::default();
        Self {
            model_name: "main".to_string(),
            sbml: true,
            matlab: Some(MatlabStyle::Functions),
            deny_overwrite: false,
            t_init: simulation.t_init,
            t_end: simulation.t_end,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Compiled {
    pub files: Vec<GeneratedFile>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run every enabled exporter on a namespace tree. Nothing is returned unless
/// all of them succeed.
pub fn export_model(model: &OneModel, options: &CompilerOptions) -> Result<Vec<GeneratedFile>, Error> {
    let flat = model.flatten()?;
    let mut files = Vec::new();
    if options.sbml {
        files.push(GeneratedFile {
            name: format!("{}.xml", options.model_name),
            contents: sbml::to_sbml_string(&flat)?,
        });
    }
    if let Some(style) = options.matlab {
        let simulation = SimulationOptions {
            t_init: options.t_init,
            t_end: options.t_end,
        };
        let dae = DaeSystem::from_flat_model(&flat, &options.model_name, simulation)?;
        files.extend(matlab::export(&dae, style)?);
    }
    Ok(files)
}

/// Compile OneModel source text into the files selected by `options`.
pub fn compile_string(text: &str, options: &CompilerOptions) -> Result<Compiled, Error> {
    let program = parser::parse_onemodel_string(text)?;
    let mut context = CompileContext::new(options.deny_overwrite);
    let model = model::walk(&program, &mut context)?;
    let files = export_model(&model, options)?;
    Ok(Compiled {
        files,
        diagnostics: context.diagnostics().to_vec(),
    })
}

/// Compile the file at `input` and write the results to `out` (default `build`).
pub fn compile(input: &str, out: Option<&str>, options: CompilerOptions) -> Result<()> {
    let text = fs::read_to_string(input).with_context(|| format!("failed to read {}", input))?;
    info!("compiling {}", input);
    let compiled = compile_string(&text, &options)
        .map_err(|err| anyhow!("{}: {}", input, err.as_error_message(&text)))?;

    let out_dir = Path::new(out.unwrap_or("build"));
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    for file in &compiled.files {
        let path = out_dir.join(&file.name);
        fs::write(&path, &file.contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{compile, compile_string, CompilerOptions, Error, MatlabStyle};

    const MODEL: &str = "
        parameter k = 0.5
        species A = 1
        species B
        reaction J1 { A -> B; k*A }
    ";

    #[test]
    fn default_outputs() {
        let compiled = compile_string(MODEL, &CompilerOptions::default()).unwrap();
        let names: Vec<_> = compiled.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["main.xml", "main_param.m", "main_ode.m", "main_states.m", "main_driver.m"]
        );
        assert!(compiled.diagnostics.is_empty());
    }

    #[test]
    fn selected_outputs() {
        let options = CompilerOptions {
            model_name: "decay".to_string(),
            sbml: false,
            matlab: Some(MatlabStyle::Class),
            ..Default::default()
        };
        let compiled = compile_string(MODEL, &options).unwrap();
        let names: Vec<_> = compiled.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["decay.m", "decay_example.m"]);
    }

    #[test]
    fn overwrite_policy() {
        let text = "species A\nspecies A\n";
        let compiled = compile_string(text, &CompilerOptions::default()).unwrap();
        assert_eq!(compiled.diagnostics.len(), 1);
        let options = CompilerOptions {
            deny_overwrite: true,
            ..Default::default()
        };
        assert!(matches!(
            compile_string(text, &options),
            Err(Error::Overwrite { .. })
        ));
    }

    #[test]
    fn compile_writes_files() {
        let dir = "test_output/compile_writes_files";
        let _ = std::fs::remove_dir_all(dir);
        std::fs::create_dir_all(dir).unwrap();
        let input = format!("{}/model.om", dir);
        std::fs::write(&input, MODEL).unwrap();
        let out = format!("{}/build", dir);
        compile(&input, Some(&out), CompilerOptions::default()).unwrap();
        let sbml = std::fs::read_to_string(format!("{}/main.xml", out)).unwrap();
        assert!(sbml.contains("<reaction id=\"J1\" reversible=\"false\">"));
        assert!(std::path::Path::new(&format!("{}/main_driver.m", out)).exists());
    }

    #[test]
    fn no_partial_output() {
        let dir = "test_output/no_partial_output";
        let _ = std::fs::remove_dir_all(dir);
        std::fs::create_dir_all(dir).unwrap();
        let input = format!("{}/model.om", dir);
        std::fs::write(&input, "species A\nrule { A := A + 1 }\n").unwrap();
        let out = format!("{}/build", dir);
        let err = compile(&input, Some(&out), CompilerOptions::default()).unwrap_err();
        assert!(err.to_string().contains("dependencies of substitution variables"));
        assert!(!std::path::Path::new(&out).exists());
    }
}
