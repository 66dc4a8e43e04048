use anyhow::Result;
use clap::{Parser, ValueEnum};
use onemodel::{compile, CompilerOptions, MatlabStyle};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Matlab {
    /// parameter, ODE, state and driver function files
    Functions,
    /// a single classdef with an example driver
    Class,
    /// no Matlab output
    None,
}

/// compiles a OneModel reaction network to SBML and Matlab DAE code
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input filename
    input: String,

    /// Output directory
    #[arg(short, long, default_value = "build")]
    out: String,

    /// Model name, used for the generated file and function names
    #[arg(short = 'n', long, default_value = "main")]
    name: String,

    /// Do not write the SBML document
    #[arg(long)]
    no_sbml: bool,

    /// Layout of the Matlab output
    #[arg(long, value_enum, default_value_t = Matlab::Functions)]
    matlab: Matlab,

    /// Fail when a name is declared more than once
    #[arg(long)]
    deny_overwrite: bool,

    /// Initial simulation time
    #[arg(long, default_value_t = 0.0)]
    t_init: f64,

    /// Final simulation time
    #[arg(long, default_value_t = 10.0)]
    t_end: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Args::parse();
    let options = CompilerOptions {
        model_name: cli.name,
        sbml: !cli.no_sbml,
        matlab: match cli.matlab {
            Matlab::Functions => Some(MatlabStyle::Functions),
            Matlab::Class => Some(MatlabStyle::Class),
            Matlab::None => None,
        },
        deny_overwrite: cli.deny_overwrite,
        t_init: cli.t_init,
        t_end: cli.t_end,
    };
    compile(&cli.input, Some(&cli.out), options)
}
