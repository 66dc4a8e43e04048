use crate::dae::{DaeModel, StateOrder};
use crate::error::Error;

use super::{
    write_derivatives, write_initial_conditions, write_local_states, write_mass_matrix,
    write_outputs, write_parameters, write_warning, Code, Rewriter,
};
use crate::GeneratedFile;

fn method(code: &mut Code, signature: &str, summary: &str) {
    code.line(format!("function {}", signature));
    code.indent();
    code.line(format!("%% {}", summary));
}

fn end_method(code: &mut Code) {
    code.dedent();
    code.line("end");
}

fn classdef<M: DaeModel + ?Sized>(
    model: &M,
    order: &StateOrder,
    rewriter: &Rewriter,
) -> Result<GeneratedFile, Error> {
    let name = model.model_name();
    let mut code = Code::new(0);
    code.line(format!("classdef {}", name));
    code.indent();
    write_warning(&mut code);

    code.line("properties");
    code.indent();
    code.line("p      % Default model parameters.");
    code.line("x0     % Default initial conditions.");
    code.line("M      % Mass matrix for DAE systems.");
    code.line("opts   % Simulation options.");
    code.dedent();
    code.line("end");
    code.blank();

    code.line("methods");
    code.indent();

    method(&mut code, &format!("obj = {}()", name), &format!("Constructor of {}.", name));
    code.line("obj.p    = obj.default_parameters();");
    code.line("obj.x0   = obj.initial_conditions();");
    code.line("obj.M    = obj.mass_matrix();");
    code.line("obj.opts = obj.simulation_options();");
    end_method(&mut code);
    code.blank();

    method(&mut code, "p = default_parameters(~)", "Default parameters value.");
    write_parameters(&mut code, model);
    end_method(&mut code);
    code.blank();

    method(&mut code, "x0 = initial_conditions(~)", "Default initial conditions.");
    write_initial_conditions(&mut code, model, order);
    end_method(&mut code);
    code.blank();

    method(&mut code, "M = mass_matrix(~)", "Mass matrix for DAE systems.");
    write_mass_matrix(&mut code, model, order);
    end_method(&mut code);
    code.blank();

    method(&mut code, "opts = simulation_options(~)", "Default simulation options.");
    code.line("opts = [];");
    for (option, value) in model.options() {
        code.line(format!("opts.{} = {};", option, value));
    }
    end_method(&mut code);
    code.blank();

    method(&mut code, "dx = ode(~,t,x,p)", "Evaluate the ODE.");
    code.line("%");
    code.line("% Args:");
    code.line("%\t t Current time in the simulation.");
    code.line("%\t x Array with the state value.");
    code.line("%\t p Struct with the parameters.");
    code.line("%");
    code.line("% Return:");
    code.line("%\t dx Array with the ODE.");
    code.blank();
    write_local_states(&mut code, model, order, rewriter)?;
    write_derivatives(&mut code, model, order, rewriter)?;
    end_method(&mut code);
    code.blank();

    method(
        &mut code,
        "out = simout2struct(~,t,x,p)",
        "Convert the simulation output into an easy-to-use struct.",
    );
    code.line("%");
    code.line("% Args:");
    code.line("%\t t Row vector with the simulation time.");
    code.line("%\t x Matrix with one row per state and one column per time.");
    code.line("%\t p Struct with the parameters.");
    code.blank();
    write_local_states(&mut code, model, order, rewriter)?;
    write_outputs(&mut code, model);
    end_method(&mut code);

    code.dedent();
    code.line("end");
    code.dedent();
    code.line("end");
    Ok(GeneratedFile {
        name: format!("{}.m", name),
        contents: code.finish(),
    })
}

fn example<M: DaeModel + ?Sized>(model: &M) -> GeneratedFile {
    let name = model.model_name();
    let mut code = Code::new(0);
    code.line(format!(
        "%% Example driver script for simulating \"{}\" model.",
        name
    ));
    write_warning(&mut code);
    code.line("clear all;");
    code.line("close all;");
    code.blank();
    code.line("% Init model.");
    code.line(format!("m = {}();", name));
    code.blank();
    code.line("% Solver options.");
    code.line("opt = odeset('AbsTol',1e-8,'RelTol',1e-8);");
    code.line("opt = odeset(opt,'Mass',m.M);");
    code.blank();
    code.line("% Simulation time span.");
    code.line("tspan = [m.opts.t_init m.opts.t_end];");
    code.blank();
    code.line("[t,x] = ode15s(@(t,x) m.ode(t,x,m.p),tspan,m.x0,opt);");
    code.line("out = m.simout2struct(t',x',m.p);");
    code.blank();
    code.line("% Plot result.");
    code.line("plot(t,x);");
    code.line("grid on;");
    GeneratedFile {
        name: format!("{}_example.m", name),
        contents: code.finish(),
    }
}

pub fn export<M: DaeModel + ?Sized>(
    model: &M,
    order: &StateOrder,
    rewriter: &Rewriter,
) -> Result<Vec<GeneratedFile>, Error> {
    Ok(vec![classdef(model, order, rewriter)?, example(model)])
}

#[cfg(test)]
mod tests {
    use crate::dae::{DaeSystem, SimulationOptions, State, StateKind};
    use crate::matlab::{export, MatlabStyle};

    #[test]
    fn class_layout() {
        let options = SimulationOptions {
            t_init: 0.0,
            t_end: 50.0,
        };
        let dae = DaeSystem::new("decay", options)
            .with_parameter("k", 0.1)
            .with_state(State::new("A", StateKind::Ode, "-k*A", 10.0))
            .with_state(State::new("D", StateKind::Algebraic, "2*A", 0.0));
        let files = export(&dae, MatlabStyle::Class).unwrap();
        let class = &files[0].contents;

        assert!(class.starts_with("classdef decay\n\t% This file was automatically generated"));
        assert!(class.contains("\t\tfunction obj = decay()\n\t\t\t%% Constructor of decay.\n"));
        assert!(class.contains("\t\t\tp.k = 0.1;\n"));
        assert!(class.contains("\t\t\tx0 = [\n\t\t\t\t10 % A\n\t\t\t\t0 % D (algebraic)\n\t\t\t];\n"));
        assert!(class.contains("\t\t\tM = [\n\t\t\t\t1 0\n\t\t\t\t0 0\n\t\t\t];\n"));
        assert!(class.contains("\t\t\topts.t_init = 0;\n\t\t\topts.t_end = 50;\n"));
        assert!(class.contains("\t\tfunction dx = ode(~,t,x,p)\n"));
        assert!(class.contains("\t\t\tdx(2,1) = -D + 2.*A;\n"));
        assert!(class.contains("\t\tfunction out = simout2struct(~,t,x,p)\n"));
        assert!(class.ends_with("\t\tend\n\tend\nend\n"));

        let example = &files[1].contents;
        assert!(example.contains("m = decay();\n"));
        assert!(example.contains("tspan = [m.opts.t_init m.opts.t_end];\n"));
    }
}
