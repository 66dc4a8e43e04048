use crate::dae::{DaeModel, StateOrder};
use crate::error::Error;

use super::{
    write_derivatives, write_initial_conditions, write_local_states, write_mass_matrix,
    write_outputs, write_parameters, write_warning, Code, Rewriter,
};
use crate::GeneratedFile;

fn param<M: DaeModel + ?Sized>(model: &M, order: &StateOrder) -> GeneratedFile {
    let name = model.model_name();
    let mut code = Code::new(0);
    code.line(format!("function [p,x0,M] = {}_param()", name));
    write_warning(&mut code);
    code.line("% Default parameters value.");
    write_parameters(&mut code, model);
    code.blank();
    code.line("% Default initial conditions.");
    write_initial_conditions(&mut code, model, order);
    code.blank();
    code.line("% Mass matrix for algebraic simulations.");
    write_mass_matrix(&mut code, model, order);
    code.blank();
    code.line("end");
    GeneratedFile {
        name: format!("{}_param.m", name),
        contents: code.finish(),
    }
}

fn ode<M: DaeModel + ?Sized>(
    model: &M,
    order: &StateOrder,
    rewriter: &Rewriter,
) -> Result<GeneratedFile, Error> {
    let name = model.model_name();
    let mut code = Code::new(0);
    code.line(format!("function [dx] = {}_ode(t,x,p)", name));
    write_warning(&mut code);
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
    code.line("end");
    Ok(GeneratedFile {
        name: format!("{}_ode.m", name),
        contents: code.finish(),
    })
}

fn states<M: DaeModel + ?Sized>(
    model: &M,
    order: &StateOrder,
    rewriter: &Rewriter,
) -> Result<GeneratedFile, Error> {
    let name = model.model_name();
    let mut code = Code::new(0);
    code.line(format!("function [out] = {}_states(t,x,p)", name));
    write_warning(&mut code);
    code.line("% Args:");
    code.line("%\t t Row vector with the simulation time.");
    code.line("%\t x Matrix with one row per state and one column per time.");
    code.line("%\t p Struct with the parameters.");
    code.line("%");
    code.line("% Return:");
    code.line("%\t out Struct with every state and parameter over time.");
    code.blank();
    write_local_states(&mut code, model, order, rewriter)?;
    write_outputs(&mut code, model);
    code.blank();
    code.line("end");
    Ok(GeneratedFile {
        name: format!("{}_states.m", name),
        contents: code.finish(),
    })
}

fn driver<M: DaeModel + ?Sized>(model: &M) -> GeneratedFile {
    let name = model.model_name();
    let option = |key: &str| model.options().get(key).copied().unwrap_or_default();
    let mut code = Code::new(0);
    code.line(format!(
        "%% Example driver script for simulating \"{}\" model.",
        name
    ));
    write_warning(&mut code);
    code.line("clear all;");
    code.line("close all;");
    code.blank();
    code.line("% Default parameters.");
    code.line(format!("[p,x0,M] = {}_param();", name));
    code.blank();
    code.line("% Solver options.");
    code.line("opt = odeset('AbsTol',1e-8,'RelTol',1e-8);");
    code.line("opt = odeset(opt,'Mass',M);");
    code.blank();
    code.line("% Simulation time span.");
    code.line(format!(
        "tspan = [{} {}];",
        option("t_init"),
        option("t_end")
    ));
    code.blank();
    code.line(format!(
        "[t,x] = ode15s(@(t,x) {}_ode(t,x,p),tspan,x0,opt);",
        name
    ));
    code.line(format!("out = {}_states(t',x',p);", name));
    code.blank();
    code.line("% Plot result.");
    code.line("plot(t,x);");
    code.line("grid on;");
    GeneratedFile {
        name: format!("{}_driver.m", name),
        contents: code.finish(),
    }
}

pub fn export<M: DaeModel + ?Sized>(
    model: &M,
    order: &StateOrder,
    rewriter: &Rewriter,
) -> Result<Vec<GeneratedFile>, Error> {
    Ok(vec![
        param(model, order),
        ode(model, order, rewriter)?,
        states(model, order, rewriter)?,
        driver(model),
    ])
}
