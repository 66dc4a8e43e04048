use std::collections::HashSet;

use log::debug;
use ndarray::{Array1, Array2};

use crate::error::Error;
use crate::math::{identifier_names, TIME};

use super::{DaeModel, StateKind};

/// Evaluation order of the states of a [`DaeModel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateOrder {
    /// Indices of the ODE and algebraic states in declaration order. Position
    /// `i` here is row `i + 1` of the state vector and of the mass matrix.
    pub indexed: Vec<usize>,
    /// Indices of the substitution states, each after everything it reads.
    pub substitutions: Vec<usize>,
}

impl StateOrder {
    /// Diagonal mass matrix, 1 for ODE rows and 0 for algebraic rows.
    pub fn mass_matrix<M: DaeModel + ?Sized>(&self, model: &M) -> Array2<f64> {
        let diagonal: Array1<f64> = self
            .indexed
            .iter()
            .map(|&i| match model.states()[i].kind() {
                StateKind::Ode => 1.0,
                _ => 0.0,
            })
            .collect();
        Array2::from_diag(&diagonal)
    }
}

/// Order the states of `model` for evaluation.
///
/// Parameters, ODE and algebraic states and the time are known from the start.
/// Each pass then admits, in declaration order, every substitution state whose
/// expression reads only names known when the pass began.
pub fn resolve<M: DaeModel + ?Sized>(model: &M) -> Result<StateOrder, Error> {
    let states = model.states();
    let mut known: HashSet<&str> = model.parameters().iter().map(|p| p.id.as_str()).collect();
    known.insert(TIME);

    let mut indexed = Vec::new();
    let mut unresolved = Vec::new();
    for (i, state) in states.iter().enumerate() {
        if state.kind().is_indexed() {
            known.insert(state.id.as_str());
            indexed.push(i);
        } else {
            unresolved.push((i, identifier_names(&state.equation.expression)));
        }
    }

    let mut substitutions = Vec::with_capacity(unresolved.len());
    while !unresolved.is_empty() {
        let (ready, waiting): (Vec<_>, Vec<_>) = unresolved
            .into_iter()
            .partition(|(_, names)| names.iter().all(|name| known.contains(name.as_str())));
        if ready.is_empty() {
            return Err(Error::CyclicOrMissingDependency {
                unresolved: waiting.iter().map(|(i, _)| states[*i].id.clone()).collect(),
            });
        }
        for (i, _) in ready {
            debug!("substitution '{}' resolved", states[i].id);
            known.insert(states[i].id.as_str());
            substitutions.push(i);
        }
        unresolved = waiting;
    }
    Ok(StateOrder {
        indexed,
        substitutions,
    })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::resolve;
    use crate::dae::{DaeModel, DaeSystem, SimulationOptions, State, StateKind};
    use crate::error::Error;

    fn system() -> DaeSystem {
        DaeSystem::new("m", SimulationOptions::default())
    }

    #[test]
    fn substitutions_follow_dependencies() {
        let dae = system()
            .with_state(State::new("x", StateKind::Substitution, "y + 1", 0.0))
            .with_state(State::new("y", StateKind::Substitution, "2", 0.0));
        let order = resolve(&dae).unwrap();
        assert!(order.indexed.is_empty());
        assert_eq!(order.substitutions, vec![1, 0]);
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let dae = system()
            .with_parameter("k", 1.0)
            .with_state(State::new("A", StateKind::Ode, "-k*A", 1.0))
            .with_state(State::new("z", StateKind::Substitution, "w*y", 0.0))
            .with_state(State::new("y", StateKind::Substitution, "k*A*exp(-t)", 0.0))
            .with_state(State::new("w", StateKind::Substitution, "2*A", 0.0));
        let order = resolve(&dae).unwrap();
        assert_eq!(order.indexed, vec![0]);
        let ids: Vec<_> = order
            .substitutions
            .iter()
            .map(|&i| dae.states()[i].id.as_str())
            .collect();
        assert_eq!(ids, vec!["y", "w", "z"]);
    }

    #[test]
    fn cycles_and_missing_symbols() {
        let dae = system()
            .with_state(State::new("x", StateKind::Substitution, "y", 0.0))
            .with_state(State::new("y", StateKind::Substitution, "x", 0.0));
        let err = resolve(&dae).unwrap_err();
        assert!(matches!(err, Error::CyclicOrMissingDependency { unresolved } if unresolved == vec!["x", "y"]));

        let dae = system().with_state(State::new("x", StateKind::Substitution, "q*2", 0.0));
        assert!(matches!(
            resolve(&dae),
            Err(Error::CyclicOrMissingDependency { .. })
        ));
    }

    #[test]
    fn mass_matrix_follows_state_index() {
        let dae = system()
            .with_state(State::new("A", StateKind::Ode, "-A", 1.0))
            .with_state(State::new("s", StateKind::Substitution, "2*A", 0.0))
            .with_state(State::new("B", StateKind::Ode, "A", 0.0))
            .with_state(State::new("C", StateKind::Algebraic, "A+B", 0.0));
        let order = resolve(&dae).unwrap();
        assert_eq!(order.indexed, vec![0, 2, 3]);
        assert_eq!(
            order.mass_matrix(&dae),
            array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]
        );
    }
}
