//! Process kernels and emission models for the Kronos engine.
//!
//! One kernel per supported process variant, the per-state observation
//! mixture, Dirichlet-updated Bayesian conditional tables, and the
//! Gaussian-mixture estimator that inverts the emission model from data.
//!
//! # Quick start
//!
//! ```rust
//! use kronos_process::{EmissionModel, markov_step};
//! use kronos_chain::{TransitionMatrix, TransitionSpec};
//! use rand::SeedableRng;
//!
//! let tm = TransitionMatrix::resolve(&TransitionSpec::Dense(vec![
//!     vec![0.5, 0.5],
//!     vec![0.5, 0.5],
//! ])).unwrap();
//! let cum = tm.cumulative();
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//! let next = markov_step(&cum, 0, &mut rng);
//! assert!(next < 2);
//! ```

pub mod bayes;
pub mod emission;
pub mod error;
pub mod kernel;
pub mod mixture;

pub use bayes::BayesNet;
pub use emission::{EmissionModel, MvNormal};
pub use error::ProcessError;
pub use kernel::{
    GaussField, OrnsteinProcess, WienerWalk, gillespie_step, markov_step, metropolis_step,
};
pub use mixture::{MixtureComponent, fit_mixture};
