//! Markov chain resolution and solvers for the Kronos process engine.
//!
//! This crate turns user-facing transition specifications into a canonical
//! row-stochastic matrix and derives the quantities the ensemble stepper
//! consumes.
//!
//! # Pipeline
//!
//! ```text
//!  ┌──────────────┐     ┌────────────────┐     ┌──────────────────┐
//!  │  transition   │────▶│  recurrence    │────▶│   absorption     │
//!  │  (resolve P)  │     │  (eqP, H)      │     │  (abT, abP)      │
//!  └──────────────┘     └────────────────┘     └──────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use kronos_chain::{TransitionMatrix, TransitionSpec, solve_recurrence};
//!
//! let spec = TransitionSpec::Dense(vec![
//!     vec![0.5, 0.25, 0.25],
//!     vec![0.5, 0.0, 0.5],
//!     vec![0.25, 0.25, 0.5],
//! ]);
//! let tm = TransitionMatrix::resolve(&spec).unwrap();
//! let rec = solve_recurrence(&tm);
//! assert!(rec.ergodic);
//! assert!((rec.eq_probs[0] - 0.4).abs() < 1e-9);
//! ```

pub mod absorption;
pub mod error;
pub mod recurrence;
pub mod symbols;
pub mod transition;

pub use absorption::{Absorption, solve_absorption};
pub use error::ChainError;
pub use recurrence::{ERGODICITY_TOL, Recurrence, solve_recurrence};
pub use symbols::{SymbolTable, SymbolsSpec, correlation_labels};
pub use transition::{CumulativeRows, ROW_SUM_TOL, TransitionMatrix, TransitionSpec, pick};
