//! Ensemble stepper, statistics, and pipeline driver for Kronos.
//!
//! The engine advances `N` independent sample paths of a configured
//! random process over the discrete time grid `t = 0, dt, 2 dt, …`,
//! accumulating transition, holding, and correlation statistics and
//! emitting a time-ordered event stream. In learning mode the same
//! accumulators run in reverse: an external event stream is folded into
//! maximum-likelihood estimates of the generator that produced it.
//!
//! # Pipeline
//!
//! ```text
//!  ┌────────────┐    ┌───────────┐    ┌───────────┐    ┌────────┐
//!  │  config     │───▶│  stepper  │───▶│  recorder │───▶│  sink  │
//!  │  (resolve)  │    │  + stats  │    │  + filter │    │        │
//!  └────────────┘    └───────────┘    └───────────┘    └────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use kronos_chain::TransitionSpec;
//! use kronos_engine::{Engine, EngineConfig, EventKind, ProcessSpec};
//! use rand::SeedableRng;
//!
//! let config = EngineConfig::new(ProcessSpec::Markov(TransitionSpec::Dense(vec![
//!     vec![0.5, 0.5],
//!     vec![0.5, 0.5],
//! ])))
//! .with_members(10)
//! .with_steps(5);
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//! let mut engine = Engine::new(config, &mut rng).unwrap();
//! let events = engine.run_collect(&mut rng);
//!
//! assert_eq!(events.first().unwrap().kind(), EventKind::Config);
//! assert_eq!(events.last().unwrap().kind(), EventKind::End);
//! ```

pub mod config;
pub mod ensemble;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod recorder;
pub mod stats;

pub use config::{EmissionSpec, EngineConfig, ProcessSpec};
pub use ensemble::Ensemble;
pub use error::EngineError;
pub use event::{
    BatchPayload, ConfigPayload, EndPayload, Event, EventKind, FieldKeys, JumpPayload,
    MixturePayload, RunStats, StepPayload,
};
pub use pipeline::{Engine, EventFeeder, EventStream, LearnEvent};
pub use recorder::{AcceptAll, EventFilter, Recorder};
