//! Canned demonstration scenarios selectable from the command line.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use kronos_chain::TransitionSpec;
use kronos_engine::{
    EmissionSpec, Engine, EngineConfig, Event, LearnEvent, ProcessSpec,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::config::RunOverrides;

/// Scenario names accepted on the command line.
pub const SCENARIOS: &[&str] = &[
    "R1", "R2", "R2.1", "R2.3", "R2.4", "R3", "R3.1", "R3.2", "R3.3", "R4.1", "R4.2",
];

/// Runs one scenario and returns its collected event stream.
///
/// Scenario defaults are set first; any TOML/CLI overrides win.
pub fn run(name: &str, overrides: &RunOverrides, seed: u64) -> Result<Vec<Event>> {
    let mut rng = StdRng::seed_from_u64(seed);
    match name {
        "R1" => {
            // Three-state recurrence showcase (eq ~ [0.4, 0.2, 0.4]).
            let config = EngineConfig::new(ProcessSpec::Markov(TransitionSpec::Dense(vec![
                vec![0.5, 0.25, 0.25],
                vec![0.5, 0.0, 0.5],
                vec![0.25, 0.25, 0.5],
            ])))
            .with_members(100)
            .with_steps(200);
            let mut engine = Engine::new(crate::config::apply(config, overrides), &mut rng)?;
            let rec = engine.recurrence().expect("categorical run");
            info!(eq = ?rec.eq_probs, ergodic = rec.ergodic, "recurrence resolved");
            Ok(engine.run_collect(&mut rng))
        }
        "R2" => {
            // Sparse input with an unreachable-exit state: non-ergodic.
            let mut entries = BTreeMap::new();
            entries.insert(
                "0".to_string(),
                BTreeMap::from([("1".to_string(), 0.8), ("2".to_string(), 0.1)]),
            );
            entries.insert("1".to_string(), BTreeMap::from([("0".to_string(), 0.1)]));
            let config = EngineConfig::new(ProcessSpec::Markov(TransitionSpec::Sparse {
                states: 3,
                entries,
                dims: None,
            }))
            .with_members(50)
            .with_steps(100);
            let mut engine = Engine::new(crate::config::apply(config, overrides), &mut rng)?;
            info!(
                ergodic = engine.recurrence().expect("categorical run").ergodic,
                "ergodicity test finished"
            );
            Ok(engine.run_collect(&mut rng))
        }
        "R2.1" => {
            // Five-state gambler's ruin: absorption at either end.
            let config = EngineConfig::new(ProcessSpec::Markov(TransitionSpec::Dense(vec![
                vec![1.0, 0.0, 0.0, 0.0, 0.0],
                vec![0.5, 0.0, 0.5, 0.0, 0.0],
                vec![0.0, 0.5, 0.0, 0.5, 0.0],
                vec![0.0, 0.0, 0.5, 0.0, 0.5],
                vec![0.0, 0.0, 0.0, 0.0, 1.0],
            ])))
            .with_members(100)
            .with_steps(50);
            let mut engine = Engine::new(crate::config::apply(config, overrides), &mut rng)?;
            let ab = engine.absorption().expect("categorical run");
            info!(times = ?ab.times, states = ?ab.states, "absorption resolved");
            Ok(engine.run_collect(&mut rng))
        }
        "R2.3" => {
            // Two-state MLE recovery with periodic batch reports.
            let config = EngineConfig::new(ProcessSpec::Markov(TransitionSpec::Dense(vec![
                vec![0.1, 0.9],
                vec![0.1, 0.9],
            ])))
            .with_members(500)
            .with_steps(500)
            .with_batch(100);
            let mut engine = Engine::new(crate::config::apply(config, overrides), &mut rng)?;
            Ok(engine.run_collect(&mut rng))
        }
        "R2.4" => {
            // Continuous-time holding draws over rate amplitudes.
            let config = EngineConfig::new(ProcessSpec::Gillespie {
                states: 3,
                rates: Some(vec![2.0, 1.0, 3.0]),
            })
            .with_members(200)
            .with_steps(300)
            .with_ctmode(true)
            .with_dt(0.1);
            let mut engine = Engine::new(crate::config::apply(config, overrides), &mut rng)?;
            Ok(engine.run_collect(&mut rng))
        }
        "R3" => {
            // Bayesian network over the ensemble: each member proposes
            // from the chain and accepts against its Dirichlet posterior
            // conditioned on the previous member.
            let members = overrides.members.unwrap_or(20);
            let parents: Vec<Vec<usize>> = (0..members)
                .map(|m| if m == 0 { vec![] } else { vec![m - 1] })
                .collect();
            let config = EngineConfig::new(ProcessSpec::Bayes {
                transition: TransitionSpec::Dense(vec![vec![0.5, 0.5], vec![0.5, 0.5]]),
                parents,
                alpha: 1.0,
            })
            .with_members(members)
            .with_steps(150)
            .with_emission(unit_grid_emission());
            let mut engine = Engine::new(crate::config::apply(config, overrides), &mut rng)?;
            Ok(engine.run_collect(&mut rng))
        }
        "R3.1" => {
            // Stateless learning: fold value increments into the walk.
            let config = EngineConfig::new(ProcessSpec::Wiener {
                steps_per_unit: Some(1.0),
            })
            .with_members(10)
            .with_steps(0);
            let mut engine = Engine::new(crate::config::apply(config, overrides), &mut rng)?;
            let mut batches = value_batches(10);
            batches.reverse();
            Ok(engine.run_learning(&mut move || batches.pop()))
        }
        "R3.2" => {
            // Categorical learning over a synthetic alternating feed.
            let config = EngineConfig::new(two_state_uniform())
                .with_members(10)
                .with_steps(0);
            let mut engine = Engine::new(crate::config::apply(config, overrides), &mut rng)?;
            let mut batches = vec![alternating_events(10, 60)];
            Ok(engine.run_learning(&mut move || batches.pop()))
        }
        "R3.3" => {
            // Supervised learning over the canned 35-event feed.
            let config = EngineConfig::new(two_state_uniform())
                .with_members(50)
                .with_steps(0)
                .with_batch(50);
            let mut engine = Engine::new(crate::config::apply(config, overrides), &mut rng)?;
            let mut batches = vec![canned_events()];
            Ok(engine.run_learning(&mut move || batches.pop()))
        }
        "R4.1" => {
            // Karhunen-Loeve intensity over a small canned eigenbasis.
            let dim = 64;
            let vectors: Vec<Vec<f64>> = (1..=4u32)
                .map(|k| {
                    (0..dim)
                        .map(|t| {
                            let x = std::f64::consts::PI * k as f64 * (t as f64 + 0.5)
                                / dim as f64;
                            (2.0 / dim as f64).sqrt() * x.cos()
                        })
                        .collect()
                })
                .collect();
            let config = EngineConfig::new(ProcessSpec::Gauss {
                values: vec![1.0, 0.5, 0.25, 0.125],
                vectors,
                reference: 1.0,
                dim,
                mean: 4.0,
            })
            .with_members(50)
            .with_steps(80)
            .with_dt(0.25);
            let mut engine = Engine::new(crate::config::apply(config, overrides), &mut rng)?;
            Ok(engine.run_collect(&mut rng))
        }
        "R4.2" => {
            // Diffusion pair: a Wiener walk, then an Ornstein-Uhlenbeck
            // relaxation, concatenated into one stream.
            let wiener = EngineConfig::new(ProcessSpec::Wiener {
                steps_per_unit: Some(50.0),
            })
            .with_members(100)
            .with_steps(200)
            .with_dt(0.02);
            let mut engine = Engine::new(crate::config::apply(wiener, overrides), &mut rng)?;
            let mut events = engine.run_collect(&mut rng);

            let ornstein = EngineConfig::new(ProcessSpec::Ornstein {
                theta: 0.5,
                sigma: 1.0,
            })
            .with_members(100)
            .with_steps(200)
            .with_dt(0.02);
            let mut engine = Engine::new(crate::config::apply(ornstein, overrides), &mut rng)?;
            events.extend(engine.run_collect(&mut rng));
            Ok(events)
        }
        other => bail!(
            "unknown scenario {other:?}; expected one of {}",
            SCENARIOS.join(", ")
        ),
    }
}

fn two_state_uniform() -> ProcessSpec {
    ProcessSpec::Markov(TransitionSpec::Dense(vec![
        vec![0.5, 0.5],
        vec![0.5, 0.5],
    ]))
}

/// The canned 35-event supervised feed: times ascend, states alternate
/// in a 3-cycle, observations spiral through the plane.
fn canned_events() -> Vec<LearnEvent> {
    (0..35)
        .map(|i| {
            let phase = 0.37 * i as f64;
            LearnEvent {
                member: i % 50,
                label: Some(if i % 3 == 0 { "1" } else { "0" }.to_string()),
                value: 0.0,
                time: 0.1 * (i + 1) as f64,
                obs: [phase.cos(), phase.sin(), 0.01 * i as f64],
            }
        })
        .collect()
}

/// Alternating two-state events across the ensemble.
fn alternating_events(members: usize, count: usize) -> Vec<LearnEvent> {
    (0..count)
        .map(|i| LearnEvent {
            member: i % members,
            label: Some(((i / members) % 2).to_string()),
            value: 0.0,
            time: 0.05 * (i + 1) as f64,
            obs: [0.0; 3],
        })
        .collect()
}

/// Batches of stateless value increments.
fn value_batches(members: usize) -> Vec<Vec<LearnEvent>> {
    (0..4)
        .map(|b| {
            (0..members)
                .map(|m| LearnEvent {
                    member: m,
                    label: None,
                    value: 0.25 * (b + 1) as f64,
                    time: b as f64,
                    obs: [0.0; 3],
                })
                .collect()
        })
        .collect()
}

/// Emission specification for the observation-bearing demos.
fn unit_grid_emission() -> EmissionSpec {
    EmissionSpec::Grid {
        dims: vec![2],
        weights: vec![1.0],
    }
}
