//! The pipeline driver: configuration resolution, the generative and
//! learning loops, and the pull-driven event stream.

use std::collections::BTreeSet;

use kronos_chain::{
    Absorption, CumulativeRows, Recurrence, SymbolTable, TransitionMatrix, TransitionSpec,
    correlation_labels, solve_absorption, solve_recurrence,
};
use kronos_linalg::Matrix;
use kronos_numeric::exp_deviate;
use kronos_process::{
    BayesNet, EmissionModel, GaussField, OrnsteinProcess, WienerWalk, fit_mixture,
    gillespie_step, markov_step, metropolis_step,
};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::{EmissionSpec, EngineConfig, ProcessSpec};
use crate::ensemble::Ensemble;
use crate::error::EngineError;
use crate::event::{
    AbsorptionPayload, BatchPayload, ConfigPayload, EndPayload, ErrorPayload, Event,
    JumpPayload, MixturePayload, RunStats, StepPayload,
};
use crate::recorder::Recorder;
use crate::stats;

/// One externally supplied observation consumed in learning mode.
#[derive(Debug, Clone)]
pub struct LearnEvent {
    /// Ensemble member the event belongs to.
    pub member: usize,
    /// State label; `None` (and unknown labels) map to the hidden state 0.
    pub label: Option<String>,
    /// Value increment applied in stateless mode.
    pub value: f64,
    /// Event timestamp.
    pub time: f64,
    /// Raw observation coordinates.
    pub obs: [f64; 3],
}

/// Pulls batches of time-ordered events for the learning loop.
///
/// Implemented for `FnMut() -> Option<Vec<LearnEvent>>` closures; `None`
/// signals the end of the feed.
pub trait EventFeeder {
    /// The next batch, or `None` when the feed is exhausted.
    fn next_batch(&mut self) -> Option<Vec<LearnEvent>>;
}

impl<F> EventFeeder for F
where
    F: FnMut() -> Option<Vec<LearnEvent>>,
{
    fn next_batch(&mut self) -> Option<Vec<LearnEvent>> {
        self()
    }
}

/// Resolved per-variant kernel state.
enum Kernel {
    Markov,
    Gillespie,
    Bayes(BayesNet),
    Gauss(GaussField),
    Wiener(WienerWalk),
    Ornstein(Vec<OrnsteinProcess>),
}

/// The stochastic-process engine: resolved tables, the ensemble, and the
/// event recorder.
///
/// One instance owns all mutable run state; independent instances may
/// run on parallel threads.
pub struct Engine {
    config: EngineConfig,
    symbols: SymbolTable,
    transition: Option<TransitionMatrix>,
    cumulative: Option<CumulativeRows>,
    /// Mean recurrence / expected holding per (from, to); the diagonal
    /// is refreshed with each drawn hold in continuous-time mode.
    holding: Matrix,
    jump_rates: Option<Matrix>,
    recurrence: Option<Recurrence>,
    absorption: Option<Absorption>,
    corr_map: Vec<i64>,
    emission: Option<EmissionModel>,
    kernel: Kernel,
    ensemble: Ensemble,
    recorder: Recorder,
    observations: Vec<Vec<f64>>,
    unknown_labels: BTreeSet<String>,
    t: f64,
    step: u64,
    halted: bool,
    started: bool,
    finished: bool,
}

impl Engine {
    /// Resolves a configuration into a ready engine.
    ///
    /// Categorical processes get their transition law resolved, the mean
    /// recurrence and absorption solvers run, and the cumulative rows
    /// built; stateless processes get their kernel state. The RNG seeds
    /// random emission moments when a grid specification is present.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on invalid options or an unresolvable
    /// process/emission specification. Configuration errors are fatal:
    /// no event is emitted before resolution succeeds.
    pub fn new(config: EngineConfig, rng: &mut impl Rng) -> Result<Self, EngineError> {
        config.validate()?;
        let n = config.members();

        // Build the emission model first so sparse transition keys can
        // borrow its grid dimensions.
        let emission = match config.emission() {
            Some(EmissionSpec::Grid { dims, weights }) => {
                Some(EmissionModel::from_grid(dims, weights, rng)?)
            }
            Some(EmissionSpec::Moments { mu, sigma }) => {
                Some(EmissionModel::from_moments(mu.clone(), sigma.clone())?)
            }
            None => None,
        };

        let transition_spec = resolve_transition_spec(&config, emission.as_ref());

        let (transition, kernel) = match config.process() {
            ProcessSpec::Markov(_) => {
                let spec = transition_spec.as_ref().expect("markov carries a transition spec");
                (Some(TransitionMatrix::resolve(spec)?), Kernel::Markov)
            }
            ProcessSpec::Gillespie { .. } => {
                let spec = transition_spec.as_ref().expect("gillespie builds a rate spec");
                (Some(TransitionMatrix::resolve(spec)?), Kernel::Gillespie)
            }
            ProcessSpec::Bayes { parents, alpha, .. } => {
                let spec = transition_spec.as_ref().expect("bayes carries a proposal spec");
                let tm = TransitionMatrix::resolve(spec)?;
                let net = BayesNet::new(parents.clone(), tm.k(), *alpha)?;
                (Some(tm), Kernel::Bayes(net))
            }
            ProcessSpec::Gauss {
                values,
                vectors,
                reference,
                dim,
                mean,
            } => {
                let field =
                    GaussField::new(values.clone(), vectors.clone(), *reference, *dim, *mean)?;
                (None, Kernel::Gauss(field))
            }
            ProcessSpec::Wiener { steps_per_unit } => {
                let walk = WienerWalk::new(steps_per_unit.unwrap_or(1.0 / config.dt()))?;
                (None, Kernel::Wiener(walk))
            }
            ProcessSpec::Ornstein { theta, sigma } => {
                let procs = (0..n)
                    .map(|_| OrnsteinProcess::new(*theta, *sigma))
                    .collect::<Result<Vec<_>, _>>()?;
                (None, Kernel::Ornstein(procs))
            }
        };

        let k = transition.as_ref().map_or(0, TransitionMatrix::k);

        let symbols = match config.symbols() {
            Some(spec) => {
                let table = SymbolTable::resolve(spec);
                if table.k() != k {
                    return Err(EngineError::InvalidOption {
                        name: "symbols",
                        reason: format!("{} labels for {k} states", table.k()),
                    });
                }
                table
            }
            None => SymbolTable::from_count(k),
        };

        if let Some(em) = &emission {
            if em.k() != k {
                return Err(EngineError::InvalidOption {
                    name: "emission",
                    reason: format!("{} emission components for {k} states", em.k()),
                });
            }
        }

        let (recurrence, absorption, holding) = match &transition {
            Some(tm) => {
                let rec = solve_recurrence(tm);
                if !rec.ergodic {
                    info!("continuing with zeroed recurrence times");
                }
                let ab = solve_absorption(tm);
                let holding = rec.times.clone();
                (Some(rec), Some(ab), holding)
            }
            None => (None, None, Matrix::zeros(0, 0)),
        };

        let jump_rates = rate_matrix(&config, k);

        Ok(Self {
            symbols,
            transition,
            cumulative: None,
            holding,
            jump_rates,
            recurrence,
            absorption,
            corr_map: correlation_labels(k),
            emission,
            kernel,
            ensemble: Ensemble::new(n, k),
            recorder: Recorder::accepting_all(),
            observations: Vec::new(),
            unknown_labels: BTreeSet::new(),
            t: 0.0,
            step: 0,
            halted: false,
            started: false,
            finished: false,
            config,
        }
        .with_cumulative())
    }

    fn with_cumulative(mut self) -> Self {
        self.cumulative = self.transition.as_ref().map(TransitionMatrix::cumulative);
        self
    }

    /// Replaces the recorder (filter and/or forwarding sink).
    pub fn set_recorder(&mut self, recorder: Recorder) {
        self.recorder = recorder;
    }

    /// Requests cooperative termination of a learning feed.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    // --- Accessors ---

    /// The resolved configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of discrete states; 0 for stateless processes.
    pub fn k(&self) -> usize {
        self.ensemble.k()
    }

    /// The resolved transition matrix, when categorical.
    pub fn transition(&self) -> Option<&TransitionMatrix> {
        self.transition.as_ref()
    }

    /// The mean-recurrence solution, when categorical.
    pub fn recurrence(&self) -> Option<&Recurrence> {
        self.recurrence.as_ref()
    }

    /// The first-absorption solution, when categorical.
    pub fn absorption(&self) -> Option<&Absorption> {
        self.absorption.as_ref()
    }

    /// The ensemble accumulators.
    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }

    /// Observations accumulated so far.
    pub fn observations(&self) -> &[Vec<f64>] {
        &self.observations
    }

    /// Current time on the grid.
    pub fn t(&self) -> f64 {
        self.t
    }

    /// Steps completed so far.
    pub fn step_count(&self) -> u64 {
        self.step
    }

    // --- Drivers ---

    /// Runs the full generative loop and returns the collected events.
    ///
    /// Emits `config`, advances the stepper until the configured step
    /// count, emits `end`, and drains the store.
    pub fn run_collect(&mut self, rng: &mut impl Rng) -> Vec<Event> {
        self.begin();
        while self.step < self.config.steps() {
            self.advance(rng);
        }
        self.finish();
        self.recorder.take()
    }

    /// The pull-driven form of the generative loop.
    ///
    /// Each `next()` yields the oldest unread event, advancing the
    /// stepper one step at a time as the consumer demands more.
    pub fn stream<'a, R: Rng>(&'a mut self, rng: &'a mut R) -> EventStream<'a, R> {
        EventStream {
            engine: self,
            rng,
            drained: 0,
        }
    }

    /// Runs the learning loop against an external event feeder.
    ///
    /// Each batch of time-ordered events is folded into the estimators;
    /// a `None` batch (or a [`halt`](Engine::halt) request) ends the
    /// feed and produces the `end` event with the final MLEs.
    pub fn run_learning(&mut self, feeder: &mut impl EventFeeder) -> Vec<Event> {
        self.begin();
        while !self.halted {
            match feeder.next_batch() {
                Some(batch) => self.apply_batch(&batch),
                None => break,
            }
        }
        self.finish();
        self.recorder.take()
    }

    /// Emits the `config` event. Idempotent.
    fn begin(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        info!(
            members = self.ensemble.n(),
            states = self.k(),
            steps = self.config.steps(),
            "engine configured"
        );
        let payload = ConfigPayload {
            t: self.t,
            members: self.ensemble.n(),
            steps: self.config.steps(),
            dt: self.config.dt(),
            states: self.k(),
            ctmode: self.config.ctmode(),
            eq_probs: self
                .recurrence
                .as_ref()
                .map(|r| r.eq_probs.clone())
                .unwrap_or_default(),
            ergodic: self.recurrence.as_ref().is_some_and(|r| r.ergodic),
            absorption: self.absorption.as_ref().filter(|ab| !ab.is_empty()).map(|ab| {
                AbsorptionPayload {
                    times: ab.times.clone(),
                    probs: (0..ab.transient.len())
                        .map(|i| (0..ab.states.len()).map(|j| ab.probs[(i, j)]).collect())
                        .collect(),
                    states: ab.states.clone(),
                }
            }),
        };
        self.recorder.record(Event::Config(payload));
    }

    /// Advances one generative step and emits its events.
    fn advance(&mut self, rng: &mut impl Rng) {
        if self.k() > 0 {
            self.step_categorical(rng);
        } else {
            self.step_stateless(rng);
        }

        let gamma = self.ensemble.gamma.last().copied().unwrap_or(1.0);
        let walk = self.ensemble_mean();
        self.recorder.record(Event::Step(StepPayload {
            t: self.t,
            step: self.step,
            gamma,
            walk,
        }));

        self.t += self.config.dt();
        self.step += 1;
        if self.config.batch() > 0 && self.step % self.config.batch() == 1 {
            self.record_batch();
        }
    }

    /// One categorical step: correlation sample, member draws, tallies.
    fn step_categorical(&mut self, rng: &mut impl Rng) {
        let gamma = self.ensemble.observe_correlation(&self.corr_map);
        self.ensemble.gamma.push(gamma);
        self.ensemble.snapshot_previous();

        let t = self.t;
        let ctmode = self.config.ctmode();
        let cum = self
            .cumulative
            .as_ref()
            .expect("categorical engines always carry cumulative rows");

        for m in 0..self.ensemble.n() {
            let from = self.ensemble.states[m];
            let to = match &self.kernel {
                Kernel::Markov => markov_step(cum, from, rng),
                Kernel::Gillespie => gillespie_step(&self.holding, from, rng),
                Kernel::Bayes(net) => {
                    let cfg = net.parent_config(m, &self.ensemble.states);
                    let proposal = self
                        .transition
                        .as_ref()
                        .expect("bayes engines carry a proposal matrix");
                    metropolis_step(cum, proposal.probs(), net.posterior(m, cfg), from, rng)
                }
                _ => unreachable!("stateless kernels never reach the categorical stepper"),
            };
            if to == from {
                continue;
            }

            let held = if ctmode { t - self.ensemble.next_jump[m] } else { 0.0 };
            let hold = if ctmode { self.draw_hold(from, to, rng) } else { 0.0 };
            if ctmode {
                self.holding[(from, from)] = hold;
            }
            self.ensemble.record_jump(m, from, to, held, hold, t + hold);

            let obs = self.emission.as_ref().map(|e| e.sample(to, rng));
            if let Some(o) = &obs {
                self.observations.push(o.clone());
            }
            self.recorder.record(Event::Jump(JumpPayload {
                t,
                member: m,
                state: to,
                hold,
                obs,
            }));
        }

        self.ensemble.tally_step();

        if let Kernel::Bayes(net) = &mut self.kernel {
            for m in 0..self.ensemble.n() {
                let cfg = net.parent_config(m, &self.ensemble.states);
                net.observe(m, cfg, &self.ensemble.occupancy[m]);
            }
        }
    }

    /// One stateless step: every member draws a fresh value.
    fn step_stateless(&mut self, rng: &mut impl Rng) {
        let t = self.t;
        let dt = self.config.dt();
        let step = self.step as usize;
        for m in 0..self.ensemble.n() {
            let value = match &mut self.kernel {
                Kernel::Gauss(field) => field.intensity(step, dt, rng),
                Kernel::Wiener(walk) => walk.step(&mut self.ensemble.walks[m], t, rng),
                Kernel::Ornstein(procs) => procs[m].step(t, rng),
                _ => unreachable!("categorical kernels never reach the stateless stepper"),
            };
            self.ensemble.values[m] = value;
            self.ensemble.counts[m] += value;
        }
    }

    /// Exponential holding draw for a continuous-time jump.
    fn draw_hold(&self, from: usize, to: usize, rng: &mut impl Rng) -> f64 {
        let rate = self
            .jump_rates
            .as_ref()
            .map_or(0.0, |rates| rates[(from, to)]);
        if rate > 0.0 {
            exp_deviate(1.0 / rate, rng)
        } else {
            debug!(from, to, "no jump rate for pair; holding time degraded to 0");
            0.0
        }
    }

    /// Folds one batch of external events into the estimators.
    fn apply_batch(&mut self, events: &[LearnEvent]) {
        let categorical = self.k() > 0;
        for ev in events {
            if ev.member >= self.ensemble.n() {
                self.recorder.record(Event::Error(ErrorPayload {
                    t: ev.time,
                    message: format!(
                        "event references member {} of {}; skipped",
                        ev.member,
                        self.ensemble.n()
                    ),
                }));
                continue;
            }
            if categorical {
                self.learn_categorical(ev);
            } else {
                self.ensemble.values[ev.member] += ev.value;
            }
        }

        self.recorder.record(Event::Step(StepPayload {
            t: self.t,
            step: self.step,
            gamma: self.ensemble.gamma.last().copied().unwrap_or(1.0),
            walk: self.ensemble_mean(),
        }));
        self.t += self.config.dt();
        self.step += 1;
        if self.config.batch() > 0 && self.step % self.config.batch() == 1 {
            self.record_batch();
        }
    }

    /// One categorical learning event: holding, counts, state move.
    fn learn_categorical(&mut self, ev: &LearnEvent) {
        let m = ev.member;
        let from = self.ensemble.states[m];
        let to = match &ev.label {
            Some(label) => self.symbols.index_of(label).unwrap_or_else(|| {
                if self.unknown_labels.insert(label.clone()) {
                    warn!(%label, "unknown state label; treating as hidden state 0");
                }
                0
            }),
            None => 0,
        };

        let held = ev.time - self.ensemble.next_jump[m];
        self.ensemble.record_jump(m, from, to, held, 0.0, ev.time);
        self.ensemble.transitions[(from, to)] += 1.0;
        self.observations.push(ev.obs.to_vec());

        self.recorder.record(Event::Jump(JumpPayload {
            t: ev.time,
            member: m,
            state: to,
            hold: 0.0,
            obs: Some(ev.obs.to_vec()),
        }));
    }

    /// Emits the periodic batch report.
    fn record_batch(&mut self) {
        let count_freq = stats::count_frequency(&self.ensemble.counts);
        let count_prob = stats::count_probability(&count_freq);
        let (mle_tr_probs, rel_error) = if self.k() > 0 {
            let mle = stats::transition_mle(&self.ensemble.transitions);
            let err = stats::relative_error(&mle, self.transition.as_ref());
            (Some(mle), err)
        } else {
            (None, None)
        };

        self.recorder.record(Event::Batch(BatchPayload {
            t: self.t,
            step: self.step,
            count_freq,
            count_prob,
            rel_error,
            mle_tr_probs,
            mle_em_events: self.fit_emission(),
            stat_corr: self.ensemble.gamma.last().copied().unwrap_or(1.0),
        }));
    }

    /// Emits the `end` event with the final statistics. Idempotent.
    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let stats = self.run_stats();
        self.recorder.record(Event::End(EndPayload {
            t: self.t,
            stats,
        }));
    }

    /// Assembles the end-of-run statistics block.
    fn run_stats(&self) -> RunStats {
        let ens = &self.ensemble;
        let k = self.k();

        let (mle_holding_times, mle_tr_probs, tr_counts, rel_error) = if k > 0 {
            let mle = stats::transition_mle(&ens.transitions);
            let err = stats::relative_error(&mle, self.transition.as_ref());
            (
                stats::holding_mle(&ens.cum_hold, &ens.cum_jumps),
                Some(mle),
                stats::matrix_to_counts(&ens.transitions),
                err,
            )
        } else {
            (Vec::new(), None, Vec::new(), None)
        };

        let count_freq = stats::count_frequency(&ens.counts);
        let mean_count = kronos_numeric::mean(&ens.counts);
        let elapsed = self.t;
        let coherence_time = stats::coherence_time(&ens.gamma, self.config.dt());
        let coherence_intervals = if coherence_time > 0.0 {
            elapsed / coherence_time
        } else {
            0.0
        };
        let degeneracy_param = if coherence_intervals > 0.0 {
            mean_count / coherence_intervals
        } else {
            0.0
        };
        let snr = (mean_count / (1.0 + degeneracy_param)).max(0.0).sqrt();
        let mean_intensity = if elapsed > 0.0 { mean_count / elapsed } else { 0.0 };

        RunStats {
            mle_holding_times,
            rel_error,
            count_freq,
            mle_em_probs: self.fit_emission(),
            mle_tr_probs,
            tr_counts,
            mean_count,
            coherence_time,
            coherence_intervals,
            correlation_0lag: ens.gamma.first().copied().unwrap_or(1.0),
            mean_intensity,
            degeneracy_param,
            snr,
        }
    }

    /// Mixture fit over the accumulated observations, when feasible.
    fn fit_emission(&self) -> Option<Vec<MixturePayload>> {
        let components = self.k().max(1);
        if self.observations.len() < components {
            return None;
        }
        match fit_mixture(&self.observations, components, 100) {
            Ok(comps) => Some(comps.iter().map(MixturePayload::from).collect()),
            Err(e) => {
                warn!(error = %e, "emission mixture fit failed");
                None
            }
        }
    }

    /// Ensemble mean of the current member values.
    fn ensemble_mean(&self) -> f64 {
        if self.k() > 0 {
            let total: usize = self.ensemble.states.iter().sum();
            total as f64 / self.ensemble.n() as f64
        } else {
            kronos_numeric::mean(&self.ensemble.values)
        }
    }
}

/// Builds the effective transition specification for categorical
/// processes, borrowing grid dimensions from the emission model for
/// sparse keys when the spec has none of its own.
fn resolve_transition_spec(
    config: &EngineConfig,
    emission: Option<&EmissionModel>,
) -> Option<TransitionSpec> {
    let base = match config.process() {
        ProcessSpec::Markov(spec) => spec.clone(),
        ProcessSpec::Bayes { transition, .. } => transition.clone(),
        ProcessSpec::Gillespie { states, rates } => {
            let pairs = states * states.saturating_sub(1) / 2;
            TransitionSpec::Rates(rates.clone().unwrap_or_else(|| vec![1.0; pairs]))
        }
        _ => return None,
    };

    let spec = match base {
        TransitionSpec::Sparse {
            states,
            entries,
            dims: None,
        } => TransitionSpec::Sparse {
            states,
            entries,
            dims: emission.and_then(|e| e.dims().map(<[usize]>::to_vec)),
        },
        other => other,
    };
    Some(spec)
}

/// Mirrors rate amplitudes into the full `K x K` jump-rate matrix.
fn rate_matrix(config: &EngineConfig, k: usize) -> Option<Matrix> {
    let amplitudes = match config.process() {
        ProcessSpec::Markov(TransitionSpec::Rates(a)) => a.clone(),
        ProcessSpec::Gillespie { states, rates } => {
            let pairs = states * states.saturating_sub(1) / 2;
            rates.clone().unwrap_or_else(|| vec![1.0; pairs])
        }
        _ => return None,
    };

    let mut rates = Matrix::zeros(k, k);
    let mut idx = 0;
    for i in 0..k {
        for j in (i + 1)..k {
            if idx < amplitudes.len() {
                rates[(i, j)] = amplitudes[idx];
                rates[(j, i)] = amplitudes[idx];
            }
            idx += 1;
        }
    }
    Some(rates)
}

/// Pull-driven event stream over a running engine.
///
/// Each pull drains the oldest unread event; when the store is caught
/// up, the engine advances one step (or emits its terminal `end`).
pub struct EventStream<'a, R: Rng> {
    engine: &'a mut Engine,
    rng: &'a mut R,
    drained: usize,
}

impl<R: Rng> Iterator for EventStream<'_, R> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        loop {
            if self.drained < self.engine.recorder.len() {
                let event = self.engine.recorder.events()[self.drained].clone();
                self.drained += 1;
                return Some(event);
            }
            if !self.engine.started {
                self.engine.begin();
                continue;
            }
            if self.engine.finished {
                return None;
            }
            if self.engine.step < self.engine.config.steps() {
                self.engine.advance(self.rng);
            } else {
                self.engine.finish();
            }
        }
    }
}
