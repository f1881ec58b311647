//! The time-ordered event stream emitted toward the sink.

use serde::Serialize;

use kronos_process::MixtureComponent;

/// Classification of an outgoing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Emitted once after configuration resolution.
    Config,
    /// Emitted after every time step.
    Step,
    /// Emitted for every member jump within a step.
    Jump,
    /// Emitted every `batch` steps.
    Batch,
    /// Emitted once at the end of a run.
    End,
    /// Emitted on a recoverable fault.
    Error,
}

/// One record of the outgoing event stream.
///
/// Serialized records carry the classification under the `at` tag and
/// the timestamp `t` alongside the variant payload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "at", rename_all = "snake_case")]
pub enum Event {
    /// Resolved configuration snapshot.
    Config(ConfigPayload),
    /// Per-step statistics.
    Step(StepPayload),
    /// One member changed state (or an external event was consumed).
    Jump(JumpPayload),
    /// Periodic batch report.
    Batch(BatchPayload),
    /// Final statistics.
    End(EndPayload),
    /// Recoverable fault description.
    Error(ErrorPayload),
}

impl Event {
    /// The event classification.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Config(_) => EventKind::Config,
            Event::Step(_) => EventKind::Step,
            Event::Jump(_) => EventKind::Jump,
            Event::Batch(_) => EventKind::Batch,
            Event::End(_) => EventKind::End,
            Event::Error(_) => EventKind::Error,
        }
    }

    /// The timestamp the event was emitted at.
    pub fn t(&self) -> f64 {
        match self {
            Event::Config(p) => p.t,
            Event::Step(p) => p.t,
            Event::Jump(p) => p.t,
            Event::Batch(p) => p.t,
            Event::End(p) => p.t,
            Event::Error(p) => p.t,
        }
    }
}

/// Resolved configuration snapshot carried by the `config` event.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPayload {
    /// Emission timestamp.
    pub t: f64,
    /// Ensemble size.
    pub members: usize,
    /// Configured step count.
    pub steps: u64,
    /// Time increment per step.
    pub dt: f64,
    /// Number of discrete states; 0 for stateless processes.
    pub states: usize,
    /// Whether continuous-time holding is active.
    pub ctmode: bool,
    /// Equilibrium state probabilities, empty for stateless processes.
    pub eq_probs: Vec<f64>,
    /// Whether the ergodicity test passed (categorical only).
    pub ergodic: bool,
    /// First-absorption summary, when the chain has absorbing states.
    pub absorption: Option<AbsorptionPayload>,
}

/// First-absorption block of the `config` event.
#[derive(Debug, Clone, Serialize)]
pub struct AbsorptionPayload {
    /// Expected steps until absorption, per transient state.
    pub times: Vec<f64>,
    /// Destination probabilities, transient x absorbing.
    pub probs: Vec<Vec<f64>>,
    /// One-based absorbing state indices.
    pub states: Vec<usize>,
}

/// Per-step statistics carried by the `step` event.
#[derive(Debug, Clone, Serialize)]
pub struct StepPayload {
    /// Emission timestamp.
    pub t: f64,
    /// Step index.
    pub step: u64,
    /// Autocorrelation statistic at this step.
    pub gamma: f64,
    /// Ensemble mean of the current member values.
    pub walk: f64,
}

/// One member jump carried by the `jump` event.
#[derive(Debug, Clone, Serialize)]
pub struct JumpPayload {
    /// Emission timestamp.
    pub t: f64,
    /// Ensemble member index.
    pub member: usize,
    /// Destination state.
    pub state: usize,
    /// Drawn holding time (0 in discrete-time mode).
    pub hold: f64,
    /// Observation vector, when an emission model is active.
    pub obs: Option<Vec<f64>>,
}

/// Periodic report carried by the `batch` event.
#[derive(Debug, Clone, Serialize)]
pub struct BatchPayload {
    /// Emission timestamp.
    pub t: f64,
    /// Step index the report was taken at.
    pub step: u64,
    /// Histogram of floored member counts.
    pub count_freq: Vec<u64>,
    /// The histogram normalized to probabilities.
    pub count_prob: Vec<f64>,
    /// Relative error of the transition MLE against the declared law.
    pub rel_error: Option<f64>,
    /// Transition-probability MLE rows.
    pub mle_tr_probs: Option<Vec<Vec<f64>>>,
    /// Mixture fit over the observations accumulated so far.
    pub mle_em_events: Option<Vec<MixturePayload>>,
    /// Autocorrelation statistic at the report step.
    pub stat_corr: f64,
}

/// Final statistics block carried by the `end` event.
#[derive(Debug, Clone, Serialize)]
pub struct EndPayload {
    /// Emission timestamp.
    pub t: f64,
    /// The statistics block.
    pub stats: RunStats,
}

/// Recoverable fault carried by the `error` event.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    /// Emission timestamp.
    pub t: f64,
    /// Human-readable description.
    pub message: String,
}

/// End-of-run statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    /// Holding-time MLE per (from, to); zero diagonal.
    pub mle_holding_times: Vec<Vec<f64>>,
    /// Relative error of the transition MLE against the declared law.
    pub rel_error: Option<f64>,
    /// Histogram of floored member counts.
    pub count_freq: Vec<u64>,
    /// Mixture fit over all accumulated observations.
    pub mle_em_probs: Option<Vec<MixturePayload>>,
    /// Transition-probability MLE rows.
    pub mle_tr_probs: Option<Vec<Vec<f64>>>,
    /// Raw transition counts per (from, to).
    pub tr_counts: Vec<Vec<u64>>,
    /// Mean accumulated count across the ensemble.
    pub mean_count: f64,
    /// Integrated normalized autocorrelation.
    pub coherence_time: f64,
    /// Number of coherence intervals in the run.
    pub coherence_intervals: f64,
    /// Autocorrelation at zero lag.
    pub correlation_0lag: f64,
    /// Mean count per unit time.
    pub mean_intensity: f64,
    /// Ratio of mean count to coherence intervals.
    pub degeneracy_param: f64,
    /// Signal-to-noise ratio `sqrt(mean / (1 + degeneracy))`.
    pub snr: f64,
}

/// One fitted mixture component in serialized form.
#[derive(Debug, Clone, Serialize)]
pub struct MixturePayload {
    /// Mixing weight.
    pub weight: f64,
    /// Component mean.
    pub mean: Vec<f64>,
    /// Per-dimension variance.
    pub variance: Vec<f64>,
}

impl From<&MixtureComponent> for MixturePayload {
    fn from(c: &MixtureComponent) -> Self {
        Self {
            weight: c.weight,
            mean: c.mean.clone(),
            variance: c.variance.clone(),
        }
    }
}

/// Serialized field names for jump-event payloads.
///
/// Defaults follow the wire convention `n, u, k, x, y, z, t`.
#[derive(Debug, Clone, Serialize)]
pub struct FieldKeys {
    /// Member index field.
    pub member: String,
    /// Destination state field.
    pub state: String,
    /// Holding time field.
    pub hold: String,
    /// Observation coordinate fields.
    pub x: String,
    /// Second observation coordinate.
    pub y: String,
    /// Third observation coordinate.
    pub z: String,
    /// Timestamp field.
    pub time: String,
}

impl Default for FieldKeys {
    fn default() -> Self {
        Self {
            member: "n".to_string(),
            state: "u".to_string(),
            hold: "k".to_string(),
            x: "x".to_string(),
            y: "y".to_string(),
            z: "z".to_string(),
            time: "t".to_string(),
        }
    }
}

impl FieldKeys {
    /// Renders a jump payload as JSON under these field names.
    ///
    /// Observation coordinates beyond the third are dropped; missing
    /// coordinates are omitted.
    pub fn jump_json(&self, jump: &JumpPayload) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(self.time.clone(), jump.t.into());
        map.insert(self.member.clone(), jump.member.into());
        map.insert(self.state.clone(), jump.state.into());
        map.insert(self.hold.clone(), jump.hold.into());
        if let Some(obs) = &jump.obs {
            for (key, value) in [&self.x, &self.y, &self.z].into_iter().zip(obs.iter()) {
                map.insert(key.clone(), (*value).into());
            }
        }
        serde_json::Value::Object(map)
    }
}
