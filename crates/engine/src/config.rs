//! Engine configuration: ensemble shape, time grid, process selection.

use kronos_chain::{SymbolsSpec, TransitionSpec};

use crate::error::EngineError;
use crate::event::FieldKeys;

/// Which random process drives the ensemble.
#[derive(Debug, Clone)]
pub enum ProcessSpec {
    /// Finite-state Markov chain. The transition law may arrive as rate
    /// amplitudes, an upper-triangular list, a dense matrix, or a sparse
    /// keyed map (see [`TransitionSpec`]).
    Markov(TransitionSpec),
    /// Bayesian network over the ensemble: members propose from the
    /// chain and accept against their Dirichlet posterior.
    Bayes {
        /// Proposal transition law.
        transition: TransitionSpec,
        /// Parent member indices, one set per ensemble member.
        parents: Vec<Vec<usize>>,
        /// Flat Dirichlet prior pseudo-count.
        alpha: f64,
    },
    /// Holding-time-ratio jumps over `states` states. When `rates` is
    /// absent every pair gets a unit amplitude.
    Gillespie {
        /// Number of states.
        states: usize,
        /// Optional `K(K-1)/2` pair amplitudes.
        rates: Option<Vec<f64>>,
    },
    /// Stateless Karhunen-Loeve Gaussian intensity generator.
    Gauss {
        /// Eigenvalues of the intensity covariance.
        values: Vec<f64>,
        /// Eigenvectors, one per eigenvalue, at least `dim` entries each.
        vectors: Vec<Vec<f64>>,
        /// Reference eigenvalue used to scale the spectrum.
        reference: f64,
        /// Temporal dimension of the eigenbasis.
        dim: usize,
        /// Expected event count per sample interval.
        mean: f64,
    },
    /// Stateless Wiener (Brownian) walk. `steps_per_unit` defaults to
    /// `1 / dt` when absent.
    Wiener {
        /// Sub-steps of the refined walk per unit time.
        steps_per_unit: Option<f64>,
    },
    /// Stateless Ornstein-Uhlenbeck walk.
    Ornstein {
        /// Mean-reversion rate.
        theta: f64,
        /// Noise scale.
        sigma: f64,
    },
}

impl ProcessSpec {
    /// True for the value-emitting variants with no discrete state space.
    pub fn is_stateless(&self) -> bool {
        matches!(
            self,
            ProcessSpec::Gauss { .. } | ProcessSpec::Wiener { .. } | ProcessSpec::Ornstein { .. }
        )
    }
}

/// How per-state observation moments are specified.
#[derive(Debug, Clone)]
pub enum EmissionSpec {
    /// Default moments over a product-space grid with per-dimension
    /// scale weights.
    Grid {
        /// Grid extent per dimension.
        dims: Vec<usize>,
        /// Per-dimension scale weights.
        weights: Vec<f64>,
    },
    /// Explicit per-state means and covariances.
    Moments {
        /// One mean vector per state.
        mu: Vec<Vec<f64>>,
        /// One covariance matrix per state.
        sigma: Vec<Vec<Vec<f64>>>,
    },
}

/// Configuration for an engine run.
///
/// Use the builder methods to customise parameters.
///
/// # Example
///
/// ```
/// use kronos_engine::{EngineConfig, ProcessSpec};
/// use kronos_chain::TransitionSpec;
///
/// let config = EngineConfig::new(ProcessSpec::Markov(TransitionSpec::Dense(vec![
///     vec![0.5, 0.5],
///     vec![0.5, 0.5],
/// ])))
/// .with_members(100)
/// .with_steps(50);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    process: ProcessSpec,
    members: usize,
    steps: u64,
    dt: f64,
    ctmode: bool,
    batch: u64,
    symbols: Option<SymbolsSpec>,
    emission: Option<EmissionSpec>,
    keys: FieldKeys,
}

impl EngineConfig {
    /// Creates a configuration with defaults.
    ///
    /// Defaults: `members = 1`, `steps = 100`, `dt = 1.0`,
    /// `ctmode = false`, `batch = 0` (disabled), no symbols, no emission.
    pub fn new(process: ProcessSpec) -> Self {
        Self {
            process,
            members: 1,
            steps: 100,
            dt: 1.0,
            ctmode: false,
            batch: 0,
            symbols: None,
            emission: None,
            keys: FieldKeys::default(),
        }
    }

    /// Sets the ensemble size.
    pub fn with_members(mut self, members: usize) -> Self {
        self.members = members;
        self
    }

    /// Sets the number of discrete time steps.
    pub fn with_steps(mut self, steps: u64) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the time increment per step.
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Enables or disables continuous-time jump holding.
    pub fn with_ctmode(mut self, ctmode: bool) -> Self {
        self.ctmode = ctmode;
        self
    }

    /// Emits a batch report every `batch` steps; 0 disables.
    pub fn with_batch(mut self, batch: u64) -> Self {
        self.batch = batch;
        self
    }

    /// Sets the state label specification.
    pub fn with_symbols(mut self, symbols: SymbolsSpec) -> Self {
        self.symbols = Some(symbols);
        self
    }

    /// Sets the observation emission specification.
    pub fn with_emission(mut self, emission: EmissionSpec) -> Self {
        self.emission = Some(emission);
        self
    }

    /// Overrides the serialized field names of jump events.
    pub fn with_keys(mut self, keys: FieldKeys) -> Self {
        self.keys = keys;
        self
    }

    // --- Accessors ---

    /// The configured process.
    pub fn process(&self) -> &ProcessSpec {
        &self.process
    }

    /// Ensemble size.
    pub fn members(&self) -> usize {
        self.members
    }

    /// Number of discrete time steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Time increment per step.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Whether continuous-time jump holding is active.
    pub fn ctmode(&self) -> bool {
        self.ctmode
    }

    /// Batch reporting interval; 0 when disabled.
    pub fn batch(&self) -> u64 {
        self.batch
    }

    /// The state label specification, if any.
    pub fn symbols(&self) -> Option<&SymbolsSpec> {
        self.symbols.as_ref()
    }

    /// The emission specification, if any.
    pub fn emission(&self) -> Option<&EmissionSpec> {
        self.emission.as_ref()
    }

    /// Serialized field names for jump events.
    pub fn keys(&self) -> &FieldKeys {
        &self.keys
    }

    /// Validates this configuration.
    ///
    /// Checks the ensemble size, time increment, continuous-time rate
    /// requirement, and that stateless processes carry no state labels.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.members == 0 {
            return Err(EngineError::InvalidOption {
                name: "members",
                reason: "ensemble size must be at least 1".to_string(),
            });
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(EngineError::InvalidOption {
                name: "dt",
                reason: format!("time increment must be finite and positive, got {}", self.dt),
            });
        }
        if self.ctmode && !self.has_rate_amplitudes() {
            return Err(EngineError::MissingJumpRates);
        }
        if self.process.is_stateless() && self.symbols.is_some() {
            return Err(EngineError::InvalidOption {
                name: "symbols",
                reason: "stateless processes have no discrete state labels".to_string(),
            });
        }
        if let ProcessSpec::Bayes { parents, .. } = &self.process {
            if parents.len() != self.members {
                return Err(EngineError::BayesSizeMismatch {
                    nodes: parents.len(),
                    members: self.members,
                });
            }
            for (node, set) in parents.iter().enumerate() {
                if let Some(&p) = set.iter().find(|&&p| p >= self.members) {
                    return Err(EngineError::InvalidOption {
                        name: "parents",
                        reason: format!("node {node} references member {p} outside the ensemble"),
                    });
                }
            }
        }
        Ok(())
    }

    fn has_rate_amplitudes(&self) -> bool {
        matches!(
            self.process,
            ProcessSpec::Markov(TransitionSpec::Rates(_)) | ProcessSpec::Gillespie { .. }
        )
    }
}
