//! Ensemble state and the accumulators updated on every step.
//!
//! All counters live here, exclusively owned by the engine instance:
//! per-member state and bookkeeping vectors, per-(from, to) transition
//! and holding accumulators, and the autocorrelation trace.

use kronos_linalg::Matrix;

/// Per-member state and all statistical accumulators of one run.
#[derive(Debug, Clone)]
pub struct Ensemble {
    n: usize,
    k: usize,
    /// Current discrete state per member (categorical processes).
    pub states: Vec<usize>,
    /// State of each member at `t = 0`.
    pub initial: Vec<usize>,
    /// Previous step's state, refreshed at the top of every step.
    pub previous: Vec<usize>,
    /// Next scheduled jump time (continuous-time) or last event time
    /// (learning) per member.
    pub next_jump: Vec<f64>,
    /// Accumulated jump count (categorical) or value (stateless).
    pub counts: Vec<f64>,
    /// Occupation counts per member and state.
    pub occupancy: Vec<Vec<u64>>,
    /// Accumulated Wiener walk per member.
    pub walks: Vec<f64>,
    /// Current real value per member (stateless processes).
    pub values: Vec<f64>,
    /// From-initial-to-current transition counts across the ensemble.
    pub from_initial: Matrix,
    /// Per-step (from, to) pair counts, self-transitions included.
    pub transitions: Matrix,
    /// Accumulated holding time per (from, to) jump.
    pub cum_hold: Matrix,
    /// Jump counts per (from, to); diagonal stays zero in generative runs.
    pub cum_jumps: Matrix,
    /// Autocorrelation trace, one entry per generative step.
    pub gamma: Vec<f64>,
    /// Cumulative member-observation count behind the correlation statistic.
    pub samples: u64,
}

impl Ensemble {
    /// Allocates the accumulators for `n` members over `k` states
    /// (`k = 0` for stateless processes).
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            k,
            states: vec![0; n],
            initial: vec![0; n],
            previous: vec![0; n],
            next_jump: vec![0.0; n],
            counts: vec![0.0; n],
            occupancy: vec![vec![0; k]; n],
            walks: vec![0.0; n],
            values: vec![0.0; n],
            from_initial: Matrix::zeros(k, k),
            transitions: Matrix::zeros(k, k),
            cum_hold: Matrix::zeros(k, k),
            cum_jumps: Matrix::zeros(k, k),
            gamma: Vec::new(),
            samples: 0,
        }
    }

    /// Ensemble size.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of discrete states; 0 for stateless processes.
    pub fn k(&self) -> usize {
        self.k
    }

    /// The correlation statistic at the current step.
    ///
    /// `Σ_{i,j} map[i] map[j] N0[i][j] / samples`, defined as 1 before
    /// any member has been observed. Folds the ensemble into the sample
    /// count afterwards.
    pub fn observe_correlation(&mut self, map: &[i64]) -> f64 {
        let cor = if self.samples == 0 {
            1.0
        } else {
            let mut acc = 0.0;
            for i in 0..self.k {
                for j in 0..self.k {
                    acc += (map[i] * map[j]) as f64 * self.from_initial[(i, j)];
                }
            }
            acc / self.samples as f64
        };
        self.samples += self.n as u64;
        cor
    }

    /// Snapshots the current states into the previous-step buffer.
    pub fn snapshot_previous(&mut self) {
        self.previous.copy_from_slice(&self.states);
    }

    /// Books one member jump into the pair accumulators.
    pub fn record_jump(&mut self, member: usize, from: usize, to: usize, held: f64, hold: f64, next_jump: f64) {
        self.cum_hold[(from, to)] += held;
        self.cum_jumps[(from, to)] += 1.0;
        self.counts[member] += 1.0;
        self.states[member] = to;
        self.next_jump[member] = next_jump;
    }

    /// Books the per-step pair counters after all members have moved:
    /// from-initial, previous-to-current, and occupancy.
    pub fn tally_step(&mut self) {
        for m in 0..self.n {
            let cur = self.states[m];
            self.from_initial[(self.initial[m], cur)] += 1.0;
            self.transitions[(self.previous[m], cur)] += 1.0;
            self.occupancy[m][cur] += 1;
        }
    }
}
