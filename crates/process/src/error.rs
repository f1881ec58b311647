//! Error types for the kronos-process crate.

/// Error type for all fallible operations in the kronos-process crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProcessError {
    /// Returned when a stateless process is configured with discrete states.
    #[error("stateless process cannot be combined with {k} discrete states")]
    StatelessWithStates {
        /// Declared state count.
        k: usize,
    },

    /// Returned when eigenvalue and eigenvector counts disagree.
    #[error("{values} eigenvalues but {vectors} eigenvectors")]
    EigenShapeMismatch {
        /// Number of eigenvalues.
        values: usize,
        /// Number of eigenvectors.
        vectors: usize,
    },

    /// Returned when an eigenvector is shorter than the temporal dimension.
    #[error("eigenvector {index} has {len} entries, need at least {dim}")]
    EigenvectorTooShort {
        /// Eigenvector index.
        index: usize,
        /// Entries present.
        len: usize,
        /// Temporal dimension required.
        dim: usize,
    },

    /// Returned when a scalar parameter is out of its valid range.
    #[error("parameter {name} = {value} is invalid: {reason}")]
    BadParameter {
        /// Parameter name.
        name: &'static str,
        /// The offending value.
        value: f64,
        /// What was expected.
        reason: &'static str,
    },

    /// Returned when emission weights do not match the grid dimensionality.
    #[error("{weights} weights provided for a {dims}-dimensional grid")]
    WeightDimensionMismatch {
        /// Number of weights provided.
        weights: usize,
        /// Grid dimensionality.
        dims: usize,
    },

    /// Returned when explicit moments disagree in shape.
    #[error("moment shapes disagree: {reason}")]
    MomentShapeMismatch {
        /// Description of the inconsistency.
        reason: String,
    },

    /// Returned when a covariance cannot be factorized.
    #[error("covariance for component {component} is not positive definite")]
    NotPositiveDefinite {
        /// Component index.
        component: usize,
    },

    /// Returned when a fit is requested over no observations.
    #[error("observation list is empty")]
    EmptyObservations,

    /// Returned when the component count is impossible for the data.
    #[error("cannot fit {k} components to {n} observations")]
    BadComponentCount {
        /// Requested component count.
        k: usize,
        /// Observations available.
        n: usize,
    },

    /// Returned when observations have inconsistent dimensionality.
    #[error("observation {index} has dimension {got}, expected {expected}")]
    ObservationDimensionMismatch {
        /// Observation index.
        index: usize,
        /// Dimension found.
        got: usize,
        /// Dimension expected.
        expected: usize,
    },
}
