//! Error types for the kronos-chain crate.

/// Error type for all fallible operations in the kronos-chain crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainError {
    /// Returned when a transition specification resolves to zero states.
    #[error("transition specification has no states")]
    EmptyMatrix,

    /// Returned when a dense matrix input is not square.
    #[error("transition matrix is not square: {rows} rows, {cols} columns")]
    NotSquare {
        /// Number of rows provided.
        rows: usize,
        /// Number of columns provided.
        cols: usize,
    },

    /// Returned when a row does not sum to 1 within tolerance.
    #[error("row {row} sums to {sum}, expected 1 within {tol}")]
    RowSumViolation {
        /// Zero-based row index.
        row: usize,
        /// Observed row sum.
        sum: f64,
        /// Tolerance applied.
        tol: f64,
    },

    /// Returned when a matrix entry is NaN or infinite.
    #[error("entry ({row}, {col}) is not finite: {value}")]
    NonFiniteEntry {
        /// Zero-based row index.
        row: usize,
        /// Zero-based column index.
        col: usize,
        /// The offending value.
        value: f64,
    },

    /// Returned when a probability entry is outside `[0, 1]`.
    #[error("entry ({row}, {col}) = {value} is outside [0, 1]")]
    OutOfRangeEntry {
        /// Zero-based row index.
        row: usize,
        /// Zero-based column index.
        col: usize,
        /// The offending value.
        value: f64,
    },

    /// Returned when an upper-triangular list length does not correspond to
    /// an integer state count `K` with `K(K-1)/2` entries.
    #[error("{n} upper-triangular entries do not correspond to an integer state count")]
    RateCountMismatch {
        /// Number of entries provided.
        n: usize,
    },

    /// Returned when a composite sparse key has the wrong number of parts.
    #[error("composite key \"{key}\" has {arity} parts, expected {expected}")]
    KeyArityMismatch {
        /// The offending key.
        key: String,
        /// Number of comma-separated parts found.
        arity: usize,
        /// Expected number of parts.
        expected: usize,
    },

    /// Returned when a sparse key cannot be parsed as indices.
    #[error("cannot parse composite key \"{key}\"")]
    BadCompositeKey {
        /// The offending key.
        key: String,
    },

    /// Returned when a parsed state index falls outside `[0, states)`.
    #[error("state index {index} out of bounds for {states} states")]
    StateIndexOutOfBounds {
        /// The parsed index.
        index: usize,
        /// Number of states in the chain.
        states: usize,
    },

    /// Returned when grid dimensions disagree with the declared state count.
    #[error("grid dimensions produce {product} states, but {states} were declared")]
    DimensionMismatch {
        /// Product of the grid dimensions.
        product: usize,
        /// Declared state count.
        states: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            ChainError::EmptyMatrix.to_string(),
            "transition specification has no states"
        );
        assert_eq!(
            ChainError::NotSquare { rows: 2, cols: 3 }.to_string(),
            "transition matrix is not square: 2 rows, 3 columns"
        );
        assert_eq!(
            ChainError::RateCountMismatch { n: 4 }.to_string(),
            "4 upper-triangular entries do not correspond to an integer state count"
        );
        assert_eq!(
            ChainError::KeyArityMismatch {
                key: "0,1".into(),
                arity: 2,
                expected: 3
            }
            .to_string(),
            "composite key \"0,1\" has 2 parts, expected 3"
        );
        assert_eq!(
            ChainError::StateIndexOutOfBounds {
                index: 7,
                states: 3
            }
            .to_string(),
            "state index 7 out of bounds for 3 states"
        );
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync + std::error::Error>() {}
        assert_impl::<ChainError>();
    }
}
