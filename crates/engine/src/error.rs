//! Error types for the kronos-engine crate.

use kronos_chain::ChainError;
use kronos_process::ProcessError;

/// Error type for all fallible operations in the kronos-engine crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// A transition specification failed to resolve.
    #[error("configuration: {0}")]
    Chain(#[from] ChainError),

    /// A process kernel or emission model failed to build.
    #[error("process: {0}")]
    Process(#[from] ProcessError),

    /// An engine option is out of its valid range.
    #[error("invalid option {name}: {reason}")]
    InvalidOption {
        /// Option name.
        name: &'static str,
        /// What was expected.
        reason: String,
    },

    /// Continuous-time mode was requested without jump-rate amplitudes.
    #[error("continuous-time mode requires a rate-amplitude process specification")]
    MissingJumpRates,

    /// The Bayesian network shape does not cover the ensemble.
    #[error("bayes network has {nodes} parent sets for {members} ensemble members")]
    BayesSizeMismatch {
        /// Parent sets provided.
        nodes: usize,
        /// Ensemble size.
        members: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            EngineError::MissingJumpRates.to_string(),
            "continuous-time mode requires a rate-amplitude process specification"
        );
        assert_eq!(
            EngineError::BayesSizeMismatch {
                nodes: 3,
                members: 5
            }
            .to_string(),
            "bayes network has 3 parent sets for 5 ensemble members"
        );
    }

    #[test]
    fn chain_errors_convert() {
        let e: EngineError = ChainError::EmptyMatrix.into();
        assert!(matches!(e, EngineError::Chain(_)));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync + std::error::Error>() {}
        assert_impl::<EngineError>();
    }
}
