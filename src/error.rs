use thiserror::Error;

/// Precondition violations of the simplification core.
///
/// Non-convergence is not an error; it is reported through
/// [`crate::pipeline::SimplificationOutcome::converged`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimplifyError {
    #[error("kept mask has {mask} slots but the node sequence has {nodes} nodes")]
    MaskLengthMismatch { mask: usize, nodes: usize },
    #[error("span [{start}, {end}] is not valid for a node sequence of length {len}")]
    InvalidSpan { start: usize, end: usize, len: usize },
    #[error("endpoint slot {index} of the kept mask must be populated before reduction")]
    UnpopulatedEndpoint { index: usize },
    #[error("epsilon must be a positive number of metres, got {0}")]
    InvalidEpsilon(f64),
    #[error("the iteration budget must allow at least one pass")]
    InvalidIterations,
}
