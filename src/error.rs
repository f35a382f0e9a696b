use thiserror::Error;

/// Only [`OptimizerError::InvalidInput`] escapes the public `optimize`/
/// `reroute` entry points as an `Err`; every other variant is folded into a
/// `Solution` with `status = Error`/`NoSolution` by the caller.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    #[error("distance provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("no feasible solution: {0}")]
    NoSolution(String),

    #[error("solver timed out before a first solution was found")]
    Timeout,

    #[error("internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, OptimizerError>;
