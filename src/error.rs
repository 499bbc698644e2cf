use std::io;

/// Errors raised while factoring a single value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactorError {
    #[error("cannot factor {0}: only integers greater than 1 have prime factors")]
    InvalidInput(i64),

    #[error("cannot factor {value}: values above {max} are not supported")]
    OutOfRange { value: i64, max: i64 },

    #[error("{value} has more than {limit} prime factors")]
    ResourceExhaustion { value: i64, limit: usize },

    #[error("verification failed for {value}: {reason}")]
    Verification { value: i64, reason: String },
}

/// Errors reported by a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Factor(#[from] FactorError),

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("{task} thread failed to terminate cleanly: {reason}")]
    TaskJoinFailure { task: &'static str, reason: String },

    #[error("failed to spawn {task} thread: {source}")]
    Spawn {
        task: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
