//! Error handling module for commflag

use thiserror::Error;

use crate::domain::errors::{
    ConsumerError, DomainError, LookupError, PipelineError, SourceError,
};

/// Exit code for a successful run
pub const EXIT_OK: u8 = 0;
/// Exit code for any failure without a dedicated code
pub const EXIT_FAILURE: u8 = 1;
/// No input given, or the job has no recording data
pub const EXIT_NO_RECORDING: u8 = 3;
pub const EXIT_SOURCE_NOT_FOUND: u8 = 4;
/// Zero-length or undecodable source
pub const EXIT_SOURCE_UNUSABLE: u8 = 5;

/// Main error type for commflag operations
#[derive(Error, Debug)]
pub enum CommFlagError {
    /// Neither a file nor a job was given, or the job is unknown
    #[error("No recording data: {message}")]
    NoRecordingData { message: String },

    #[error(transparent)]
    Source(#[from] SourceError),

    /// A consumer or the producer died during the run
    #[error("Analysis failed: {message}")]
    Analysis { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] DomainError),

    /// Report could not be written
    #[error("Failed to write output: {message}")]
    OutputError { message: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CommFlagError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            CommFlagError::NoRecordingData { .. } => EXIT_NO_RECORDING,
            CommFlagError::Source(SourceError::SourceNotFound { .. }) => EXIT_SOURCE_NOT_FOUND,
            CommFlagError::Source(SourceError::SourceEmpty { .. })
            | CommFlagError::Source(SourceError::DecoderUnavailable { .. }) => EXIT_SOURCE_UNUSABLE,
            _ => EXIT_FAILURE,
        }
    }
}

impl From<PipelineError> for CommFlagError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Source(source) => CommFlagError::Source(source),
            other => CommFlagError::Analysis {
                message: other.to_string(),
            },
        }
    }
}

impl From<ConsumerError> for CommFlagError {
    fn from(err: ConsumerError) -> Self {
        CommFlagError::Analysis {
            message: err.to_string(),
        }
    }
}

impl From<LookupError> for CommFlagError {
    fn from(err: LookupError) -> Self {
        CommFlagError::NoRecordingData {
            message: err.to_string(),
        }
    }
}

/// Result type alias for commflag operations
pub type CommFlagResult<T> = std::result::Result<T, CommFlagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let not_found: CommFlagError = SourceError::SourceNotFound {
            identifier: "x".into(),
        }
        .into();
        assert_eq!(not_found.exit_code(), EXIT_SOURCE_NOT_FOUND);

        let empty: CommFlagError = PipelineError::Source(SourceError::SourceEmpty {
            identifier: "x".into(),
        })
        .into();
        assert_eq!(empty.exit_code(), EXIT_SOURCE_UNUSABLE);

        let job: CommFlagError = LookupError::NotFound(9).into();
        assert_eq!(job.exit_code(), EXIT_NO_RECORDING);

        let run: CommFlagError = PipelineError::AlreadyRun.into();
        assert_eq!(run.exit_code(), EXIT_FAILURE);
    }
}
