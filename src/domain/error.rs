//! Domain error types.

/// Top-level error type for aptfit.
#[derive(Debug, thiserror::Error)]
pub enum AptError {
    #[error("data store error: {reason}")]
    DataStore { reason: String },

    #[error("data query error: {reason}")]
    DataQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient observations: have {observations}, need at least {parameters}")]
    InsufficientObservations {
        observations: usize,
        parameters: usize,
    },

    #[error("design matrix is singular (rank {rank} of {parameters})")]
    SingularDesign { rank: usize, parameters: usize },

    #[error("invalid window {window}: {reason}")]
    InvalidWindow { window: usize, reason: String },

    #[error("invalid scenario: {reason}")]
    InvalidScenario { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&AptError> for std::process::ExitCode {
    fn from(err: &AptError) -> Self {
        let code: u8 = match err {
            AptError::Io(_) => 1,
            AptError::ConfigParse { .. }
            | AptError::ConfigMissing { .. }
            | AptError::ConfigInvalid { .. }
            | AptError::InvalidScenario { .. } => 2,
            AptError::DataStore { .. } | AptError::DataQuery { .. } => 3,
            AptError::InsufficientObservations { .. }
            | AptError::SingularDesign { .. }
            | AptError::InvalidWindow { .. } => 4,
            AptError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::ExitCode;

    #[test]
    fn display_names_section_and_key() {
        let err = AptError::ConfigMissing {
            section: "analysis".into(),
            key: "assets".into(),
        };
        assert_eq!(err.to_string(), "missing config key [analysis] assets");
    }

    #[test]
    fn model_errors_share_exit_code() {
        let singular = AptError::SingularDesign {
            rank: 1,
            parameters: 3,
        };
        let short = AptError::InsufficientObservations {
            observations: 2,
            parameters: 3,
        };
        assert_eq!(ExitCode::from(&singular), ExitCode::from(4));
        assert_eq!(ExitCode::from(&short), ExitCode::from(4));
    }

    #[test]
    fn io_error_converts() {
        let err: AptError = std::io::Error::other("boom").into();
        assert!(matches!(err, AptError::Io(_)));
        assert_eq!(ExitCode::from(&err), ExitCode::from(1));
    }
}
