//! Domain error types.
//!
//! The signal engine and risk manager never return these: their faults degrade
//! to a reasoned HOLD or a missing trade plan. Errors here surface from loading
//! configuration, reading data and starting a simulator run.

/// Failure reported by a probability model at inference time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("feature {column} is not available")]
    MissingFeature { column: String },

    #[error("feature {column} is not finite")]
    NonFinite { column: String },

    #[error("model produced {value}, outside [0, 1]")]
    OutOfRange { value: f64 },

    #[error("prediction failed: {reason}")]
    Predict { reason: String },
}

/// Top-level error type for sigtrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol} ({timeframe})")]
    NoData { symbol: String, timeframe: String },

    #[error("insufficient data: have {bars} bars, need more than {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("model error: {reason}")]
    Model { reason: String },

    #[error("run for {label} panicked: {reason}")]
    RunPanicked { label: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) | TraderError::RunPanicked { .. } => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. } => 2,
            TraderError::Data { .. } => 3,
            TraderError::Model { .. } => 4,
            TraderError::NoData { .. } | TraderError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
