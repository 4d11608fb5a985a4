use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored record is malformed: {0}")]
    Malformed(String),
    #[cfg(test)]
    #[error("{0}")]
    Unavailable(String),
}

/// Rejections raised before any computation or write happens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter values for: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("Values must be between 0 and 100: {}", .0.join(", "))]
    OutOfRange(Vec<String>),
    #[error("Year {0} has no configured subjects")]
    UnsupportedYear(u32),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to save submission: {0}")]
    Persistence(#[from] StoreError),
}

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("{band} {axis} threshold must be between 0 and 100, got {value}")]
    OutOfRange {
        band: &'static str,
        axis: &'static str,
        value: f64,
    },
    #[error("{axis} thresholds must satisfy high risk <= risk <= low risk")]
    Unordered { axis: &'static str },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Invalid(#[from] ThresholdError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
