//! Error types for nmfrec operations.
//!
//! Provides rich error context for library consumers.

use std::fmt;

/// Main error type for nmfrec operations.
///
/// Covers shape problems, bad hyperparameters, use of unfitted estimators,
/// search failures and artifact I/O.
///
/// # Examples
///
/// ```
/// use nmfrec::error::NmfRecError;
///
/// let err = NmfRecError::NotFitted {
///     estimator: "NmfRecommender".to_string(),
/// };
/// assert!(err.to_string().contains("not fitted"));
/// ```
#[derive(Debug)]
pub enum NmfRecError {
    /// Matrix dimensions don't match for the operation.
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Invalid hyperparameter value provided.
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// `predict`/`transform` called before `fit`.
    NotFitted {
        /// Estimator or transformer name
        estimator: String,
    },

    /// Input data failed validation (negative entries, NaN, empty matrix).
    ValidationError {
        /// Validation failure message
        message: String,
    },

    /// Every candidate of a hyperparameter search failed.
    SearchFailed {
        /// Number of candidates evaluated
        candidates: usize,
        /// Last failure observed
        last_error: String,
    },

    /// I/O error (file not found, permission denied, etc.).
    Io(std::io::Error),

    /// Serialization/deserialization error.
    Serialization(String),

    /// Invalid or corrupt artifact.
    FormatError {
        /// Error description
        message: String,
    },

    /// Unsupported artifact format version.
    UnsupportedVersion {
        /// Version found
        found: (u8, u8),
        /// Maximum supported version
        supported: (u8, u8),
    },

    /// Checksum verification failed.
    ChecksumMismatch {
        /// Expected checksum
        expected: u32,
        /// Actual checksum
        actual: u32,
    },

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for NmfRecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NmfRecError::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "Matrix dimension mismatch: expected {expected}, got {actual}"
                )
            }
            NmfRecError::InvalidHyperparameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid hyperparameter: {param} = {value}, expected {constraint}"
                )
            }
            NmfRecError::NotFitted { estimator } => {
                write!(f, "{estimator} is not fitted yet. Call fit() first")
            }
            NmfRecError::ValidationError { message } => {
                write!(f, "Validation failed: {message}")
            }
            NmfRecError::SearchFailed {
                candidates,
                last_error,
            } => {
                write!(
                    f,
                    "All {candidates} candidates failed to fit; last error: {last_error}"
                )
            }
            NmfRecError::Io(e) => write!(f, "I/O error: {e}"),
            NmfRecError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            NmfRecError::FormatError { message } => {
                write!(f, "Invalid artifact format: {message}")
            }
            NmfRecError::UnsupportedVersion { found, supported } => {
                write!(
                    f,
                    "Unsupported format version: found {}.{}, max supported {}.{}",
                    found.0, found.1, supported.0, supported.1
                )
            }
            NmfRecError::ChecksumMismatch { expected, actual } => {
                write!(
                    f,
                    "Checksum mismatch: expected 0x{expected:08X}, got 0x{actual:08X}"
                )
            }
            NmfRecError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for NmfRecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NmfRecError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NmfRecError {
    fn from(err: std::io::Error) -> Self {
        NmfRecError::Io(err)
    }
}

impl From<&str> for NmfRecError {
    fn from(msg: &str) -> Self {
        NmfRecError::Other(msg.to_string())
    }
}

impl From<String> for NmfRecError {
    fn from(msg: String) -> Self {
        NmfRecError::Other(msg)
    }
}

impl From<bincode::Error> for NmfRecError {
    fn from(err: bincode::Error) -> Self {
        NmfRecError::Serialization(err.to_string())
    }
}

impl NmfRecError {
    /// Create a shape mismatch error from two `(rows, cols)` pairs
    #[must_use]
    pub fn shape_mismatch(expected: (usize, usize), actual: (usize, usize)) -> Self {
        Self::DimensionMismatch {
            expected: format!("{}x{}", expected.0, expected.1),
            actual: format!("{}x{}", actual.0, actual.1),
        }
    }

    /// Create a column-count mismatch error
    #[must_use]
    pub fn feature_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{expected} features"),
            actual: format!("{actual} features"),
        }
    }

    /// Create a not-fitted error for the named estimator
    #[must_use]
    pub fn not_fitted(estimator: &str) -> Self {
        Self::NotFitted {
            estimator: estimator.to_string(),
        }
    }

    /// Create an invalid hyperparameter error
    #[must_use]
    pub fn invalid_param(param: &str, value: impl fmt::Display, constraint: &str) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    /// Returns true for the not-fitted precondition failure.
    #[must_use]
    pub fn is_not_fitted(&self) -> bool {
        matches!(self, Self::NotFitted { .. })
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, NmfRecError>;
