//! Error type shared by every stage of the permutation test.
//!
//! All validation happens before the first permutation trial, so a returned
//! error always means no partial result was produced.

use thiserror::Error;

/// Errors raised while building a dataset or running a permutation test.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PermTestError {
    /// The comparison direction is neither `"greater"` nor `"lesser"`.
    #[error("invalid mode '{mode}': expected \"greater\" or \"lesser\"")]
    InvalidMode {
        /// The rejected mode string.
        mode: String,
    },

    /// A requested control group does not occur in the dataset.
    #[error("control group {group} not found among dataset groups")]
    UnknownControlGroup {
        /// `Debug` rendering of the missing group id.
        group: String,
    },

    /// No control groups were requested.
    #[error("at least one control group is required")]
    EmptyControlGroups,

    /// The dataset has fewer than two distinct groups.
    #[error("need at least 2 distinct groups, found {found}")]
    InsufficientGroups {
        /// Number of distinct groups present.
        found: usize,
    },

    /// The permutation count is zero.
    #[error("iteration count must be positive, got {iterations}")]
    InvalidIterationCount {
        /// The rejected iteration count.
        iterations: usize,
    },

    /// Parallel columns have different lengths.
    #[error("length mismatch: expected {expected} rows, found {found}")]
    LengthMismatch {
        /// Row count already established.
        expected: usize,
        /// Row count of the offending column.
        found: usize,
    },

    /// A measurement is NaN or infinite.
    #[error("non-finite value at row {row}")]
    NonFiniteValue {
        /// Zero-based row index.
        row: usize,
    },

    /// Summed value magnitudes are large enough for means or their
    /// differences to overflow.
    #[error("sum of absolute values exceeds f64::MAX / 2; group means could overflow")]
    MagnitudeOverflow,

    /// A column selector names a column the table does not have.
    #[error("unknown column '{name}'")]
    UnknownColumn {
        /// The requested column name.
        name: String,
    },

    /// A column exists but holds the wrong kind of data.
    #[error("column '{name}' is not a {expected} column")]
    ColumnType {
        /// The column name.
        name: String,
        /// The kind the caller asked for (`"label"` or `"numeric"`).
        expected: &'static str,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PermTestError>;

impl PermTestError {
    pub(crate) fn unknown_group<G: std::fmt::Debug>(group: &G) -> Self {
        Self::UnknownControlGroup {
            group: format!("{group:?}"),
        }
    }
}
