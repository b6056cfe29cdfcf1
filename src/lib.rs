//! # u-permtest
//!
//! Min/max permutation tests comparing control-group means against every
//! other group in a dataset.
//!
//! The crate operates on raw `(label, f64)` rows and knows nothing about
//! where the data came from; loading files is left to the caller.
//!
//! ## Modules
//!
//! - [`dataset`] — Validated grouped rows and named-column tables
//! - [`minmax`] — Observed statistic, permutation engine, empirical p-values
//! - [`error`] — Error type shared by all stages
//!
//! ## Design Philosophy
//!
//! - **Fail fast**: every input check runs before the first permutation
//! - **Reproducible**: randomness is injected or seeded, never global state
//! - **Numerical stability**: group means via `u-numflow`'s compensated summation
//!
//! # Examples
//!
//! ```
//! use u_permtest::dataset::Dataset;
//! use u_permtest::minmax::{MinMaxPermutation, Mode};
//!
//! let data = Dataset::from_pairs([
//!     ("A", 1.0), ("A", 1.0), ("A", 1.0),
//!     ("B", 10.0), ("B", 10.0), ("B", 10.0),
//!     ("C", 5.0), ("C", 5.0), ("C", 5.0),
//! ]).unwrap();
//!
//! let result = MinMaxPermutation::new(Mode::Greater, 1000)
//!     .unwrap()
//!     .seed(42)
//!     .run(&data, &["A"])
//!     .unwrap();
//! assert_eq!(result.observed["A"], -9.0);
//! assert!(result.p_values["A"] > 0.95);
//! ```

pub mod dataset;
pub mod error;
pub mod minmax;

pub use error::{PermTestError, Result};
