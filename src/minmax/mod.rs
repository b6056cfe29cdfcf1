//! Min/max permutation test against control groups.
//!
//! For each control group C the test statistic is the extreme signed mean
//! difference against every other group G:
//!
//! ```text
//! greater: S_C = min_{G != C} (mean(C) - mean(G))
//! lesser:  S_C = max_{G != C} (mean(C) - mean(G))
//! ```
//!
//! A large `S_C` in greater mode means C beats *every* other group, not just
//! the average one. The null distribution comes from shuffling rows across
//! groups while keeping each group's size, and the p-value is the fraction
//! of shuffles strictly more extreme than the observed statistic.
//!
//! # Stages
//!
//! - [`observed_statistics`] — group means, [`DiffMatrix`], observed `S_C`
//! - [`PermutationEngine`] — shuffled relabelings into a [`NullTable`]
//! - [`p_values`] / [`empirical_p_value`] — one-sided empirical p-values
//! - [`MinMaxPermutation`] / [`minmax_permutation_test`] — all of the above
//!
//! # References
//!
//! - Good, P. (2005). *Permutation, Parametric, and Bootstrap Tests of
//!   Hypotheses*, 3rd ed. Springer.
//! - Phipson, B. & Smyth, G.K. (2010). "Permutation P-values Should Never Be
//!   Zero", *Statistical Applications in Genetics and Molecular Biology* 9(1).
//!   The `+1` correction discussed there is intentionally not applied here.

mod engine;
mod mode;
mod observed;
mod pvalue;
mod runner;

pub use engine::{Execution, NullTable, PermutationEngine};
pub use mode::Mode;
pub use observed::{observed_statistics, DiffMatrix, ObservedStatistics};
pub use pvalue::{empirical_p_value, p_values};
pub use runner::{minmax_permutation_test, MinMaxPermutation, MinMaxPermutationResult};
