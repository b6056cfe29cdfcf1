//! Orchestration: validation, observed statistic, trials, aggregation.

use std::collections::BTreeMap;
use std::fmt::Debug;

use rand::Rng;

use super::engine::{Execution, NullTable, PermutationEngine};
use super::observed::{resolve_controls, ObservedStatistics};
use super::pvalue::p_values;
use super::Mode;
use crate::dataset::{Dataset, Table};
use crate::error::{PermTestError, Result};

/// Output of a min/max permutation test.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxPermutationResult<G> {
    /// Null distribution: `iterations` rows, one column per control group.
    pub null_table: NullTable<G>,
    /// Empirical one-sided p-value per control group.
    pub p_values: BTreeMap<G, f64>,
    /// Observed directional statistic per control group.
    pub observed: BTreeMap<G, f64>,
}

/// Configured min/max permutation test.
///
/// # Examples
///
/// ```
/// use u_permtest::dataset::Dataset;
/// use u_permtest::minmax::{Execution, MinMaxPermutation, Mode};
///
/// let data = Dataset::from_pairs([
///     ("ctrl", 9.0), ("ctrl", 9.5), ("ctrl", 10.0), ("ctrl", 9.8),
///     ("x", 1.0), ("x", 1.5), ("x", 0.5), ("x", 1.2),
///     ("y", 2.0), ("y", 1.8), ("y", 2.2), ("y", 1.9),
/// ]).unwrap();
///
/// let test = MinMaxPermutation::new(Mode::Greater, 2000)
///     .unwrap()
///     .seed(7)
///     .execution(Execution::Parallel);
/// let result = test.run(&data, &["ctrl"]).unwrap();
///
/// assert_eq!(result.null_table.n_rows(), 2000);
/// assert!(result.p_values["ctrl"] < 0.01);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxPermutation {
    mode: Mode,
    iterations: usize,
    seed: Option<u64>,
    execution: Execution,
}

impl MinMaxPermutation {
    /// Creates a sequential, entropy-seeded test.
    ///
    /// # Errors
    ///
    /// [`PermTestError::InvalidIterationCount`] if `iterations` is 0.
    pub fn new(mode: Mode, iterations: usize) -> Result<Self> {
        if iterations == 0 {
            return Err(PermTestError::InvalidIterationCount { iterations });
        }
        Ok(Self {
            mode,
            iterations,
            seed: None,
            execution: Execution::Sequential,
        })
    }

    /// Fixes the base seed so results are reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Selects how trials are scheduled.
    pub fn execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    /// Comparison direction.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of permutation trials.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Runs the test.
    ///
    /// Uses the configured seed, or a fresh one from OS-seeded entropy.
    ///
    /// # Errors
    ///
    /// See [`observed_statistics`](super::observed_statistics); every check
    /// runs before the first trial.
    pub fn run<G>(
        &self,
        dataset: &Dataset<G>,
        controls: &[G],
    ) -> Result<MinMaxPermutationResult<G>>
    where
        G: Ord + Clone + Debug,
    {
        let seed = self.seed.unwrap_or_else(rand::random);
        self.run_seeded(dataset, controls, seed)
    }

    /// Runs the test, drawing the base seed from `rng`.
    ///
    /// Exactly one `u64` is drawn from `rng`, after validation succeeds. A
    /// configured [`seed`](Self::seed) is ignored.
    pub fn run_with_rng<G, R>(
        &self,
        dataset: &Dataset<G>,
        controls: &[G],
        rng: &mut R,
    ) -> Result<MinMaxPermutationResult<G>>
    where
        G: Ord + Clone + Debug,
        R: Rng + ?Sized,
    {
        self.execute(dataset, controls, || rng.gen())
    }

    fn run_seeded<G>(
        &self,
        dataset: &Dataset<G>,
        controls: &[G],
        seed: u64,
    ) -> Result<MinMaxPermutationResult<G>>
    where
        G: Ord + Clone + Debug,
    {
        self.execute(dataset, controls, || seed)
    }

    fn execute<G, F>(
        &self,
        dataset: &Dataset<G>,
        controls: &[G],
        draw_seed: F,
    ) -> Result<MinMaxPermutationResult<G>>
    where
        G: Ord + Clone + Debug,
        F: FnOnce() -> u64,
    {
        let index = dataset.group_index();
        let positions = resolve_controls(&index, controls)?;

        let observed =
            ObservedStatistics::from_index(&index, dataset.values(), &positions, self.mode)
                .into_statistics();
        tracing::debug!(
            rows = dataset.len(),
            groups = index.len(),
            mode = %self.mode,
            ?observed,
            "observed statistics computed"
        );

        let engine =
            PermutationEngine::from_index(&index, dataset.values(), positions, self.mode);
        let null_table = engine.run(self.iterations, draw_seed(), self.execution)?;
        let p_values = p_values(&null_table, &observed, self.mode);

        Ok(MinMaxPermutationResult {
            null_table,
            p_values,
            observed,
        })
    }
}

/// Min/max permutation test on a named-column table.
///
/// Selects `group_col` and `value_col` from `table`, parses `mode`
/// (`"greater"` or `"lesser"`), and runs `iterations` trials seeded from `rng`.
///
/// # Errors
///
/// [`PermTestError::InvalidMode`], [`PermTestError::InvalidIterationCount`],
/// any column selection error from [`Table::select`], and the grouping errors
/// of [`MinMaxPermutation::run`]. No trial runs if any check fails.
///
/// # Examples
///
/// ```
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
/// use u_permtest::dataset::Table;
/// use u_permtest::minmax::minmax_permutation_test;
///
/// let table = Table::new()
///     .with_labels("group", ["A", "A", "A", "B", "B", "B", "C", "C", "C"])
///     .unwrap()
///     .with_values("value", vec![1.0, 1.0, 1.0, 10.0, 10.0, 10.0, 5.0, 5.0, 5.0])
///     .unwrap();
///
/// let mut rng = ChaCha8Rng::seed_from_u64(42);
/// let r = minmax_permutation_test(&table, &["A"], "group", "value", "greater", 1000, &mut rng)
///     .unwrap();
/// assert_eq!(r.observed["A"], -9.0);
/// assert!(r.p_values["A"] > 0.95);
/// ```
pub fn minmax_permutation_test<R>(
    table: &Table,
    control_groups: &[&str],
    group_col: &str,
    value_col: &str,
    mode: &str,
    iterations: usize,
    rng: &mut R,
) -> Result<MinMaxPermutationResult<String>>
where
    R: Rng + ?Sized,
{
    let test = MinMaxPermutation::new(mode.parse()?, iterations)?;
    let dataset = table.select(group_col, value_col)?;
    let controls: Vec<String> = control_groups.iter().map(|g| g.to_string()).collect();
    test.run_with_rng(&dataset, &controls, rng)
}
