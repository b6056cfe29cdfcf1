//! Permutation engine: null distribution of the min/max statistic.
//!
//! # Algorithm
//!
//! For each trial:
//!
//! 1. Shuffle the row indices `0..n` (Fisher-Yates, no replacement).
//! 2. Cut the shuffled sequence into contiguous blocks whose lengths are the
//!    original group sizes, in ascending label order.
//! 3. Average the original values over each block.
//! 4. Recompute the directional statistic of each control block against
//!    every other block.
//!
//! Group sizes are preserved exactly, so under H₀ (labels exchangeable with
//! respect to value) every relabeling is equally likely.
//!
//! # Random streams
//!
//! Trial `i` draws from `ChaCha8Rng::seed_from_u64(seed)` switched to stream
//! `i`. A trial's randomness therefore depends only on `(seed, i)`, which
//! makes [`Execution::Sequential`] and [`Execution::Parallel`] produce
//! identical tables.

use std::fmt::Debug;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use super::observed::{block_mean, resolve_controls};
use super::Mode;
use crate::dataset::{Dataset, GroupIndex};
use crate::error::{PermTestError, Result};

/// How trials are scheduled.
///
/// Both strategies return bit-identical tables for the same seed; only the
/// scheduling differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    /// One trial after another on the calling thread.
    #[default]
    Sequential,
    /// Trials spread over the rayon global thread pool.
    Parallel,
}

/// Null-distribution samples: one row per trial, one column per control group.
///
/// A cell is `None` when the statistic is undefined for that trial.
#[derive(Debug, Clone, PartialEq)]
pub struct NullTable<G> {
    columns: Vec<G>,
    rows: Vec<Vec<Option<f64>>>,
}

impl<G: Ord> NullTable<G> {
    pub(crate) fn new(columns: Vec<G>, rows: Vec<Vec<Option<f64>>>) -> Self {
        Self { columns, rows }
    }

    /// Control groups, ascending. Column `j` of every row belongs to `columns()[j]`.
    pub fn columns(&self) -> &[G] {
        &self.columns
    }

    /// Number of trials.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of control groups.
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// All trial rows.
    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.rows
    }

    /// Samples of column `j`, in trial order.
    pub fn column_at(&self, j: usize) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(move |row| row.get(j).copied().flatten())
    }

    /// Samples of the column for `group`, if it is a control group.
    pub fn column(&self, group: &G) -> Option<impl Iterator<Item = Option<f64>> + '_> {
        let j = self.columns.binary_search(group).ok()?;
        Some(self.column_at(j))
    }

    /// Number of defined (non-missing) cells in column `j`.
    pub fn defined_count(&self, j: usize) -> usize {
        self.column_at(j).flatten().count()
    }
}

/// Generates permutation trials for a fixed grouping.
///
/// # Examples
///
/// ```
/// use u_permtest::dataset::Dataset;
/// use u_permtest::minmax::{Execution, Mode, PermutationEngine};
///
/// let data = Dataset::from_pairs([("a", 1.0), ("a", 2.0), ("b", 3.0), ("b", 4.0)]).unwrap();
/// let engine = PermutationEngine::new(&data, &["b"], Mode::Lesser).unwrap();
/// let table = engine.run(50, 1, Execution::Sequential).unwrap();
/// assert_eq!(table.n_rows(), 50);
/// assert_eq!(table.columns(), &["b"]);
/// ```
#[derive(Debug, Clone)]
pub struct PermutationEngine<'a, G> {
    columns: Vec<G>,
    sizes: Vec<usize>,
    values: &'a [f64],
    controls: Vec<usize>,
    mode: Mode,
}

impl<'a, G: Ord + Clone + Debug> PermutationEngine<'a, G> {
    /// Creates an engine for `controls` over the groups of `dataset`.
    ///
    /// # Errors
    ///
    /// - [`PermTestError::EmptyControlGroups`] if `controls` is empty.
    /// - [`PermTestError::InsufficientGroups`] if the dataset has fewer than 2 groups.
    /// - [`PermTestError::UnknownControlGroup`] for a control absent from the data.
    pub fn new(dataset: &'a Dataset<G>, controls: &[G], mode: Mode) -> Result<Self> {
        let index = dataset.group_index();
        let positions = resolve_controls(&index, controls)?;
        Ok(Self::from_index(&index, dataset.values(), positions, mode))
    }

    /// `controls` must be ascending positions into `index.keys()`, and
    /// `values` must be the rows `index` was built from.
    pub(crate) fn from_index(
        index: &GroupIndex<G>,
        values: &'a [f64],
        controls: Vec<usize>,
        mode: Mode,
    ) -> Self {
        let columns = controls.iter().map(|&c| index.keys()[c].clone()).collect();
        Self {
            columns,
            sizes: index.sizes().to_vec(),
            values,
            controls,
            mode,
        }
    }

    /// Control groups, ascending; the column order of every trial.
    pub fn columns(&self) -> &[G] {
        &self.columns
    }

    /// Runs one trial with the given generator.
    ///
    /// Returns one entry per control group, in [`columns`](Self::columns) order.
    pub fn trial<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Option<f64>> {
        self.relabeling().trial(rng)
    }

    /// Runs `iterations` trials seeded from `seed`.
    ///
    /// Row `i` of the result is trial `i` regardless of `execution`.
    ///
    /// # Errors
    ///
    /// [`PermTestError::InvalidIterationCount`] if `iterations` is 0.
    pub fn run(
        &self,
        iterations: usize,
        seed: u64,
        execution: Execution,
    ) -> Result<NullTable<G>> {
        if iterations == 0 {
            return Err(PermTestError::InvalidIterationCount { iterations });
        }
        tracing::debug!(
            iterations,
            groups = self.sizes.len(),
            controls = self.controls.len(),
            ?execution,
            "running permutation trials"
        );

        let relabeling = self.relabeling();
        let trial_at = |i: usize| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(i as u64);
            relabeling.trial(&mut rng)
        };

        let rows = match execution {
            Execution::Sequential => (0..iterations).map(trial_at).collect(),
            Execution::Parallel => (0..iterations).into_par_iter().map(trial_at).collect(),
        };
        Ok(NullTable::new(self.columns.clone(), rows))
    }

    fn relabeling(&self) -> Relabeling<'_> {
        Relabeling {
            sizes: &self.sizes,
            values: self.values,
            controls: &self.controls,
            mode: self.mode,
        }
    }
}

/// Label-free view of an engine, shared across worker threads.
#[derive(Clone, Copy)]
struct Relabeling<'a> {
    sizes: &'a [usize],
    values: &'a [f64],
    controls: &'a [usize],
    mode: Mode,
}

impl Relabeling<'_> {
    fn trial<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Option<f64>> {
        let mut perm: Vec<usize> = (0..self.values.len()).collect();
        perm.shuffle(rng);

        let mut buf = Vec::new();
        let means: Vec<f64> = partition(&perm, self.sizes)
            .into_iter()
            .map(|block| block_mean(self.values, block, &mut buf))
            .collect();

        self.controls
            .iter()
            .map(|&c| {
                let mc = means[c];
                self.mode.extreme(
                    means
                        .iter()
                        .enumerate()
                        .filter(|&(j, _)| j != c)
                        .map(|(_, &m)| mc - m),
                )
            })
            .collect()
    }
}

/// Splits `perm` into consecutive blocks of the given sizes.
pub(crate) fn partition<'p>(perm: &'p [usize], sizes: &[usize]) -> Vec<&'p [usize]> {
    let mut blocks = Vec::with_capacity(sizes.len());
    let mut start = 0;
    for &n in sizes {
        blocks.push(&perm[start..start + n]);
        start += n;
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    fn two_groups() -> Dataset<char> {
        Dataset::from_pairs([
            ('a', 0.0),
            ('a', 1.0),
            ('b', 2.0),
            ('b', 3.0),
            ('b', 4.0),
        ])
        .unwrap()
    }

    #[test]
    fn partition_preserves_sizes() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let sizes = [3, 1, 4, 2];
        for _ in 0..50 {
            let mut perm: Vec<usize> = (0..10).collect();
            perm.shuffle(&mut rng);
            let blocks = partition(&perm, &sizes);
            let lens: Vec<usize> = blocks.iter().map(|b| b.len()).collect();
            assert_eq!(lens, sizes);

            let mut all: Vec<usize> = blocks.concat();
            all.sort_unstable();
            assert_eq!(all, (0..10).collect::<Vec<_>>());
        }
    }

    #[test]
    fn trial_excludes_self_comparison() {
        let data = two_groups();
        let engine = PermutationEngine::new(&data, &['a', 'b'], Mode::Greater).unwrap();

        let table = engine.run(500, 11, Execution::Sequential).unwrap();
        let mut positive = 0;
        for row in table.rows() {
            let a = row[0].expect("two groups always have a peer");
            let b = row[1].expect("two groups always have a peer");
            assert!((a + b).abs() < 1e-12, "a = {a}, b = {b}");
            if a > 0.0 {
                positive += 1;
            }
        }
        // a self-difference of 0 would cap every greater-mode statistic at 0
        assert!(positive > 0);
    }

    #[test]
    fn run_is_reproducible() {
        let data = two_groups();
        let engine = PermutationEngine::new(&data, &['b'], Mode::Lesser).unwrap();
        let t1 = engine.run(200, 42, Execution::Sequential).unwrap();
        let t2 = engine.run(200, 42, Execution::Sequential).unwrap();
        assert_eq!(t1, t2);
        assert_eq!(t1.n_rows(), 200);
        assert_eq!(t1.columns(), &['b']);
    }

    #[test]
    fn parallel_matches_sequential() {
        let data = two_groups();
        let engine = PermutationEngine::new(&data, &['a', 'b'], Mode::Greater).unwrap();
        let seq = engine.run(300, 2024, Execution::Sequential).unwrap();
        let par = engine.run(300, 2024, Execution::Parallel).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn trial_means_use_all_rows() {
        // constant values: every relabeling gives identical means
        let data = Dataset::from_pairs([(1, 3.0), (1, 3.0), (2, 3.0), (3, 3.0)]).unwrap();
        let engine = PermutationEngine::new(&data, &[3, 1], Mode::Lesser).unwrap();
        assert_eq!(engine.columns(), &[1, 3]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(engine.trial(&mut rng), vec![Some(0.0), Some(0.0)]);
    }

    // -----------------------------------------------------------------------
    // Input validation
    // -----------------------------------------------------------------------

    #[test]
    fn engine_rejects_unknown_control() {
        let data = two_groups();
        let err = PermutationEngine::new(&data, &['z'], Mode::Greater).unwrap_err();
        assert_eq!(
            err,
            PermTestError::UnknownControlGroup {
                group: "'z'".into()
            }
        );
    }

    #[test]
    fn engine_rejects_degenerate_grouping() {
        let single = Dataset::from_pairs([('a', 1.0), ('a', 2.0), ('a', 3.0)]).unwrap();
        let err = PermutationEngine::new(&single, &['a'], Mode::Lesser).unwrap_err();
        assert_eq!(err, PermTestError::InsufficientGroups { found: 1 });

        let data = two_groups();
        let err = PermutationEngine::new(&data, &[], Mode::Lesser).unwrap_err();
        assert_eq!(err, PermTestError::EmptyControlGroups);
    }

    #[test]
    fn engine_rejects_zero_iterations() {
        let data = two_groups();
        let engine = PermutationEngine::new(&data, &['a'], Mode::Greater).unwrap();
        let err = engine.run(0, 3, Execution::Parallel).unwrap_err();
        assert_eq!(err, PermTestError::InvalidIterationCount { iterations: 0 });
    }

    #[test]
    fn null_table_accessors() {
        let t = NullTable::new(
            vec!["x", "y"],
            vec![vec![Some(1.0), None], vec![Some(2.0), Some(3.0)]],
        );
        assert_eq!(t.n_rows(), 2);
        assert_eq!(t.n_columns(), 2);
        assert_eq!(t.defined_count(0), 2);
        assert_eq!(t.defined_count(1), 1);
        let y: Vec<_> = t.column(&"y").expect("y is a column").collect();
        assert_eq!(y, vec![None, Some(3.0)]);
        assert!(t.column(&"z").is_none());
    }
}
