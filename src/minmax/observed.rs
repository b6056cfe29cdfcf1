//! Observed min/max mean-difference statistic.
//!
//! # Algorithm
//!
//! With ascending group means m_0, ..., m_{k-1}:
//!
//! ```text
//! D[i][j] = m_i - m_j          (i != j; diagonal excluded)
//! greater: S_i = min_j D[i][j]
//! lesser:  S_i = max_j D[i][j]
//! ```

use std::collections::BTreeMap;

use u_numflow::stats;

use super::Mode;
use crate::dataset::{Dataset, GroupIndex};
use crate::error::{PermTestError, Result};

/// Pairwise signed mean differences with the diagonal excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffMatrix {
    n: usize,
    cells: Vec<f64>,
}

impl DiffMatrix {
    /// Builds `D[i][j] = means[i] - means[j]`.
    pub fn from_means(means: &[f64]) -> Self {
        let n = means.len();
        let mut cells = Vec::with_capacity(n * n);
        for &mi in means {
            cells.extend(means.iter().map(|&mj| mi - mj));
        }
        Self { n, cells }
    }

    /// Matrix dimension (number of groups).
    pub fn size(&self) -> usize {
        self.n
    }

    /// `D[i][j]`, or `None` on the diagonal or out of range.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i == j || i >= self.n || j >= self.n {
            return None;
        }
        Some(self.cells[i * self.n + j])
    }

    /// Off-diagonal entries of row `i`, in column order.
    pub fn row(&self, i: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.n).filter_map(move |j| self.get(i, j))
    }

    /// Directional extreme of row `i`; `None` when the row has no peers.
    pub fn extreme(&self, i: usize, mode: Mode) -> Option<f64> {
        mode.extreme(self.row(i))
    }
}

/// Observed statistic of every group plus the subset requested as controls.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedStatistics<G> {
    mode: Mode,
    group_means: BTreeMap<G, f64>,
    diff: DiffMatrix,
    statistics: BTreeMap<G, f64>,
}

impl<G: Ord + Clone> ObservedStatistics<G> {
    pub(crate) fn from_index(
        index: &GroupIndex<G>,
        values: &[f64],
        controls: &[usize],
        mode: Mode,
    ) -> Self {
        let mut buf = Vec::new();
        let means: Vec<f64> = index
            .rows()
            .iter()
            .map(|rows| block_mean(values, rows, &mut buf))
            .collect();
        let diff = DiffMatrix::from_means(&means);

        let statistics = controls
            .iter()
            .filter_map(|&c| diff.extreme(c, mode).map(|s| (index.keys()[c].clone(), s)))
            .collect();
        let group_means = index.keys().iter().cloned().zip(means).collect();

        Self {
            mode,
            group_means,
            diff,
            statistics,
        }
    }

    /// Comparison direction used.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Mean of every group, ascending by label.
    pub fn group_means(&self) -> &BTreeMap<G, f64> {
        &self.group_means
    }

    /// Pairwise difference matrix, indexed in ascending label order.
    pub fn diff_matrix(&self) -> &DiffMatrix {
        &self.diff
    }

    /// Directional statistic per control group.
    pub fn statistics(&self) -> &BTreeMap<G, f64> {
        &self.statistics
    }

    /// Consumes `self`, keeping only the control statistics.
    pub fn into_statistics(self) -> BTreeMap<G, f64> {
        self.statistics
    }
}

/// Computes the observed directional statistic for each control group.
///
/// Control groups are sorted and de-duplicated; the result is keyed in
/// ascending order.
///
/// # Errors
///
/// - [`PermTestError::EmptyControlGroups`] if `controls` is empty.
/// - [`PermTestError::InsufficientGroups`] if the dataset has fewer than 2 groups.
/// - [`PermTestError::UnknownControlGroup`] for a control absent from the data.
///
/// # Examples
///
/// ```
/// use u_permtest::dataset::Dataset;
/// use u_permtest::minmax::{observed_statistics, Mode};
///
/// let data = Dataset::from_pairs([
///     ("A", 1.0), ("A", 1.0), ("A", 1.0),
///     ("B", 10.0), ("B", 10.0), ("B", 10.0),
///     ("C", 5.0), ("C", 5.0), ("C", 5.0),
/// ]).unwrap();
/// let obs = observed_statistics(&data, &["A"], Mode::Greater).unwrap();
/// assert_eq!(obs.statistics()["A"], -9.0);
/// ```
pub fn observed_statistics<G>(
    dataset: &Dataset<G>,
    controls: &[G],
    mode: Mode,
) -> Result<ObservedStatistics<G>>
where
    G: Ord + Clone + std::fmt::Debug,
{
    let index = dataset.group_index();
    let positions = resolve_controls(&index, controls)?;
    Ok(ObservedStatistics::from_index(
        &index,
        dataset.values(),
        &positions,
        mode,
    ))
}

/// Validates the grouping and maps controls to ascending group positions.
pub(crate) fn resolve_controls<G>(index: &GroupIndex<G>, controls: &[G]) -> Result<Vec<usize>>
where
    G: Ord + Clone + std::fmt::Debug,
{
    if controls.is_empty() {
        return Err(PermTestError::EmptyControlGroups);
    }
    if index.len() < 2 {
        return Err(PermTestError::InsufficientGroups { found: index.len() });
    }

    let mut sorted: Vec<&G> = controls.iter().collect();
    sorted.sort();
    sorted.dedup();

    sorted
        .into_iter()
        .map(|g| {
            index
                .position(g)
                .ok_or_else(|| PermTestError::unknown_group(g))
        })
        .collect()
}

/// Mean of `values` at the given row positions.
pub(crate) fn block_mean(values: &[f64], rows: &[usize], buf: &mut Vec<f64>) -> f64 {
    buf.clear();
    buf.extend(rows.iter().map(|&r| values[r]));
    // rows are non-empty and total magnitude is at most f64::MAX / 2 by construction
    stats::mean(buf).unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Dataset<&'static str> {
        Dataset::from_pairs([
            ("A", 1.0),
            ("A", 1.0),
            ("A", 1.0),
            ("B", 10.0),
            ("B", 10.0),
            ("B", 10.0),
            ("C", 5.0),
            ("C", 5.0),
            ("C", 5.0),
        ])
        .unwrap()
    }

    #[test]
    fn diff_matrix_excludes_diagonal() {
        let d = DiffMatrix::from_means(&[1.0, 10.0, 5.0]);
        assert_eq!(d.size(), 3);
        for i in 0..3 {
            assert_eq!(d.get(i, i), None);
            assert_eq!(d.row(i).count(), 2);
        }
        assert_eq!(d.get(0, 1), Some(-9.0));
        assert_eq!(d.get(1, 2), Some(5.0));
        assert_eq!(d.get(3, 0), None);
    }

    #[test]
    fn single_row_has_no_extreme() {
        let d = DiffMatrix::from_means(&[4.0]);
        assert_eq!(d.extreme(0, Mode::Greater), None);
        assert_eq!(d.extreme(0, Mode::Lesser), None);
    }

    #[test]
    fn greater_takes_min_difference() {
        let obs = observed_statistics(&abc(), &["A"], Mode::Greater).unwrap();
        assert_eq!(obs.statistics().len(), 1);
        assert_eq!(obs.statistics()["A"], -9.0);
        assert_eq!(obs.group_means()["B"], 10.0);
        assert_eq!(obs.mode(), Mode::Greater);
    }

    #[test]
    fn lesser_takes_max_difference() {
        let obs = observed_statistics(&abc(), &["A", "B"], Mode::Lesser).unwrap();
        assert_eq!(obs.statistics()["A"], -4.0);
        assert_eq!(obs.statistics()["B"], 9.0);
    }

    #[test]
    fn controls_sorted_and_deduplicated() {
        let obs = observed_statistics(&abc(), &["C", "A", "C"], Mode::Greater).unwrap();
        let keys: Vec<_> = obs.statistics().keys().copied().collect();
        assert_eq!(keys, vec!["A", "C"]);
        // C: min(5 - 1, 5 - 10) = -5
        assert_eq!(obs.statistics()["C"], -5.0);
    }

    #[test]
    fn unknown_control_group() {
        let err = observed_statistics(&abc(), &["A", "Z"], Mode::Greater).unwrap_err();
        assert_eq!(
            err,
            PermTestError::UnknownControlGroup {
                group: "\"Z\"".into()
            }
        );
    }

    #[test]
    fn single_group_is_rejected() {
        let data = Dataset::from_pairs([("A", 1.0), ("A", 2.0)]).unwrap();
        let err = observed_statistics(&data, &["A"], Mode::Greater).unwrap_err();
        assert_eq!(err, PermTestError::InsufficientGroups { found: 1 });
    }

    #[test]
    fn empty_controls_rejected() {
        let err = observed_statistics(&abc(), &[], Mode::Lesser).unwrap_err();
        assert_eq!(err, PermTestError::EmptyControlGroups);
    }

    #[test]
    fn block_mean_gathers_rows() {
        let mut buf = Vec::new();
        let m = block_mean(&[1.0, 2.0, 3.0, 4.0], &[0, 3], &mut buf);
        assert!((m - 2.5).abs() < 1e-15, "m = {m}");
    }
}
