//! Empirical one-sided p-values from a null table.
//!
//! ```text
//! greater: p = #{ t : null_t > observed } / #{ t : null_t defined }
//! lesser:  p = #{ t : null_t < observed } / #{ t : null_t defined }
//! ```
//!
//! Ties never count. No `+1` small-sample correction is applied, so a
//! p-value of exactly 0 is possible when no trial is more extreme than the
//! observed value.

use std::collections::BTreeMap;

use super::{Mode, NullTable};

/// Empirical p-value of one null-distribution column.
///
/// Missing samples are excluded from both numerator and denominator.
/// Returns `NaN` if no sample is defined.
///
/// # Examples
///
/// ```
/// use u_permtest::minmax::{empirical_p_value, Mode};
///
/// let null = [Some(-1.0), Some(0.0), Some(2.0), None];
/// let p = empirical_p_value(null, 0.0, Mode::Greater);
/// assert!((p - 1.0 / 3.0).abs() < 1e-15);
/// ```
pub fn empirical_p_value<I>(null: I, observed: f64, mode: Mode) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (hits, defined) = null
        .into_iter()
        .flatten()
        .fold((0_usize, 0_usize), |(hits, defined), v| {
            (hits + usize::from(mode.exceeds(v, observed)), defined + 1)
        });

    if defined == 0 {
        return f64::NAN;
    }
    hits as f64 / defined as f64
}

/// p-value of every control group in `null_table`.
///
/// Columns without an observed statistic are skipped.
pub fn p_values<G>(
    null_table: &NullTable<G>,
    observed: &BTreeMap<G, f64>,
    mode: Mode,
) -> BTreeMap<G, f64>
where
    G: Ord + Clone + std::fmt::Debug,
{
    null_table
        .columns()
        .iter()
        .enumerate()
        .filter_map(|(j, group)| {
            let &obs = observed.get(group)?;
            let p = empirical_p_value(null_table.column_at(j), obs, mode);
            tracing::trace!(?group, observed = obs, p_value = p, "control group p-value");
            Some((group.clone(), p))
        })
        .collect()
}
