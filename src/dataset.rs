//! Grouped measurement data.
//!
//! A [`Dataset`] is an ordered list of rows, each carrying one group label and
//! one finite numeric value. A [`Table`] holds named columns and selects a
//! dataset by column name, the way a data frame would.
//!
//! # Examples
//!
//! ```
//! use u_permtest::dataset::Table;
//!
//! let table = Table::new()
//!     .with_labels("dose", ["lo", "lo", "hi", "hi"])
//!     .unwrap()
//!     .with_values("response", vec![1.0, 2.0, 5.0, 6.0])
//!     .unwrap();
//! let data = table.select("dose", "response").unwrap();
//! let groups = data.group_index();
//! assert_eq!(groups.keys(), &["hi".to_string(), "lo".to_string()]);
//! assert_eq!(groups.sizes(), &[2, 2]);
//! ```

use std::collections::BTreeMap;

use crate::error::{PermTestError, Result};

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// Rows of `(group label, value)` with every value finite.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<G> {
    labels: Vec<G>,
    values: Vec<f64>,
}

impl<G: Ord + Clone> Dataset<G> {
    /// Builds a dataset from parallel label and value columns.
    ///
    /// # Errors
    ///
    /// - [`PermTestError::LengthMismatch`] if the columns differ in length.
    /// - [`PermTestError::NonFiniteValue`] for the first NaN or infinite value.
    /// - [`PermTestError::MagnitudeOverflow`] if `Σ|x|` exceeds `f64::MAX / 2`.
    ///   Every block sum, mean and mean difference then stays finite.
    pub fn new(labels: Vec<G>, values: Vec<f64>) -> Result<Self> {
        if labels.len() != values.len() {
            return Err(PermTestError::LengthMismatch {
                expected: labels.len(),
                found: values.len(),
            });
        }
        if let Some(row) = values.iter().position(|v| !v.is_finite()) {
            return Err(PermTestError::NonFiniteValue { row });
        }
        let magnitude: f64 = values.iter().map(|v| v.abs()).sum();
        if magnitude > f64::MAX / 2.0 {
            return Err(PermTestError::MagnitudeOverflow);
        }
        Ok(Self { labels, values })
    }

    /// Builds a dataset from `(label, value)` pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_permtest::dataset::Dataset;
    ///
    /// let data = Dataset::from_pairs([('a', 1.0), ('b', 2.0), ('a', 3.0)]).unwrap();
    /// assert_eq!(data.len(), 3);
    /// assert_eq!(data.group_index().sizes(), &[2, 1]);
    /// ```
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (G, f64)>,
    {
        let (labels, values) = pairs.into_iter().unzip();
        Self::new(labels, values)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Group label of every row, in row order.
    pub fn labels(&self) -> &[G] {
        &self.labels
    }

    /// Value of every row, in row order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Groups rows by label in ascending label order.
    ///
    /// # Complexity
    ///
    /// Time: O(n log k), Space: O(n) where k is the number of groups
    pub fn group_index(&self) -> GroupIndex<G> {
        let mut members: BTreeMap<G, Vec<usize>> = BTreeMap::new();
        for (row, label) in self.labels.iter().enumerate() {
            members.entry(label.clone()).or_default().push(row);
        }

        let mut keys = Vec::with_capacity(members.len());
        let mut rows = Vec::with_capacity(members.len());
        for (key, idx) in members {
            keys.push(key);
            rows.push(idx);
        }
        let sizes = rows.iter().map(Vec::len).collect();

        GroupIndex { keys, sizes, rows }
    }
}

/// Distinct groups of a [`Dataset`], sorted ascending by label.
///
/// Position `i` in [`keys`](Self::keys), [`sizes`](Self::sizes) and
/// [`rows`](Self::rows) refers to the same group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupIndex<G> {
    keys: Vec<G>,
    sizes: Vec<usize>,
    rows: Vec<Vec<usize>>,
}

impl<G: Ord> GroupIndex<G> {
    /// Group labels, ascending.
    pub fn keys(&self) -> &[G] {
        &self.keys
    }

    /// Row count of each group.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Row indices belonging to each group, in original row order.
    pub fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }

    /// Number of distinct groups.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if there are no groups.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Position of `key` in ascending order, if present.
    pub fn position(&self, key: &G) -> Option<usize> {
        self.keys.binary_search(key).ok()
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A single named column of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Categorical group labels.
    Labels(Vec<String>),
    /// Numeric measurements.
    Values(Vec<f64>),
}

impl Column {
    /// Number of rows in the column.
    pub fn len(&self) -> usize {
        match self {
            Column::Labels(v) => v.len(),
            Column::Values(v) => v.len(),
        }
    }

    /// Returns `true` if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named columns of equal length.
///
/// Insertion order is kept; inserting under an existing name replaces
/// that column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<(String, Column)>,
}

impl Table {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a label column, builder style.
    pub fn with_labels<I, S>(mut self, name: &str, labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels = labels.into_iter().map(Into::into).collect();
        self.insert(name, Column::Labels(labels))?;
        Ok(self)
    }

    /// Adds a numeric column, builder style.
    pub fn with_values(mut self, name: &str, values: Vec<f64>) -> Result<Self> {
        self.insert(name, Column::Values(values))?;
        Ok(self)
    }

    /// Inserts or replaces a column.
    ///
    /// # Errors
    ///
    /// [`PermTestError::LengthMismatch`] if the column length differs from the
    /// other columns. A replaced column is not compared against itself.
    pub fn insert(&mut self, name: &str, column: Column) -> Result<()> {
        if let Some(expected) = self
            .columns
            .iter()
            .find(|(n, _)| n != name)
            .map(|(_, c)| c.len())
        {
            if column.len() != expected {
                return Err(PermTestError::LengthMismatch {
                    expected,
                    found: column.len(),
                });
            }
        }

        match self.columns.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = column,
            None => self.columns.push((name.to_string(), column)),
        }
        Ok(())
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Number of rows (0 for a table without columns).
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, c)| c.len())
    }

    /// Selects a group column and a value column as a [`Dataset`].
    ///
    /// # Errors
    ///
    /// - [`PermTestError::UnknownColumn`] if either name is missing.
    /// - [`PermTestError::ColumnType`] if `group_col` is not a label column or
    ///   `value_col` is not numeric.
    /// - [`PermTestError::NonFiniteValue`] if a value is NaN or infinite.
    pub fn select(&self, group_col: &str, value_col: &str) -> Result<Dataset<String>> {
        let labels = match self.lookup(group_col)? {
            Column::Labels(labels) => labels.clone(),
            Column::Values(_) => {
                return Err(PermTestError::ColumnType {
                    name: group_col.to_string(),
                    expected: "label",
                })
            }
        };
        let values = match self.lookup(value_col)? {
            Column::Values(values) => values.clone(),
            Column::Labels(_) => {
                return Err(PermTestError::ColumnType {
                    name: value_col.to_string(),
                    expected: "numeric",
                })
            }
        };
        Dataset::new(labels, values)
    }

    fn lookup(&self, name: &str) -> Result<&Column> {
        self.column(name).ok_or_else(|| PermTestError::UnknownColumn {
            name: name.to_string(),
        })
    }
}
