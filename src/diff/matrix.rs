//! Pairwise cost matrix between the clades of two trees.

use std::collections::BTreeSet;

use indicatif::ProgressBar;
use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::debug;

use super::clade::Clade;
use super::metric::CladeMetric;
use super::DiffError;

/// Costs between reference clades (rows) and target clades (columns).
/// `rows` and `cols` map matrix positions back to the clade lists
/// the matrix was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    rows: Vec<usize>,
    cols: Vec<usize>,
    costs: Array2<f64>,
}

impl CostMatrix {
    /// Evaluates `metric` on every pair of clades on a dedicated pool of `jobs` threads
    /// (all available cores when `jobs` is 0). The first failing cell aborts the build.
    pub fn build<M: CladeMetric + ?Sized>(
        reference: &[Clade<'_>],
        target: &[Clade<'_>],
        metric: &M,
        jobs: usize,
        progress: &ProgressBar,
    ) -> Result<Self, DiffError> {
        let (n_rows, n_cols) = (reference.len(), target.len());
        if n_rows == 0 || n_cols == 0 {
            return Err(DiffError::DegenerateInput("no clades to compare"));
        }

        let pool = ThreadPoolBuilder::new().num_threads(jobs).build()?;
        debug!(
            threads = pool.current_num_threads(),
            cells = n_rows * n_cols,
            "Evaluating cost matrix"
        );

        let cells = pool.install(|| {
            (0..n_rows * n_cols)
                .into_par_iter()
                .map(|cell| {
                    let (row, col) = (cell / n_cols, cell % n_cols);
                    let cost = metric
                        .distance(&reference[row], &target[col])
                        .map_err(|source| DiffError::MetricEvaluation {
                            row,
                            col,
                            source: Box::new(source),
                        })?;
                    progress.inc(1);
                    Ok(cost)
                })
                .collect::<Result<Vec<f64>, DiffError>>()
        })?;

        Ok(Self {
            rows: (0..n_rows).collect(),
            cols: (0..n_cols).collect(),
            costs: Array2::from_shape_vec((n_rows, n_cols), cells)?,
        })
    }

    /// Wraps an existing cost array
    /// ```
    /// use ndarray::array;
    /// use phylodiff::diff::CostMatrix;
    ///
    /// let matrix = CostMatrix::from_costs(array![[0.0, 0.5], [0.5, 1.0]]);
    /// assert_eq!(matrix.shape(), (2, 2));
    /// assert_eq!(matrix.get(0, 1), Some(0.5));
    /// ```
    pub fn from_costs(costs: Array2<f64>) -> Self {
        let (n_rows, n_cols) = costs.dim();
        Self {
            rows: (0..n_rows).collect(),
            cols: (0..n_cols).collect(),
            costs,
        }
    }

    /// Drops every row that has a zero cost cell, together with the first zero
    /// column of that row. A column already dropped by an earlier row is not
    /// replaced. Remaining rows and columns keep their order.
    /// ```
    /// use ndarray::array;
    /// use phylodiff::diff::CostMatrix;
    ///
    /// let matrix = CostMatrix::from_costs(array![
    ///     [0.0, 0.5, 1.0],
    ///     [0.0, 0.0, 0.5],
    ///     [0.5, 1.0, 0.2],
    /// ]);
    /// let reduced = matrix.reduce();
    ///
    /// assert_eq!(reduced.rows(), &[2]);
    /// assert_eq!(reduced.cols(), &[1, 2]);
    /// ```
    pub fn reduce(&self) -> Self {
        let mut cols: BTreeSet<usize> = (0..self.cols.len()).collect();
        let mut rows = vec![];

        for (i, row) in self.costs.axis_iter(Axis(0)).enumerate() {
            match row.iter().position(|&cost| cost == 0.0) {
                Some(j) => {
                    cols.remove(&j);
                }
                None => rows.push(i),
            }
        }
        let cols: Vec<usize> = cols.into_iter().collect();

        Self {
            rows: rows.iter().map(|&i| self.rows[i]).collect(),
            cols: cols.iter().map(|&j| self.cols[j]).collect(),
            costs: self.costs.select(Axis(0), &rows).select(Axis(1), &cols),
        }
    }

    /// Clade indices of the rows
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Clade indices of the columns
    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    /// Number of rows and columns
    pub fn shape(&self) -> (usize, usize) {
        self.costs.dim()
    }

    /// Check if the matrix has no rows or no columns
    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Cost at a matrix position
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.costs.get((row, col)).copied()
    }

    /// View of the costs
    pub fn costs(&self) -> ArrayView2<'_, f64> {
        self.costs.view()
    }
}
