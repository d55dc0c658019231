//! Minimum cost assignment between the rows and columns of a cost matrix.
//!
//! Rectangular matrices are padded to a square with zero cost cells so that
//! surplus rows or columns are matched to placeholders without changing the
//! optimum over real cells. The square problem is solved with shortest
//! augmenting paths and dual potentials (Jonker-Volgenant augmentation),
//! in `O(n³)`.

use ndarray::ArrayView2;

use super::DiffError;

/// Result of an assignment
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Column matched to each row, `None` for rows matched to padding
    pub row_to_col: Vec<Option<usize>>,
    /// Sum of the costs of real matched cells
    pub cost: f64,
}

impl Assignment {
    /// Iterates over matched `(row, col)` pairs, skipping rows matched to padding
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.row_to_col
            .iter()
            .enumerate()
            .filter_map(|(row, col)| col.map(|col| (row, col)))
    }
}

/// Finds a minimum cost one to one assignment of rows to columns.
/// ```
/// use ndarray::array;
/// use phylodiff::diff::assignment::solve;
///
/// let costs = array![
///     [4.0, 1.0, 3.0],
///     [2.0, 0.0, 5.0],
///     [3.0, 2.0, 2.0],
/// ];
/// let assignment = solve(costs.view()).unwrap();
///
/// assert_eq!(assignment.row_to_col, vec![Some(1), Some(0), Some(2)]);
/// assert_eq!(assignment.cost, 5.0);
/// ```
pub fn solve(costs: ArrayView2<'_, f64>) -> Result<Assignment, DiffError> {
    let (n_rows, n_cols) = costs.dim();
    if n_rows == 0 || n_cols == 0 {
        return Err(DiffError::Assignment("empty cost matrix".into()));
    }
    if let Some(((row, col), cost)) = costs
        .indexed_iter()
        .find(|(_, cost)| !cost.is_finite() || **cost < 0.0)
    {
        return Err(DiffError::Assignment(format!(
            "invalid cost {cost} at ({row}, {col})"
        )));
    }

    let n = n_rows.max(n_cols);
    let cost = |row: usize, col: usize| costs.get((row, col)).copied().unwrap_or(0.0);

    // 1-based indices, 0 is the virtual source of augmenting paths
    let mut row_potential = vec![0.0; n + 1];
    let mut col_potential = vec![0.0; n + 1];
    let mut col_owner = vec![0usize; n + 1];
    let mut previous = vec![0usize; n + 1];

    for row in 1..=n {
        col_owner[0] = row;
        let mut current = 0;
        let mut min_slack = vec![f64::INFINITY; n + 1];
        let mut visited = vec![false; n + 1];

        // Grow the shortest path tree until it reaches a free column
        loop {
            visited[current] = true;
            let owner = col_owner[current];
            let mut delta = f64::INFINITY;
            let mut next = 0;

            for col in 1..=n {
                if visited[col] {
                    continue;
                }
                let slack = cost(owner - 1, col - 1) - row_potential[owner] - col_potential[col];
                if slack < min_slack[col] {
                    min_slack[col] = slack;
                    previous[col] = current;
                }
                if min_slack[col] < delta {
                    delta = min_slack[col];
                    next = col;
                }
            }

            for col in 0..=n {
                if visited[col] {
                    row_potential[col_owner[col]] += delta;
                    col_potential[col] -= delta;
                } else {
                    min_slack[col] -= delta;
                }
            }

            current = next;
            if col_owner[current] == 0 {
                break;
            }
        }

        // Flip the augmenting path
        while current != 0 {
            let prev = previous[current];
            col_owner[current] = col_owner[prev];
            current = prev;
        }
    }

    let mut row_to_col = vec![None; n_rows];
    for (col, &owner) in col_owner.iter().enumerate().skip(1) {
        let (row, col) = (owner - 1, col - 1);
        if row < n_rows && col < n_cols {
            row_to_col[row] = Some(col);
        }
    }
    let cost = row_to_col
        .iter()
        .enumerate()
        .filter_map(|(row, col)| col.map(|col| costs[[row, col]]))
        .sum();

    Ok(Assignment { row_to_col, cost })
}
