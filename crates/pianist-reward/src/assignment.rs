//! Minimum-cost bipartite assignment (Hungarian method).

use nalgebra::DMatrix;

/// Solve the rectangular linear assignment problem.
///
/// Every row is matched to a distinct column when there are no more rows than
/// columns, and vice versa otherwise; the surplus side stays unmatched.
/// Returns `(row, col)` pairs ordered by row, minimizing the summed cost.
pub fn min_cost_assignment(cost: &DMatrix<f64>) -> Vec<(usize, usize)> {
    if cost.nrows() == 0 || cost.ncols() == 0 {
        return Vec::new();
    }
    if cost.nrows() > cost.ncols() {
        let mut pairs: Vec<(usize, usize)> = hungarian(&cost.transpose())
            .into_iter()
            .map(|(r, c)| (c, r))
            .collect();
        pairs.sort_unstable();
        return pairs;
    }
    hungarian(cost)
}

/// Shortest augmenting path with potentials; requires `nrows <= ncols`.
fn hungarian(cost: &DMatrix<f64>) -> Vec<(usize, usize)> {
    let n = cost.nrows();
    let m = cost.ncols();

    // 1-based with a virtual column 0, as in the classic formulation.
    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; m + 1];
    let mut row_of = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        row_of[0] = i;
        let mut j0 = 0;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[j0] = true;
            let i0 = row_of[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let reduced = cost[(i0 - 1, j - 1)] - u[i0] - v[j];
                if reduced < minv[j] {
                    minv[j] = reduced;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            if j1 == 0 {
                // Only non-finite costs remain; nothing left to augment.
                break;
            }
            for j in 0..=m {
                if used[j] {
                    u[row_of[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if row_of[j0] == 0 {
                break;
            }
        }
        // Augment along the alternating path.
        while j0 != 0 {
            let j1 = way[j0];
            row_of[j0] = row_of[j1];
            j0 = j1;
        }
    }

    let mut pairs: Vec<(usize, usize)> = (1..=m)
        .filter(|&j| row_of[j] != 0)
        .map(|j| (row_of[j] - 1, j - 1))
        .collect();
    pairs.sort_unstable();
    pairs
}
