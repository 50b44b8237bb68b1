//! Small dense quadratic programs with box constraints.
//!
//! Minimizes `0.5 * x' H x - g' x` subject to `lower <= x <= upper`, with `H`
//! symmetric positive definite. Without bounds this is a Cholesky solve;
//! with bounds the unconstrained optimum is projected and refined by
//! projected Gauss-Seidel, which converges for SPD `H`.

use nalgebra::{DMatrix, DVector};

const MAX_SWEEPS: usize = 500;
const TOLERANCE: f64 = 1e-12;

/// Solve the box-constrained QP. Returns `None` if `H` is not positive
/// definite or the result is not finite.
pub fn solve_box_qp(
    h: &DMatrix<f64>,
    g: &DVector<f64>,
    bounds: Option<&[(f64, f64)]>,
) -> Option<DVector<f64>> {
    let unconstrained = h.clone().cholesky()?.solve(g);
    if !unconstrained.iter().all(|v| v.is_finite()) {
        return None;
    }

    let Some(bounds) = bounds else {
        return Some(unconstrained);
    };
    debug_assert_eq!(bounds.len(), g.len());

    let mut x = unconstrained;
    for (xi, &(lo, hi)) in x.iter_mut().zip(bounds) {
        *xi = xi.clamp(lo, hi);
    }

    for _ in 0..MAX_SWEEPS {
        let mut change = 0.0_f64;
        for i in 0..x.len() {
            let hii = h[(i, i)];
            let mut r = g[i];
            for j in 0..x.len() {
                if j != i {
                    r -= h[(i, j)] * x[j];
                }
            }
            let (lo, hi) = bounds[i];
            let next = (r / hii).clamp(lo, hi);
            change = change.max((next - x[i]).abs());
            x[i] = next;
        }
        if change < TOLERANCE {
            break;
        }
    }

    x.iter().all(|v| v.is_finite()).then_some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unconstrained_matches_linear_solve() {
        let h = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let g = DVector::from_vec(vec![1.0, 2.0]);
        let x = solve_box_qp(&h, &g, None).unwrap();
        assert_relative_eq!(&h * &x, g, epsilon = 1e-12);
    }

    #[test]
    fn inactive_bounds_do_not_change_solution() {
        let h = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let g = DVector::from_vec(vec![1.0, 2.0]);
        let free = solve_box_qp(&h, &g, None).unwrap();
        let boxed = solve_box_qp(&h, &g, Some(&[(-10.0, 10.0), (-10.0, 10.0)])).unwrap();
        assert_relative_eq!(free, boxed, epsilon = 1e-9);
    }

    #[test]
    fn active_bound_is_respected() {
        // Unconstrained optimum is (1, 1); cap x0 at 0.5.
        let h = DMatrix::identity(2, 2);
        let g = DVector::from_vec(vec![1.0, 1.0]);
        let x = solve_box_qp(&h, &g, Some(&[(-1.0, 0.5), (-1.0, 2.0)])).unwrap();
        assert_relative_eq!(x[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn coupled_bound_moves_free_variable() {
        // Coupling pulls x1 down once x0 is pinned at its upper bound.
        let h = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let g = DVector::from_vec(vec![3.0, 0.0]);
        let x = solve_box_qp(&h, &g, Some(&[(-5.0, 1.0), (-5.0, 5.0)])).unwrap();
        // KKT: x0 = 1, x1 = -0.5
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(x[1], -0.5, epsilon = 1e-9);
    }

    #[test]
    fn indefinite_is_rejected() {
        let h = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]);
        let g = DVector::from_vec(vec![1.0, 1.0]);
        assert!(solve_box_qp(&h, &g, None).is_none());
    }
}
