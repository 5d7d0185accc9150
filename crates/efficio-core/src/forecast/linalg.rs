//! Dense linear algebra for small regression problems

const PIVOT_TOLERANCE: f64 = 1e-12;

/// Solve `(XᵀX + diag(penalty)) β = Xᵀy` for β
///
/// `rows` is the design matrix in row-major form; every row must have
/// `penalty.len()` columns. Returns None when the regularized system is not
/// positive definite.
pub fn ridge_solve(rows: &[Vec<f64>], y: &[f64], penalty: &[f64]) -> Option<Vec<f64>> {
    let p = penalty.len();
    let mut a = vec![vec![0.0; p]; p];
    let mut b = vec![0.0; p];

    for (row, &target) in rows.iter().zip(y) {
        debug_assert_eq!(row.len(), p);
        for i in 0..p {
            let xi = row[i];
            if xi == 0.0 {
                continue;
            }
            b[i] += xi * target;
            for j in 0..=i {
                a[i][j] += xi * row[j];
            }
        }
    }

    for i in 0..p {
        a[i][i] += penalty[i];
        for j in 0..i {
            a[j][i] = a[i][j];
        }
    }

    let l = cholesky(&a)?;
    Some(cholesky_solve(&l, &b))
}

/// Lower-triangular Cholesky factor of a symmetric positive definite matrix
fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                // Pivots that collapse relative to the diagonal mean a rank-deficient system
                if !sum.is_finite() || sum <= a[i][i].abs() * PIVOT_TOLERANCE {
                    return None;
                }
                l[i][i] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    Some(l)
}

/// Solve `L Lᵀ x = b` by forward then back substitution
fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = l.len();

    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[i][k] * z[k];
        }
        z[i] = sum / l[i][i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[k][i] * x[k];
        }
        x[i] = sum / l[i][i];
    }

    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line_fit() {
        // y = 3 + 2x
        let rows: Vec<Vec<f64>> = (0..5).map(|x| vec![1.0, x as f64]).collect();
        let y: Vec<f64> = (0..5).map(|x| 3.0 + 2.0 * x as f64).collect();

        let beta = ridge_solve(&rows, &y, &[0.0, 0.0]).unwrap();
        assert!((beta[0] - 3.0).abs() < 1e-10);
        assert!((beta[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_penalty_shrinks_coefficient() {
        let rows: Vec<Vec<f64>> = (0..10).map(|x| vec![x as f64]).collect();
        let y: Vec<f64> = (0..10).map(|x| x as f64).collect();

        let free = ridge_solve(&rows, &y, &[0.0]).unwrap();
        let shrunk = ridge_solve(&rows, &y, &[100.0]).unwrap();
        assert!((free[0] - 1.0).abs() < 1e-10);
        assert!(shrunk[0] < free[0]);
        assert!(shrunk[0] > 0.0);
    }

    #[test]
    fn test_singular_without_penalty() {
        // Two identical columns
        let rows: Vec<Vec<f64>> = (0..4).map(|x| vec![x as f64, x as f64]).collect();
        let y = vec![0.0, 1.0, 2.0, 3.0];
        assert!(ridge_solve(&rows, &y, &[0.0, 0.0]).is_none());
        assert!(ridge_solve(&rows, &y, &[1e-6, 1e-6]).is_some());
    }
}
