//! Symmetric 4x4 eigendecomposition via cyclic Jacobi rotations.
//!
//! The Bingham filter only ever diagonalizes symmetric 4x4 matrices, so a
//! fixed-size Jacobi sweep is enough; it converges quadratically and the
//! returned eigenvector columns are orthonormal by construction.

const MAX_SWEEPS: usize = 32;

/// Eigenvalues and eigenvectors (as columns) of a symmetric 4x4 matrix.
///
/// Eigenvalues come back unsorted; callers order them as needed.
pub(crate) fn eigh4(matrix: &[[f64; 4]; 4]) -> ([f64; 4], [[f64; 4]; 4]) {
    let mut a = *matrix;
    let mut v = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    for _ in 0..MAX_SWEEPS {
        if off_diagonal_sq(&a) <= convergence_floor(&a) {
            break;
        }

        for p in 0..3 {
            for q in (p + 1)..4 {
                let apq = a[p][q];
                if apq == 0.0 {
                    continue;
                }

                // Stable rotation choice: the smaller root of
                // t^2 + 2*theta*t - 1 = 0 zeroes a[p][q].
                let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                // A <- J^T A J on columns then rows p, q.
                for k in 0..4 {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..4 {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                // Accumulate V <- V J.
                for k in 0..4 {
                    let vkp = v[k][p];
                    let vkq = v[k][q];
                    v[k][p] = c * vkp - s * vkq;
                    v[k][q] = s * vkp + c * vkq;
                }
            }
        }
    }

    ([a[0][0], a[1][1], a[2][2], a[3][3]], v)
}

fn off_diagonal_sq(a: &[[f64; 4]; 4]) -> f64 {
    let mut sum = 0.0;
    for p in 0..3 {
        for q in (p + 1)..4 {
            sum += a[p][q] * a[p][q];
        }
    }
    sum
}

// Convergence is judged relative to the diagonal magnitude so the same
// sweep count serves inputs at wildly different scales.
fn convergence_floor(a: &[[f64; 4]; 4]) -> f64 {
    let diagonal_sq = (0..4).map(|i| a[i][i] * a[i][i]).sum::<f64>();
    (f64::EPSILON * f64::EPSILON * diagonal_sq).max(f64::MIN_POSITIVE)
}
