/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The single-threaded reference factorization.

use crate::gram_schmidt::{self, Factorize, GramSchmidtKernel, QrFactors};
use crate::mul::{axpy, dot};
use crate::{Matrix, QrResult};

/// Runs every phase on the calling thread, in index order.
#[derive(Debug, Default, Copy, Clone)]
pub struct Sequential;

impl GramSchmidtKernel for Sequential {
    fn column_norm(&self, column: &[f64]) -> f64 {
        column.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    fn normalize(&self, column: &[f64], norm: f64, out: &mut [f64]) {
        for (q, a) in out.iter_mut().zip(column) {
            *q = a / norm;
        }
    }

    fn project_and_subtract(&self, k: usize, q_k: &[f64], trailing: &mut [f64], r_trailing: &mut [f64]) {
        let n = q_k.len();
        for (a_j, r_j) in trailing.chunks_exact_mut(n).zip(r_trailing.chunks_exact_mut(n)) {
            let r_kj = dot(q_k, a_j);
            r_j[k] = r_kj;
            axpy(-r_kj, q_k, a_j);
        }
    }
}

impl Factorize for Sequential {
    fn factorize_in_place(&self, working: &mut Matrix, q: &mut Matrix, r: &mut Matrix) -> QrResult<()> {
        gram_schmidt::run(self, working, q, r)
    }
}

pub fn factorize(matrix: &Matrix) -> QrResult<QrFactors> {
    Sequential.factorize(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{assert_valid_factors, random_matrix};
    use crate::QrError;

    #[test]
    fn known_factors() {
        let a = Matrix::from_rows(&[[3.0, 1.0], [4.0, 2.0]]).unwrap();
        let QrFactors { q, r } = factorize(&a).unwrap();

        assert_close!(abs=1e-14, q.col(0), &[0.6, 0.8][..]);
        assert_close!(abs=1e-14, q.col(1), &[-0.8, 0.6][..]);
        assert_close!(abs=1e-14, r.col(0), &[5.0, 0.0][..]);
        assert_close!(abs=1e-14, r.col(1), &[2.2, 0.4][..]);
    }

    #[test]
    fn properties_hold_across_sizes() {
        for &(n, seed) in &[(1, 1), (2, 2), (8, 3), (50, 4)] {
            let a = random_matrix(n, seed);
            let factors = factorize(&a).unwrap();
            assert_valid_factors(&a, &factors);
        }
    }

    #[test]
    fn input_is_preserved() {
        let a = random_matrix(6, 9);
        let before = a.clone();
        let _ = factorize(&a).unwrap();
        assert_eq!(a, before);
    }

    #[test]
    fn zero_column_is_singular() {
        let a = Matrix::from_rows(&[[0.0, 1.0], [0.0, 2.0]]).unwrap();
        assert_eq!(factorize(&a), Err(QrError::SingularColumn { column: 0, norm: 0.0 }));
    }
}
