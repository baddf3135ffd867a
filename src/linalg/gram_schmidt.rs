/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Classical Gram-Schmidt, phrased as three phases per column so that the
//! serial and fork-join implementations share one driver.
//!
//! For column `k`:
//!
//! 1. [`Phase::ComputeNorm`]: `R[k][k] = |A[:, k]|`.
//! 2. [`Phase::Normalize`]: `Q[:, k] = A[:, k] / R[k][k]`.
//! 3. [`Phase::ProjectAndSubtract`]: for every `j > k`,
//!    `R[k][j] = <Q[:, k], A[:, j]>` and `A[:, j] -= R[k][j] * Q[:, k]`.
//!
//! `A` here is the working matrix, which is consumed in the process.
//! A phase never starts before the previous one has completely finished.

use crate::{Matrix, QrError, QrResult};

/// A column whose residual norm is at or below this fraction of the input's
/// [`pivot_scale`] (or is not finite) is treated as linearly dependent on the
/// ones before it.
pub const SINGULAR_EPSILON: f64 = 1e-12;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    ComputeNorm,
    Normalize,
    ProjectAndSubtract,
}

/// The output of a factorization.
///
/// `q` has orthonormal columns and `r` is upper triangular; nothing below the
/// diagonal of `r` is ever written.
#[derive(Debug, Clone, PartialEq)]
pub struct QrFactors {
    pub q: Matrix,
    pub r: Matrix,
}

/// The magnitude that singular-column checks are measured against: the largest
/// absolute entry of the matrix before factorization.
///
/// This is exact, so every mode and every process derives the same value.
pub fn pivot_scale(matrix: &Matrix) -> f64 { matrix.max_abs() }

/// Validates a column norm, producing the error that every mode reports.
pub fn check_pivot(column: usize, norm: f64, scale: f64) -> QrResult<f64> {
    match norm.is_finite() && norm > SINGULAR_EPSILON * scale && norm > 0.0 {
        true => Ok(norm),
        false => Err(QrError::SingularColumn { column, norm }),
    }
}

/// How each phase gets executed.
pub trait GramSchmidtKernel {
    fn column_norm(&self, column: &[f64]) -> f64;

    /// Write `column / norm` into `out`.
    fn normalize(&self, column: &[f64], norm: f64, out: &mut [f64]);

    /// `trailing` holds columns `k + 1..` of the working matrix back to back,
    /// and `r_trailing` the same columns of `R`; `R[k][j]` is written into
    /// row `k` of the corresponding column.
    fn project_and_subtract(&self, k: usize, q_k: &[f64], trailing: &mut [f64], r_trailing: &mut [f64]);
}

/// Factor `working` into `q` and `r` in place. `working` is destroyed.
///
/// `q` and `r` must be the same size as `working`, and the strict lower
/// triangle of `r` must already be zero.
pub fn run<K: GramSchmidtKernel + ?Sized>(
    kernel: &K,
    working: &mut Matrix,
    q: &mut Matrix,
    r: &mut Matrix,
) -> QrResult<()> {
    let n = working.size();
    let scale = pivot_scale(working);
    for k in 0..n {
        trace!("column {}: {:?}", k, Phase::ComputeNorm);
        let norm = check_pivot(k, kernel.column_norm(working.col(k)), scale)?;
        r[(k, k)] = norm;

        trace!("column {}: {:?}", k, Phase::Normalize);
        kernel.normalize(working.col(k), norm, q.col_mut(k));

        trace!("column {}: {:?}", k, Phase::ProjectAndSubtract);
        let start = (k + 1) * n;
        kernel.project_and_subtract(
            k,
            q.col(k),
            &mut working.col_major_data_mut()[start..],
            &mut r.col_major_data_mut()[start..],
        );
    }
    Ok(())
}

/// A factorization strategy that the eigenvalue iteration can drive.
pub trait Factorize {
    /// Factor `working` into `q` and `r`, destroying `working`.
    fn factorize_in_place(&self, working: &mut Matrix, q: &mut Matrix, r: &mut Matrix) -> QrResult<()>;

    /// `out = a * b`.
    fn multiply_into(&self, a: &Matrix, b: &Matrix, out: &mut Matrix) -> QrResult<()> {
        crate::mul::multiply_into(a, b, out)
    }

    /// Factor a copy of `matrix`, leaving the input intact.
    fn factorize(&self, matrix: &Matrix) -> QrResult<QrFactors> {
        let n = matrix.size();
        let mut working = matrix.clone();
        let mut q = Matrix::zeros(n)?;
        let mut r = Matrix::zeros(n)?;
        self.factorize_in_place(&mut working, &mut q, &mut r)?;
        Ok(QrFactors { q, r })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sequential;
    use ::std::cell::RefCell;

    // Wraps the serial kernel to record which phases run, in order.
    struct Recording {
        inner: Sequential,
        log: RefCell<Vec<(usize, Phase)>>,
    }

    impl GramSchmidtKernel for Recording {
        fn column_norm(&self, column: &[f64]) -> f64 {
            let k = self.log.borrow().iter().filter(|e| e.1 == Phase::ComputeNorm).count();
            self.log.borrow_mut().push((k, Phase::ComputeNorm));
            self.inner.column_norm(column)
        }

        fn normalize(&self, column: &[f64], norm: f64, out: &mut [f64]) {
            let k = self.log.borrow().last().map(|e| e.0).unwrap();
            self.log.borrow_mut().push((k, Phase::Normalize));
            self.inner.normalize(column, norm, out)
        }

        fn project_and_subtract(&self, k: usize, q_k: &[f64], trailing: &mut [f64], r_trailing: &mut [f64]) {
            self.log.borrow_mut().push((k, Phase::ProjectAndSubtract));
            self.inner.project_and_subtract(k, q_k, trailing, r_trailing)
        }
    }

    #[test]
    fn phases_run_in_order() {
        let kernel = Recording { inner: Sequential, log: RefCell::new(vec![]) };
        let mut working = Matrix::from_rows(&[[2.0, 1.0], [0.0, 3.0]]).unwrap();
        let mut q = Matrix::zeros(2).unwrap();
        let mut r = Matrix::zeros(2).unwrap();
        run(&kernel, &mut working, &mut q, &mut r).unwrap();

        assert_eq!(kernel.log.into_inner(), vec![
            (0, Phase::ComputeNorm), (0, Phase::Normalize), (0, Phase::ProjectAndSubtract),
            (1, Phase::ComputeNorm), (1, Phase::Normalize), (1, Phase::ProjectAndSubtract),
        ]);
    }

    #[test]
    fn singular_stops_before_normalizing() {
        let kernel = Recording { inner: Sequential, log: RefCell::new(vec![]) };
        let mut working = Matrix::from_rows(&[[1.0, 2.0], [1.0, 2.0]]).unwrap();
        let mut q = Matrix::zeros(2).unwrap();
        let mut r = Matrix::zeros(2).unwrap();
        match run(&kernel, &mut working, &mut q, &mut r) {
            Err(QrError::SingularColumn { column: 1, .. }) => {},
            res => panic!("unexpected: {:?}", res),
        }
        assert_eq!(kernel.log.into_inner().last(), Some(&(1, Phase::ComputeNorm)));
    }

    #[test]
    fn pivot_check() {
        assert_eq!(check_pivot(3, 2.0, 1.0), Ok(2.0));
        assert!(check_pivot(3, 0.0, 1.0).is_err());
        assert!(check_pivot(3, 1e-15, 1.0).is_err());
        assert!(check_pivot(3, ::std::f64::NAN, 1.0).is_err());
        assert!(check_pivot(3, ::std::f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn pivot_check_is_relative_to_scale() {
        assert_eq!(check_pivot(0, 1e-13, 1e-13), Ok(1e-13));
        assert!(check_pivot(1, 1.5e-11, 1e6).is_err());
        assert!(check_pivot(0, 0.0, 0.0).is_err());
    }
}
