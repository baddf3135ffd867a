/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Dense products, used to rebuild `A = QR` and for the `RQ` recurrence.

use crate::matrix::check_same_size;
use crate::{Matrix, QrResult};
use ::rayon::prelude::*;

// out[:, j] = sum_l a[:, l] * b[l, j]
fn multiply_column(a: &Matrix, b_col: &[f64], out_col: &mut [f64]) {
    for x in out_col.iter_mut() {
        *x = 0.0;
    }
    for (a_col, &b_lj) in a.cols().zip(b_col) {
        axpy(b_lj, a_col, out_col);
    }
}

/// `y += alpha * x`
#[inline]
pub(crate) fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (y, x) in y.iter_mut().zip(x) {
        *y += alpha * x;
    }
}

#[inline]
pub(crate) fn dot(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(x, y)| x * y).sum()
}

/// `a * b`
pub fn multiply(a: &Matrix, b: &Matrix) -> QrResult<Matrix> {
    let mut out = Matrix::zeros(a.size())?;
    multiply_into(a, b, &mut out)?;
    Ok(out)
}

/// `out = a * b`, reusing the storage of `out`.
pub fn multiply_into(a: &Matrix, b: &Matrix, out: &mut Matrix) -> QrResult<()> {
    check_same_size(a, b)?;
    check_same_size(a, out)?;
    for (j, out_col) in out.cols_mut().enumerate() {
        multiply_column(a, b.col(j), out_col);
    }
    Ok(())
}

/// `a * b`, one column of the output per work unit.
///
/// Runs on whatever rayon pool is current.
pub fn multiply_parallel(a: &Matrix, b: &Matrix) -> QrResult<Matrix> {
    let mut out = Matrix::zeros(a.size())?;
    multiply_parallel_into(a, b, &mut out)?;
    Ok(out)
}

pub fn multiply_parallel_into(a: &Matrix, b: &Matrix, out: &mut Matrix) -> QrResult<()> {
    check_same_size(a, b)?;
    check_same_size(a, out)?;
    out.par_cols_from_mut(0)
        .enumerate()
        .for_each(|(j, out_col)| multiply_column(a, b.col(j), out_col));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QrError;

    #[test]
    fn small_product() {
        let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(&[[0.0, 1.0], [1.0, 0.0]]).unwrap();
        let expected = Matrix::from_rows(&[[2.0, 1.0], [4.0, 3.0]]).unwrap();
        assert_eq!(multiply(&a, &b).unwrap(), expected);
        assert_eq!(multiply_parallel(&a, &b).unwrap(), expected);
    }

    #[test]
    fn identity_is_neutral() {
        let a = Matrix::random(7, 10.0, &mut ::rand::thread_rng()).unwrap();
        let id = Matrix::identity(7).unwrap();
        assert_eq!(multiply(&a, &id).unwrap(), a);
        assert_eq!(multiply(&id, &a).unwrap(), a);
    }

    #[test]
    fn parallel_matches_serial() {
        let mut rng = ::rand::thread_rng();
        let a = Matrix::random(33, 10.0, &mut rng).unwrap();
        let b = Matrix::random(33, 10.0, &mut rng).unwrap();
        // same operations in the same order per column
        assert_eq!(multiply(&a, &b).unwrap(), multiply_parallel(&a, &b).unwrap());
    }

    #[test]
    fn mismatched_sizes() {
        let a = Matrix::identity(2).unwrap();
        let b = Matrix::identity(3).unwrap();
        assert_eq!(multiply(&a, &b), Err(QrError::DimensionMismatch { left: 2, right: 3 }));
    }
}
