/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::{QrError, QrResult};
use ::qr_eigen_assert_close::{CheckClose, CheckCloseError, Tolerances};
use ::rand::Rng;
use ::rayon::prelude::*;
use ::std::fmt;
use ::std::ops::{Index, IndexMut};

/// Owned, dense, square matrix of `f64` in column-major layout.
///
/// Logical column `j` is the contiguous slice `data[j * size..(j + 1) * size]`.
/// Every algorithm in this crate reaches columns through [`Matrix::col`],
/// [`Matrix::col_mut`] and friends, and reaches single elements through
/// `matrix[(row, col)]`; nothing depends on the physical order otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    // invariant: data.len() == size * size
    // invariant: size >= 1
    data: Vec<f64>,
    size: usize,
}

fn checked_len(size: usize) -> QrResult<usize> {
    if size == 0 {
        return Err(QrError::InvalidDimension { size });
    }
    size.checked_mul(size).ok_or(QrError::ResourceExhaustion { size })
}

impl Matrix {
    pub fn zeros(size: usize) -> QrResult<Self> {
        let len = checked_len(size)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| QrError::ResourceExhaustion { size })?;
        data.resize(len, 0.0);
        Ok(Matrix { data, size })
    }

    pub fn identity(size: usize) -> QrResult<Self> {
        let mut out = Matrix::zeros(size)?;
        for i in 0..size {
            out[(i, i)] = 1.0;
        }
        Ok(out)
    }

    pub fn from_diagonal(diagonal: &[f64]) -> QrResult<Self> {
        let mut out = Matrix::zeros(diagonal.len())?;
        for (i, &x) in diagonal.iter().enumerate() {
            out[(i, i)] = x;
        }
        Ok(out)
    }

    /// Build from a list of rows, as a matrix would be written on paper.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> QrResult<Self> {
        let size = rows.len();
        let mut out = Matrix::zeros(size)?;
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != size {
                return Err(QrError::DimensionMismatch { left: size, right: row.len() });
            }
            for (j, &x) in row.iter().enumerate() {
                out[(i, j)] = x;
            }
        }
        Ok(out)
    }

    pub fn from_col_major_data(size: usize, data: Vec<f64>) -> QrResult<Self> {
        if data.len() != checked_len(size)? {
            return Err(QrError::InvalidDimension { size });
        }
        Ok(Matrix { data, size })
    }

    /// Entries drawn uniformly from `[-max_magnitude, max_magnitude]`.
    ///
    /// A non-positive `max_magnitude` gives the zero matrix.
    pub fn random(size: usize, max_magnitude: f64, rng: &mut impl Rng) -> QrResult<Self> {
        let mut out = Matrix::zeros(size)?;
        if max_magnitude > 0.0 {
            for x in &mut out.data {
                *x = rng.gen_range(-max_magnitude, max_magnitude);
            }
        }
        Ok(out)
    }

    pub fn size(&self) -> usize { self.size }

    pub fn col(&self, j: usize) -> &[f64] {
        let n = self.size;
        &self.data[j * n..(j + 1) * n]
    }

    pub fn col_mut(&mut self, j: usize) -> &mut [f64] {
        let n = self.size;
        &mut self.data[j * n..(j + 1) * n]
    }

    pub fn cols(&self) -> ::std::slice::ChunksExact<'_, f64> { self.data.chunks_exact(self.size) }

    pub fn cols_mut(&mut self) -> ::std::slice::ChunksExactMut<'_, f64> { self.cols_from_mut(0) }

    /// Columns `start..size`, each as its own disjoint mutable slice.
    pub fn cols_from_mut(&mut self, start: usize) -> ::std::slice::ChunksExactMut<'_, f64> {
        let n = self.size;
        self.data[start * n..].chunks_exact_mut(n)
    }

    /// Parallel version of [`Matrix::cols_from_mut`].
    pub fn par_cols_from_mut(&mut self, start: usize) -> ::rayon::slice::ChunksExactMut<'_, f64> {
        let n = self.size;
        self.data[start * n..].par_chunks_exact_mut(n)
    }

    /// Row `i`. This is strided; prefer columns in hot loops.
    pub fn row(&self, i: usize) -> impl Iterator<Item = f64> + '_ {
        self.data[i..].iter().step_by(self.size).cloned()
    }

    pub fn set_row(&mut self, i: usize, values: &[f64]) {
        assert_eq!(values.len(), self.size);
        for (j, &x) in values.iter().enumerate() {
            self[(i, j)] = x;
        }
    }

    pub fn col_major_data(&self) -> &[f64] { &self.data }
    pub fn col_major_data_mut(&mut self) -> &mut [f64] { &mut self.data }
    pub fn into_col_major_data(self) -> Vec<f64> { self.data }

    /// Overwrite with the contents of another matrix of the same size.
    pub fn copy_from(&mut self, other: &Matrix) -> QrResult<()> {
        check_same_size(self, other)?;
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.size).map(|i| self[(i, i)]).collect()
    }

    pub fn trace(&self) -> f64 {
        (0..self.size).map(|i| self[(i, i)]).sum()
    }

    pub fn transpose(&self) -> QrResult<Matrix> {
        let mut out = Matrix::zeros(self.size)?;
        for (j, col) in out.cols_mut().enumerate() {
            for (dest, x) in col.iter_mut().zip(self.row(j)) {
                *dest = x;
            }
        }
        Ok(out)
    }

    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
    }

    /// True if every entry below the diagonal is exactly zero.
    pub fn is_upper_triangular(&self) -> bool {
        self.cols().enumerate().all(|(j, col)| col[j + 1..].iter().all(|&x| x == 0.0))
    }

    /// Frobenius norm of the strictly lower triangle.
    pub fn subdiagonal_norm(&self) -> f64 {
        self.cols().enumerate()
            .map(|(j, col)| col[j + 1..].iter().map(|x| x * x).sum::<f64>())
            .sum::<f64>()
            .sqrt()
    }

    pub fn is_finite(&self) -> bool { self.data.iter().all(|x| x.is_finite()) }
}

pub(crate) fn check_same_size(a: &Matrix, b: &Matrix) -> QrResult<()> {
    match a.size == b.size {
        true => Ok(()),
        false => Err(QrError::DimensionMismatch { left: a.size, right: b.size }),
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        assert!(row < self.size && col < self.size, "index ({}, {}) out of bounds", row, col);
        &self.data[col * self.size + row]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        assert!(row < self.size && col < self.size, "index ({}, {}) out of bounds", row, col);
        &mut self.data[col * self.size + row]
    }
}

/// Rows of comma-terminated cells with two decimals, padded to a common
/// width derived from the largest magnitude.
impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // room for the sign, the dot and two decimals
        let width = ((self.max_abs() + 0.5).log10() + 5.0).max(0.0) as usize;
        for i in 0..self.size {
            for x in self.row(i) {
                write!(f, "{:>width$.2},", x, width = width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl CheckClose for Matrix {
    fn check_close(&self, other: &Matrix, tol: Tolerances) -> Result<(), CheckCloseError> {
        assert_eq!(self.size, other.size, "compared matrices differ in size");
        self.data.check_close(&other.data, tol)
    }
}
