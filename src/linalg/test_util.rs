/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::gram_schmidt::QrFactors;
use crate::{multiply, Matrix};
use ::rand::{SeedableRng, XorShiftRng};

pub(crate) fn rng(seed: u32) -> XorShiftRng {
    XorShiftRng::from_seed([seed, 0x9E37_79B9, 0x85EB_CA6B, 0xC2B2_AE35])
}

pub(crate) fn random_matrix(n: usize, seed: u32) -> Matrix {
    Matrix::random(n, 100.0, &mut rng(seed)).unwrap()
}

pub(crate) fn assert_valid_factors(a: &Matrix, QrFactors { q, r }: &QrFactors) {
    let n = a.size();
    assert!(r.is_upper_triangular(), "R is not upper triangular:\n{}", r);

    let qtq = multiply(&q.transpose().unwrap(), q).unwrap();
    assert_close!(abs=1e-9, qtq, Matrix::identity(n).unwrap(), "Q^T Q (n = {})", n);

    let qr = multiply(q, r).unwrap();
    assert_close!(abs=1e-6, qr, a.clone(), "QR versus A (n = {})", n);
}
