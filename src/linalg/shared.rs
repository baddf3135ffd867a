/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Fork-join factorization on a dedicated rayon pool.
//!
//! Each phase is one `install` on the pool, and `install` only returns once
//! every task spawned inside it has finished, which gives the barrier
//! between phases.
//!
//! # Reproducibility
//!
//! The norm is reduced as fixed blocks of [`REDUCTION_BLOCK`] rows whose
//! partial sums are then added in block order. The result therefore does not
//! depend on the number of threads or on scheduling, and for columns no
//! longer than one block it is bitwise identical to [`crate::Sequential`].
//! Normalization and projection do the same arithmetic as the serial code
//! within each work unit, so the whole factorization is reproducible.

use crate::gram_schmidt::{self, Factorize, GramSchmidtKernel, QrFactors};
use crate::mul::{axpy, dot, multiply_parallel_into};
use crate::{Matrix, QrError, QrResult};
use ::rayon::prelude::*;

pub const REDUCTION_BLOCK: usize = 64;

pub struct SharedMemory {
    pool: ::rayon::ThreadPool,
}

impl SharedMemory {
    /// Build a pool of exactly `threads` workers.
    pub fn new(threads: usize) -> QrResult<Self> {
        if threads == 0 {
            return Err(QrError::topology("a thread pool needs at least one thread"));
        }
        let pool = ::rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("qr-worker-{}", i))
            .build()
            .map_err(|e| QrError::topology(format!("could not start thread pool: {}", e)))?;
        debug!("started a pool of {} threads", threads);
        Ok(SharedMemory { pool })
    }

    pub fn num_threads(&self) -> usize { self.pool.current_num_threads() }
}

impl ::std::fmt::Debug for SharedMemory {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("SharedMemory").field("threads", &self.num_threads()).finish()
    }
}

impl GramSchmidtKernel for SharedMemory {
    fn column_norm(&self, column: &[f64]) -> f64 {
        let partials: Vec<f64> = self.pool.install(|| {
            column.par_chunks(REDUCTION_BLOCK)
                .map(|block| block.iter().map(|x| x * x).sum::<f64>())
                .collect()
        });
        partials.iter().sum::<f64>().sqrt()
    }

    fn normalize(&self, column: &[f64], norm: f64, out: &mut [f64]) {
        self.pool.install(|| {
            out.par_iter_mut()
                .zip(column.par_iter())
                .for_each(|(q, a)| *q = a / norm);
        })
    }

    fn project_and_subtract(&self, k: usize, q_k: &[f64], trailing: &mut [f64], r_trailing: &mut [f64]) {
        let n = q_k.len();
        // every unit owns column j of the working matrix and column j of R
        self.pool.install(|| {
            trailing.par_chunks_exact_mut(n)
                .zip(r_trailing.par_chunks_exact_mut(n))
                .for_each(|(a_j, r_j)| {
                    let r_kj = dot(q_k, a_j);
                    r_j[k] = r_kj;
                    axpy(-r_kj, q_k, a_j);
                });
        })
    }
}

impl Factorize for SharedMemory {
    fn factorize_in_place(&self, working: &mut Matrix, q: &mut Matrix, r: &mut Matrix) -> QrResult<()> {
        gram_schmidt::run(self, working, q, r)
    }

    fn multiply_into(&self, a: &Matrix, b: &Matrix, out: &mut Matrix) -> QrResult<()> {
        self.pool.install(|| multiply_parallel_into(a, b, out))
    }
}

pub fn factorize(matrix: &Matrix, threads: usize) -> QrResult<QrFactors> {
    SharedMemory::new(threads)?.factorize(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{assert_valid_factors, random_matrix};

    #[test]
    fn zero_threads() {
        match SharedMemory::new(0) {
            Err(QrError::ProcessTopology { .. }) => {},
            r => panic!("unexpected: {:?}", r),
        }
    }

    #[test]
    fn pool_has_requested_size() {
        assert_eq!(SharedMemory::new(3).unwrap().num_threads(), 3);
    }

    #[test]
    fn properties_hold_across_sizes() {
        for &(n, seed) in &[(1, 11), (2, 12), (8, 13), (50, 14)] {
            let a = random_matrix(n, seed);
            assert_valid_factors(&a, &factorize(&a, 4).unwrap());
        }
    }

    #[test]
    fn matches_sequential_exactly_for_short_columns() {
        let a = random_matrix(REDUCTION_BLOCK, 21);
        let expected = crate::sequential::factorize(&a).unwrap();
        for &threads in &[1, 2, 4, 8] {
            assert_eq!(factorize(&a, threads).unwrap(), expected);
        }
    }

    #[test]
    fn independent_of_thread_count() {
        let a = random_matrix(150, 22);
        let expected = factorize(&a, 1).unwrap();
        for &threads in &[2, 4, 8] {
            assert_eq!(factorize(&a, threads).unwrap(), expected);
        }
    }

    #[test]
    fn zero_column_is_singular() {
        let a = Matrix::from_rows(&[[0.0, 1.0], [0.0, 2.0]]).unwrap();
        assert_eq!(factorize(&a, 2), Err(QrError::SingularColumn { column: 0, norm: 0.0 }));
    }
}
