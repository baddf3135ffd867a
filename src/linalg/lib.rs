/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! QR factorization by Gram-Schmidt orthogonalization, and the unshifted
//! QR eigenvalue iteration built on top of it.
//!
//! Three factorizers produce the same factors: [`Sequential`],
//! [`SharedMemory`] (a rayon pool), and the message-passing code in
//! [`distributed`]. [`factorize`] and [`run_eigen_iteration`] pick one
//! according to a [`Mode`].

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[cfg_attr(test, macro_use)]
extern crate qr_eigen_assert_close;

pub use crate::error::{QrError, QrResult};
mod error;

pub use crate::matrix::Matrix;
mod matrix;

pub use crate::mul::{multiply, multiply_into, multiply_parallel, multiply_parallel_into};
mod mul;

pub use crate::gram_schmidt::{Factorize, GramSchmidtKernel, Phase, QrFactors, SINGULAR_EPSILON};
pub mod gram_schmidt;

pub use crate::sequential::Sequential;
pub mod sequential;

pub use crate::shared::SharedMemory;
pub mod shared;

pub mod distributed;

pub use crate::eigen::{EigenEstimate, EigenIteration, Progress};
pub mod eigen;

pub use crate::stop_condition::{ShouldStop, StopCondition, DEFAULT_ITERATIONS};
pub mod stop_condition;

#[cfg(test)]
mod test_util;

/// How a factorization is carried out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    Sequential,
    /// A dedicated pool of this many threads.
    SharedMemory { threads: usize },
    /// This many in-process ranks talking through channels.
    ///
    /// Runs on a real MPI world go through [`distributed`] directly.
    Distributed { processes: usize },
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Sequential => "sequential",
            Mode::SharedMemory { .. } => "shared-memory",
            Mode::Distributed { .. } => "distributed",
        }
    }
}

/// Factor `matrix` as `Q R`. The input is not modified.
pub fn factorize(matrix: &Matrix, mode: &Mode) -> QrResult<QrFactors> {
    debug!("factorizing a {0}x{0} matrix ({1})", matrix.size(), mode.name());
    match *mode {
        Mode::Sequential => sequential::factorize(matrix),
        Mode::SharedMemory { threads } => shared::factorize(matrix, threads),
        Mode::Distributed { processes } => distributed::factorize_local(matrix, processes),
    }
}

/// Estimate the eigenvalues of `matrix` by repeated factorization.
pub fn run_eigen_iteration<S>(matrix: &Matrix, mode: &Mode, stop: &S) -> QrResult<EigenEstimate>
where S: for<'p> ShouldStop<Progress<'p>> + Sync + ?Sized,
{
    match *mode {
        Mode::Sequential => eigen::run_eigen_iteration(&Sequential, matrix, stop),
        Mode::SharedMemory { threads } => {
            eigen::run_eigen_iteration(&SharedMemory::new(threads)?, matrix, stop)
        },
        Mode::Distributed { processes } => {
            distributed::run_eigen_iteration_local(matrix, processes, stop)
        },
    }
}
