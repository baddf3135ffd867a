/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The unshifted QR eigenvalue algorithm.
//!
//! `A_{k+1} = R_k Q_k` where `A_k = Q_k R_k`. Each step is a similarity
//! transform, so the diagonal of the working matrix tends towards the
//! eigenvalues for matrices with real eigenvalues of distinct magnitude.

use crate::gram_schmidt::Factorize;
use crate::stop_condition::ShouldStop;
use crate::{Matrix, QrResult};
use ::std::mem;

/// What a stop condition gets to look at between iterations.
#[derive(Debug, Clone)]
pub struct Progress<'a> {
    pub iterations: usize,
    pub diagonal: &'a [f64],
    /// The diagonal before the most recent iteration.
    pub previous_diagonal: Option<&'a [f64]>,
    pub subdiagonal_norm: f64,
}

/// Diagonal of the final iterate. No particular ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenEstimate {
    pub values: Vec<f64>,
    pub iterations: usize,
}

/// Iteration state. The working matrix and both factor buffers are
/// allocated once and reused by every step.
pub struct EigenIteration<'f, F: ?Sized> {
    factorizer: &'f F,
    working: Matrix,
    q: Matrix,
    r: Matrix,
    diagonal: Vec<f64>,
    previous_diagonal: Option<Vec<f64>>,
    iterations: usize,
}

impl<'f, F: Factorize + ?Sized> EigenIteration<'f, F> {
    /// Starts from a copy of `input`.
    pub fn new(factorizer: &'f F, input: &Matrix) -> QrResult<Self> {
        let n = input.size();
        Ok(EigenIteration {
            factorizer,
            working: input.clone(),
            q: Matrix::zeros(n)?,
            r: Matrix::zeros(n)?,
            diagonal: input.diagonal(),
            previous_diagonal: None,
            iterations: 0,
        })
    }

    pub fn working(&self) -> &Matrix { &self.working }

    pub fn progress(&self) -> Progress<'_> {
        Progress {
            iterations: self.iterations,
            diagonal: &self.diagonal,
            previous_diagonal: self.previous_diagonal.as_deref(),
            subdiagonal_norm: self.working.subdiagonal_norm(),
        }
    }

    /// Factor the working matrix and replace it with `R Q`.
    ///
    /// On error the working matrix is left partially reduced and the
    /// iteration should be abandoned.
    pub fn step(&mut self) -> QrResult<()> {
        self.factorizer.factorize_in_place(&mut self.working, &mut self.q, &mut self.r)?;
        self.factorizer.multiply_into(&self.r, &self.q, &mut self.working)?;

        let diagonal = self.working.diagonal();
        self.previous_diagonal = Some(mem::replace(&mut self.diagonal, diagonal));
        self.iterations += 1;
        debug!("iteration {}: diagonal {:?}", self.iterations, self.diagonal);
        Ok(())
    }

    pub fn run<S>(mut self, stop: &S) -> QrResult<EigenEstimate>
    where S: for<'p> ShouldStop<Progress<'p>> + ?Sized,
    {
        while !stop.should_stop(&self.progress()) {
            self.step()?;
        }
        Ok(EigenEstimate { values: self.diagonal, iterations: self.iterations })
    }
}

/// Run the iteration on a copy of `input` until `stop` says otherwise.
pub fn run_eigen_iteration<F, S>(factorizer: &F, input: &Matrix, stop: &S) -> QrResult<EigenEstimate>
where
    F: Factorize + ?Sized,
    S: for<'p> ShouldStop<Progress<'p>> + ?Sized,
{
    EigenIteration::new(factorizer, input)?.run(stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::random_matrix;
    use crate::{QrError, Sequential, SharedMemory, StopCondition};

    fn sorted(mut values: Vec<f64>) -> Vec<f64> {
        values.sort_by(|a, b| b.partial_cmp(a).unwrap());
        values
    }

    #[test]
    fn diagonal_matrix_is_a_fixed_point() {
        let a = Matrix::from_diagonal(&[5.0, 3.0, 1.0]).unwrap();
        let est = run_eigen_iteration(&Sequential, &a, &StopCondition::Iterations(20)).unwrap();
        assert_eq!(est.iterations, 20);
        assert_close!(abs=1e-6, est.values, vec![5.0, 3.0, 1.0]);
    }

    #[test]
    fn symmetric_two_by_two() {
        let a = Matrix::from_rows(&[[2.0, 1.0], [1.0, 2.0]]).unwrap();
        let est = run_eigen_iteration(&Sequential, &a, &StopCondition::Iterations(60)).unwrap();
        assert_close!(abs=1e-9, sorted(est.values), vec![3.0, 1.0]);
    }

    #[test]
    fn trace_is_preserved() {
        let a = random_matrix(6, 17);
        let mut iter = EigenIteration::new(&Sequential, &a).unwrap();
        for _ in 0..5 {
            iter.step().unwrap();
            assert_close!(abs=1e-8, iter.working().trace(), a.trace());
        }
    }

    #[test]
    fn zero_iterations_returns_input_diagonal() {
        let a = random_matrix(4, 18);
        let est = run_eigen_iteration(&Sequential, &a, &StopCondition::Iterations(0)).unwrap();
        assert_eq!(est, EigenEstimate { values: a.diagonal(), iterations: 0 });
    }

    #[test]
    fn tolerance_stops_early() {
        let a = Matrix::from_rows(&[[4.0, 1.0], [2.0, 3.0]]).unwrap();
        let stop = StopCondition::converged_or_exhausted(1000, 1e-12);
        let est = run_eigen_iteration(&Sequential, &a, &stop).unwrap();
        assert!(est.iterations < 1000);
        assert_close!(abs=1e-9, sorted(est.values), vec![5.0, 2.0]);
    }

    #[test]
    fn shared_memory_agrees() {
        let a = Matrix::from_rows(&[[2.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 4.0]]).unwrap();
        let stop = StopCondition::Iterations(30);
        let seq = run_eigen_iteration(&Sequential, &a, &stop).unwrap();
        let par = run_eigen_iteration(&SharedMemory::new(3).unwrap(), &a, &stop).unwrap();
        assert_close!(abs=1e-9, par.values, seq.values);
    }

    #[test]
    fn singular_input_fails() {
        let a = Matrix::from_rows(&[[1.0, 2.0], [2.0, 4.0]]).unwrap();
        match run_eigen_iteration(&Sequential, &a, &StopCondition::default()) {
            Err(QrError::SingularColumn { column: 1, .. }) => {},
            r => panic!("unexpected: {:?}", r),
        }
    }
}
