/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Serializable stop conditions for the eigenvalue iteration.
//!
//! In YAML a condition is a single-key map, and `any`/`all` nest:
//!
//! ```yaml
//! any:
//!   - iterations: 200
//!   - all:
//!     - diagonal-delta: 1.0e-10
//!     - subdiagonal-norm: 1e-8
//! ```

use crate::eigen::Progress;

/// Default iteration budget; no convergence test is made.
pub const DEFAULT_ITERATIONS: usize = 10;

pub trait ShouldStop<T> {
    fn should_stop(&self, x: &T) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopCondition {
    /// Stop once this many iterations have been performed.
    Iterations(usize),
    /// Stop once no diagonal entry moved by more than this in the last
    /// iteration. Never true before the first iteration.
    DiagonalDelta(f64),
    /// Stop once the Frobenius norm of the strict lower triangle falls to
    /// this value or below.
    SubdiagonalNorm(f64),
    /// Logical-or. Empty is false.
    Any(Vec<StopCondition>),
    /// Logical-and. Empty is true.
    All(Vec<StopCondition>),
}

impl Default for StopCondition {
    fn default() -> Self { StopCondition::Iterations(DEFAULT_ITERATIONS) }
}

impl StopCondition {
    /// A fixed budget of `iterations`, cut short once the diagonal
    /// stabilizes to within `tolerance`.
    pub fn converged_or_exhausted(iterations: usize, tolerance: f64) -> Self {
        StopCondition::Any(vec![
            StopCondition::Iterations(iterations),
            StopCondition::DiagonalDelta(tolerance),
        ])
    }
}

impl<'a> ShouldStop<Progress<'a>> for StopCondition {
    fn should_stop(&self, progress: &Progress<'a>) -> bool {
        match *self {
            StopCondition::Iterations(n) => progress.iterations >= n,
            StopCondition::DiagonalDelta(tol) => match progress.previous_diagonal {
                None => false,
                Some(prev) => {
                    prev.iter().zip(progress.diagonal)
                        .all(|(a, b)| (a - b).abs() <= tol)
                },
            },
            StopCondition::SubdiagonalNorm(tol) => progress.subdiagonal_norm <= tol,
            StopCondition::Any(ref xs) => xs.iter().any(|x| x.should_stop(progress)),
            StopCondition::All(ref xs) => xs.iter().all(|x| x.should_stop(progress)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress<'a>(iterations: usize, diagonal: &'a [f64], previous: Option<&'a [f64]>) -> Progress<'a> {
        Progress { iterations, diagonal, previous_diagonal: previous, subdiagonal_norm: 1.0 }
    }

    #[test]
    fn deserialize_nested() {
        let cond: StopCondition = ::serde_yaml::from_str("
any:
  - iterations: 200
  - all:
    - diagonal-delta: 1.0e-10
    - subdiagonal-norm: 1.0e-8
").unwrap();

        assert_eq!(cond, StopCondition::Any(vec![
            StopCondition::Iterations(200),
            StopCondition::All(vec![
                StopCondition::DiagonalDelta(1e-10),
                StopCondition::SubdiagonalNorm(1e-8),
            ]),
        ]));
    }

    #[test]
    fn default_is_ten_iterations() {
        let cond = StopCondition::default();
        assert!(!cond.should_stop(&progress(9, &[], None)));
        assert!(cond.should_stop(&progress(10, &[], None)));
    }

    #[test]
    fn diagonal_delta_needs_history() {
        let cond = StopCondition::DiagonalDelta(1e-3);
        assert!(!cond.should_stop(&progress(0, &[1.0, 2.0], None)));
        assert!(cond.should_stop(&progress(1, &[1.0, 2.0], Some(&[1.0005, 2.0]))));
        assert!(!cond.should_stop(&progress(1, &[1.0, 2.0], Some(&[1.0, 2.1]))));
    }

    #[test]
    fn subdiagonal() {
        let cond = StopCondition::SubdiagonalNorm(0.5);
        let mut p = progress(3, &[], None);
        assert!(!cond.should_stop(&p));
        p.subdiagonal_norm = 0.5;
        assert!(cond.should_stop(&p));
    }

    #[test]
    fn empty_logical_expressions() {
        let p = progress(0, &[], None);
        assert!(!StopCondition::Any(vec![]).should_stop(&p));
        assert!(StopCondition::All(vec![]).should_stop(&p));
    }

    #[test]
    fn logic() {
        let cond = StopCondition::converged_or_exhausted(5, 1e-6);
        assert!(!cond.should_stop(&progress(1, &[1.0], Some(&[2.0]))));
        assert!(cond.should_stop(&progress(1, &[1.0], Some(&[1.0]))));
        assert!(cond.should_stop(&progress(5, &[1.0], Some(&[2.0]))));
    }
}
