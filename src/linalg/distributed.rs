/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Gram-Schmidt across cooperating processes.
//!
//! Every process runs the same code with its own copy of the matrices.
//! Index `i` is owned by process `i mod P`. For each column `k`:
//!
//! 1. every process sums the squares of the entries of column `k` it owns,
//!    and the partial sums are reduced onto the coordinator;
//! 2. the coordinator forms `R[k][k]` and `Q[:, k]` and broadcasts both, so
//!    the singular-column check is made on identical data everywhere;
//! 3. every process projects `Q[:, k]` out of the columns `j > k` it owns,
//!    and workers send `[R[k][j], A[:, j]...]` to the coordinator, which
//!    drains them by increasing rank and then increasing `j`;
//! 4. the coordinator broadcasts the merged working matrix together with
//!    row `k` of `R`.
//!
//! Step 4 is what lets ownership move around between steps, and because it
//! carries `R` as well, every process finishes with the complete `Q` and `R`.

use crate::eigen::{EigenEstimate, Progress};
use crate::gram_schmidt::{check_pivot, pivot_scale, QrFactors};
use crate::mul::{axpy, dot, multiply_into};
use crate::stop_condition::ShouldStop;
use crate::{Matrix, QrError, QrResult};
use ::qr_eigen_comm::{owner_of, Communicator, LocalWorld, Role, Tag};

fn expect_len(tag: Tag, data: &[f64], len: usize) -> QrResult<()> {
    match data.len() == len {
        true => Ok(()),
        false => Err(QrError::topology(format!(
            "{} message has {} values, expected {}", tag, data.len(), len,
        ))),
    }
}

/// Share the coordinator's matrix with every process.
///
/// The size travels first; a coordinator without a matrix sends size zero so
/// that every process fails together instead of leaving workers blocked.
fn distribute_input<C: Communicator>(comm: &C, input: Option<&Matrix>) -> QrResult<Matrix> {
    let packet = match comm.role() {
        Role::Coordinator => Some(match input {
            Some(m) => {
                let mut packet = Vec::with_capacity(m.size() * m.size() + 1);
                packet.push(m.size() as f64);
                packet.extend_from_slice(m.col_major_data());
                packet
            },
            None => vec![0.0],
        }),
        Role::Worker { .. } => None,
    };
    let mut packet = comm.broadcast(Tag::Input, packet)?;
    let size = match packet.first() {
        Some(&size) => size as usize,
        None => return Err(QrError::topology("empty input message")),
    };
    if size == 0 {
        return Err(QrError::InvalidDimension { size });
    }
    expect_len(Tag::Input, &packet, size * size + 1)?;
    packet.remove(0);
    Matrix::from_col_major_data(size, packet)
}

/// Factor the coordinator's matrix across all processes of `comm`.
///
/// `input` is only read on the coordinator, where it must be `Some`.
/// Every process returns the same factors.
pub fn factorize<C: Communicator>(comm: &C, input: Option<&Matrix>) -> QrResult<QrFactors> {
    let mut working = distribute_input(comm, input)?;
    let n = working.size();
    let mut q = Matrix::zeros(n)?;
    let mut r = Matrix::zeros(n)?;
    factorize_in_place(comm, &mut working, &mut q, &mut r)?;
    Ok(QrFactors { q, r })
}

/// Factor a working matrix that is already identical on every process.
///
/// On return `working`, `q` and `r` are again identical everywhere.
pub fn factorize_in_place<C: Communicator>(
    comm: &C,
    working: &mut Matrix,
    q: &mut Matrix,
    r: &mut Matrix,
) -> QrResult<()> {
    let n = working.size();
    let nprocs = comm.size();
    let role = comm.role();
    let owns = |i: usize| owner_of(i, nprocs) == role.rank();
    // the working matrix is identical everywhere, so this is too
    let scale = pivot_scale(working);

    for k in 0..n {
        let partial = partial_norm_squared(working.col(k), &owns);
        let total = comm.reduce_sum(partial)?;

        let norm = normalize_and_share(comm, role, k, total, scale, working, q)?;
        r[(k, k)] = norm;

        project_owned(comm, role, k, &owns, working, q, r)?;
        if let Role::Coordinator = role {
            collect_projections(comm, k, working, r)?;
        }

        resync(comm, role, k, working, r)?;
    }
    Ok(())
}

fn partial_norm_squared(column: &[f64], owns: impl Fn(usize) -> bool) -> f64 {
    column.iter().enumerate()
        .filter(|&(i, _)| owns(i))
        .map(|(_, x)| x * x)
        .sum()
}

// Broadcasts `[R[k][k], Q[0][k], ..., Q[n-1][k]]` and applies it locally.
fn normalize_and_share<C: Communicator>(
    comm: &C,
    role: Role,
    k: usize,
    total: Option<f64>,
    scale: f64,
    working: &Matrix,
    q: &mut Matrix,
) -> QrResult<f64> {
    let n = working.size();
    let packet = match role {
        Role::Coordinator => {
            let total = total.ok_or_else(|| QrError::topology("coordinator received no reduction"))?;
            let norm = total.sqrt();
            let mut packet = Vec::with_capacity(n + 1);
            packet.push(norm);
            match check_pivot(k, norm, scale) {
                Ok(_) => packet.extend(working.col(k).iter().map(|x| x / norm)),
                Err(_) => packet.resize(n + 1, 0.0),
            }
            Some(packet)
        },
        Role::Worker { .. } => None,
    };

    let packet = comm.broadcast(Tag::Normalized, packet)?;
    expect_len(Tag::Normalized, &packet, n + 1)?;
    let norm = check_pivot(k, packet[0], scale)?;
    q.col_mut(k).copy_from_slice(&packet[1..]);
    Ok(norm)
}

fn project_owned<C: Communicator>(
    comm: &C,
    role: Role,
    k: usize,
    owns: impl Fn(usize) -> bool,
    working: &mut Matrix,
    q: &Matrix,
    r: &mut Matrix,
) -> QrResult<()> {
    let n = working.size();
    let q_k = q.col(k);
    for j in (k + 1..n).filter(|&j| owns(j)) {
        let a_j = working.col_mut(j);
        let r_kj = dot(q_k, a_j);
        axpy(-r_kj, q_k, a_j);
        r[(k, j)] = r_kj;

        if let Role::Worker { .. } = role {
            let mut message = Vec::with_capacity(n + 1);
            message.push(r_kj);
            message.extend_from_slice(a_j);
            comm.send_to_coordinator(Tag::Projection, message)?;
        }
    }
    Ok(())
}

fn collect_projections<C: Communicator>(
    comm: &C,
    k: usize,
    working: &mut Matrix,
    r: &mut Matrix,
) -> QrResult<()> {
    let n = working.size();
    let nprocs = comm.size();
    for rank in 1..nprocs {
        for j in (k + 1..n).filter(|&j| owner_of(j, nprocs) == rank) {
            let message = comm.receive_from(rank, Tag::Projection)?;
            expect_len(Tag::Projection, &message, n + 1)?;
            r[(k, j)] = message[0];
            working.col_mut(j).copy_from_slice(&message[1..]);
        }
    }
    trace!("column {}: merged projections from {} workers", k, nprocs - 1);
    Ok(())
}

// Broadcasts the working matrix followed by row `k` of R.
fn resync<C: Communicator>(
    comm: &C,
    role: Role,
    k: usize,
    working: &mut Matrix,
    r: &mut Matrix,
) -> QrResult<()> {
    let n = working.size();
    let packet = match role {
        Role::Coordinator => {
            let mut packet = Vec::with_capacity(n * n + n);
            packet.extend_from_slice(working.col_major_data());
            packet.extend(r.row(k));
            Some(packet)
        },
        Role::Worker { .. } => None,
    };

    let packet = comm.broadcast(Tag::Resync, packet)?;
    expect_len(Tag::Resync, &packet, n * n + n)?;
    if let Role::Worker { .. } = role {
        working.col_major_data_mut().copy_from_slice(&packet[..n * n]);
        r.set_row(k, &packet[n * n..]);
    }
    Ok(())
}

/// The QR eigenvalue iteration across all processes of `comm`.
///
/// After each factorization the coordinator alone forms `R Q` and broadcasts
/// it, and the stop condition is then evaluated on that shared matrix, so
/// every process stops after the same number of iterations and returns the
/// same estimate.
pub fn run_eigen_iteration<C, S>(comm: &C, input: Option<&Matrix>, stop: &S) -> QrResult<EigenEstimate>
where
    C: Communicator,
    S: for<'p> ShouldStop<Progress<'p>> + ?Sized,
{
    let mut working = distribute_input(comm, input)?;
    let n = working.size();
    let mut q = Matrix::zeros(n)?;
    let mut r = Matrix::zeros(n)?;

    let mut diagonal = working.diagonal();
    let mut previous_diagonal: Option<Vec<f64>> = None;
    let mut iterations = 0;
    loop {
        let progress = Progress {
            iterations,
            diagonal: &diagonal,
            previous_diagonal: previous_diagonal.as_deref(),
            subdiagonal_norm: working.subdiagonal_norm(),
        };
        if stop.should_stop(&progress) {
            break;
        }

        factorize_in_place(comm, &mut working, &mut q, &mut r)?;
        let packet = match comm.role() {
            Role::Coordinator => {
                multiply_into(&r, &q, &mut working)?;
                Some(working.col_major_data().to_vec())
            },
            Role::Worker { .. } => None,
        };
        let packet = comm.broadcast(Tag::Iterate, packet)?;
        expect_len(Tag::Iterate, &packet, n * n)?;
        working.col_major_data_mut().copy_from_slice(&packet);

        previous_diagonal = Some(::std::mem::replace(&mut diagonal, working.diagonal()));
        iterations += 1;
        if comm.role().is_coordinator() {
            debug!("iteration {}: diagonal {:?}", iterations, diagonal);
        }
    }
    Ok(EigenEstimate { values: diagonal, iterations })
}

/// Runs [`factorize`] on `processes` in-process ranks and returns the
/// coordinator's result.
pub fn factorize_local(matrix: &Matrix, processes: usize) -> QrResult<QrFactors> {
    coordinator_result(LocalWorld::run(processes, |comm| {
        factorize(comm, select_input(comm, matrix))
    })?)
}

/// Runs [`run_eigen_iteration`] on `processes` in-process ranks and returns
/// the coordinator's result.
pub fn run_eigen_iteration_local<S>(matrix: &Matrix, processes: usize, stop: &S) -> QrResult<EigenEstimate>
where S: for<'p> ShouldStop<Progress<'p>> + Sync + ?Sized,
{
    coordinator_result(LocalWorld::run(processes, |comm| {
        run_eigen_iteration(comm, select_input(comm, matrix), stop)
    })?)
}

fn select_input<'m, C: Communicator>(comm: &C, matrix: &'m Matrix) -> Option<&'m Matrix> {
    match comm.role() {
        Role::Coordinator => Some(matrix),
        Role::Worker { .. } => None,
    }
}

fn coordinator_result<T>(results: Vec<QrResult<T>>) -> QrResult<T> {
    results.into_iter().next()
        .unwrap_or_else(|| Err(QrError::topology("world has no coordinator")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{assert_valid_factors, random_matrix};
    use crate::{sequential, StopCondition};

    #[test]
    fn zero_processes() {
        let a = random_matrix(3, 1);
        match factorize_local(&a, 0) {
            Err(QrError::ProcessTopology { .. }) => {},
            r => panic!("unexpected: {:?}", r),
        }
    }

    #[test]
    fn single_process_is_bitwise_sequential() {
        let a = random_matrix(12, 2);
        assert_eq!(factorize_local(&a, 1).unwrap(), sequential::factorize(&a).unwrap());
    }

    #[test]
    fn properties_hold_across_sizes() {
        for &(n, seed) in &[(1, 31), (2, 32), (8, 33), (50, 34)] {
            let a = random_matrix(n, seed);
            assert_valid_factors(&a, &factorize_local(&a, 3).unwrap());
        }
    }

    #[test]
    fn more_processes_than_columns() {
        let a = random_matrix(3, 35);
        let expected = sequential::factorize(&a).unwrap();
        let actual = factorize_local(&a, 8).unwrap();
        assert_close!(abs=1e-9, actual.q, expected.q);
        assert_close!(abs=1e-9, actual.r, expected.r);
    }

    #[test]
    fn every_process_ends_with_the_same_factors() {
        let a = random_matrix(9, 36);
        let results = LocalWorld::run(4, |comm| factorize(comm, select_input(comm, &a))).unwrap();
        let results: Vec<_> = results.into_iter().map(Result::unwrap).collect();
        for other in &results[1..] {
            assert_eq!(other, &results[0]);
        }
        assert_valid_factors(&a, &results[0]);
    }

    #[test]
    fn zero_column_fails_on_every_process() {
        let a = Matrix::from_rows(&[[0.0, 1.0], [0.0, 2.0]]).unwrap();
        let results = LocalWorld::run(3, |comm| factorize(comm, select_input(comm, &a))).unwrap();
        for result in results {
            assert_eq!(result, Err(QrError::SingularColumn { column: 0, norm: 0.0 }));
        }
    }

    #[test]
    fn missing_input_fails_everywhere() {
        let results = LocalWorld::run(2, |comm| factorize(comm, None)).unwrap();
        for result in results {
            assert_eq!(result, Err(QrError::InvalidDimension { size: 0 }));
        }
    }

    #[test]
    fn eigen_iteration_agrees_across_processes() {
        let a = Matrix::from_rows(&[[2.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 4.0]]).unwrap();
        let stop = StopCondition::Iterations(25);
        let results = LocalWorld::run(3, |comm| {
            run_eigen_iteration(comm, select_input(comm, &a), &stop)
        }).unwrap();
        let results: Vec<_> = results.into_iter().map(Result::unwrap).collect();
        for other in &results[1..] {
            assert_eq!(other, &results[0]);
        }
        assert_eq!(results[0].iterations, 25);
    }
}
