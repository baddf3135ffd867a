/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Generating the input and driving a run in each execution mode.

use crate::FailResult;
use crate::config::{Execution, Ranks, ValidatedSettings};
use crate::report;

use ::qr_eigen_comm::{Communicator, LocalWorld, Role};
use ::qr_eigen_linalg::{distributed, EigenEstimate, Matrix, Mode, QrFactors};
use ::rand::{SeedableRng, XorShiftRng};
use ::std::time::{Duration, Instant};

/// What a coordinator learns from a run.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub input: Matrix,
    pub factors: QrFactors,
    pub elapsed: Duration,
    pub eigen: EigenEstimate,
}

pub fn generate_input(settings: &ValidatedSettings) -> FailResult<Matrix> {
    let mut rng = match settings.seed {
        Some(seed) => XorShiftRng::from_seed([seed, 0x9E37_79B9, 0x85EB_CA6B, 0xC2B2_AE35]),
        None => ::rand::weak_rng(),
    };
    Ok(Matrix::random(settings.size, settings.max_number, &mut rng)?)
}

/// Runs sequentially or on a thread pool.
pub fn run_local(settings: &ValidatedSettings, mode: &Mode) -> FailResult<Outcome> {
    let input = generate_input(settings)?;
    report::started(input.size());

    let start = Instant::now();
    let factors = ::qr_eigen_linalg::factorize(&input, mode)?;
    let elapsed = start.elapsed();
    report::finished(input.size(), elapsed);

    let eigen = ::qr_eigen_linalg::run_eigen_iteration(&input, mode, &settings.stop)?;
    Ok(Outcome { input, factors, elapsed, eigen })
}

/// The body run by every rank of a distributed run.
///
/// Only the coordinator generates input and gets an `Outcome`.
pub fn run_on<C: Communicator>(settings: &ValidatedSettings, comm: &C) -> FailResult<Option<Outcome>> {
    let input = match comm.role() {
        Role::Coordinator => {
            let input = generate_input(settings)?;
            report::started(input.size());
            Some(input)
        },
        Role::Worker { .. } => None,
    };

    let start = Instant::now();
    let factors = distributed::factorize(comm, input.as_ref())?;
    let elapsed = start.elapsed();
    if let Some(input) = &input {
        report::finished(input.size(), elapsed);
    }

    let eigen = distributed::run_eigen_iteration(comm, input.as_ref(), &settings.stop)?;
    Ok(input.map(|input| Outcome { input, factors, elapsed, eigen }))
}

/// Runs `run_on` over in-process ranks.
pub fn run_local_world(settings: &ValidatedSettings, processes: usize) -> FailResult<Outcome> {
    info!("distributing over {} in-process ranks", processes);
    let mut results = LocalWorld::run(processes, |comm| run_on(settings, comm))?.into_iter();

    let coordinator = match results.next() {
        Some(result) => result?,
        None => bail!("no ranks were started"),
    };
    for (rank, result) in results.enumerate() {
        if let Err(e) = result {
            warn!("rank {}: {}", rank + 1, e);
        }
    }
    match coordinator {
        Some(outcome) => Ok(outcome),
        None => bail!("(BUG) the coordinator produced no outcome"),
    }
}

/// Reports a finished run: timing file, eigenvalues, and the `-v` dump.
pub fn finish(settings: &ValidatedSettings, outcome: &Outcome) -> FailResult<()> {
    if let Some(path) = &settings.output {
        report::append_timing(path, outcome.input.size(), outcome.elapsed)?;
    }
    info!(
        "eigenvalue estimate after {} iterations: {:?}",
        outcome.eigen.iterations, outcome.eigen.values,
    );
    if settings.display {
        report::display(&outcome.input, &outcome.factors, &outcome.eigen)?;
    }
    Ok(())
}

/// Everything except MPI.
pub fn run(settings: &ValidatedSettings) -> FailResult<()> {
    let outcome = match settings.execution {
        Execution::Distributed(Ranks::Local(processes)) => run_local_world(settings, processes)?,
        Execution::Distributed(Ranks::MpiWorld) => {
            bail!("(BUG) MPI runs must go through the MPI entry point")
        },
        execution => match execution.local_mode() {
            Some(mode) => run_local(settings, &mode)?,
            None => bail!("(BUG) no local mode for {:?}", execution),
        },
    };
    finish(settings, &outcome)
}

#[cfg(feature = "mpi-support")]
pub use self::mpi_run::MpiSession;
#[cfg(feature = "mpi-support")]
mod mpi_run {
    use super::*;
    use ::qr_eigen_comm::MpiWorld;

    /// Keeps MPI initialized for as long as it lives.
    pub struct MpiSession {
        _universe: ::mpi::environment::Universe,
        world: MpiWorld,
    }

    impl MpiSession {
        pub fn init() -> FailResult<MpiSession> {
            let universe = match ::mpi::initialize() {
                Some(universe) => universe,
                None => bail!("MPI was already initialized"),
            };
            let world = MpiWorld::new(universe.world());
            Ok(MpiSession { _universe: universe, world })
        }

        pub fn role(&self) -> Role { self.world.role() }

        /// Every rank takes part in a distributed run on the MPI world.
        /// Anything else runs on the coordinator alone.
        pub fn run(&self, settings: &ValidatedSettings) -> FailResult<()> {
            match settings.execution {
                Execution::Distributed(Ranks::MpiWorld) => {
                    info!("distributing over {} MPI processes", self.world.size());
                    match run_on(settings, &self.world)? {
                        Some(outcome) => finish(settings, &outcome),
                        None => Ok(()),
                    }
                },
                _ => match self.role() {
                    Role::Coordinator => super::run(settings),
                    Role::Worker { rank } => {
                        debug!("rank {} idle: the run is not distributed over MPI", rank);
                        Ok(())
                    },
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use ::qr_eigen_linalg::StopCondition;

    fn settings(size: usize, execution: Execution) -> ValidatedSettings {
        let mut settings = Settings { size: Some(size), seed: Some(5), ..Settings::default() }
            .validate().unwrap();
        settings.execution = execution;
        settings
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let s = settings(6, Execution::Sequential);
        let a = generate_input(&s).unwrap();
        assert_eq!(a, generate_input(&s).unwrap());
        assert!(a.max_abs() <= 100.0);
        assert_ne!(a.max_abs(), 0.0);
    }

    #[test]
    fn distributed_matches_sequential() {
        let seq = run_local(&settings(7, Execution::Sequential), &Mode::Sequential).unwrap();
        let dist = run_local_world(&settings(7, Execution::Distributed(Ranks::Local(3))), 3).unwrap();
        assert_eq!(dist.input, seq.input);
        assert_eq!(dist.eigen.iterations, seq.eigen.iterations);
        assert_close!(abs=1e-6, &dist.eigen.values, &seq.eigen.values);
    }

    #[test]
    fn stop_condition_reaches_the_iteration() {
        let mut s = settings(4, Execution::SharedMemory { threads: 2 });
        s.stop = StopCondition::Iterations(3);
        let outcome = run_local(&s, &Mode::SharedMemory { threads: 2 }).unwrap();
        assert_eq!(outcome.eigen.iterations, 3);
    }
}
