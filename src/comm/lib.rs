/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Message passing between one coordinator and any number of workers.
//!
//! All processes run the same code and talk through a [`Communicator`].
//! Only four patterns are supported, and every one of them is blocking:
//!
//! * reduce-to-coordinator of a single `f64` ([`Communicator::reduce_sum`]),
//! * broadcast of a vector from the coordinator ([`Communicator::broadcast`]),
//! * worker-to-coordinator sends ([`Communicator::send_to_coordinator`]),
//! * coordinator receives from a specific worker ([`Communicator::receive_from`]).
//!
//! Two backends exist. [`LocalWorld`] simulates `P` processes with threads
//! and channels inside the current process, and is what tests use.
//! `MpiWorld` (feature `mpi-support`) runs on an actual MPI world.

#[macro_use]
extern crate log;

use std::fmt;

pub use crate::local::{LocalComm, LocalWorld};
mod local;

#[cfg(feature = "mpi-support")]
pub use crate::mpi_world::{MpiWorld, this_process_is_root};
#[cfg(feature = "mpi-support")]
mod mpi_world;

pub type CommResult<T> = Result<T, CommError>;

/// Rank of the coordinator process.
pub const COORDINATOR: usize = 0;

/// Which side of the coordinator asymmetry a process is on.
///
/// Algorithms receive this explicitly instead of testing `rank == 0`
/// wherever they need to know.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Worker { rank: usize },
}

impl Role {
    pub fn from_rank(rank: usize) -> Role {
        match rank {
            COORDINATOR => Role::Coordinator,
            rank => Role::Worker { rank },
        }
    }

    pub fn rank(self) -> usize {
        match self {
            Role::Coordinator => COORDINATOR,
            Role::Worker { rank } => rank,
        }
    }

    pub fn is_coordinator(self) -> bool { self == Role::Coordinator }
}

/// Label carried by every message so that a receiver can tell when the two
/// sides of the protocol have fallen out of step.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Input,
    PartialNorm,
    Normalized,
    Projection,
    Resync,
    Iterate,
}

impl Tag {
    pub fn code(self) -> i32 {
        match self {
            Tag::Input => 10,
            Tag::PartialNorm => 11,
            Tag::Normalized => 12,
            Tag::Projection => 13,
            Tag::Resync => 14,
            Tag::Iterate => 15,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { fmt::Debug::fmt(self, f) }
}

#[derive(Debug, thiserror::Error)]
pub enum CommError {
    #[error("a world needs at least one process")]
    EmptyWorld,

    #[error("process {rank} stopped responding")]
    PeerLost { rank: usize },

    #[error("process {rank} panicked")]
    Panicked { rank: usize },

    #[error("expected a {expected} message from process {rank}, got {found}")]
    UnexpectedMessage { rank: usize, expected: Tag, found: Tag },

    #[error("{operation} is not available to process {rank}")]
    WrongRole { operation: &'static str, rank: usize },

    #[error("no process with rank {rank} (world size {size})")]
    NoSuchRank { rank: usize, size: usize },

    #[error("the coordinator did not provide a value to broadcast")]
    NothingToBroadcast,
}

/// The operations the distributed algorithms are allowed to use.
pub trait Communicator {
    fn rank(&self) -> usize;

    /// Number of processes, including the coordinator.
    fn size(&self) -> usize;

    fn role(&self) -> Role { Role::from_rank(self.rank()) }

    /// Sum `value` over every process.
    ///
    /// The total is `Some` on the coordinator and `None` on workers.
    fn reduce_sum(&self, value: f64) -> CommResult<Option<f64>>;

    /// Replicate the coordinator's vector on every process.
    ///
    /// `data` must be `Some` on the coordinator and is ignored elsewhere.
    /// Workers learn the length from the coordinator.
    fn broadcast(&self, tag: Tag, data: Option<Vec<f64>>) -> CommResult<Vec<f64>>;

    /// Worker-only.
    fn send_to_coordinator(&self, tag: Tag, data: Vec<f64>) -> CommResult<()>;

    /// Coordinator-only. Blocks until the next message from `rank` arrives.
    fn receive_from(&self, rank: usize, tag: Tag) -> CommResult<Vec<f64>>;
}

impl<'a, C: Communicator + ?Sized> Communicator for &'a C {
    fn rank(&self) -> usize { (**self).rank() }
    fn size(&self) -> usize { (**self).size() }
    fn reduce_sum(&self, value: f64) -> CommResult<Option<f64>> { (**self).reduce_sum(value) }
    fn broadcast(&self, tag: Tag, data: Option<Vec<f64>>) -> CommResult<Vec<f64>> { (**self).broadcast(tag, data) }
    fn send_to_coordinator(&self, tag: Tag, data: Vec<f64>) -> CommResult<()> { (**self).send_to_coordinator(tag, data) }
    fn receive_from(&self, rank: usize, tag: Tag) -> CommResult<Vec<f64>> { (**self).receive_from(rank, tag) }
}

/// Round-robin ownership: index `i` belongs to process `i mod size`.
#[inline]
pub fn owner_of(index: usize, size: usize) -> usize { index % size }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles() {
        assert_eq!(Role::from_rank(0), Role::Coordinator);
        assert_eq!(Role::from_rank(3), Role::Worker { rank: 3 });
        assert_eq!(Role::from_rank(3).rank(), 3);
        assert!(Role::Coordinator.is_coordinator());
    }

    #[test]
    fn round_robin() {
        let owners: Vec<_> = (0..7).map(|i| owner_of(i, 3)).collect();
        assert_eq!(owners, vec![0, 1, 2, 0, 1, 2, 0]);
    }
}
