/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The [`Communicator`] protocol on top of an MPI world.
//!
//! Unlike `LocalWorld`, a stalled or crashed rank is never detected here;
//! MPI will simply block (or abort the job).

use crate::{CommError, CommResult, Communicator, Role, Tag, COORDINATOR};
use ::mpi;
use ::mpi::collective::SystemOperation;
use ::mpi::topology::SystemCommunicator;
use ::mpi::traits::{AsCommunicator, Communicator as MpiCommunicator, Destination, Root, Source};

#[derive(Copy, Clone)]
pub struct MpiWorld {
    world: SystemCommunicator,
}

impl MpiWorld {
    /// Wrap the world communicator of an initialized universe.
    pub fn new(world: SystemCommunicator) -> Self { MpiWorld { world } }

    fn root(&self) -> mpi::topology::Process<'_, SystemCommunicator> {
        self.world.process_at_rank(COORDINATOR as i32)
    }
}

impl Communicator for MpiWorld {
    fn rank(&self) -> usize { MpiCommunicator::rank(&self.world) as usize }
    fn size(&self) -> usize { MpiCommunicator::size(&self.world) as usize }

    fn reduce_sum(&self, value: f64) -> CommResult<Option<f64>> {
        let root = self.root();
        match self.role() {
            Role::Coordinator => {
                let mut total = 0.0;
                root.reduce_into_root(&value, &mut total, SystemOperation::sum());
                Ok(Some(total))
            },
            Role::Worker { .. } => {
                root.reduce_into(&value, SystemOperation::sum());
                Ok(None)
            },
        }
    }

    // Differs from `Root::broadcast_into` in that the receivers resize to match.
    fn broadcast(&self, tag: Tag, data: Option<Vec<f64>>) -> CommResult<Vec<f64>> {
        let root = self.root();
        let is_root = this_process_is_root(&root);
        if is_root && data.is_none() {
            return Err(CommError::NothingToBroadcast);
        }

        let mut buf = data.unwrap_or_default();
        let mut len = buf.len() as u64;
        root.broadcast_into(&mut len);
        if !is_root {
            buf.resize(len as usize, 0.0);
        }
        root.broadcast_into(&mut buf[..]);
        trace!("broadcast {} ({} values)", tag, buf.len());
        Ok(buf)
    }

    fn send_to_coordinator(&self, tag: Tag, data: Vec<f64>) -> CommResult<()> {
        if self.role().is_coordinator() {
            return Err(CommError::WrongRole { operation: "send_to_coordinator", rank: self.rank() });
        }
        self.root().send_with_tag(&data[..], tag.code());
        Ok(())
    }

    fn receive_from(&self, rank: usize, tag: Tag) -> CommResult<Vec<f64>> {
        if !self.role().is_coordinator() {
            return Err(CommError::WrongRole { operation: "receive_from", rank: self.rank() });
        }
        if rank == COORDINATOR || rank >= self.size() {
            return Err(CommError::NoSuchRank { rank, size: self.size() });
        }
        let (data, _status) = self.world
            .process_at_rank(rank as i32)
            .receive_vec_with_tag::<f64>(tag.code());
        Ok(data)
    }
}

pub fn this_process_is_root(root: &impl Root) -> bool
{ MpiCommunicator::rank(root.as_communicator()) == root.root_rank() }
