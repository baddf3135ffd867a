/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Threads standing in for processes.
//!
//! Every worker has one FIFO channel towards the coordinator and one back.
//! Messages between a given pair of processes therefore arrive in the order
//! they were sent, which is all the protocol relies on.

use crate::{CommError, CommResult, Communicator, Role, Tag, COORDINATOR};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::thread;

#[derive(Debug)]
struct Envelope {
    tag: Tag,
    data: Vec<f64>,
}

#[derive(Debug)]
enum Links {
    Coordinator {
        // index `w - 1` talks to worker `w`
        to_workers: Vec<Sender<Envelope>>,
        from_workers: Vec<Receiver<Envelope>>,
    },
    Worker {
        to_coordinator: Sender<Envelope>,
        from_coordinator: Receiver<Envelope>,
    },
}

/// One endpoint of a [`LocalWorld`].
#[derive(Debug)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    links: Links,
}

/// Runs the same closure on `size` threads, each with its own [`LocalComm`].
pub struct LocalWorld;

impl LocalWorld {
    /// Runs `func` once per rank and returns every rank's output, ordered by rank.
    ///
    /// A rank that returns drops its channels, so peers still waiting on it get
    /// [`CommError::PeerLost`] instead of hanging.
    pub fn run<R, F>(size: usize, func: F) -> CommResult<Vec<R>>
    where
        R: Send,
        F: Fn(&LocalComm) -> R + Sync,
    {
        let comms = LocalComm::create_world(size)?;
        debug!("starting local world of {} processes", size);

        thread::scope(|scope| {
            let func = &func;
            let handles: Vec<_> = comms.into_iter()
                .map(|comm| scope.spawn(move || func(&comm)))
                .collect();

            handles.into_iter()
                .enumerate()
                .map(|(rank, handle)| handle.join().map_err(|_| CommError::Panicked { rank }))
                .collect()
        })
    }
}

impl LocalComm {
    /// Builds the endpoints for every rank without starting any threads.
    pub fn create_world(size: usize) -> CommResult<Vec<LocalComm>> {
        if size == 0 {
            return Err(CommError::EmptyWorld);
        }

        let mut to_workers = Vec::with_capacity(size - 1);
        let mut from_workers = Vec::with_capacity(size - 1);
        let mut workers = Vec::with_capacity(size - 1);
        for rank in 1..size {
            let (down_tx, down_rx) = unbounded();
            let (up_tx, up_rx) = unbounded();
            to_workers.push(down_tx);
            from_workers.push(up_rx);
            workers.push(LocalComm {
                rank, size,
                links: Links::Worker { to_coordinator: up_tx, from_coordinator: down_rx },
            });
        }

        let coordinator = LocalComm {
            rank: COORDINATOR, size,
            links: Links::Coordinator { to_workers, from_workers },
        };
        Ok(Some(coordinator).into_iter().chain(workers).collect())
    }

    fn wrong_role(&self, operation: &'static str) -> CommError {
        CommError::WrongRole { operation, rank: self.rank }
    }

    fn worker_link(&self, rank: usize) -> CommResult<usize> {
        match rank {
            0 => Err(CommError::NoSuchRank { rank, size: self.size }),
            r if r >= self.size => Err(CommError::NoSuchRank { rank, size: self.size }),
            r => Ok(r - 1),
        }
    }
}

fn open(rank: usize, expected: Tag, envelope: Envelope) -> CommResult<Vec<f64>> {
    match envelope.tag == expected {
        true => Ok(envelope.data),
        false => Err(CommError::UnexpectedMessage { rank, expected, found: envelope.tag }),
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize { self.rank }
    fn size(&self) -> usize { self.size }

    fn role(&self) -> Role {
        match self.links {
            Links::Coordinator { .. } => Role::Coordinator,
            Links::Worker { .. } => Role::Worker { rank: self.rank },
        }
    }

    fn reduce_sum(&self, value: f64) -> CommResult<Option<f64>> {
        match &self.links {
            Links::Coordinator { from_workers, .. } => {
                // fixed summation order: coordinator first, then by rank
                let mut total = value;
                for (index, rx) in from_workers.iter().enumerate() {
                    let rank = index + 1;
                    let envelope = rx.recv().map_err(|_| CommError::PeerLost { rank })?;
                    let data = open(rank, Tag::PartialNorm, envelope)?;
                    total += data.iter().sum::<f64>();
                }
                Ok(Some(total))
            },
            Links::Worker { to_coordinator, .. } => {
                to_coordinator.send(Envelope { tag: Tag::PartialNorm, data: vec![value] })
                    .map_err(|_| CommError::PeerLost { rank: COORDINATOR })?;
                Ok(None)
            },
        }
    }

    fn broadcast(&self, tag: Tag, data: Option<Vec<f64>>) -> CommResult<Vec<f64>> {
        match &self.links {
            Links::Coordinator { to_workers, .. } => {
                let data = data.ok_or(CommError::NothingToBroadcast)?;
                for (index, tx) in to_workers.iter().enumerate() {
                    tx.send(Envelope { tag, data: data.clone() })
                        .map_err(|_| CommError::PeerLost { rank: index + 1 })?;
                }
                trace!("broadcast {} ({} values)", tag, data.len());
                Ok(data)
            },
            Links::Worker { from_coordinator, .. } => {
                let envelope = from_coordinator.recv()
                    .map_err(|_| CommError::PeerLost { rank: COORDINATOR })?;
                open(COORDINATOR, tag, envelope)
            },
        }
    }

    fn send_to_coordinator(&self, tag: Tag, data: Vec<f64>) -> CommResult<()> {
        match &self.links {
            Links::Coordinator { .. } => Err(self.wrong_role("send_to_coordinator")),
            Links::Worker { to_coordinator, .. } => {
                to_coordinator.send(Envelope { tag, data })
                    .map_err(|_| CommError::PeerLost { rank: COORDINATOR })
            },
        }
    }

    fn receive_from(&self, rank: usize, tag: Tag) -> CommResult<Vec<f64>> {
        match &self.links {
            Links::Worker { .. } => Err(self.wrong_role("receive_from")),
            Links::Coordinator { from_workers, .. } => {
                let rx = &from_workers[self.worker_link(rank)?];
                let envelope = rx.recv().map_err(|_| CommError::PeerLost { rank })?;
                open(rank, tag, envelope)
            },
        }
    }
}
