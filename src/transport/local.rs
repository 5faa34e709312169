//! In-process transport: P peers as threads over an all-pairs channel mesh
//!
//! Each endpoint owns one receiver per source peer and one sender per
//! destination peer; collectives are built from the same mesh using a tag
//! outside the point-to-point range. Channels are unbounded, so no send ever
//! blocks and the bulk-synchronous call pattern cannot deadlock against
//! buffer limits. A shared [`Barrier`] implements the barrier collective.
//!
//! [`LocalCluster::run`] is the SPMD launcher used by the binary, the
//! end-to-end tests, and the benchmarks: it spawns one scoped thread per peer
//! and hands each the same closure.

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Barrier};
use std::thread;

use super::{RecvHandle, Result, Transport, TransportError};

/// Tag reserved for collective traffic; point-to-point tags stay below it.
const COLLECTIVE_TAG: u32 = u32::MAX;

struct Packet {
    tag: u32,
    bytes: Vec<u8>,
}

/// One peer's endpoint into the mesh.
pub struct LocalEndpoint {
    rank: usize,
    size: usize,
    barrier: Arc<Barrier>,
    /// Sender towards each destination rank.
    senders: Vec<Sender<Packet>>,
    /// Receiver from each source rank.
    inboxes: Vec<Receiver<Packet>>,
    /// Packets pulled while looking for a different tag, per source rank.
    stashes: Vec<VecDeque<Packet>>,
}

impl LocalEndpoint {
    /// Pull the next packet from `from` carrying `tag`, consulting the stash
    /// first and stashing mismatches.
    fn pull(&mut self, from: usize, tag: u32, op: &'static str) -> Result<Vec<u8>> {
        if let Some(at) = self.stashes[from].iter().position(|p| p.tag == tag) {
            if let Some(packet) = self.stashes[from].remove(at) {
                return Ok(packet.bytes);
            }
        }
        loop {
            let packet = self.inboxes[from]
                .recv()
                .map_err(|_| TransportError::Disconnected { peer: from, op })?;
            if packet.tag == tag {
                return Ok(packet.bytes);
            }
            self.stashes[from].push_back(packet);
        }
    }

    fn push(&self, to: usize, tag: u32, bytes: Vec<u8>, op: &'static str) -> Result<()> {
        self.senders[to]
            .send(Packet { tag, bytes })
            .map_err(|_| TransportError::Disconnected { peer: to, op })
    }
}

impl Transport for LocalEndpoint {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&mut self) {
        self.barrier.wait();
    }

    fn broadcast(&mut self, root: usize, buf: &mut Vec<u8>) -> Result<()> {
        if self.rank == root {
            for to in 0..self.size {
                if to != root {
                    self.push(to, COLLECTIVE_TAG, buf.clone(), "broadcast")?;
                }
            }
        } else {
            *buf = self.pull(root, COLLECTIVE_TAG, "broadcast")?;
        }
        Ok(())
    }

    fn all_gather(&mut self, send: &[u8]) -> Result<Vec<u8>> {
        let sizes = vec![send.len(); self.size];
        self.all_gather_var(send, &sizes)
    }

    fn all_gather_var(&mut self, send: &[u8], sizes: &[usize]) -> Result<Vec<u8>> {
        if send.len() != sizes[self.rank] {
            return Err(TransportError::BadContribution {
                expected: sizes[self.rank],
                got: send.len(),
            });
        }
        for to in 0..self.size {
            if to != self.rank {
                self.push(to, COLLECTIVE_TAG, send.to_vec(), "all_gather")?;
            }
        }
        let mut gathered = Vec::with_capacity(sizes.iter().sum());
        for from in 0..self.size {
            if from == self.rank {
                gathered.extend_from_slice(send);
                continue;
            }
            let bytes = self.pull(from, COLLECTIVE_TAG, "all_gather")?;
            if bytes.len() != sizes[from] {
                return Err(TransportError::SizeMismatch {
                    peer: from,
                    expected: sizes[from],
                    got: bytes.len(),
                });
            }
            gathered.extend_from_slice(&bytes);
        }
        Ok(gathered)
    }

    fn send_async(&mut self, to: usize, tag: u32, bytes: Vec<u8>) -> Result<()> {
        self.push(to, tag, bytes, "send")
    }

    fn recv_async(&mut self, from: usize, tag: u32, expected: usize) -> RecvHandle {
        RecvHandle {
            from,
            tag,
            expected,
        }
    }

    fn wait_recv(&mut self, handle: RecvHandle) -> Result<Vec<u8>> {
        let bytes = self.pull(handle.from, handle.tag, "recv")?;
        if bytes.len() != handle.expected {
            return Err(TransportError::SizeMismatch {
                peer: handle.from,
                expected: handle.expected,
                got: bytes.len(),
            });
        }
        Ok(bytes)
    }

    fn wait_sends(&mut self) -> Result<()> {
        // channel sends complete at the call site
        Ok(())
    }
}

/// Launcher for an in-process peer group.
pub struct LocalCluster;

impl LocalCluster {
    /// Build the endpoints of a `size`-peer mesh. Endpoint `i` must end up on
    /// the thread acting as peer `i`.
    pub fn endpoints(size: usize) -> Vec<LocalEndpoint> {
        assert!(size >= 1, "a cluster needs at least one peer");
        let barrier = Arc::new(Barrier::new(size));

        // senders[from][to] and inboxes[to][from] over one channel per pair
        let mut sender_rows: Vec<Vec<Sender<Packet>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut inbox_rows: Vec<Vec<Receiver<Packet>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        for from in 0..size {
            for to in 0..size {
                let (tx, rx) = channel();
                sender_rows[from].push(tx);
                inbox_rows[to].push(rx);
            }
        }

        sender_rows
            .into_iter()
            .zip(inbox_rows)
            .enumerate()
            .map(|(rank, (senders, inboxes))| LocalEndpoint {
                rank,
                size,
                barrier: Arc::clone(&barrier),
                senders,
                inboxes,
                stashes: (0..size).map(|_| VecDeque::new()).collect(),
            })
            .collect()
    }

    /// Run `f` once per peer on its own thread and collect the results in
    /// rank order. Panics if a peer thread panics.
    pub fn run<R, F>(size: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(LocalEndpoint) -> R + Sync,
    {
        let endpoints = Self::endpoints(size);
        thread::scope(|scope| {
            let f = &f;
            let handles: Vec<_> = endpoints
                .into_iter()
                .map(|endpoint| scope.spawn(move || f(endpoint)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("peer thread panicked"))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_reaches_every_peer() {
        let out = LocalCluster::run(4, |mut ep| {
            let mut buf = if ep.rank() == 0 {
                vec![1, 2, 3]
            } else {
                Vec::new()
            };
            ep.broadcast(0, &mut buf).unwrap();
            buf
        });
        assert!(out.iter().all(|b| b == &[1, 2, 3]));
    }

    #[test]
    fn all_gather_concatenates_in_rank_order() {
        let out = LocalCluster::run(3, |mut ep| {
            let mine = [ep.rank() as u8; 2];
            ep.all_gather(&mine).unwrap()
        });
        assert!(out.iter().all(|b| b == &[0, 0, 1, 1, 2, 2]));
    }

    #[test]
    fn all_gather_var_uses_the_size_table() {
        let out = LocalCluster::run(3, |mut ep| {
            let sizes = [1usize, 0, 2];
            let mine = vec![ep.rank() as u8; sizes[ep.rank()]];
            ep.all_gather_var(&mine, &sizes).unwrap()
        });
        assert!(out.iter().all(|b| b == &[0, 2, 2]));
    }

    #[test]
    fn tagged_point_to_point_matches_out_of_order() {
        let out = LocalCluster::run(2, |mut ep| {
            let other = 1 - ep.rank();
            // both tags go out before either receive is waited on
            ep.send_async(other, 7, vec![7]).unwrap();
            ep.send_async(other, 9, vec![9]).unwrap();
            let h9 = ep.recv_async(other, 9, 1);
            let h7 = ep.recv_async(other, 7, 1);
            let nine = ep.wait_recv(h9).unwrap();
            let seven = ep.wait_recv(h7).unwrap();
            ep.wait_sends().unwrap();
            (seven, nine)
        });
        for (seven, nine) in out {
            assert_eq!(seven, vec![7]);
            assert_eq!(nine, vec![9]);
        }
    }

    #[test]
    fn wrong_size_receive_is_an_error() {
        let out = LocalCluster::run(2, |mut ep| {
            if ep.rank() == 0 {
                ep.send_async(1, 0, vec![0; 3]).unwrap();
                true
            } else {
                let handle = ep.recv_async(0, 0, 5);
                ep.wait_recv(handle).is_err()
            }
        });
        assert!(out[1]);
    }

    #[test]
    fn single_peer_collectives_are_identities() {
        let out = LocalCluster::run(1, |mut ep| {
            ep.barrier();
            let mut buf = vec![42];
            ep.broadcast(0, &mut buf).unwrap();
            let gathered = ep.all_gather(&buf).unwrap();
            (buf, gathered)
        });
        assert_eq!(out[0], (vec![42], vec![42]));
    }
}
