//! Group-communication contract for the peer protocol
//!
//! Every collective the simulation driver relies on is a method here, one per
//! primitive of the underlying communication layer: barrier, rooted broadcast,
//! fixed- and variable-size all-gather, and tagged non-blocking point-to-point
//! for the halo exchange. All payloads are raw bytes; the wire module owns the
//! record layouts that cross this boundary.
//!
//! The protocol is SPMD and bulk-synchronous: every peer must call the same
//! sequence of collectives in the same order, and a collective returns only
//! once every peer has contributed. A peer that stops calling deadlocks the
//! run; there are no timeouts.

pub mod local;
pub mod wire;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("peer {peer} went away during {op}")]
    Disconnected { peer: usize, op: &'static str },
    #[error("peer {peer} sent {got} bytes where {expected} were advertised")]
    SizeMismatch {
        peer: usize,
        expected: usize,
        got: usize,
    },
    #[error("local contribution is {got} bytes but the size table says {expected}")]
    BadContribution { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// A pending receive posted with [`Transport::recv_async`].
#[derive(Debug)]
pub struct RecvHandle {
    pub(crate) from: usize,
    pub(crate) tag: u32,
    pub(crate) expected: usize,
}

pub trait Transport {
    /// This peer's index in `[0, size)`.
    fn rank(&self) -> usize;

    /// Number of peers in the group.
    fn size(&self) -> usize;

    /// Block until every peer has entered the barrier.
    fn barrier(&mut self);

    /// Rooted broadcast of a variable-size buffer. On `root`, `buf` holds the
    /// payload; on every other peer it is replaced by the received bytes.
    fn broadcast(&mut self, root: usize, buf: &mut Vec<u8>) -> Result<()>;

    /// Every peer contributes the same number of bytes; every peer receives
    /// the concatenation in rank order.
    fn all_gather(&mut self, send: &[u8]) -> Result<Vec<u8>>;

    /// Every peer contributes `sizes[rank]` bytes and receives the
    /// concatenation in rank order; `sizes` must be identical on all peers.
    fn all_gather_var(&mut self, send: &[u8], sizes: &[usize]) -> Result<Vec<u8>>;

    /// Post a non-blocking send of `bytes` to `to` under `tag`. Completion is
    /// observed through [`Transport::wait_sends`].
    fn send_async(&mut self, to: usize, tag: u32, bytes: Vec<u8>) -> Result<()>;

    /// Post a non-blocking receive from `from` under `tag`, expecting exactly
    /// `expected` bytes.
    fn recv_async(&mut self, from: usize, tag: u32, expected: usize) -> RecvHandle;

    /// Complete a posted receive, blocking until the matching message lands.
    fn wait_recv(&mut self, handle: RecvHandle) -> Result<Vec<u8>>;

    /// Block until every posted send has been handed off.
    fn wait_sends(&mut self) -> Result<()>;
}
