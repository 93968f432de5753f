//! Collective operations over a fixed group of cooperating processes.
//!
//! The reducer and the report only need rank identity, broadcast and
//! all-reduce. Every member of the group must issue the same sequence of
//! calls; a member that stops participating stalls the rest.

pub mod local;
#[cfg(feature = "mpi")]
pub mod message_passing;
pub mod threads;

pub use local::SingleProcess;
#[cfg(feature = "mpi")]
pub use message_passing::MpiComm;
pub use threads::{ThreadComm, ThreadGroup};

use crate::utils::error::CollectiveError;

/// Combining operation for all-reduce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Max,
    Min,
}

impl ReduceOp {
    pub fn apply_f64(&self, a: f64, b: f64) -> f64 {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Max => a.max(b),
            ReduceOp::Min => a.min(b),
        }
    }

    pub fn apply_u64(&self, a: u64, b: u64) -> u64 {
        match self {
            ReduceOp::Sum => a.saturating_add(b),
            ReduceOp::Max => a.max(b),
            ReduceOp::Min => a.min(b),
        }
    }
}

/// Transport used by the distributed reducer
pub trait Collective {
    /// This process's rank in `0..size()`
    fn rank(&self) -> usize;

    /// Number of processes in the group
    fn size(&self) -> usize;

    /// Combine `value` across the group; every rank receives the result
    fn all_reduce_f64(&self, value: f64, op: ReduceOp) -> Result<f64, CollectiveError>;

    fn all_reduce_u64(&self, value: u64, op: ReduceOp) -> Result<u64, CollectiveError>;

    /// Every rank receives `root`'s payload. Payloads passed by other ranks
    /// are ignored.
    fn broadcast_bytes(&self, root: usize, payload: &[u8]) -> Result<Vec<u8>, CollectiveError>;

    fn broadcast_u64(&self, root: usize, value: u64) -> Result<u64, CollectiveError> {
        let bytes = self.broadcast_bytes(root, &value.to_le_bytes())?;
        let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
            CollectiveError::MalformedBroadcast(format!(
                "expected 8 bytes for an integer, got {}",
                bytes.len()
            ))
        })?;
        Ok(u64::from_le_bytes(raw))
    }
}

impl<T: Collective + ?Sized> Collective for &T {
    fn rank(&self) -> usize {
        (**self).rank()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn all_reduce_f64(&self, value: f64, op: ReduceOp) -> Result<f64, CollectiveError> {
        (**self).all_reduce_f64(value, op)
    }

    fn all_reduce_u64(&self, value: u64, op: ReduceOp) -> Result<u64, CollectiveError> {
        (**self).all_reduce_u64(value, op)
    }

    fn broadcast_bytes(&self, root: usize, payload: &[u8]) -> Result<Vec<u8>, CollectiveError> {
        (**self).broadcast_bytes(root, payload)
    }
}
