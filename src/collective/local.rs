//! Group of one: the non-distributed case.

use super::{Collective, ReduceOp};
use crate::utils::error::CollectiveError;

/// Rank 0 of a single-process group; every collective is the identity
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl Collective for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce_f64(&self, value: f64, _op: ReduceOp) -> Result<f64, CollectiveError> {
        Ok(value)
    }

    fn all_reduce_u64(&self, value: u64, _op: ReduceOp) -> Result<u64, CollectiveError> {
        Ok(value)
    }

    fn broadcast_bytes(&self, root: usize, payload: &[u8]) -> Result<Vec<u8>, CollectiveError> {
        if root != 0 {
            return Err(CollectiveError::RankOutOfRange { rank: root, size: 1 });
        }
        Ok(payload.to_vec())
    }
}
