//! In-process group where each rank is a thread.
//!
//! Every collective is one exchange round: each rank deposits a payload,
//! waits for the others, reads every payload, and waits again so no rank can
//! overwrite its slot before everyone has read the round.

use super::{Collective, ReduceOp};
use crate::utils::error::CollectiveError;
use std::sync::{Arc, Barrier, Mutex};

struct Shared {
    slots: Mutex<Vec<Vec<u8>>>,
    barrier: Barrier,
}

/// Factory for a fixed-size thread group
pub struct ThreadGroup;

impl ThreadGroup {
    /// Create `size` connected handles, one per rank, in rank order
    #[allow(clippy::new_ret_no_self)]
    pub fn new(size: usize) -> Vec<ThreadComm> {
        let size = size.max(1);
        let shared = Arc::new(Shared {
            slots: Mutex::new(vec![Vec::new(); size]),
            barrier: Barrier::new(size),
        });

        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

/// One rank's endpoint; move it into the thread that plays that rank
pub struct ThreadComm {
    rank: usize,
    size: usize,
    shared: Arc<Shared>,
}

impl ThreadComm {
    fn exchange(&self, payload: Vec<u8>) -> Result<Vec<Vec<u8>>, CollectiveError> {
        {
            let mut slots = self
                .shared
                .slots
                .lock()
                .map_err(|_| CollectiveError::Poisoned)?;
            slots[self.rank] = payload;
        }
        self.shared.barrier.wait();

        let round = self
            .shared
            .slots
            .lock()
            .map_err(|_| CollectiveError::Poisoned)?
            .clone();
        self.shared.barrier.wait();

        Ok(round)
    }
}

impl Collective for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_reduce_f64(&self, value: f64, op: ReduceOp) -> Result<f64, CollectiveError> {
        let round = self.exchange(value.to_le_bytes().to_vec())?;
        let mut values = round.iter().map(|bytes| decode_word(bytes).map(f64::from_le_bytes));

        let first = values
            .next()
            .ok_or_else(|| CollectiveError::MalformedBroadcast("empty round".to_string()))??;
        values.try_fold(first, |acc, v| -> Result<f64, CollectiveError> {
            Ok(op.apply_f64(acc, v?))
        })
    }

    fn all_reduce_u64(&self, value: u64, op: ReduceOp) -> Result<u64, CollectiveError> {
        let round = self.exchange(value.to_le_bytes().to_vec())?;
        let mut values = round.iter().map(|bytes| decode_word(bytes).map(u64::from_le_bytes));

        let first = values
            .next()
            .ok_or_else(|| CollectiveError::MalformedBroadcast("empty round".to_string()))??;
        values.try_fold(first, |acc, v| -> Result<u64, CollectiveError> {
            Ok(op.apply_u64(acc, v?))
        })
    }

    fn broadcast_bytes(&self, root: usize, payload: &[u8]) -> Result<Vec<u8>, CollectiveError> {
        if root >= self.size {
            return Err(CollectiveError::RankOutOfRange {
                rank: root,
                size: self.size,
            });
        }

        let contribution = if self.rank == root {
            payload.to_vec()
        } else {
            Vec::new()
        };
        let mut round = self.exchange(contribution)?;
        Ok(std::mem::take(&mut round[root]))
    }
}

fn decode_word(bytes: &[u8]) -> Result<[u8; 8], CollectiveError> {
    bytes.try_into().map_err(|_| {
        CollectiveError::MalformedBroadcast(format!("expected 8 bytes, got {}", bytes.len()))
    })
}
