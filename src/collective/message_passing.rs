//! Transport over an MPI communicator, for runs spread across real
//! processes (`mpirun -n N ...`).
//!
//! MPI reports failures by aborting the job itself, so every operation here
//! returns `Ok` once the call completes.

use super::{Collective, ReduceOp};
use crate::utils::error::CollectiveError;
use ::mpi::collective::SystemOperation;
use ::mpi::environment::Universe;
use ::mpi::topology::SimpleCommunicator;
use ::mpi::traits::*;

/// One process's endpoint in an MPI world
pub struct MpiComm {
    world: SimpleCommunicator,
    // Finalizes MPI on drop; declared after `world` so it is dropped last
    _universe: Option<Universe>,
}

impl MpiComm {
    /// Initialize MPI and use the world communicator.
    ///
    /// MPI can only be initialized once per process; a host that already
    /// did should use [`MpiComm::from_communicator`].
    pub fn init() -> Result<Self, CollectiveError> {
        let universe = ::mpi::initialize().ok_or(CollectiveError::InitFailed)?;
        Ok(Self {
            world: universe.world(),
            _universe: Some(universe),
        })
    }

    /// Wrap a communicator from an MPI environment the host owns
    pub fn from_communicator(world: SimpleCommunicator) -> Self {
        Self {
            world,
            _universe: None,
        }
    }
}

fn system_op(op: ReduceOp) -> SystemOperation {
    match op {
        ReduceOp::Sum => SystemOperation::sum(),
        ReduceOp::Max => SystemOperation::max(),
        ReduceOp::Min => SystemOperation::min(),
    }
}

impl Collective for MpiComm {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn all_reduce_f64(&self, value: f64, op: ReduceOp) -> Result<f64, CollectiveError> {
        let mut result = 0.0f64;
        self.world.all_reduce_into(&value, &mut result, system_op(op));
        Ok(result)
    }

    fn all_reduce_u64(&self, value: u64, op: ReduceOp) -> Result<u64, CollectiveError> {
        let mut result = 0u64;
        self.world.all_reduce_into(&value, &mut result, system_op(op));
        Ok(result)
    }

    fn broadcast_bytes(&self, root: usize, payload: &[u8]) -> Result<Vec<u8>, CollectiveError> {
        let size = self.size();
        if root >= size {
            return Err(CollectiveError::RankOutOfRange { rank: root, size });
        }
        let root_process = self.world.process_at_rank(root as i32);

        // Length first so receivers can size their buffers
        let mut len = payload.len() as u64;
        root_process.broadcast_into(&mut len);

        let mut buffer = if self.rank() == root {
            payload.to_vec()
        } else {
            vec![0u8; len as usize]
        };
        root_process.broadcast_into(&mut buffer[..]);
        Ok(buffer)
    }
}
