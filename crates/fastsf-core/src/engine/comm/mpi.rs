use super::{CommError, Communicator};
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::{Communicator as _, Equivalence, Root};

/// The world communicator of an MPI job.
///
/// MPI is finalized when the value is dropped, so it must outlive every collective call.
pub struct MpiComm {
    world: SimpleCommunicator,
    // Dropped last; finalizes MPI.
    _universe: Universe,
}

impl MpiComm {
    pub fn initialize() -> Result<Self, CommError> {
        let universe = mpi::initialize()
            .ok_or_else(|| CommError::Backend("MPI has already been initialized".to_string()))?;
        let world = universe.world();
        Ok(Self {
            world,
            _universe: universe,
        })
    }

    fn gather<T>(&self, local: &[T], root: usize) -> Result<Option<Vec<T>>, CommError>
    where
        T: Equivalence + Clone + Default,
    {
        let size = self.size();
        if root >= size {
            return Err(CommError::InvalidRoot { root, size });
        }

        let root_process = self.world.process_at_rank(root as i32);
        if self.rank() == root {
            let mut gathered = vec![T::default(); local.len() * size];
            root_process.gather_into_root(local, &mut gathered[..]);
            Ok(Some(gathered))
        } else {
            root_process.gather_into(local);
            Ok(None)
        }
    }
}

impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn gather_u64(&self, local: &[u64], root: usize) -> Result<Option<Vec<u64>>, CommError> {
        self.gather(local, root)
    }

    fn gather_f64(&self, local: &[f64], root: usize) -> Result<Option<Vec<f64>>, CommError> {
        self.gather(local, root)
    }

    fn abort(&self, code: i32) {
        self.world.abort(code)
    }
}
