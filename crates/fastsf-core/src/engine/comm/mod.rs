//! The process group that cooperates on one structure-function computation.
//!
//! The engine only needs one collective primitive: an ordered gather to a root rank. It is
//! expressed by the [`Communicator`] trait so the same engine code runs on a single process,
//! on a group of threads inside one process ([`LocalGroup`]), or across an MPI job
//! ([`MpiComm`], behind the `mpi` feature).

pub mod local;
#[cfg(feature = "mpi")]
pub mod mpi;

pub use local::{LocalComm, LocalGroup};
#[cfg(feature = "mpi")]
pub use self::mpi::MpiComm;

use thiserror::Error;

/// Rank that receives gathered contributions and owns the result grids.
pub const ROOT: usize = 0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommError {
    #[error("The process group was aborted")]
    Aborted,

    #[error("Rank {rank} contributed {found} element(s) to a gather expecting {expected}")]
    LengthMismatch {
        rank: usize,
        expected: usize,
        found: usize,
    },

    #[error("Rank {rank} left the process group while others were still in a collective call")]
    Departed { rank: usize },

    #[error("Root rank {root} does not exist in a group of {size}")]
    InvalidRoot { root: usize, size: usize },

    #[error("Communication backend failure: {0}")]
    Backend(String),
}

/// A fixed group of ranks `0..size()` that can gather buffers to a root.
///
/// Gathers are collective: every rank must make the same sequence of calls with slices of
/// identical length. The root receives the concatenation of all slices ordered by rank; every
/// other rank receives `None`.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    #[inline]
    fn is_root(&self) -> bool {
        self.rank() == ROOT
    }

    fn gather_u64(&self, local: &[u64], root: usize) -> Result<Option<Vec<u64>>, CommError>;

    fn gather_f64(&self, local: &[f64], root: usize) -> Result<Option<Vec<f64>>, CommError>;

    /// Tells the rest of the group that this rank cannot continue.
    ///
    /// Thread-group peers blocked in a gather fail with [`CommError::Aborted`]; the MPI
    /// backend terminates the whole job and does not return.
    fn abort(&self, code: i32);
}

/// A group of exactly one rank.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleProcess;

impl SingleProcess {
    fn gather<T: Clone>(&self, local: &[T], root: usize) -> Result<Option<Vec<T>>, CommError> {
        if root != ROOT {
            return Err(CommError::InvalidRoot { root, size: 1 });
        }
        Ok(Some(local.to_vec()))
    }
}

impl Communicator for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn gather_u64(&self, local: &[u64], root: usize) -> Result<Option<Vec<u64>>, CommError> {
        self.gather(local, root)
    }

    fn gather_f64(&self, local: &[f64], root: usize) -> Result<Option<Vec<f64>>, CommError> {
        self.gather(local, root)
    }

    fn abort(&self, _code: i32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_process_gather_is_identity() {
        let comm = SingleProcess;
        assert!(comm.is_root());
        assert_eq!(comm.size(), 1);
        assert_eq!(comm.gather_u64(&[3, 1, 2], ROOT), Ok(Some(vec![3, 1, 2])));
        assert_eq!(comm.gather_f64(&[], ROOT), Ok(Some(vec![])));
    }

    #[test]
    fn single_process_rejects_foreign_root() {
        assert_eq!(
            SingleProcess.gather_f64(&[1.0], 1),
            Err(CommError::InvalidRoot { root: 1, size: 1 })
        );
    }
}
