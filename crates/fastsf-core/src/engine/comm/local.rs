use super::{CommError, Communicator};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::thread;
use tracing::warn;

#[derive(Debug)]
struct ExchangeState {
    arrived: usize,
    generation: u64,
    aborted: bool,
    departed: Option<usize>,
    u64_slots: Vec<Vec<u64>>,
    f64_slots: Vec<Vec<f64>>,
}

impl ExchangeState {
    fn check(&self) -> Result<(), CommError> {
        if self.aborted {
            return Err(CommError::Aborted);
        }
        match self.departed {
            Some(rank) => Err(CommError::Departed { rank }),
            None => Ok(()),
        }
    }
}

fn u64_slots(state: &mut ExchangeState) -> &mut Vec<Vec<u64>> {
    &mut state.u64_slots
}

fn f64_slots(state: &mut ExchangeState) -> &mut Vec<Vec<f64>> {
    &mut state.f64_slots
}

/// Shared mailbox of a thread group: one slot per rank plus a reusable barrier.
#[derive(Debug)]
struct Exchange {
    size: usize,
    state: Mutex<ExchangeState>,
    turnstile: Condvar,
}

impl Exchange {
    fn new(size: usize) -> Self {
        Self {
            size,
            state: Mutex::new(ExchangeState {
                arrived: 0,
                generation: 0,
                aborted: false,
                departed: None,
                u64_slots: vec![Vec::new(); size],
                f64_slots: vec![Vec::new(); size],
            }),
            turnstile: Condvar::new(),
        }
    }

    /// Blocks until every rank has arrived, or the group is aborted.
    fn wait_all(&self, state: &mut MutexGuard<'_, ExchangeState>) -> Result<(), CommError> {
        state.check()?;
        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.size {
            state.arrived = 0;
            state.generation += 1;
            self.turnstile.notify_all();
            return Ok(());
        }
        while state.generation == generation {
            state.check()?;
            self.turnstile.wait(state);
        }
        Ok(())
    }

    fn gather<T: Clone>(
        &self,
        rank: usize,
        local: &[T],
        root: usize,
        slots: fn(&mut ExchangeState) -> &mut Vec<Vec<T>>,
    ) -> Result<Option<Vec<T>>, CommError> {
        if root >= self.size {
            return Err(CommError::InvalidRoot {
                root,
                size: self.size,
            });
        }

        let mut state = self.state.lock();
        state.check()?;
        slots(&mut *state)[rank] = local.to_vec();
        self.wait_all(&mut state)?;

        let gathered = if rank == root {
            let expected = local.len();
            let mismatch = slots(&mut *state)
                .iter()
                .enumerate()
                .find(|(_, slot)| slot.len() != expected)
                .map(|(rank, slot)| CommError::LengthMismatch {
                    rank,
                    expected,
                    found: slot.len(),
                });
            if let Some(error) = mismatch {
                state.aborted = true;
                self.turnstile.notify_all();
                return Err(error);
            }
            Some(slots(&mut *state).concat())
        } else {
            None
        };

        self.wait_all(&mut state)?;
        Ok(gathered)
    }

    fn abort(&self) {
        self.state.lock().aborted = true;
        self.turnstile.notify_all();
    }

    fn depart(&self, rank: usize, clean: bool) {
        let mut state = self.state.lock();
        if clean {
            state.departed.get_or_insert(rank);
        } else {
            state.aborted = true;
        }
        self.turnstile.notify_all();
    }
}

/// Marks a rank as gone when its closure returns or unwinds.
struct Departure<'a> {
    exchange: &'a Exchange,
    rank: usize,
    clean: bool,
}

impl Drop for Departure<'_> {
    fn drop(&mut self) {
        self.exchange.depart(self.rank, self.clean);
    }
}

/// One rank's handle on a [`LocalGroup`].
#[derive(Debug)]
pub struct LocalComm<'a> {
    rank: usize,
    exchange: &'a Exchange,
}

impl Communicator for LocalComm<'_> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.exchange.size
    }

    fn gather_u64(&self, local: &[u64], root: usize) -> Result<Option<Vec<u64>>, CommError> {
        self.exchange.gather(self.rank, local, root, u64_slots)
    }

    fn gather_f64(&self, local: &[f64], root: usize) -> Result<Option<Vec<f64>>, CommError> {
        self.exchange.gather(self.rank, local, root, f64_slots)
    }

    fn abort(&self, code: i32) {
        warn!(rank = self.rank, code, "Aborting local process group.");
        self.exchange.abort();
    }
}

/// A process group of `size` ranks run as scoped threads of the current process.
///
/// If a rank returns an error or panics, the group is aborted so that peers blocked in a
/// gather fail with [`CommError::Aborted`] instead of waiting forever.
#[derive(Debug, Clone, Copy)]
pub struct LocalGroup {
    size: usize,
}

impl LocalGroup {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    /// Runs `task` once per rank and returns the per-rank results in rank order.
    pub fn run<T, E, F>(&self, task: F) -> Vec<Result<T, E>>
    where
        F: Fn(&LocalComm<'_>) -> Result<T, E> + Sync,
        T: Send,
        E: Send,
    {
        let exchange = Exchange::new(self.size);
        thread::scope(|scope| {
            let handles: Vec<_> = (0..self.size)
                .map(|rank| {
                    let exchange = &exchange;
                    let task = &task;
                    scope.spawn(move || {
                        let mut departure = Departure {
                            exchange,
                            rank,
                            clean: false,
                        };
                        let result = task(&LocalComm { rank, exchange });
                        departure.clean = result.is_ok();
                        result
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        })
    }
}
