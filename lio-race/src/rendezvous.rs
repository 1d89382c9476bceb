//! Two-party rendezvous barrier.
//!
//! [`Rendezvous`] pins the relative order of the two units in a trial: the
//! io-unit arrives after its send has completed, the dispose-unit arrives
//! right before teardown, and neither proceeds until both are there.
//!
//! Waits can be bounded. A participant whose wait times out withdraws its
//! arrival, so a late partner cannot be released by a ghost. A barrier built
//! with [`Rendezvous::once`] serves a single generation and answers every
//! later arrival with [`RendezvousError::Overfull`] instead of blocking it.
//!
//! ```rust
//! use std::{sync::Arc, thread};
//! use lio_race::rendezvous::Rendezvous;
//!
//! let barrier = Arc::new(Rendezvous::once());
//! let other = Arc::clone(&barrier);
//! let t = thread::spawn(move || other.signal_and_wait().unwrap());
//! let here = barrier.signal_and_wait().unwrap();
//! let there = t.join().unwrap();
//! assert_ne!(here.is_leader(), there.is_leader());
//! ```

use std::time::{Duration, Instant};

use crate::{
  error::RendezvousError,
  sync::{Condvar, Mutex},
};

/// Participants per generation.
pub const PARTIES: usize = 2;

struct State {
  arrived: usize,
  generation: u64,
}

/// A reusable two-party barrier.
pub struct Rendezvous {
  state: Mutex<State>,
  condvar: Condvar,
  /// Generations this barrier may complete, `None` for unlimited.
  limit: Option<u64>,
}

/// Returned to each participant once the generation completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
  leader: bool,
}

impl BarrierWaitResult {
  /// `true` for the participant whose arrival completed the generation.
  pub fn is_leader(&self) -> bool {
    self.leader
  }
}

impl Rendezvous {
  /// A barrier that can be passed any number of times.
  pub const fn new() -> Self {
    Self::with_limit(None)
  }

  /// A barrier for exactly one generation of two arrivals.
  pub const fn once() -> Self {
    Self::with_limit(Some(1))
  }

  const fn with_limit(limit: Option<u64>) -> Self {
    Self {
      state: Mutex::new(State { arrived: 0, generation: 0 }),
      condvar: Condvar::new(),
      limit,
    }
  }

  /// Blocks until the partner arrives.
  pub fn signal_and_wait(&self) -> Result<BarrierWaitResult, RendezvousError> {
    self.wait_until(None)
  }

  /// Blocks until the partner arrives or `timeout` elapses.
  pub fn signal_and_wait_timeout(
    &self,
    timeout: Duration,
  ) -> Result<BarrierWaitResult, RendezvousError> {
    self.wait_until(Some(Instant::now() + timeout))
  }

  /// Blocks until the partner arrives or `deadline` passes.
  pub fn signal_and_wait_deadline(
    &self,
    deadline: Instant,
  ) -> Result<BarrierWaitResult, RendezvousError> {
    self.wait_until(Some(deadline))
  }

  /// Number of completed generations.
  pub fn generation(&self) -> u64 {
    self.state.lock().generation
  }

  fn wait_until(
    &self,
    deadline: Option<Instant>,
  ) -> Result<BarrierWaitResult, RendezvousError> {
    let mut state = self.state.lock();

    if self.limit.is_some_and(|limit| state.generation >= limit) {
      return Err(RendezvousError::Overfull);
    }

    let generation = state.generation;
    state.arrived += 1;

    if state.arrived == PARTIES {
      state.arrived = 0;
      state.generation += 1;
      self.condvar.notify_all();
      return Ok(BarrierWaitResult { leader: true });
    }

    loop {
      state = match deadline {
        None => self.condvar.wait(state),
        Some(deadline) => {
          let now = Instant::now();
          if now >= deadline {
            state.arrived -= 1;
            return Err(RendezvousError::TimedOut);
          }
          self.condvar.wait_timeout(state, deadline - now).0
        }
      };

      // Loop handles spurious wakeups
      if state.generation != generation {
        return Ok(BarrierWaitResult { leader: false });
      }
    }
  }
}

impl Default for Rendezvous {
  fn default() -> Self {
    Self::new()
  }
}
