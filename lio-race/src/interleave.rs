//! Interleaving injection.
//!
//! Blind repetition relies on the scheduler to eventually land in the narrow
//! window between teardown and the pending receive. A seeded
//! [`Interleaving`] nudges each unit by a chosen number of yields after the
//! rendezvous, derived from the seed and the trial index, so a failing
//! trial's perturbation can be replayed exactly.

use std::{fmt, thread};

/// Upper bound on yields injected at one point.
pub const MAX_YIELDS: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interleaving {
  /// Units run unperturbed.
  #[default]
  Free,
  /// Yields are drawn from an rng seeded with this value and the trial index.
  Seeded(u64),
}

impl Interleaving {
  pub fn perturbation(&self, trial: usize) -> Perturbation {
    match *self {
      Self::Free => Perturbation::default(),
      Self::Seeded(seed) => {
        let mut rng = fastrand::Rng::with_seed(
          seed ^ (trial as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15),
        );
        Perturbation {
          before_teardown: rng.u32(0..=MAX_YIELDS),
          before_recv: rng.u32(0..=MAX_YIELDS),
        }
      }
    }
  }
}

impl fmt::Display for Interleaving {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Free => f.write_str("free"),
      Self::Seeded(seed) => write!(f, "seeded({seed:#x})"),
    }
  }
}

/// Yields each unit performs right after the rendezvous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Perturbation {
  pub before_teardown: u32,
  pub before_recv: u32,
}

impl Perturbation {
  pub(crate) fn yield_times(n: u32) {
    for _ in 0..n {
      thread::yield_now();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn free_never_perturbs() {
    for trial in 0..100 {
      assert_eq!(Interleaving::Free.perturbation(trial), Perturbation::default());
    }
  }

  #[test]
  fn seeded_is_reproducible_per_trial() {
    let a = Interleaving::Seeded(0xdead_beef);
    let b = Interleaving::Seeded(0xdead_beef);

    for trial in 0..100 {
      let p = a.perturbation(trial);
      assert_eq!(p, b.perturbation(trial));
      assert!(p.before_teardown <= MAX_YIELDS && p.before_recv <= MAX_YIELDS);
    }
  }

  #[test]
  fn seeded_varies_across_trials() {
    let seeded = Interleaving::Seeded(7);
    let first = seeded.perturbation(0);
    assert!((1..100).any(|trial| seeded.perturbation(trial) != first));
  }
}
