#![cfg_attr(docsrs, feature(doc_cfg))]

//! # lio-race - Socket teardown race harness
//!
//! Repeatedly races a blocking receive on one end of a loopback TCP
//! connection against a concurrent `shutdown` + `close` of that same end, and
//! checks that the receive only ever ends in one of a small set of accepted
//! ways.
//!
//! Every trial:
//!
//! 1. creates a fresh connected pair ([`pair::connected_pair`]),
//! 2. sends one byte on the server end,
//! 3. lets the io-unit and the dispose-unit meet at a two-party
//!    [`Rendezvous`](rendezvous::Rendezvous),
//! 4. receives on the client end while the other thread tears it down,
//! 5. classifies what the receive saw ([`classify`]).
//!
//! The first trial whose outcome falls outside the accepted taxonomy stops
//! the run and is reported with its index.
//!
//! | Outcome                                  | Verdict                       |
//! |------------------------------------------|-------------------------------|
//! | receive returned 0 or 1 bytes            | accept                        |
//! | `EBADF` (handle already closed)          | accept                        |
//! | reset / aborted / not connected / `EPIPE`| accept                        |
//! | fatal signal                             | accept only when sandboxed    |
//! | anything else                            | reject                        |
//! | no outcome within the trial timeout      | hang                          |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lio_race::config::Config;
//!
//! let report = lio_race::run(&Config::default().with_trials(500))?;
//! println!("{report}");
//! # Ok::<(), lio_race::error::RunError>(())
//! ```
//!
//! Scenarios can be replayed deterministically with the
//! [`Scripted`](backend::Scripted) backend and a [`TrialRunner`].
//!
//! ## Platform support
//!
//! Unix only. Linux and macOS are exercised.

#[macro_use]
mod macros;

pub mod backend;
pub mod classify;
pub mod config;
pub mod error;
pub mod interleave;
mod net_utils;
pub mod op;
pub mod pair;
pub mod race;
pub mod rendezvous;
pub mod resource;
pub mod runner;
mod sync;

pub use classify::{ErrorCategory, OutcomeClassifier, Verdict};
pub use config::Config;
pub use error::{RunError, TrialError};
pub use runner::{RunReport, TrialRunner};

/// Runs `config.trials` trials against real loopback sockets.
pub fn run(config: &Config) -> Result<RunReport, RunError> {
  TrialRunner::new(backend::Os, config.clone()).run(config.trials)
}
