//! Error taxonomy of the harness.
//!
//! Errors split by who raised them. [`IoFailure`] comes from the io-unit and
//! is always captured and classified, never propagated. Everything else
//! ([`SetupError`], [`DisposeError`], [`TrialError::Hang`]) aborts the run.

use std::{fmt, io, time::Duration};

use crate::classify::Rejection;

/// The pair-construction step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
  Socket,
  Bind,
  Listen,
  LocalAddr,
  Connect,
  Accept,
  /// Spawning one of the unit threads.
  Spawn,
}

impl fmt::Display for SetupStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Socket => "socket",
      Self::Bind => "bind",
      Self::Listen => "listen",
      Self::LocalAddr => "getsockname",
      Self::Connect => "connect",
      Self::Accept => "accept",
      Self::Spawn => "spawn unit thread",
    })
  }
}

/// Building a trial failed before the race started.
#[derive(Debug)]
pub struct SetupError {
  pub step: SetupStep,
  pub source: io::Error,
}

impl SetupError {
  pub fn new(step: SetupStep, source: io::Error) -> Self {
    Self { step, source }
  }

  /// Adapter for `map_err`.
  pub(crate) fn at(step: SetupStep) -> impl FnOnce(io::Error) -> Self {
    move |source| Self::new(step, source)
  }
}

impl std::error::Error for SetupError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    Some(&self.source)
  }
}

impl fmt::Display for SetupError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "setup failed at {}: {}", self.step, self.source)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendezvousError {
  /// The partner did not arrive in time.
  TimedOut,
  /// The barrier already served its generation.
  Overfull,
}

impl std::error::Error for RendezvousError {}

impl fmt::Display for RendezvousError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::TimedOut => f.write_str("rendezvous timed out waiting for partner"),
      Self::Overfull => f.write_str("rendezvous reached by a third participant"),
    }
  }
}

/// What the io-unit observed instead of a clean completion.
#[derive(Debug)]
pub enum IoFailure {
  /// A send or receive returned an OS error.
  Os(io::Error),
  Rendezvous(RendezvousError),
  /// The unit panicked; the payload message is kept.
  Panicked(String),
  /// A fatal signal reported by a sandboxed execution context.
  FatalSignal(i32),
}

impl IoFailure {
  pub fn from_errno(errno: i32) -> Self {
    Self::Os(io::Error::from_raw_os_error(errno))
  }
}

impl From<io::Error> for IoFailure {
  fn from(value: io::Error) -> Self {
    Self::Os(value)
  }
}

impl std::error::Error for IoFailure {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Os(err) => Some(err),
      Self::Rendezvous(err) => Some(err),
      Self::Panicked(_) | Self::FatalSignal(_) => None,
    }
  }
}

impl fmt::Display for IoFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Os(err) => write!(f, "{err}"),
      Self::Rendezvous(err) => write!(f, "{err}"),
      Self::Panicked(msg) => write!(f, "io-unit panicked: {msg}"),
      Self::FatalSignal(signo) => write!(f, "fatal signal {signo}"),
    }
  }
}

/// The dispose-unit failed. Always fatal to the run.
#[derive(Debug)]
pub enum DisposeError {
  Rendezvous(RendezvousError),
  Shutdown(io::Error),
  Close(io::Error),
  Panicked(String),
}

impl std::error::Error for DisposeError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Rendezvous(err) => Some(err),
      Self::Shutdown(err) | Self::Close(err) => Some(err),
      Self::Panicked(_) => None,
    }
  }
}

impl fmt::Display for DisposeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Rendezvous(err) => write!(f, "dispose-unit: {err}"),
      Self::Shutdown(err) => write!(f, "dispose-unit: shutdown failed: {err}"),
      Self::Close(err) => write!(f, "dispose-unit: close failed: {err}"),
      Self::Panicked(msg) => write!(f, "dispose-unit panicked: {msg}"),
    }
  }
}

/// Units that had not reported when the trial timeout fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stalled {
  pub io: bool,
  pub dispose: bool,
}

impl Stalled {
  pub fn any(&self) -> bool {
    self.io || self.dispose
  }
}

impl fmt::Display for Stalled {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (self.io, self.dispose) {
      (true, true) => f.write_str("io-unit and dispose-unit"),
      (true, false) => f.write_str("io-unit"),
      (false, true) => f.write_str("dispose-unit"),
      (false, false) => f.write_str("no unit"),
    }
  }
}

/// Why a single trial failed.
#[derive(Debug)]
pub enum TrialError {
  Setup(SetupError),
  Dispose(DisposeError),
  /// The io-unit's failure is outside the accepted taxonomy.
  Rejected(Rejection),
  /// No outcome before the trial timeout.
  Hang { stalled: Stalled, timeout: Duration },
}

impl From<SetupError> for TrialError {
  fn from(value: SetupError) -> Self {
    Self::Setup(value)
  }
}

impl From<DisposeError> for TrialError {
  fn from(value: DisposeError) -> Self {
    Self::Dispose(value)
  }
}

impl std::error::Error for TrialError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Setup(err) => Some(err),
      Self::Dispose(err) => Some(err),
      Self::Rejected(rejection) => Some(rejection),
      Self::Hang { .. } => None,
    }
  }
}

impl fmt::Display for TrialError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Setup(err) => err.fmt(f),
      Self::Dispose(err) => err.fmt(f),
      Self::Rejected(rejection) => write!(f, "rejected: {rejection}"),
      Self::Hang { stalled, timeout } => {
        write!(f, "hang: {stalled} did not finish within {timeout:?}")
      }
    }
  }
}

/// Why a run failed.
#[derive(Debug)]
pub enum RunError {
  /// Trial `index` (zero based) failed; the run stopped there.
  Trial { index: usize, error: TrialError },
  /// The run budget ran out after `completed` trials.
  OutOfTime { completed: usize, budget: Duration },
}

impl RunError {
  pub fn is_hang(&self) -> bool {
    matches!(self, Self::Trial { error: TrialError::Hang { .. }, .. })
  }
}

impl std::error::Error for RunError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Trial { error, .. } => Some(error),
      Self::OutOfTime { .. } => None,
    }
  }
}

impl fmt::Display for RunError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Trial { index, error } => write!(f, "trial {index} failed: {error}"),
      Self::OutOfTime { completed, budget } => {
        write!(f, "run budget of {budget:?} exhausted after {completed} trials")
      }
    }
  }
}

/// An environment override could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
  pub var: &'static str,
  pub value: String,
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "invalid value for {}: {:?}", self.var, self.value)
  }
}
