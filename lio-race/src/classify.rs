//! Outcome classification.
//!
//! A receive racing against the disposal of its own handle may legitimately
//! lose in a few well-defined ways. [`ErrorCategory::of`] sorts whatever the
//! io-unit observed into one category, and [`AcceptedErrorSet`] decides which
//! categories pass:
//!
//! | Observation                                                       | Category             |
//! |-------------------------------------------------------------------|----------------------|
//! | `EBADF`                                                           | `DisposedAccess`     |
//! | `ECONNRESET`, `ECONNABORTED`, `ENOTCONN`, `ESHUTDOWN`, `EPIPE`    | `TransportAbort`     |
//! | [`IoFailure::FatalSignal`]                                        | `SandboxFatalSignal` |
//! | anything else, including timeouts and panics                      | `Unclassified`       |
//!
//! `SandboxFatalSignal` is only accepted when the run is configured as
//! sandboxed. `Unclassified` is never accepted.

use std::{fmt, io};

use crate::error::IoFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
  /// The handle was already disposed when the call was issued.
  DisposedAccess,
  /// The network stack reset, aborted or disconnected the connection.
  TransportAbort,
  /// A structured fatal signal from a sandboxed execution context.
  ///
  /// Only a backend that reports [`IoFailure::FatalSignal`] produces this,
  /// such as [`Scripted`](crate::backend::Scripted). The [`Os`](crate::backend::Os)
  /// backend does not capture signals and never yields it.
  SandboxFatalSignal,
  Unclassified,
}

impl ErrorCategory {
  pub fn of(failure: &IoFailure) -> Self {
    match failure {
      IoFailure::Os(err) => Self::of_os(err),
      IoFailure::FatalSignal(_) => Self::SandboxFatalSignal,
      IoFailure::Rendezvous(_) | IoFailure::Panicked(_) => Self::Unclassified,
    }
  }

  fn of_os(err: &io::Error) -> Self {
    match err.raw_os_error() {
      Some(libc::EBADF) => Self::DisposedAccess,
      Some(
        libc::ECONNRESET
        | libc::ECONNABORTED
        | libc::ENOTCONN
        | libc::ESHUTDOWN
        | libc::EPIPE,
      ) => Self::TransportAbort,
      Some(_) | None => Self::Unclassified,
    }
  }
}

impl fmt::Display for ErrorCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::DisposedAccess => "disposed-access",
      Self::TransportAbort => "transport-abort",
      Self::SandboxFatalSignal => "sandbox-fatal-signal",
      Self::Unclassified => "unclassified",
    })
  }
}

/// The categories a racing receive may surface without failing the trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptedErrorSet {
  sandboxed: bool,
}

impl AcceptedErrorSet {
  pub const fn new(sandboxed: bool) -> Self {
    Self { sandboxed }
  }

  pub const fn contains(&self, category: ErrorCategory) -> bool {
    match category {
      ErrorCategory::DisposedAccess | ErrorCategory::TransportAbort => true,
      ErrorCategory::SandboxFatalSignal => self.sandboxed,
      ErrorCategory::Unclassified => false,
    }
  }
}

/// A failure outside the accepted set, with the original error intact.
#[derive(Debug)]
pub struct Rejection {
  pub category: ErrorCategory,
  pub failure: IoFailure,
}

impl std::error::Error for Rejection {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    Some(&self.failure)
  }
}

impl fmt::Display for Rejection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({}): {:?}", self.failure, self.category, self.failure)
  }
}

#[derive(Debug)]
pub enum Verdict {
  /// `None` when the receive completed without error.
  Accept(Option<ErrorCategory>),
  Reject(Rejection),
}

impl Verdict {
  pub fn is_accept(&self) -> bool {
    matches!(self, Self::Accept(_))
  }

  /// Category of the observed failure, `None` for a clean completion.
  pub fn category(&self) -> Option<ErrorCategory> {
    match self {
      Self::Accept(category) => *category,
      Self::Reject(rejection) => Some(rejection.category),
    }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct OutcomeClassifier {
  accepted: AcceptedErrorSet,
}

impl OutcomeClassifier {
  pub const fn new(accepted: AcceptedErrorSet) -> Self {
    Self { accepted }
  }

  pub fn accepted(&self) -> AcceptedErrorSet {
    self.accepted
  }

  /// Classifies the io-unit's error, `None` meaning it completed.
  pub fn classify(&self, error: Option<IoFailure>) -> Verdict {
    let Some(failure) = error else {
      return Verdict::Accept(None);
    };

    let category = ErrorCategory::of(&failure);
    if self.accepted.contains(category) {
      Verdict::Accept(Some(category))
    } else {
      Verdict::Reject(Rejection { category, failure })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::RendezvousError;
  use proptest::prelude::*;

  const ACCEPTED_ERRNOS: [i32; 6] = [
    libc::EBADF,
    libc::ECONNRESET,
    libc::ECONNABORTED,
    libc::ENOTCONN,
    libc::ESHUTDOWN,
    libc::EPIPE,
  ];

  fn strict() -> OutcomeClassifier {
    OutcomeClassifier::new(AcceptedErrorSet::new(false))
  }

  #[test]
  fn clean_completion_is_accepted() {
    assert!(matches!(strict().classify(None), Verdict::Accept(None)));
  }

  #[test]
  fn ebadf_is_disposed_access() {
    let verdict = strict().classify(Some(IoFailure::from_errno(libc::EBADF)));
    assert_eq!(verdict.category(), Some(ErrorCategory::DisposedAccess));
    assert!(verdict.is_accept());
  }

  #[test]
  fn timeouts_are_rejected() {
    for errno in [libc::ETIMEDOUT, libc::EAGAIN] {
      let verdict = strict().classify(Some(IoFailure::from_errno(errno)));
      assert!(!verdict.is_accept(), "errno {errno} must not be accepted");
    }
  }

  #[test]
  fn non_os_errors_are_rejected() {
    let kinds = [
      IoFailure::Os(io::Error::other("not an os error")),
      IoFailure::Panicked("boom".into()),
      IoFailure::Rendezvous(RendezvousError::TimedOut),
    ];

    for failure in kinds {
      match strict().classify(Some(failure)) {
        Verdict::Reject(rejection) => {
          assert_eq!(rejection.category, ErrorCategory::Unclassified)
        }
        Verdict::Accept(category) => panic!("accepted as {category:?}"),
      }
    }
  }

  #[test]
  fn fatal_signal_gated_on_sandbox_flag() {
    let signal = || Some(IoFailure::FatalSignal(libc::SIGSEGV));

    assert!(!strict().classify(signal()).is_accept());

    let sandboxed = OutcomeClassifier::new(AcceptedErrorSet::new(true));
    let verdict = sandboxed.classify(signal());
    assert!(verdict.is_accept());
    assert_eq!(verdict.category(), Some(ErrorCategory::SandboxFatalSignal));
  }

  #[test]
  fn rejection_keeps_original_error() {
    let verdict = strict().classify(Some(IoFailure::from_errno(libc::ENOMEM)));
    let Verdict::Reject(rejection) = verdict else {
      panic!("ENOMEM accepted");
    };

    let IoFailure::Os(err) = &rejection.failure else {
      panic!("failure changed shape: {:?}", rejection.failure);
    };
    assert_eq!(err.raw_os_error(), Some(libc::ENOMEM));
    assert!(rejection.to_string().contains(&err.to_string()));
  }

  proptest! {
    #[test]
    fn accept_iff_category_in_set(errno in 1i32..200, sandboxed in any::<bool>()) {
      let classifier = OutcomeClassifier::new(AcceptedErrorSet::new(sandboxed));
      let verdict = classifier.classify(Some(IoFailure::from_errno(errno)));

      prop_assert_eq!(verdict.is_accept(), ACCEPTED_ERRNOS.contains(&errno));
    }

    #[test]
    fn classification_is_stable(errno in 1i32..200) {
      let first = strict().classify(Some(IoFailure::from_errno(errno)));
      let second = strict().classify(Some(IoFailure::from_errno(errno)));

      prop_assert_eq!(first.category(), second.category());
      prop_assert_eq!(first.is_accept(), second.is_accept());
    }
  }
}
