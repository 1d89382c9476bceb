//! Repeats the race until it fails or the trial count is reached.

use std::{
  fmt,
  sync::Arc,
  time::{Duration, Instant},
};

use crate::{
  backend::Backend,
  classify::{AcceptedErrorSet, ErrorCategory, OutcomeClassifier, Verdict},
  config::Config,
  error::{RunError, TrialError},
  race::Race,
};

/// Tally of a passing run, by how each trial was accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
  pub trials: usize,
  /// Receive completed without error.
  pub completed: usize,
  pub disposed: usize,
  pub transport_abort: usize,
  pub sandbox_signal: usize,
  pub elapsed: Duration,
}

impl RunReport {
  fn record(&mut self, accepted: Option<ErrorCategory>) {
    self.trials += 1;
    match accepted {
      None => self.completed += 1,
      Some(ErrorCategory::DisposedAccess) => self.disposed += 1,
      Some(ErrorCategory::TransportAbort) => self.transport_abort += 1,
      Some(ErrorCategory::SandboxFatalSignal) => self.sandbox_signal += 1,
      // Never accepted; classify rejects it before it gets here.
      Some(ErrorCategory::Unclassified) => {}
    }
  }
}

impl fmt::Display for RunReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} trials passed in {:.2?} (completed: {}, disposed: {}, transport-abort: {}, sandbox-signal: {})",
      self.trials,
      self.elapsed,
      self.completed,
      self.disposed,
      self.transport_abort,
      self.sandbox_signal
    )
  }
}

/// Drives trials sequentially: create pair, race, classify.
pub struct TrialRunner<B: Backend> {
  backend: Arc<B>,
  race: Race<B>,
  classifier: OutcomeClassifier,
  config: Config,
}

impl<B: Backend> TrialRunner<B> {
  pub fn new(backend: B, config: Config) -> Self {
    Self::with_shared(Arc::new(backend), config)
  }

  /// Like [`new`](Self::new), for callers that keep a handle on the backend.
  pub fn with_shared(backend: Arc<B>, config: Config) -> Self {
    Self {
      race: Race::new(Arc::clone(&backend), &config),
      classifier: OutcomeClassifier::new(AcceptedErrorSet::new(config.sandboxed)),
      backend,
      config,
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Runs up to `trials` trials and stops at the first failure.
  ///
  /// Trials never overlap: each one has released its sockets before the next
  /// pair is created.
  pub fn run(&self, trials: usize) -> Result<RunReport, RunError> {
    let started = Instant::now();
    let mut report = RunReport::default();

    #[cfg(feature = "tracing")]
    tracing::info!(
      trials,
      interleaving = %self.config.interleaving,
      sandboxed = self.config.sandboxed,
      "starting race run"
    );

    for index in 0..trials {
      if let Some(budget) = self.config.run_budget
        && started.elapsed() >= budget
      {
        #[cfg(feature = "tracing")]
        tracing::error!(completed = index, ?budget, "run budget exhausted");
        return Err(RunError::OutOfTime { completed: index, budget });
      }

      match self.run_trial(index) {
        Ok(accepted) => report.record(accepted),
        Err(error) => {
          #[cfg(feature = "tracing")]
          tracing::error!(trial = index, %error, "trial failed");
          return Err(RunError::Trial { index, error });
        }
      }

      #[cfg(feature = "tracing")]
      if (index + 1) % 1_000 == 0 {
        tracing::debug!(done = index + 1, elapsed = ?started.elapsed(), "progress");
      }
    }

    report.elapsed = started.elapsed();

    #[cfg(feature = "tracing")]
    tracing::info!(%report, "race run passed");

    Ok(report)
  }

  /// Runs trial `index` once, returning the accepted category.
  pub fn run_trial(&self, index: usize) -> Result<Option<ErrorCategory>, TrialError> {
    let pair = self.backend.connected_pair(index)?;
    let perturbation = self.config.interleaving.perturbation(index);

    let outcome = self.race.run(pair, perturbation)?;
    if outcome.timed_out {
      return Err(TrialError::Hang {
        stalled: outcome.stalled,
        timeout: self.config.trial_timeout,
      });
    }

    match self.classifier.classify(outcome.error) {
      Verdict::Accept(category) => {
        #[cfg(feature = "tracing")]
        tracing::trace!(trial = index, ?category, received = outcome.received, "accepted");
        Ok(category)
      }
      Verdict::Reject(rejection) => Err(TrialError::Rejected(rejection)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::{Script, Scripted, Step};

  fn runner(scripts: impl IntoIterator<Item = Script>) -> (Arc<Scripted>, TrialRunner<Scripted>) {
    let backend = Arc::new(Scripted::new(scripts));
    let config = Config::default().with_trial_timeout(Duration::from_millis(200));
    (Arc::clone(&backend), TrialRunner::with_shared(backend, config))
  }

  #[test]
  fn tallies_each_accepted_category() {
    let (_, runner) = runner([
      Script::default(),
      Script::recv(Step::Complete(0)),
      Script::recv(Step::Errno(libc::EBADF)),
      Script::recv(Step::Errno(libc::ECONNRESET)),
    ]);

    let report = runner.run(8).unwrap();
    assert_eq!(report.trials, 8);
    assert_eq!(report.completed, 4);
    assert_eq!(report.disposed, 2);
    assert_eq!(report.transport_abort, 2);
    assert_eq!(report.sandbox_signal, 0);
  }

  #[test]
  fn stops_at_first_rejection() {
    let (backend, runner) = runner([
      Script::default(),
      Script::default(),
      Script::recv(Step::Errno(libc::EINVAL)),
    ]);

    let err = runner.run(100).unwrap_err();
    assert!(matches!(err, RunError::Trial { index: 2, error: TrialError::Rejected(_) }));
    assert_eq!(backend.pairs_created(), 3, "kept going after the rejection");
  }

  #[test]
  fn setup_failure_aborts_the_run() {
    let (backend, runner) = runner([Script::default().with_setup_failure(libc::ECONNREFUSED)]);

    match runner.run(10) {
      Err(RunError::Trial { index: 0, error: TrialError::Setup(err) }) => {
        assert_eq!(err.source.raw_os_error(), Some(libc::ECONNREFUSED));
      }
      other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(backend.pairs_created(), 0);
  }

  #[test]
  fn exhausted_budget_is_reported() {
    let backend = Scripted::new([Script::default()]);
    let config = Config::default().with_run_budget(Some(Duration::ZERO));

    let err = TrialRunner::new(backend, config).run(5).unwrap_err();
    assert!(matches!(err, RunError::OutOfTime { completed: 0, .. }));
  }

  #[test]
  fn zero_trials_pass_trivially() {
    let (_, runner) = runner(Vec::new());
    assert_eq!(runner.run(0).unwrap().trials, 0);
  }
}
