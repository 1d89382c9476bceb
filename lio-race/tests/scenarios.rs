use std::{sync::Arc, time::Duration};

use lio_race::{
  ErrorCategory, TrialError, TrialRunner,
  backend::{Script, Scripted, Step},
  config::Config,
  error::{IoFailure, RunError, Stalled},
};

fn runner(script: Script, config: Config) -> TrialRunner<Scripted> {
  TrialRunner::new(Scripted::new([script]), config)
}

fn quick() -> Config {
  Config::default().with_trial_timeout(Duration::from_millis(200))
}

macro_rules! scenario {
  ($name:ident, $script:expr, $expected:pat) => {
    pastey::paste! {
      #[test]
      fn [<scenario_ $name>]() {
        let runner = runner($script, quick());
        let outcome = runner.run_trial(0);
        assert!(
          matches!(outcome, $expected),
          "unexpected outcome: {outcome:?}"
        );
      }
    }
  };
}

// A: the receive wins and returns whatever was buffered.
scenario!(a_receive_completes_with_payload, Script::recv(Step::Complete(1)), Ok(None));
scenario!(a_receive_sees_end_of_stream, Script::recv(Step::Complete(0)), Ok(None));

// B: teardown wins, the receive is issued on a disposed handle.
scenario!(
  b_close_before_receive,
  Script::recv(Step::Errno(libc::EBADF)),
  Ok(Some(ErrorCategory::DisposedAccess))
);

// C: shutdown lands while the receive is pending.
scenario!(
  c_shutdown_mid_receive,
  Script::recv(Step::Errno(libc::ECONNRESET)),
  Ok(Some(ErrorCategory::TransportAbort))
);
scenario!(
  c_not_connected,
  Script::recv(Step::Errno(libc::ENOTCONN)),
  Ok(Some(ErrorCategory::TransportAbort))
);
scenario!(
  c_broken_pipe,
  Script::recv(Step::Errno(libc::EPIPE)),
  Ok(Some(ErrorCategory::TransportAbort))
);

// D: anything else is a defect.
scenario!(
  d_out_of_memory,
  Script::recv(Step::Errno(libc::ENOMEM)),
  Err(TrialError::Rejected(_))
);
scenario!(
  d_invalid_argument,
  Script::recv(Step::Errno(libc::EINVAL)),
  Err(TrialError::Rejected(_))
);
scenario!(
  d_timed_out_is_not_a_transport_abort,
  Script::recv(Step::Errno(libc::ETIMEDOUT)),
  Err(TrialError::Rejected(_))
);
scenario!(
  d_unsandboxed_fatal_signal,
  Script::recv(Step::FatalSignal(libc::SIGSEGV)),
  Err(TrialError::Rejected(_))
);

// E: neither unit reports in time.
scenario!(
  e_both_units_stall,
  Script::recv(Step::Stall(Duration::from_secs(2)))
    .with_shutdown(Step::Stall(Duration::from_secs(2))),
  Err(TrialError::Hang { stalled: Stalled { io: true, dispose: true }, .. })
);

// A failed send is classified like any other io-unit error.
scenario!(
  send_broken_pipe,
  Script::default().with_send(Step::Errno(libc::EPIPE)),
  Ok(Some(ErrorCategory::TransportAbort))
);

#[test]
fn failed_send_errno_reaches_the_report() {
  let script = Script::default().with_send(Step::Errno(libc::ENOBUFS));
  let err = runner(script, quick()).run(5).unwrap_err();

  let RunError::Trial { index: 0, error: TrialError::Rejected(rejection) } = &err
  else {
    panic!("unexpected error: {err:?}");
  };
  match &rejection.failure {
    IoFailure::Os(os) => assert_eq!(os.raw_os_error(), Some(libc::ENOBUFS)),
    other => panic!("failure changed shape: {other:?}"),
  }
  let expected = std::io::Error::from_raw_os_error(libc::ENOBUFS).to_string();
  assert!(err.to_string().contains(&expected), "{err}");
}

#[test]
fn rejection_surfaces_error_verbatim() {
  let runner = runner(Script::recv(Step::Errno(libc::ENOMEM)), quick());

  let err = runner.run(10).unwrap_err();
  let RunError::Trial { index: 0, error: TrialError::Rejected(rejection) } = &err
  else {
    panic!("unexpected error: {err:?}");
  };

  match &rejection.failure {
    IoFailure::Os(os) => assert_eq!(os.raw_os_error(), Some(libc::ENOMEM)),
    other => panic!("failure changed shape: {other:?}"),
  }
  assert!(err.to_string().contains("trial 0"));
  assert!(!err.is_hang());
}

#[test]
fn hang_is_reported_distinctly() {
  let script = Script::recv(Step::Stall(Duration::from_secs(2)));
  let err = runner(script, quick()).run(3).unwrap_err();

  assert!(err.is_hang(), "expected a hang, got {err}");
}

#[test]
fn same_script_classifies_the_same_twice() {
  let scripts = [
    Script::recv(Step::Complete(1)),
    Script::recv(Step::Errno(libc::EBADF)),
    Script::recv(Step::Errno(libc::ECONNABORTED)),
    Script::recv(Step::Errno(libc::EINVAL)),
  ];

  for script in scripts {
    let first = runner(script.clone(), quick()).run_trial(0);
    let second = runner(script, quick()).run_trial(0);

    match (first, second) {
      (Ok(a), Ok(b)) => assert_eq!(a, b),
      (Err(TrialError::Rejected(a)), Err(TrialError::Rejected(b))) => {
        assert_eq!(a.category, b.category)
      }
      other => panic!("classification differed: {other:?}"),
    }
  }
}

#[test]
fn sandbox_flag_accepts_fatal_signal() {
  let script = Script::recv(Step::FatalSignal(libc::SIGSEGV));

  let runner = runner(script, quick().with_sandboxed(true));
  let report = runner.run(4).unwrap();

  assert_eq!(report.sandbox_signal, 4);
}

#[test]
fn setup_failure_stops_before_any_race() {
  let backend = Arc::new(Scripted::new([
    Script::default(),
    Script::default().with_setup_failure(libc::EADDRNOTAVAIL),
  ]));
  let runner = TrialRunner::with_shared(Arc::clone(&backend), quick());

  let err = runner.run(10).unwrap_err();
  assert!(matches!(err, RunError::Trial { index: 1, error: TrialError::Setup(_) }));
  assert_eq!(backend.pairs_created(), 1);
  assert!(backend.calls().iter().all(|(trial, _)| *trial == 0));
}

#[test]
fn dispose_failure_aborts_the_run() {
  let script = Script::default().with_close(Step::Errno(libc::EIO));
  let err = runner(script, quick()).run(10).unwrap_err();

  assert!(matches!(err, RunError::Trial { index: 0, error: TrialError::Dispose(_) }));
}
