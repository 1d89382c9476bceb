//! The race itself.
//!
//! Each trial runs two units on their own OS threads:
//!
//! - the **io-unit** sends one byte on the server end, waits at the
//!   rendezvous, then receives one byte on the client end;
//! - the **dispose-unit** waits at the rendezvous, then shuts the client end
//!   down in both directions and closes it with a bounded linger.
//!
//! The rendezvous orders *send completed* before *teardown begins* before
//! *receive attempted*. Whether the receive or the teardown takes effect
//! first in the kernel is left to the scheduler; that window is what the
//! harness exercises. The handles are shared by both units without any lock.
//!
//! Results travel back over channels. Errors and panics are captured on the
//! unit's own thread and never unwind into the caller.

use std::{
  any::Any,
  io,
  panic::{self, AssertUnwindSafe},
  sync::Arc,
  thread::{self, JoinHandle},
  time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::{
  backend::Backend,
  config::{Config, PAYLOAD_LEN},
  error::{DisposeError, IoFailure, SetupError, SetupStep, Stalled, TrialError},
  interleave::Perturbation,
  pair::SocketPair,
  rendezvous::Rendezvous,
};

/// What one trial produced, before classification.
#[derive(Debug, Default)]
pub struct TrialOutcome {
  pub completed_without_error: bool,
  /// Bytes the receive returned when it completed.
  pub received: usize,
  /// The io-unit's failure, if it reported one.
  pub error: Option<IoFailure>,
  pub timed_out: bool,
  /// Which units had not reported when the timeout fired.
  pub stalled: Stalled,
}

/// Runs single trials against a [`Backend`].
pub struct Race<B: Backend> {
  backend: Arc<B>,
  trial_timeout: Duration,
  linger: Duration,
}

impl<B: Backend> Race<B> {
  pub fn new(backend: Arc<B>, config: &Config) -> Self {
    Self { backend, trial_timeout: config.trial_timeout, linger: config.linger }
  }

  /// Races teardown of `pair.client` against a receive on it.
  ///
  /// Returns once both units have reported or the trial timeout fires. A
  /// dispose-unit failure is an error; the io-unit's is part of the outcome.
  pub fn run(
    &self,
    pair: SocketPair<B::Handle>,
    perturbation: Perturbation,
  ) -> Result<TrialOutcome, TrialError> {
    let deadline = Instant::now() + self.trial_timeout;
    let barrier = Arc::new(Rendezvous::once());

    let (dispose_rx, dispose_thread) = self
      .spawn_dispose(pair.client.clone(), &barrier, deadline, perturbation)
      .map_err(SetupError::at(SetupStep::Spawn))?;

    let (io_rx, io_thread) =
      match self.spawn_io(pair, &barrier, deadline, perturbation) {
        Ok(spawned) => spawned,
        Err(err) => {
          release_partner(&barrier, deadline, dispose_thread);
          return Err(SetupError::new(SetupStep::Spawn, err).into());
        }
      };

    // Units give up at `deadline` on their own; the grace lets that report
    // arrive before the trial is declared hung.
    let reported_by = deadline + REPORT_GRACE;
    let disposed = dispose_rx.recv_deadline(reported_by);
    let io = io_rx.recv_deadline(reported_by);

    let stalled = Stalled {
      io: matches!(io, Err(RecvTimeoutError::Timeout)),
      dispose: matches!(disposed, Err(RecvTimeoutError::Timeout)),
    };

    if stalled.any() {
      #[cfg(feature = "tracing")]
      tracing::error!(
        %stalled,
        timeout = ?self.trial_timeout,
        "trial timed out; detaching units"
      );

      // Stuck units are left behind; joining would hang the harness.
      drop((dispose_thread, io_thread));
      return Ok(TrialOutcome { timed_out: true, stalled, ..Default::default() });
    }

    // Both units reported; joining releases their handle clones before the
    // next trial starts.
    let _ = dispose_thread.join();
    let _ = io_thread.join();

    let io = match io {
      Ok(Ok(res)) => res,
      Ok(Err(payload)) => Err(IoFailure::Panicked(panic_message(payload))),
      Err(_) => Err(IoFailure::Panicked("unit exited without reporting".into())),
    };

    match disposed {
      Ok(Ok(Ok(()))) => {}
      // The io-unit failed before it could arrive; its error is the cause.
      Ok(Ok(Err(DisposeError::Rendezvous(_)))) if io.is_err() => {}
      Ok(Ok(Err(err))) => return Err(err.into()),
      Ok(Err(payload)) => {
        return Err(DisposeError::Panicked(panic_message(payload)).into());
      }
      Err(_) => {
        return Err(
          DisposeError::Panicked("unit exited without reporting".into()).into(),
        );
      }
    }

    Ok(match io {
      Ok(received) => TrialOutcome {
        completed_without_error: true,
        received,
        ..Default::default()
      },
      Err(failure) => TrialOutcome { error: Some(failure), ..Default::default() },
    })
  }

  /// Rendezvous, then shutdown and close of `client`.
  fn spawn_dispose(
    &self,
    client: B::Handle,
    barrier: &Arc<Rendezvous>,
    deadline: Instant,
    perturbation: Perturbation,
  ) -> io::Result<Spawned<Result<(), DisposeError>>> {
    let backend = Arc::clone(&self.backend);
    let barrier = Arc::clone(barrier);
    let linger = self.linger;

    spawn_unit("lio-race-dispose", move || -> Result<(), DisposeError> {
      barrier
        .signal_and_wait_deadline(deadline)
        .map_err(DisposeError::Rendezvous)?;
      Perturbation::yield_times(perturbation.before_teardown);
      backend.shutdown(&client).map_err(DisposeError::Shutdown)?;
      backend.close(&client, linger).map_err(DisposeError::Close)?;
      Ok(())
    })
  }

  /// Send on `server`, rendezvous, then receive on `client`.
  fn spawn_io(
    &self,
    pair: SocketPair<B::Handle>,
    barrier: &Arc<Rendezvous>,
    deadline: Instant,
    perturbation: Perturbation,
  ) -> io::Result<Spawned<Result<usize, IoFailure>>> {
    let backend = Arc::clone(&self.backend);
    let barrier = Arc::clone(barrier);
    let SocketPair { client, server } = pair;

    spawn_unit("lio-race-io", move || -> Result<usize, IoFailure> {
      let sent = backend.send(&server, vec![0u8; PAYLOAD_LEN]);
      // The partner waits on this arrival whether or not the send succeeded.
      let met = barrier.signal_and_wait_deadline(deadline);
      sent?;
      met.map_err(IoFailure::Rendezvous)?;
      Perturbation::yield_times(perturbation.before_recv);
      backend.recv(&client, vec![0u8; PAYLOAD_LEN])
    })
  }
}

/// How long past the trial deadline a unit's own timeout report is awaited.
const REPORT_GRACE: Duration = Duration::from_millis(100);

/// Arrives at `barrier` in place of a partner that never started, then waits
/// for `unit` to finish.
fn release_partner(barrier: &Rendezvous, deadline: Instant, unit: JoinHandle<()>) {
  if barrier.signal_and_wait_deadline(deadline).is_ok() {
    let _ = unit.join();
  }
}

type UnitResult<T> = thread::Result<T>;
type Spawned<T> = (Receiver<UnitResult<T>>, JoinHandle<()>);

/// Spawns a named unit thread whose result, or panic, is sent back once.
fn spawn_unit<T, F>(
  name: &str,
  f: F,
) -> io::Result<Spawned<T>>
where
  T: Send + 'static,
  F: FnOnce() -> T + Send + 'static,
{
  let (tx, rx) = crossbeam_channel::bounded(1);
  let handle = thread::Builder::new().name(name.to_owned()).spawn(move || {
    let res = panic::catch_unwind(AssertUnwindSafe(f));
    // The receiver is gone only if the orchestrator gave up on us.
    let _ = tx.send(res);
  })?;
  Ok((rx, handle))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  if let Some(msg) = payload.downcast_ref::<&'static str>() {
    (*msg).to_owned()
  } else if let Some(msg) = payload.downcast_ref::<String>() {
    msg.clone()
  } else {
    "non-string panic payload".to_owned()
  }
}
