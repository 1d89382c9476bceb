use std::{
  io,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  thread,
  time::Duration,
};

use crate::{
  backend::Backend,
  error::{IoFailure, SetupError, SetupStep},
  pair::SocketPair,
  sync::Mutex,
};

/// What one scripted call does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
  /// Completes, transferring this many bytes.
  Complete(usize),
  /// Fails with this OS error.
  Errno(i32),
  /// Reports a fatal signal.
  FatalSignal(i32),
  Panic(&'static str),
  /// Blocks for the duration, then completes with zero bytes.
  Stall(Duration),
}

/// The behaviour of every call in one trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
  /// Errno failing the pair's connect, if any.
  pub setup: Option<i32>,
  pub send: Step,
  pub recv: Step,
  pub shutdown: Step,
  pub close: Step,
}

impl Default for Script {
  fn default() -> Self {
    Self {
      setup: None,
      send: Step::Complete(1),
      recv: Step::Complete(1),
      shutdown: Step::Complete(0),
      close: Step::Complete(0),
    }
  }
}

impl Script {
  /// Default script with the receive replaced.
  pub fn recv(step: Step) -> Self {
    Self { recv: step, ..Self::default() }
  }

  pub fn with_send(mut self, step: Step) -> Self {
    self.send = step;
    self
  }

  pub fn with_shutdown(mut self, step: Step) -> Self {
    self.shutdown = step;
    self
  }

  pub fn with_close(mut self, step: Step) -> Self {
    self.close = step;
    self
  }

  pub fn with_setup_failure(mut self, errno: i32) -> Self {
    self.setup = Some(errno);
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
  Client,
  Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
  Send(End),
  Recv(End),
  Shutdown(End),
  Close(End),
}

#[derive(Debug, Clone)]
pub struct ScriptedHandle {
  trial: usize,
  end: End,
  script: Arc<Script>,
}

/// A backend replaying one [`Script`] per trial, cycling through the list.
pub struct Scripted {
  scripts: Vec<Script>,
  pairs: AtomicUsize,
  calls: Mutex<Vec<(usize, Call)>>,
}

impl Scripted {
  pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
    Self {
      scripts: scripts.into_iter().collect(),
      pairs: AtomicUsize::new(0),
      calls: Mutex::new(Vec::new()),
    }
  }

  /// Number of pairs handed out so far.
  pub fn pairs_created(&self) -> usize {
    self.pairs.load(Ordering::Acquire)
  }

  /// Every call made, tagged with its trial, in the order they began.
  pub fn calls(&self) -> Vec<(usize, Call)> {
    self.calls.lock().clone()
  }

  fn script_for(&self, trial: usize) -> Script {
    if self.scripts.is_empty() {
      Script::default()
    } else {
      self.scripts[trial % self.scripts.len()].clone()
    }
  }

  fn record(&self, handle: &ScriptedHandle, call: Call) {
    self.calls.lock().push((handle.trial, call));
  }

  fn play(step: Step) -> Result<usize, IoFailure> {
    match step {
      Step::Complete(n) => Ok(n),
      Step::Errno(errno) => Err(IoFailure::from_errno(errno)),
      Step::FatalSignal(signo) => Err(IoFailure::FatalSignal(signo)),
      Step::Panic(msg) => panic!("{msg}"),
      Step::Stall(duration) => {
        thread::sleep(duration);
        Ok(0)
      }
    }
  }

  fn play_io(step: Step) -> io::Result<()> {
    match Self::play(step) {
      Ok(_) => Ok(()),
      Err(IoFailure::Os(err)) => Err(err),
      Err(other) => Err(io::Error::other(other.to_string())),
    }
  }
}

impl Backend for Scripted {
  type Handle = ScriptedHandle;

  fn connected_pair(
    &self,
    trial: usize,
  ) -> Result<SocketPair<ScriptedHandle>, SetupError> {
    let script = self.script_for(trial);
    if let Some(errno) = script.setup {
      return Err(SetupError::new(
        SetupStep::Connect,
        io::Error::from_raw_os_error(errno),
      ));
    }

    self.pairs.fetch_add(1, Ordering::AcqRel);
    let script = Arc::new(script);
    let end = |end| ScriptedHandle { trial, end, script: Arc::clone(&script) };

    Ok(SocketPair { client: end(End::Client), server: end(End::Server) })
  }

  fn send(&self, handle: &ScriptedHandle, _buf: Vec<u8>) -> Result<usize, IoFailure> {
    self.record(handle, Call::Send(handle.end));
    Self::play(handle.script.send)
  }

  fn recv(&self, handle: &ScriptedHandle, _buf: Vec<u8>) -> Result<usize, IoFailure> {
    self.record(handle, Call::Recv(handle.end));
    Self::play(handle.script.recv)
  }

  fn shutdown(&self, handle: &ScriptedHandle) -> io::Result<()> {
    self.record(handle, Call::Shutdown(handle.end));
    Self::play_io(handle.script.shutdown)
  }

  fn close(&self, handle: &ScriptedHandle, _linger: Duration) -> io::Result<()> {
    self.record(handle, Call::Close(handle.end));
    Self::play_io(handle.script.close)
  }
}
