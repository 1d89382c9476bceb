//! The seam between the harness and the socket stack.
//!
//! The orchestrator only ever talks to a [`Backend`]: it asks for a
//! connected pair, sends and receives on its ends, and tears the client down.
//! [`Os`] drives real loopback sockets. [`Scripted`] replays a fixed script
//! per trial so every scenario can be reproduced without depending on the
//! scheduler.

use std::{io, time::Duration};

use crate::{
  error::{IoFailure, SetupError},
  pair::SocketPair,
};

mod os;
mod scripted;

pub use os::Os;
pub use scripted::{Call, End, Script, Scripted, ScriptedHandle, Step};

pub trait Backend: Send + Sync + 'static {
  /// One end of a connection, shared by both units of a trial.
  type Handle: Clone + Send + 'static;

  /// Creates the connected pair for trial `trial`.
  fn connected_pair(
    &self,
    trial: usize,
  ) -> Result<SocketPair<Self::Handle>, SetupError>;

  /// Sends all of `buf`, returning the byte count.
  fn send(&self, handle: &Self::Handle, buf: Vec<u8>) -> Result<usize, IoFailure>;

  /// Receives into `buf`, returning the byte count. Zero is end of stream.
  fn recv(&self, handle: &Self::Handle, buf: Vec<u8>) -> Result<usize, IoFailure>;

  /// Shuts down both directions.
  fn shutdown(&self, handle: &Self::Handle) -> io::Result<()>;

  /// Disposes the handle with a bounded linger.
  fn close(&self, handle: &Self::Handle, linger: Duration) -> io::Result<()>;
}
