//! Connected socket pairs over loopback.

use std::{
  io,
  net::{Ipv4Addr, SocketAddr},
};

use crate::{
  error::{SetupError, SetupStep},
  op::{self, Operation},
  resource::Resource,
};

/// The two ends of one connection, created fresh for every trial.
#[derive(Debug, Clone)]
pub struct SocketPair<H = Resource> {
  /// The connecting end. Torn down and received on during the race.
  pub client: H,
  /// The accepted end. Sends the payload.
  pub server: H,
}

impl SocketPair<Resource> {
  /// Whether both ends currently have a peer.
  pub fn is_connected(&self) -> bool {
    [&self.client, &self.server]
      .into_iter()
      .all(|end| op::peer_addr(end).blocking().is_ok())
  }
}

/// Creates a connected TCP pair on `127.0.0.1`.
///
/// Binds an ephemeral listener with backlog 1, connects a second socket to
/// it, accepts, and releases the listener before returning. The listener is
/// released on every path, including failures.
///
/// ```rust,no_run
/// let pair = lio_race::pair::connected_pair()?;
/// assert!(pair.is_connected());
/// # Ok::<(), lio_race::error::SetupError>(())
/// ```
pub fn connected_pair() -> Result<SocketPair, SetupError> {
  // Dropped at the end of this scope, which releases the descriptor.
  let listener = tcp_socket().map_err(SetupError::at(SetupStep::Socket))?;

  let loopback = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
  op::bind(&listener, loopback)
    .blocking()
    .map_err(SetupError::at(SetupStep::Bind))?;
  op::listen(&listener, 1)
    .blocking()
    .map_err(SetupError::at(SetupStep::Listen))?;
  let addr = op::local_addr(&listener)
    .blocking()
    .map_err(SetupError::at(SetupStep::LocalAddr))?;

  let client = tcp_socket().map_err(SetupError::at(SetupStep::Socket))?;
  op::connect(&client, addr)
    .blocking()
    .map_err(SetupError::at(SetupStep::Connect))?;

  let (server, _peer) = op::accept(&listener)
    .blocking()
    .map_err(SetupError::at(SetupStep::Accept))?;

  Ok(SocketPair { client, server })
}

fn tcp_socket() -> io::Result<Resource> {
  op::socket(libc::AF_INET, libc::SOCK_STREAM, libc::IPPROTO_TCP).blocking()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::os::fd::AsRawFd;

  #[test]
  fn pair_is_connected_and_distinct() {
    let pair = connected_pair().unwrap();

    assert!(pair.is_connected());
    assert_ne!(pair.client.as_raw_fd(), pair.server.as_raw_fd());

    let client_local = op::local_addr(&pair.client).blocking().unwrap();
    let server_peer = op::peer_addr(&pair.server).blocking().unwrap();
    assert_eq!(client_local, server_peer);
  }

  #[test]
  fn pair_carries_no_buffered_data() {
    let pair = connected_pair().unwrap();
    let mut byte = 0u8;

    let res = syscall!(recv(
      pair.client.as_raw_fd(),
      &mut byte as *mut u8 as *mut libc::c_void,
      1,
      libc::MSG_DONTWAIT
    ));
    assert_eq!(res.unwrap_err().kind(), io::ErrorKind::WouldBlock);
  }

  #[test]
  fn byte_crosses_the_pair() {
    let pair = connected_pair().unwrap();

    let (sent, _) = op::send(&pair.server, vec![7]).blocking();
    assert_eq!(sent.unwrap(), 1);

    let (received, buf) = op::recv(&pair.client, vec![0]).blocking();
    assert_eq!(received.unwrap(), 1);
    assert_eq!(buf, vec![7]);
  }

  #[test]
  fn closed_client_is_disposed_and_not_connected() {
    let pair = connected_pair().unwrap();

    op::close(&pair.client, std::time::Duration::from_secs(1))
      .blocking()
      .unwrap();

    assert!(pair.client.is_disposed());
    assert!(!pair.is_connected());

    let (res, _) = op::recv(&pair.client, vec![0]).blocking();
    assert_eq!(res.unwrap_err().raw_os_error(), Some(libc::EBADF));
  }
}
