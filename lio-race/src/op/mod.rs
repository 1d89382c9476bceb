//! Socket primitives as blocking operations.
//!
//! Every operation is a small struct that owns what the call needs (a
//! [`Resource`] clone, a buffer, an encoded address). [`Operation::blocking`]
//! issues the call on the current thread and converts the raw return value
//! into the operation's result type.
//!
//! ```rust,no_run
//! use lio_race::op::{self, Operation};
//!
//! fn example() -> std::io::Result<()> {
//!     let sock = op::socket(libc::AF_INET, libc::SOCK_STREAM, libc::IPPROTO_TCP).blocking()?;
//!     op::bind(&sock, "127.0.0.1:0".parse().unwrap()).blocking()?;
//!     op::listen(&sock, 1).blocking()?;
//!     let addr = op::local_addr(&sock).blocking()?;
//!     println!("listening on {addr}");
//!     Ok(())
//! }
//! ```

use std::{io, net::SocketAddr, time::Duration};

use crate::resource::Resource;

mod accept;
mod bind;
mod close;
mod connect;
mod listen;
mod recv;
mod send;
mod shutdown;
mod sockname;
mod socket;

pub use accept::Accept;
pub use bind::Bind;
pub use close::Close;
pub use connect::Connect;
pub use listen::Listen;
pub use recv::Recv;
pub use send::Send;
pub use shutdown::Shutdown;
pub use sockname::{LocalAddr, PeerAddr};
pub use socket::Socket;

/// Result type for operations that hand their buffer back.
pub type BufResult<T, B> = (io::Result<T>, B);

/// A single socket call.
pub trait Operation: Sized {
  type Result;

  /// Issues the call once. `Ok` carries the raw non-negative return value.
  fn run_blocking(&mut self) -> io::Result<i32>;

  /// Converts the raw return value into the operation's result.
  fn result(&mut self, res: io::Result<i32>) -> Self::Result;

  /// Runs the operation to completion on the current thread.
  fn blocking(mut self) -> Self::Result {
    let res = self.run_blocking();
    self.result(res)
  }
}

/// Creates a socket. The descriptor is close-on-exec.
pub fn socket(domain: libc::c_int, ty: libc::c_int, proto: libc::c_int) -> Socket {
  Socket::new(domain, ty, proto)
}

pub fn bind(res: &Resource, addr: SocketAddr) -> Bind {
  Bind::new(res.clone(), addr)
}

pub fn listen(res: &Resource, backlog: i32) -> Listen {
  Listen::new(res.clone(), backlog)
}

pub fn connect(res: &Resource, addr: SocketAddr) -> Connect {
  Connect::new(res.clone(), addr)
}

pub fn accept(res: &Resource) -> Accept {
  Accept::new(res.clone())
}

/// Sends all of `buf` in one call; the returned count may be short.
pub fn send(res: &Resource, buf: Vec<u8>) -> Send {
  Send::new(res.clone(), buf)
}

/// Receives at most `buf.len()` bytes. The buffer comes back truncated to
/// what was read.
pub fn recv(res: &Resource, buf: Vec<u8>) -> Recv {
  Recv::new(res.clone(), buf)
}

pub fn shutdown(res: &Resource, how: std::net::Shutdown) -> Shutdown {
  Shutdown::new(res.clone(), how)
}

/// Disposes the handle after arming `SO_LINGER` with `linger`.
///
/// The descriptor is released when the last clone of `res` drops. Closing an
/// already disposed handle is a no-op.
pub fn close(res: &Resource, linger: Duration) -> Close {
  Close::new(res.clone(), linger)
}

pub fn local_addr(res: &Resource) -> LocalAddr {
  LocalAddr::new(res.clone())
}

pub fn peer_addr(res: &Resource) -> PeerAddr {
  PeerAddr::new(res.clone())
}

/// Flags for `send(2)`. Linux suppresses `SIGPIPE` per call; Apple targets do
/// it per socket instead (see [`Socket`]).
#[cfg(linux)]
pub(crate) const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;

#[cfg(not(linux))]
pub(crate) const SEND_FLAGS: libc::c_int = 0;
