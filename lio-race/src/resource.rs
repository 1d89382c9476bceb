//! Socket handles shared between the two units of a trial.
//!
//! [`Resource`] is a reference-counted wrapper around a socket file
//! descriptor. Clones are cheap and all point to the same descriptor.
//!
//! Disposal and release are two separate steps:
//!
//! - [`close`](crate::op::Close) *disposes* the handle. From then on every
//!   operation started through any clone fails with `EBADF`.
//! - The descriptor itself is *released* with `close(2)` once the last clone
//!   is dropped.
//!
//! An operation in flight holds its own clone, so the descriptor number stays
//! reserved until that call has returned. The kernel can therefore never hand
//! the same number to an unrelated socket while a receive is still parked on
//! it.
//!
//! ```rust,no_run
//! use std::os::fd::FromRawFd;
//! use lio_race::resource::Resource;
//!
//! fn share(raw_fd: i32) {
//!     // SAFETY: the caller owns `raw_fd`.
//!     let sock = unsafe { Resource::from_raw_fd(raw_fd) };
//!     let other = sock.clone();
//!     assert_eq!(sock.count(), 2);
//!     drop(other);
//!     // `raw_fd` is closed here, when the last clone goes away.
//! }
//! ```

use std::{
  io,
  os::fd::{AsRawFd, FromRawFd, RawFd},
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

/// Internal owned resource.
///
/// Holds the descriptor and whether it has been disposed.
struct Owned {
  inner: RawFd,
  disposed: AtomicBool,
}

impl Owned {
  fn new(inner: RawFd) -> Self {
    Self { inner, disposed: AtomicBool::new(false) }
  }
}

impl Drop for Owned {
  fn drop(&mut self) {
    // Nothing useful can be done with a failed close(2) here; the descriptor
    // is gone either way.
    let _ = syscall!(close(self.inner));
  }
}

/// A reference-counted socket handle with explicit disposal.
///
/// See the [module documentation](self) for the lifetime rules.
#[derive(Clone)]
pub struct Resource(Arc<Owned>);

impl FromRawFd for Resource {
  unsafe fn from_raw_fd(fd: RawFd) -> Self {
    Resource(Arc::new(Owned::new(fd)))
  }
}

impl AsRawFd for Resource {
  fn as_raw_fd(&self) -> RawFd {
    self.0.inner
  }
}

impl Resource {
  /// Returns the descriptor for issuing a call, or `EBADF` once disposed.
  pub fn fd(&self) -> io::Result<RawFd> {
    if self.is_disposed() {
      Err(io::Error::from_raw_os_error(libc::EBADF))
    } else {
      Ok(self.0.inner)
    }
  }

  pub fn is_disposed(&self) -> bool {
    self.0.disposed.load(Ordering::Acquire)
  }

  /// Marks the handle disposed.
  ///
  /// Returns `true` for the call that performed the transition and `false`
  /// if the handle was already disposed.
  pub(crate) fn dispose(&self) -> bool {
    !self.0.disposed.swap(true, Ordering::AcqRel)
  }

  /// Number of live clones, including in-flight operations.
  pub fn count(&self) -> usize {
    Arc::strong_count(&self.0)
  }
}

impl std::fmt::Debug for Resource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Resource")
      .field("fd", &self.0.inner)
      .field("disposed", &self.is_disposed())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pipe() -> (RawFd, RawFd) {
    let mut fds = [0i32; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
    (fds[0], fds[1])
  }

  /// Writes one byte into the pipe; fails with `EPIPE` once the read end is
  /// released.
  fn poke(w: RawFd) -> io::Result<isize> {
    let byte = [0u8; 1];
    syscall!(write(w, byte.as_ptr() as *const libc::c_void, 1))
  }

  #[test]
  fn disposed_handle_reports_ebadf() {
    let (r, w) = pipe();
    let res = unsafe { Resource::from_raw_fd(r) };

    assert_eq!(res.fd().unwrap(), r);
    assert!(res.dispose());
    assert!(!res.dispose(), "second dispose must not transition again");

    let err = res.fd().unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::EBADF));

    unsafe { libc::close(w) };
  }

  #[test]
  fn descriptor_released_with_last_clone() {
    let (r, w) = pipe();
    let res = unsafe { Resource::from_raw_fd(r) };
    let in_flight = res.clone();

    res.dispose();
    drop(res);
    assert_eq!(
      poke(w).unwrap(),
      1,
      "in-flight clone must keep the descriptor reserved"
    );
    assert_eq!(in_flight.count(), 1);

    drop(in_flight);
    assert_eq!(poke(w).unwrap_err().raw_os_error(), Some(libc::EPIPE));

    unsafe { libc::close(w) };
  }
}
