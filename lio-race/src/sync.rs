//! Poison-free wrappers over `std::sync`.
//!
//! A unit that panics while holding the barrier lock is captured and
//! reported as a trial failure; the other unit must still be able to take
//! the lock afterwards, so poisoning is stripped here.

use std::{sync as std_sync, time::Duration};

/// A mutual exclusion primitive that wraps `std::sync::Mutex`.
///
/// Unlike `std::sync::Mutex`, this does not support poisoning.
pub struct Mutex<T: ?Sized> {
  inner: std_sync::Mutex<T>,
}

impl<T> Mutex<T> {
  /// Creates a new mutex in an unlocked state ready for use.
  #[inline]
  pub const fn new(value: T) -> Self {
    Self { inner: std_sync::Mutex::new(value) }
  }
}

impl<T: ?Sized> Mutex<T> {
  /// Acquires a mutex, blocking the current thread until it is able to do so.
  ///
  /// This function does not propagate poisoning, so it will always succeed.
  #[inline]
  pub fn lock(&self) -> MutexGuard<'_, T> {
    MutexGuard { inner: self.inner.lock().unwrap_or_else(|e| e.into_inner()) }
  }
}

/// An RAII implementation of a "scoped lock" of a mutex.
///
/// When this structure is dropped (falls out of scope), the lock will be unlocked.
pub struct MutexGuard<'a, T: ?Sized> {
  inner: std_sync::MutexGuard<'a, T>,
}

impl<T: ?Sized> std::ops::Deref for MutexGuard<'_, T> {
  type Target = T;

  #[inline]
  fn deref(&self) -> &T {
    &self.inner
  }
}

impl<T: ?Sized> std::ops::DerefMut for MutexGuard<'_, T> {
  #[inline]
  fn deref_mut(&mut self) -> &mut T {
    &mut self.inner
  }
}

/// A condition variable paired with [`Mutex`].
pub struct Condvar {
  inner: std_sync::Condvar,
}

impl Condvar {
  #[inline]
  pub const fn new() -> Self {
    Self { inner: std_sync::Condvar::new() }
  }

  /// Blocks until notified. Spurious wakeups are possible.
  pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
    let inner = self.inner.wait(guard.inner).unwrap_or_else(|e| e.into_inner());
    MutexGuard { inner }
  }

  /// Blocks until notified or `timeout` elapses. The flag is `true` on
  /// timeout.
  pub fn wait_timeout<'a, T>(
    &self,
    guard: MutexGuard<'a, T>,
    timeout: Duration,
  ) -> (MutexGuard<'a, T>, bool) {
    let (inner, res) = self
      .inner
      .wait_timeout(guard.inner, timeout)
      .unwrap_or_else(|e| e.into_inner());
    (MutexGuard { inner }, res.timed_out())
  }

  #[inline]
  pub fn notify_all(&self) {
    self.inner.notify_all();
  }
}

impl Default for Condvar {
  fn default() -> Self {
    Self::new()
  }
}
