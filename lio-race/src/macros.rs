macro_rules! syscall {
  ($fn: ident ( $($arg: expr),* $(,)* ) ) => {{
      #[allow(unused_unsafe)]
      let res = unsafe { libc::$fn($($arg, )*) };
      if res == -1 {
          Err(std::io::Error::last_os_error())
      } else {
          Ok(res)
      }
  }};
}

macro_rules! impl_result {
  (()) => {
    type Result = std::io::Result<()>;

    fn result(&mut self, res: std::io::Result<i32>) -> Self::Result {
      res.map(|code| {
        debug_assert!(code == 0);
      })
    }
  };

  (fd) => {
    type Result = std::io::Result<crate::resource::Resource>;

    /// Socket returned from the operation.
    fn result(&mut self, fd: std::io::Result<i32>) -> Self::Result {
      // SAFETY: the kernel just handed us this descriptor and nothing else owns it.
      fd.map(|fd| unsafe {
        <crate::resource::Resource as std::os::fd::FromRawFd>::from_raw_fd(fd)
      })
    }
  };
}
