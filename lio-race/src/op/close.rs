use std::{io, mem, time::Duration};

use crate::{op::Operation, resource::Resource};

pub struct Close {
  res: Resource,
  linger: libc::linger,
}

impl Close {
  pub(crate) fn new(res: Resource, linger: Duration) -> Self {
    // Round up so a sub-second linger still bounds the close.
    let secs = linger.as_secs() + u64::from(linger.subsec_nanos() > 0);
    let linger = libc::linger {
      l_onoff: 1,
      l_linger: secs.min(libc::c_int::MAX as u64) as libc::c_int,
    };
    Self { res, linger }
  }
}

impl Operation for Close {
  impl_result!(());

  fn run_blocking(&mut self) -> io::Result<i32> {
    if self.res.is_disposed() {
      return Ok(0);
    }

    syscall!(setsockopt(
      self.res.fd()?,
      libc::SOL_SOCKET,
      libc::SO_LINGER,
      &self.linger as *const libc::linger as *const libc::c_void,
      mem::size_of::<libc::linger>() as libc::socklen_t
    ))?;

    self.res.dispose();
    Ok(0)
  }
}
