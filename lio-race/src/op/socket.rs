use std::io;

use crate::op::Operation;

pub struct Socket {
  domain: libc::c_int,
  ty: libc::c_int,
  proto: libc::c_int,
}

impl Socket {
  pub(crate) fn new(domain: libc::c_int, ty: libc::c_int, proto: libc::c_int) -> Self {
    Self { domain, ty, proto }
  }
}

impl Operation for Socket {
  impl_result!(fd);

  fn run_blocking(&mut self) -> io::Result<i32> {
    #[cfg(linux)]
    let fd = syscall!(socket(self.domain, self.ty | libc::SOCK_CLOEXEC, self.proto))?;

    #[cfg(not(linux))]
    let fd = {
      let fd = syscall!(socket(self.domain, self.ty, self.proto))?;
      if let Err(err) = syscall!(fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC)) {
        let _ = syscall!(close(fd));
        return Err(err);
      }
      fd
    };

    #[cfg(apple)]
    {
      let on: libc::c_int = 1;
      if let Err(err) = syscall!(setsockopt(
        fd,
        libc::SOL_SOCKET,
        libc::SO_NOSIGPIPE,
        &on as *const libc::c_int as *const libc::c_void,
        std::mem::size_of::<libc::c_int>() as libc::socklen_t
      )) {
        let _ = syscall!(close(fd));
        return Err(err);
      }
    }

    Ok(fd)
  }
}
