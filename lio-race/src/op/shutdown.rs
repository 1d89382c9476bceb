use std::{io, net};

use crate::{op::Operation, resource::Resource};

pub struct Shutdown {
  res: Resource,
  how: i32,
}

impl Shutdown {
  pub(crate) fn new(res: Resource, how: net::Shutdown) -> Self {
    let how = match how {
      net::Shutdown::Read => libc::SHUT_RD,
      net::Shutdown::Write => libc::SHUT_WR,
      net::Shutdown::Both => libc::SHUT_RDWR,
    };
    Self { res, how }
  }
}

impl Operation for Shutdown {
  impl_result!(());

  fn run_blocking(&mut self) -> io::Result<i32> {
    syscall!(shutdown(self.res.fd()?, self.how))
  }
}
