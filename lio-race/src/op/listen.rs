use std::io;

use crate::{op::Operation, resource::Resource};

pub struct Listen {
  res: Resource,
  backlog: i32,
}

impl Listen {
  pub(crate) fn new(res: Resource, backlog: i32) -> Self {
    Self { res, backlog }
  }
}

impl Operation for Listen {
  impl_result!(());

  fn run_blocking(&mut self) -> io::Result<i32> {
    syscall!(listen(self.res.fd()?, self.backlog))
  }
}
