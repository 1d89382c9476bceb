use std::{io, mem};

use crate::{
  op::{BufResult, Operation, SEND_FLAGS},
  resource::Resource,
};

pub struct Send {
  res: Resource,
  buf: Vec<u8>,
}

impl Send {
  pub(crate) fn new(res: Resource, buf: Vec<u8>) -> Self {
    Self { res, buf }
  }
}

impl Operation for Send {
  type Result = BufResult<i32, Vec<u8>>;

  fn result(&mut self, res: io::Result<i32>) -> Self::Result {
    (res, mem::take(&mut self.buf))
  }

  fn run_blocking(&mut self) -> io::Result<i32> {
    let fd = self.res.fd()?;
    loop {
      match syscall!(send(
        fd,
        self.buf.as_ptr() as *const libc::c_void,
        self.buf.len(),
        SEND_FLAGS
      )) {
        Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
        other => return other.map(|n| n as i32),
      }
    }
  }
}
