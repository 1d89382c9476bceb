use std::{io, mem};

use crate::{
  op::{BufResult, Operation},
  resource::Resource,
};

pub struct Recv {
  res: Resource,
  buf: Vec<u8>,
}

impl Recv {
  pub(crate) fn new(res: Resource, buf: Vec<u8>) -> Self {
    Self { res, buf }
  }
}

impl Operation for Recv {
  type Result = BufResult<i32, Vec<u8>>;

  fn result(&mut self, res: io::Result<i32>) -> Self::Result {
    let mut buf = mem::take(&mut self.buf);
    buf.truncate(*res.as_ref().unwrap_or(&0) as usize);
    (res, buf)
  }

  fn run_blocking(&mut self) -> io::Result<i32> {
    let fd = self.res.fd()?;
    loop {
      match syscall!(recv(
        fd,
        self.buf.as_mut_ptr() as *mut libc::c_void,
        self.buf.len(),
        0
      )) {
        Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
        other => return other.map(|n| n as i32),
      }
    }
  }
}
