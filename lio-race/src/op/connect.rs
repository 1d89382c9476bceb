use std::{io, net::SocketAddr};

use crate::{
  net_utils::std_socketaddr_into_libc,
  op::Operation,
  resource::Resource,
};

pub struct Connect {
  res: Resource,
  addr: libc::sockaddr_storage,
  len: libc::socklen_t,
}

impl Connect {
  pub(crate) fn new(res: Resource, addr: SocketAddr) -> Self {
    let (addr, len) = std_socketaddr_into_libc(addr);
    Self { res, addr, len }
  }
}

impl Operation for Connect {
  impl_result!(());

  fn run_blocking(&mut self) -> io::Result<i32> {
    loop {
      match syscall!(connect(
        self.res.fd()?,
        &self.addr as *const libc::sockaddr_storage as *const libc::sockaddr,
        self.len
      )) {
        Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
        other => return other,
      }
    }
  }
}
