use std::{io, net::SocketAddr};

use crate::{
  net_utils::std_socketaddr_into_libc,
  op::Operation,
  resource::Resource,
};

pub struct Bind {
  res: Resource,
  addr: libc::sockaddr_storage,
  len: libc::socklen_t,
}

impl Bind {
  pub(crate) fn new(res: Resource, addr: SocketAddr) -> Self {
    let (addr, len) = std_socketaddr_into_libc(addr);
    Self { res, addr, len }
  }
}

impl Operation for Bind {
  impl_result!(());

  fn run_blocking(&mut self) -> io::Result<i32> {
    syscall!(bind(
      self.res.fd()?,
      &self.addr as *const libc::sockaddr_storage as *const libc::sockaddr,
      self.len
    ))
  }
}
