use std::{io, mem, net::SocketAddr};

use crate::{
  net_utils::libc_socketaddr_into_std,
  op::Operation,
  resource::Resource,
};

macro_rules! impl_sockname {
  ($name:ident, $call:ident) => {
    pub struct $name {
      res: Resource,
      addr: libc::sockaddr_storage,
      len: libc::socklen_t,
    }

    impl $name {
      pub(crate) fn new(res: Resource) -> Self {
        // SAFETY: sockaddr_storage is plain old data; all-zero is a valid value.
        let addr: libc::sockaddr_storage = unsafe { mem::zeroed() };
        Self { res, addr, len: mem::size_of_val(&addr) as libc::socklen_t }
      }
    }

    impl Operation for $name {
      type Result = io::Result<SocketAddr>;

      fn result(&mut self, res: io::Result<i32>) -> Self::Result {
        res?;
        // SAFETY: the kernel filled `addr` on success.
        unsafe { libc_socketaddr_into_std(&self.addr) }
      }

      fn run_blocking(&mut self) -> io::Result<i32> {
        syscall!($call(
          self.res.fd()?,
          &mut self.addr as *mut libc::sockaddr_storage as *mut libc::sockaddr,
          &mut self.len
        ))
      }
    }
  };
}

impl_sockname!(LocalAddr, getsockname);
impl_sockname!(PeerAddr, getpeername);
