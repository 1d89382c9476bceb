use std::{
  io, mem,
  net::SocketAddr,
  os::fd::FromRawFd,
};

use crate::{
  net_utils::libc_socketaddr_into_std,
  op::Operation,
  resource::Resource,
};

pub struct Accept {
  res: Resource,
  addr: libc::sockaddr_storage,
  len: libc::socklen_t,
}

impl Accept {
  pub(crate) fn new(res: Resource) -> Self {
    // SAFETY: sockaddr_storage is plain old data; all-zero is a valid value.
    let addr: libc::sockaddr_storage = unsafe { mem::zeroed() };
    Self { res, addr, len: mem::size_of_val(&addr) as libc::socklen_t }
  }
}

impl Operation for Accept {
  type Result = io::Result<(Resource, SocketAddr)>;

  fn result(&mut self, res: io::Result<i32>) -> Self::Result {
    // SAFETY: accept(2) returned a fresh descriptor that nothing else owns.
    let accepted = unsafe { Resource::from_raw_fd(res?) };
    // SAFETY: the kernel filled `addr` for the accepted peer.
    let peer = unsafe { libc_socketaddr_into_std(&self.addr) }?;
    Ok((accepted, peer))
  }

  fn run_blocking(&mut self) -> io::Result<i32> {
    let fd = self.res.fd()?;
    let addr = &mut self.addr as *mut libc::sockaddr_storage as *mut libc::sockaddr;

    loop {
      #[cfg(linux)]
      let res = syscall!(accept4(fd, addr, &mut self.len, libc::SOCK_CLOEXEC));

      #[cfg(not(linux))]
      let res = syscall!(accept(fd, addr, &mut self.len)).and_then(|socket| {
        // Ensure the socket is closed if the `fcntl` call errors below
        match syscall!(fcntl(socket, libc::F_SETFD, libc::FD_CLOEXEC)) {
          Ok(_) => Ok(socket),
          Err(err) => {
            let _ = syscall!(close(socket));
            Err(err)
          }
        }
      });

      match res {
        Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
        other => return other,
      }
    }
  }
}
