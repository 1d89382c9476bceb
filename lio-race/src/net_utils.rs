use std::{
  io, mem,
  net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6},
};

/// Reads a socket address written by the kernel into `storage`.
///
/// # Safety
///
/// `storage` must point to a valid, initialised `sockaddr_storage`.
pub unsafe fn libc_socketaddr_into_std(
  storage: *const libc::sockaddr_storage,
) -> io::Result<SocketAddr> {
  // SAFETY: caller guarantees a valid pointer.
  let family = unsafe { (*storage).ss_family };

  if family == libc::AF_INET as libc::sa_family_t {
    // SAFETY: ss_family is AF_INET, so the storage holds a sockaddr_in.
    let in4 = unsafe { *storage.cast::<libc::sockaddr_in>() };
    let ip = Ipv4Addr::from(u32::from_be(in4.sin_addr.s_addr));
    let port = u16::from_be(in4.sin_port);

    Ok(SocketAddr::from(SocketAddrV4::new(ip, port)))
  } else if family == libc::AF_INET6 as libc::sa_family_t {
    // SAFETY: ss_family is AF_INET6, so the storage holds a sockaddr_in6.
    let in6 = unsafe { *storage.cast::<libc::sockaddr_in6>() };
    let ip = Ipv6Addr::from(in6.sin6_addr.s6_addr);
    let port = u16::from_be(in6.sin6_port);

    Ok(SocketAddr::from(SocketAddrV6::new(
      ip,
      port,
      in6.sin6_flowinfo,
      in6.sin6_scope_id,
    )))
  } else {
    Err(io::Error::from_raw_os_error(libc::EAFNOSUPPORT))
  }
}

/// Encodes `addr` for `bind(2)`/`connect(2)`, returning the storage and the
/// length to pass alongside it.
pub fn std_socketaddr_into_libc(
  addr: SocketAddr,
) -> (libc::sockaddr_storage, libc::socklen_t) {
  // SAFETY: sockaddr_storage is plain old data; all-zero is a valid value.
  let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };

  let len = match addr {
    SocketAddr::V4(v4) => {
      // SAFETY: sockaddr_storage is large and aligned enough for any
      // sockaddr_* type.
      unsafe {
        (&mut storage as *mut libc::sockaddr_storage)
          .cast::<libc::sockaddr_in>()
          .write(into_addr(v4));
      }
      mem::size_of::<libc::sockaddr_in>()
    }
    SocketAddr::V6(v6) => {
      // SAFETY: as above.
      unsafe {
        (&mut storage as *mut libc::sockaddr_storage)
          .cast::<libc::sockaddr_in6>()
          .write(into_addr6(v6));
      }
      mem::size_of::<libc::sockaddr_in6>()
    }
  };

  (storage, len as libc::socklen_t)
}

fn into_addr(addr: SocketAddrV4) -> libc::sockaddr_in {
  // SAFETY: sockaddr_in is a C struct with primitive integer fields.
  let mut out: libc::sockaddr_in = unsafe { mem::zeroed() };

  #[cfg(apple)]
  {
    out.sin_len = mem::size_of::<libc::sockaddr_in>() as u8;
  }
  out.sin_family = libc::AF_INET as libc::sa_family_t;
  out.sin_port = addr.port().to_be();
  out.sin_addr = libc::in_addr { s_addr: u32::from(*addr.ip()).to_be() };

  out
}

fn into_addr6(addr: SocketAddrV6) -> libc::sockaddr_in6 {
  // SAFETY: sockaddr_in6 is a C struct with primitive integer/array fields.
  let mut out: libc::sockaddr_in6 = unsafe { mem::zeroed() };

  #[cfg(apple)]
  {
    out.sin6_len = mem::size_of::<libc::sockaddr_in6>() as u8;
  }
  out.sin6_family = libc::AF_INET6 as libc::sa_family_t;
  out.sin6_port = addr.port().to_be();
  out.sin6_addr = libc::in6_addr { s6_addr: addr.ip().octets() };
  out.sin6_flowinfo = addr.flowinfo();
  out.sin6_scope_id = addr.scope_id();

  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn loopback_v4_survives_encoding() {
    let addr: SocketAddr = "127.0.0.1:4242".parse().unwrap();
    let (storage, len) = std_socketaddr_into_libc(addr);

    assert_eq!(len as usize, mem::size_of::<libc::sockaddr_in>());
    let back = unsafe { libc_socketaddr_into_std(&storage) }.unwrap();
    assert_eq!(back, addr);
  }

  #[test]
  fn unknown_family_is_rejected() {
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    storage.ss_family = libc::AF_UNIX as libc::sa_family_t;

    let err = unsafe { libc_socketaddr_into_std(&storage) }.unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::EAFNOSUPPORT));
  }
}
