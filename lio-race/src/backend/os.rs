use std::{io, net, time::Duration};

use crate::{
  backend::Backend,
  error::{IoFailure, SetupError},
  op::{self, Operation},
  pair::{self, SocketPair},
  resource::Resource,
};

/// Real IPv4 TCP sockets over loopback.
#[derive(Debug, Default, Clone, Copy)]
pub struct Os;

impl Backend for Os {
  type Handle = Resource;

  fn connected_pair(&self, _trial: usize) -> Result<SocketPair, SetupError> {
    pair::connected_pair()
  }

  fn send(&self, handle: &Resource, buf: Vec<u8>) -> Result<usize, IoFailure> {
    let mut sent = 0;

    while sent < buf.len() {
      let (res, _) = op::send(handle, buf[sent..].to_vec()).blocking();
      match res? as usize {
        0 => return Err(io::Error::from(io::ErrorKind::WriteZero).into()),
        n => sent += n,
      }
    }

    Ok(sent)
  }

  fn recv(&self, handle: &Resource, buf: Vec<u8>) -> Result<usize, IoFailure> {
    let (res, _buf) = op::recv(handle, buf).blocking();
    Ok(res? as usize)
  }

  fn shutdown(&self, handle: &Resource) -> io::Result<()> {
    op::shutdown(handle, net::Shutdown::Both).blocking()
  }

  fn close(&self, handle: &Resource, linger: Duration) -> io::Result<()> {
    op::close(handle, linger).blocking()
  }
}
