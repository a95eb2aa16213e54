//! Socket access

use crate::security::{Operation, SecurityHost};
use std::io;
use std::net::{Ipv4Addr, TcpListener, TcpStream, UdpSocket};

/// Open a TCP connection to `host:port`
pub fn connect(security: &SecurityHost, host: &str, port: u16) -> io::Result<TcpStream> {
    security.check(&Operation::Connect {
        host: host.to_string(),
        port: Some(port),
    })?;
    TcpStream::connect((host, port))
}

/// Listen on `port` of the loopback interface
pub fn bind(security: &SecurityHost, port: u16) -> io::Result<TcpListener> {
    security.check(&Operation::Listen { port })?;
    TcpListener::bind((Ipv4Addr::LOCALHOST, port))
}

/// Accept the next connection; a refused peer is dropped before it is returned
pub fn accept(security: &SecurityHost, listener: &TcpListener) -> io::Result<TcpStream> {
    let (stream, peer) = listener.accept()?;
    security.check(&Operation::Accept {
        host: peer.ip().to_string(),
        port: peer.port(),
    })?;
    Ok(stream)
}

pub fn join_multicast(
    security: &SecurityHost,
    socket: &UdpSocket,
    group: Ipv4Addr,
) -> io::Result<()> {
    security.check(&Operation::Multicast {
        address: group.to_string(),
    })?;
    socket.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
}
