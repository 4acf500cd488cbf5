use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{FtpError, Result};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Which side opens the data connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    /// The client listens and the server connects (`PORT`).
    Active,
    /// The server listens and the client connects (`PASV`).
    Passive,
}

/// The data connection negotiated for the next transfer.
#[derive(Debug)]
pub(crate) enum DataChannel {
    Passive { stream: TcpStream, peer: SocketAddr },
    Active { listener: TcpListener, local: SocketAddr },
}

impl DataChannel {
    pub(crate) fn connect(peer: SocketAddr, timeout: Duration) -> Result<DataChannel> {
        let stream = TcpStream::connect_timeout(&peer, timeout)
            .map_err(|e| FtpError::io("open data connection", e))?;
        set_timeouts(&stream, timeout).map_err(|e| FtpError::io("open data connection", e))?;
        debug!("Data connection open to {}", peer);
        Ok(DataChannel::Passive { stream, peer })
    }

    pub(crate) fn listen(local: SocketAddr) -> Result<DataChannel> {
        let listener =
            TcpListener::bind(local).map_err(|e| FtpError::io("listen for data connection", e))?;
        debug!("Listening for data connection on {}", local);
        Ok(DataChannel::Active { listener, local })
    }

    pub(crate) fn mode(&self) -> DataMode {
        match self {
            DataChannel::Passive { .. } => DataMode::Passive,
            DataChannel::Active { .. } => DataMode::Active,
        }
    }

    /// Server endpoint in passive mode, local listening endpoint in active mode.
    pub(crate) fn endpoint(&self) -> SocketAddr {
        match self {
            DataChannel::Passive { peer, .. } => *peer,
            DataChannel::Active { local, .. } => *local,
        }
    }

    /// Returns the connected byte stream, accepting the server first if needed.
    pub(crate) fn acquire_stream(self, timeout: Duration) -> Result<TcpStream> {
        match self {
            DataChannel::Passive { stream, .. } => Ok(stream),
            DataChannel::Active { listener, local } => {
                let (stream, peer) = accept_timeout(&listener, timeout)?;
                debug!("Accepted data connection on {} from {}", local, peer);
                set_timeouts(&stream, timeout)
                    .map_err(|e| FtpError::io("accept data connection", e))?;
                Ok(stream)
            }
        }
    }
}

fn accept_timeout(listener: &TcpListener, timeout: Duration) -> Result<(TcpStream, SocketAddr)> {
    listener
        .set_nonblocking(true)
        .map_err(|e| FtpError::io("accept data connection", e))?;

    let started = Instant::now();
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                stream
                    .set_nonblocking(false)
                    .map_err(|e| FtpError::io("accept data connection", e))?;
                return Ok((stream, peer));
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                if started.elapsed() >= timeout {
                    return Err(FtpError::TimedOut("accept data connection"));
                }
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => (),
            Err(e) => return Err(FtpError::io("accept data connection", e)),
        }
    }
}

pub(crate) fn set_timeouts(stream: &TcpStream, timeout: Duration) -> io::Result<()> {
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::Ipv4Addr;

    #[test]
    fn passive_channel_is_already_connected() {
        let server = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let peer = server.local_addr().unwrap();

        let channel = DataChannel::connect(peer, Duration::from_secs(5)).unwrap();
        assert_eq!(channel.mode(), DataMode::Passive);

        let (mut remote, _) = server.accept().unwrap();
        remote.write_all(b"hello").unwrap();
        drop(remote);

        let mut stream = channel.acquire_stream(Duration::from_secs(5)).unwrap();
        let mut buf = String::new();
        stream.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "hello");
    }

    #[test]
    fn active_channel_accepts_on_acquire() {
        let channel = DataChannel::listen((Ipv4Addr::LOCALHOST, 0).into()).unwrap();
        assert_eq!(channel.mode(), DataMode::Active);
        let addr = match &channel {
            DataChannel::Active { listener, .. } => listener.local_addr().unwrap(),
            DataChannel::Passive { .. } => unreachable!(),
        };

        let remote = thread::spawn(move || {
            let mut s = TcpStream::connect(addr).unwrap();
            s.write_all(b"listing").unwrap();
        });

        let mut stream = channel.acquire_stream(Duration::from_secs(5)).unwrap();
        let mut buf = String::new();
        stream.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "listing");
        remote.join().unwrap();
    }

    #[test]
    fn active_accept_times_out() {
        let channel = DataChannel::listen((Ipv4Addr::LOCALHOST, 0).into()).unwrap();
        match channel.acquire_stream(Duration::from_millis(50)) {
            Err(FtpError::TimedOut(_)) => (),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
