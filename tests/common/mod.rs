#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pure_ftp::{FtpConfig, FtpSession};

const SERVER_TIMEOUT: Duration = Duration::from_secs(10);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A one-connection FTP server driven by a script.
pub struct MockServer {
    pub port: u16,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub fn start<F>(script: F) -> MockServer
    where
        F: FnOnce(&mut MockConn) + Send + 'static,
    {
        init_logging();
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            stream.set_read_timeout(Some(SERVER_TIMEOUT)).unwrap();
            let mut conn = MockConn {
                reader: BufReader::new(stream.try_clone().unwrap()),
                writer: stream,
            };
            script(&mut conn);
        });
        MockServer { port, handle }
    }

    /// Starts a server that greets and accepts `anon`/`pw` before `script`.
    pub fn logged_in<F>(script: F) -> MockServer
    where
        F: FnOnce(&mut MockConn) + Send + 'static,
    {
        MockServer::start(move |conn| {
            conn.greet();
            conn.login();
            script(conn);
        })
    }

    pub fn config(&self) -> FtpConfig {
        FtpConfig::new("127.0.0.1")
            .port(self.port)
            .timeout(Duration::from_secs(5))
    }

    pub fn connect(&self) -> FtpSession {
        FtpSession::connect_with_config(&self.config()).unwrap()
    }

    pub fn connect_and_login(&self) -> FtpSession {
        let mut ftp = self.connect();
        ftp.login("anon", "pw").unwrap();
        ftp
    }

    /// Waits for the script to finish, re-raising its panics.
    pub fn join(self) {
        self.handle.join().unwrap();
    }
}

pub struct MockConn {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl MockConn {
    pub fn send(&mut self, reply: &str) {
        self.writer
            .write_all(format!("{}\r\n", reply).as_bytes())
            .unwrap();
    }

    /// Next command line from the client, `None` once it hung up.
    pub fn recv(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()),
            Err(e) => panic!("mock server read failed: {}", e),
        }
    }

    pub fn expect(&mut self, command: &str) {
        assert_eq!(self.recv().as_deref(), Some(command));
    }

    pub fn reply(&mut self, command: &str, reply: &str) {
        self.expect(command);
        self.send(reply);
    }

    pub fn expect_closed(&mut self) {
        assert_eq!(self.recv(), None);
    }

    pub fn expect_quit(&mut self) {
        self.expect("QUIT");
        self.expect_closed();
    }

    pub fn greet(&mut self) {
        self.send("220 Mock FTP ready");
    }

    pub fn login(&mut self) {
        self.reply("USER anon", "331 Password required for anon");
        self.reply("PASS pw", "230 User anon logged in");
    }

    /// Answers `PASV` with a fresh listener on the loopback address.
    pub fn passive(&mut self) -> TcpListener {
        self.expect("PASV");
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        self.send(&format!(
            "227 Entering Passive Mode (127,0,0,1,{},{}).",
            port / 256,
            port % 256
        ));
        listener
    }

    /// Answers `PASV` and accepts the client's data connection.
    pub fn passive_accept(&mut self) -> TcpStream {
        let listener = self.passive();
        let (stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(SERVER_TIMEOUT)).unwrap();
        stream
    }

    /// Answers `PORT` and returns the endpoint the client listens on.
    pub fn active(&mut self) -> SocketAddr {
        let line = self.recv().expect("client hung up before PORT");
        assert!(line.starts_with("PORT "), "expected PORT, got {:?}", line);
        let numbers: Vec<u16> = line[5..]
            .split(',')
            .map(|n| n.parse().unwrap())
            .collect();
        assert_eq!(numbers.len(), 6);
        let port = numbers[4] * 256 + numbers[5];
        assert!(port >= 39 * 256 + 39 && port <= 250 * 256 + 250);
        self.send("200 PORT command successful");
        SocketAddrV4::new(
            Ipv4Addr::new(
                numbers[0] as u8,
                numbers[1] as u8,
                numbers[2] as u8,
                numbers[3] as u8,
            ),
            port,
        )
        .into()
    }

    pub fn connect_back(addr: SocketAddr) -> TcpStream {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(SERVER_TIMEOUT)).unwrap();
        stream
    }
}

pub fn read_all(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = vec![];
    stream.read_to_end(&mut buf).unwrap();
    buf
}

pub fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}
