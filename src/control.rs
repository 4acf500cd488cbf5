use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};

use log::trace;

use crate::config::ReplyFraming;
use crate::error::{FtpError, Result};
use crate::response::{parse_status, FtpResponse};

/// The command connection: writes command lines, reads replies.
pub(crate) struct ControlChannel {
    reader: BufReader<TcpStream>,
    framing: ReplyFraming,
}

impl ControlChannel {
    pub(crate) fn new(stream: TcpStream, framing: ReplyFraming) -> ControlChannel {
        ControlChannel {
            reader: BufReader::new(stream),
            framing,
        }
    }

    pub(crate) fn local_addr(&self) -> Result<SocketAddr> {
        self.reader
            .get_ref()
            .local_addr()
            .map_err(|e| FtpError::io("query control address", e))
    }

    pub(crate) fn write_command(&mut self, command: &str) -> Result<()> {
        if command.starts_with("PASS ") {
            trace!("CC OUT: PASS ******");
        } else {
            trace!("CC OUT: {}", command);
        }

        let stream = self.reader.get_mut();
        stream
            .write_all(format!("{}\r\n", command).as_bytes())
            .and_then(|_| stream.flush())
            .map_err(|e| FtpError::io("send command", e))
    }

    /// Sends `command` and reads its reply.
    pub(crate) fn execute(&mut self, command: &str) -> Result<FtpResponse> {
        self.write_command(command)?;
        self.read_response()
    }

    /// Sends `command` and fails unless the reply code is one of `expected`.
    pub(crate) fn execute_expect(&mut self, command: &str, expected: &[u16]) -> Result<FtpResponse> {
        self.write_command(command)?;
        self.expect_response(expected)
    }

    pub(crate) fn expect_response(&mut self, expected: &[u16]) -> Result<FtpResponse> {
        let res = self.read_response()?;
        check_status(res, expected)
    }

    pub(crate) fn read_response(&mut self) -> Result<FtpResponse> {
        match self.framing {
            ReplyFraming::Rfc959 => self.read_rfc959_response(),
            ReplyFraming::Drain => self.read_drained_response(),
        }
    }

    /// Reads exactly one reply with RFC 959 framing, whatever the session
    /// framing is.
    ///
    /// Transfer replies (`150` then `226`) often arrive together; draining
    /// would merge them.
    pub(crate) fn read_single_response(&mut self) -> Result<FtpResponse> {
        self.read_rfc959_response()
    }

    pub(crate) fn expect_single_response(&mut self, expected: &[u16]) -> Result<FtpResponse> {
        let res = self.read_single_response()?;
        check_status(res, expected)
    }

    fn read_rfc959_response(&mut self) -> Result<FtpResponse> {
        let first = self.read_line()?;
        let status = parse_status(&first)?;
        let multiline = first.as_bytes().get(3) == Some(&b'-');
        let mut lines = vec![first];

        if multiline {
            let expected_end = format!("{} ", status);
            loop {
                let line = self.read_line()?;
                let done = line.starts_with(&expected_end) || line == expected_end.trim_end();
                lines.push(line);
                if done {
                    break;
                }
            }
        }

        FtpResponse::from_lines(lines)
    }

    fn read_drained_response(&mut self) -> Result<FtpResponse> {
        let mut lines = vec![self.read_line()?];
        while self.has_pending()? {
            lines.push(self.read_line()?);
        }
        FtpResponse::from_lines(lines)
    }

    /// Reads and returns whatever complete lines are already waiting.
    pub(crate) fn drain_pending(&mut self) -> Result<Vec<String>> {
        let mut drained = vec![];
        while self.has_pending()? {
            drained.push(self.read_line()?);
        }
        Ok(drained)
    }

    /// Blocks until the server has sent something, bounded by the read timeout.
    pub(crate) fn wait_readable(&mut self) -> Result<()> {
        if !self.reader.buffer().is_empty() {
            return Ok(());
        }
        let mut peek_buf = [0u8; 1];
        match self.reader.get_ref().peek(&mut peek_buf) {
            Ok(0) => Err(closed_error("wait for reply")),
            Ok(_) => Ok(()),
            Err(e) => Err(FtpError::io("wait for reply", e)),
        }
    }

    fn has_pending(&mut self) -> Result<bool> {
        if !self.reader.buffer().is_empty() {
            return Ok(true);
        }

        let stream = self.reader.get_ref();
        let mut peek_buf = [0u8; 1];
        stream
            .set_nonblocking(true)
            .map_err(|e| FtpError::io("poll control connection", e))?;
        let peeked = stream.peek(&mut peek_buf);
        stream
            .set_nonblocking(false)
            .map_err(|e| FtpError::io("poll control connection", e))?;

        match peeked {
            Ok(n) => Ok(n > 0),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(FtpError::io("poll control connection", e)),
        }
    }

    fn read_line(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        let n = self
            .reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| FtpError::io("read reply", e))?;
        if n == 0 {
            return Err(closed_error("read reply"));
        }

        while buf.last() == Some(&b'\n') || buf.last() == Some(&b'\r') {
            buf.pop();
        }
        let line = String::from_utf8_lossy(&buf).into_owned();
        trace!("CC IN: {}", line);
        Ok(line)
    }
}

fn check_status(res: FtpResponse, expected: &[u16]) -> Result<FtpResponse> {
    if expected.contains(&res.status) {
        Ok(res)
    } else {
        Err(FtpError::UnexpectedResponse(res))
    }
}

fn closed_error(context: &'static str) -> FtpError {
    FtpError::Connection {
        context,
        source: io::Error::new(io::ErrorKind::UnexpectedEof, "control connection closed"),
    }
}
