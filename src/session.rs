use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream, ToSocketAddrs};
use std::ops::RangeInclusive;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;

use crate::config::FtpConfig;
use crate::control::ControlChannel;
use crate::data::{self, DataChannel, DataMode};
use crate::error::{FtpError, Result};
use crate::response::FtpResponse;
use crate::status::ftp_status;

/// A blocking FTP client session.
///
/// Every method blocks for at most the configured timeout per socket
/// operation. A session must not be shared between threads without external
/// serialization; open one session per logical connection instead.
pub struct FtpSession {
    pub(crate) control: Option<ControlChannel>,
    pub(crate) timeout: Duration,
    pub(crate) data: Option<DataChannel>,
    pub(crate) passive: bool,
    active_port_octets: RangeInclusive<u8>,
}

impl FtpSession {
    /// Connects to `host:port` and waits for the `220` greeting.
    ///
    /// `timeout_secs` bounds the connect and every later socket read or write.
    pub fn connect(host: &str, port: u16, timeout_secs: u64) -> Result<FtpSession> {
        let config = FtpConfig::new(host)
            .port(port)
            .timeout(Duration::from_secs(timeout_secs));
        FtpSession::connect_with_config(&config)
    }

    pub fn connect_with_config(config: &FtpConfig) -> Result<FtpSession> {
        if config.host.trim().is_empty() {
            return Err(FtpError::invalid_argument("missing host"));
        }
        if config.timeout == Duration::from_secs(0) {
            return Err(FtpError::invalid_argument("timeout must be greater than zero"));
        }
        if config.active_port_octets.is_empty() || *config.active_port_octets.start() == 0 {
            return Err(FtpError::invalid_argument(format!(
                "invalid active port octet range {:?}",
                config.active_port_octets
            )));
        }

        debug!("Connecting to {}:{}", config.host, config.port);
        let stream = connect_any(&config.host, config.port, config.timeout)?;
        data::set_timeouts(&stream, config.timeout)
            .map_err(|e| FtpError::io("configure control connection", e))?;

        let mut control = ControlChannel::new(stream, config.reply_framing);
        let greeting = control.expect_response(&[ftp_status::SERVICE_READY])?;
        debug!("Server ready: {}", greeting.last_line());

        Ok(FtpSession {
            control: Some(control),
            timeout: config.timeout,
            data: None,
            passive: config.passive,
            active_port_octets: config.active_port_octets.clone(),
        })
    }

    /// Sends `USER` and, only if the server asks for one, `PASS`.
    pub fn login(&mut self, username: &str, password: &str) -> Result<&mut Self> {
        check_argument("username", username, false)?;
        check_argument("password", password, true)?;
        debug!("Logging in as {}", username);

        let control = self.control()?;
        control.execute_expect(&format!("USER {}", username), &[ftp_status::PASSWORD_NEEDED])?;
        control.execute_expect(&format!("PASS {}", password), &[ftp_status::LOGGED_IN])?;
        debug!("Logged in as {}", username);
        Ok(self)
    }

    /// Sends `QUIT` and closes the control connection and any data channel.
    ///
    /// The socket is closed even if `QUIT` cannot be written.
    pub fn quit(&mut self) -> Result<&mut Self> {
        let mut control = self.control.take().ok_or(FtpError::Disconnected)?;
        self.data = None;
        if let Err(e) = control.write_command("QUIT") {
            warn!("Unable to send QUIT: {}", e);
        }
        drop(control);
        debug!("Control connection closed");
        Ok(self)
    }

    pub fn close(&mut self) -> Result<&mut Self> {
        self.quit()
    }

    /// Sends one raw command line and returns the reply, whatever its code.
    pub fn send_command(&mut self, line: &str) -> Result<FtpResponse> {
        check_argument("command", line, false)?;
        self.control()?.execute(line)
    }

    /// Negotiates a new data channel, closing the current one first.
    ///
    /// Passive mode connects to the endpoint announced in the `227` reply.
    /// Active mode listens on a random port whose two bytes are drawn from the
    /// configured octet range (by default ports 10023 to 64250, no collision
    /// check) and advertises it with `PORT`.
    pub fn pasv(&mut self, passive: bool) -> Result<&mut Self> {
        let channel = self.open_data_channel(passive)?;
        self.data = Some(channel);
        Ok(self)
    }

    /// Tears down the current data channel and negotiates a new one without
    /// storing it.
    pub(crate) fn open_data_channel(&mut self, passive: bool) -> Result<DataChannel> {
        self.control()?;

        if let Some(old) = self.data.take() {
            debug!("Closing data channel {}", old.endpoint());
            drop(old);
            for line in self.control()?.drain_pending()? {
                debug!("Discarded pending reply: {}", line);
            }
        }

        let channel = if passive {
            self.negotiate_passive()?
        } else {
            self.negotiate_active()?
        };
        debug!(
            "{:?} data channel ready on {}",
            channel.mode(),
            channel.endpoint()
        );

        self.passive = passive;
        Ok(channel)
    }

    /// The open data channel, or a new one in the last used mode.
    pub(crate) fn take_data_channel(&mut self) -> Result<DataChannel> {
        match self.data.take() {
            Some(channel) => Ok(channel),
            None => {
                let passive = self.passive;
                self.open_data_channel(passive)
            }
        }
    }

    fn negotiate_passive(&mut self) -> Result<DataChannel> {
        let timeout = self.timeout;
        let res = self
            .control()?
            .execute_expect("PASV", &[ftp_status::ENTERING_PASSIVE])?;
        let peer = res.parse_pasv_addr()?;
        DataChannel::connect(peer.into(), timeout)
    }

    fn negotiate_active(&mut self) -> Result<DataChannel> {
        let local_ip = match self.control()?.local_addr()?.ip() {
            IpAddr::V4(ip) => ip,
            IpAddr::V6(ip) => {
                return Err(FtpError::invalid_argument(format!(
                    "active mode needs an IPv4 control connection, local address is {}",
                    ip
                )))
            }
        };

        let mut rng = rand::thread_rng();
        let low = rng.gen_range(self.active_port_octets.clone());
        let high = rng.gen_range(self.active_port_octets.clone());
        let port = u16::from(low) * 256 + u16::from(high);

        let channel = DataChannel::listen(SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), port))?;

        let ip = local_ip.octets();
        let command = format!(
            "PORT {},{},{},{},{},{}",
            ip[0], ip[1], ip[2], ip[3], low, high
        );
        self.control()?
            .execute_expect(&command, &[ftp_status::COMMAND_OKAY])?;
        Ok(channel)
    }

    pub fn is_connected(&self) -> bool {
        self.control.is_some()
    }

    pub fn has_data_channel(&self) -> bool {
        self.data.is_some()
    }

    /// Mode of the open data channel, if any.
    pub fn data_mode(&self) -> Option<DataMode> {
        self.data.as_ref().map(DataChannel::mode)
    }

    /// Whether the next implicitly negotiated data channel will be passive.
    pub fn is_passive(&self) -> bool {
        self.passive
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn control(&mut self) -> Result<&mut ControlChannel> {
        self.control.as_mut().ok_or(FtpError::Disconnected)
    }
}

fn connect_any(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| FtpError::io("resolve host", e))?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("Connect to {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    let err = last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, "host resolved to no address")
    });
    Err(FtpError::io("connect", err))
}

/// Rejects arguments that would break the command line before any I/O.
pub(crate) fn check_argument(name: &str, value: &str, allow_empty: bool) -> Result<()> {
    if !allow_empty && value.is_empty() {
        return Err(FtpError::invalid_argument(format!("{} must not be empty", name)));
    }
    if value.contains('\r') || value.contains('\n') {
        return Err(FtpError::invalid_argument(format!(
            "{} must not contain line breaks",
            name
        )));
    }
    Ok(())
}
