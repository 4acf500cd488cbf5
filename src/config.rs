use std::ops::RangeInclusive;
use std::time::Duration;

/// Default FTP control port.
pub const DEFAULT_PORT: u16 = 21;
/// Default connect and I/O timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// How multi-line replies are framed on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFraming {
    /// Read until a line starts with the reply code followed by a space.
    Rfc959,
    /// Keep reading lines while bytes are immediately available.
    ///
    /// Best-effort only: a reply split across slow deliveries ends early, and
    /// two replies arriving together are merged into one.
    Drain,
}

impl Default for ReplyFraming {
    fn default() -> Self {
        ReplyFraming::Rfc959
    }
}

/// Connection settings for [`FtpSession::connect_with_config`].
///
/// [`FtpSession::connect_with_config`]: crate::FtpSession::connect_with_config
#[derive(Debug, Clone)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    /// Applied to connect, every read and write, and active-mode accepts.
    pub timeout: Duration,
    /// Data connection mode used until `pasv` is called explicitly.
    pub passive: bool,
    pub reply_framing: ReplyFraming,
    /// Range both `PORT` octets are drawn from in active mode.
    pub active_port_octets: RangeInclusive<u8>,
}

impl FtpConfig {
    pub fn new<S: Into<String>>(host: S) -> Self {
        FtpConfig {
            host: host.into(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            passive: true,
            reply_framing: ReplyFraming::default(),
            active_port_octets: 39..=250,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }

    pub fn reply_framing(mut self, framing: ReplyFraming) -> Self {
        self.reply_framing = framing;
        self
    }

    pub fn active_port_octets(mut self, octets: RangeInclusive<u8>) -> Self {
        self.active_port_octets = octets;
        self
    }
}
