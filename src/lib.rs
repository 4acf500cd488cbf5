//! A blocking FTP client.
//!
//! One [`FtpSession`] owns the control connection and at most one data
//! connection. Data connections are negotiated with [`FtpSession::pasv`]
//! (`true` for passive, `false` for active) or implicitly in the last used
//! mode when a transfer needs one.
//!
//! ```no_run
//! use pure_ftp::{FtpSession, TransferMode};
//!
//! # fn main() -> pure_ftp::Result<()> {
//! let mut ftp = FtpSession::connect("ftp.example.com", 21, 30)?;
//! ftp.login("anonymous", "guest@example.com")?;
//! println!("cwd: {}", ftp.pwd()?);
//!
//! ftp.pasv(true)?;
//! for line in ftp.rawlist("/pub")? {
//!     println!("{}", line);
//! }
//!
//! ftp.put("remote.bin", "local.bin", TransferMode::Binary)?;
//! ftp.get("copy.bin", "remote.bin", TransferMode::Binary)?;
//! ftp.quit()?;
//! # Ok(())
//! # }
//! ```

mod commands;
pub mod config;
mod control;
mod data;
pub mod error;
pub mod filestructure;
pub mod response;
mod session;
pub mod status;
mod transfer;

pub use config::{FtpConfig, ReplyFraming};
pub use data::DataMode;
pub use error::{FtpError, FtpErrorKind, Result};
pub use response::FtpResponse;
pub use session::FtpSession;
pub use transfer::TransferMode;
