use log::debug;

use crate::error::Result;
use crate::session::{check_argument, FtpSession};
use crate::status::ftp_status;

impl FtpSession {
    /// Returns the current remote directory.
    pub fn pwd(&mut self) -> Result<String> {
        let res = self
            .control()?
            .execute_expect("PWD", &[ftp_status::PATHNAME_CREATED])?;
        res.parse_quoted_path()
    }

    pub fn chdir(&mut self, path: &str) -> Result<&mut Self> {
        check_argument("path", path, false)?;
        debug!("Changing working directory to {}", path);
        self.control()?
            .execute_expect(&format!("CWD {}", path), &[ftp_status::FILE_ACTION_COMPLETE])?;
        Ok(self)
    }

    pub fn cdup(&mut self) -> Result<&mut Self> {
        self.control()?
            .execute_expect("CDUP", &[ftp_status::FILE_ACTION_COMPLETE])?;
        Ok(self)
    }

    /// Returns the system name from `SYST`, e.g. `UNIX`.
    ///
    /// Unlike the other commands a rejected `SYST` is not an error: any reply
    /// other than `215` yields `None`. Transport failures still fail.
    pub fn systype(&mut self) -> Result<Option<String>> {
        let res = self.control()?.execute("SYST")?;
        let os = res.parse_system_type();
        if os.is_none() {
            debug!("SYST not answered: {}", res.last_line());
        }
        Ok(os)
    }

    /// Asks the server to reserve `bytes` of storage (`ALLO n R n`).
    pub fn alloc(&mut self, bytes: u64) -> Result<&mut Self> {
        self.control()?.execute_expect(
            &format!("ALLO {} R {}", bytes, bytes),
            &[ftp_status::COMMAND_OKAY, ftp_status::COMMAND_SUPERFLUOUS],
        )?;
        Ok(self)
    }

    /// `SITE CHMOD` with Unix permission bits.
    ///
    /// `mode_bits` is sent in octal notation, so pass an octal literal:
    /// `0o644` goes out as `SITE CHMOD 644`, while a decimal `644` would be
    /// sent as `1204`.
    ///
    /// ```no_run
    /// # fn main() -> pure_ftp::Result<()> {
    /// let mut ftp = pure_ftp::FtpSession::connect("ftp.example.com", 21, 30)?;
    /// ftp.login("anonymous", "guest@example.com")?;
    /// // SITE CHMOD 640 notes.txt
    /// ftp.chmod(0o640, "notes.txt")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn chmod(&mut self, mode_bits: u32, file: &str) -> Result<&mut Self> {
        check_argument("file", file, false)?;
        self.control()?.execute_expect(
            &format!("SITE CHMOD {:o} {}", mode_bits, file),
            &[ftp_status::COMMAND_OKAY],
        )?;
        Ok(self)
    }

    pub fn delete(&mut self, path: &str) -> Result<&mut Self> {
        check_argument("path", path, false)?;
        debug!("Removing {}", path);
        self.control()?
            .execute_expect(&format!("DELE {}", path), &[ftp_status::FILE_ACTION_COMPLETE])?;
        Ok(self)
    }

    /// Runs a server-side command through `SITE EXEC`.
    pub fn exec(&mut self, command: &str) -> Result<&mut Self> {
        check_argument("command", command, false)?;
        self.control()?.execute_expect(
            &format!("SITE EXEC {}", command),
            &[ftp_status::COMMAND_OKAY],
        )?;
        Ok(self)
    }
}
