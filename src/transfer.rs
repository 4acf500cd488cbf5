use std::convert::TryFrom;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use log::{debug, warn};

use crate::data::DataChannel;
use crate::error::{FtpError, Result};
use crate::session::{check_argument, FtpSession};
use crate::status::ftp_status;

const CHUNK_SIZE: usize = 10240;

/// Representation type announced with `TYPE` before a transfer.
///
/// Bytes are copied unchanged in both modes; `Ascii` only tells the server to
/// treat the file as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Ascii = 0,
    Binary = 1,
}

impl TransferMode {
    fn type_code(self) -> &'static str {
        match self {
            TransferMode::Ascii => "A",
            TransferMode::Binary => "I",
        }
    }
}

impl Default for TransferMode {
    fn default() -> Self {
        TransferMode::Binary
    }
}

impl TryFrom<u8> for TransferMode {
    type Error = FtpError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(TransferMode::Ascii),
            1 => Ok(TransferMode::Binary),
            _ => Err(FtpError::invalid_argument(format!(
                "unknown transfer mode {}",
                value
            ))),
        }
    }
}

impl FtpSession {
    /// Lists `path` (the working directory if empty) with `LIST`.
    ///
    /// Lines are returned as the server sent them, without parsing.
    pub fn rawlist(&mut self, path: &str) -> Result<Vec<String>> {
        check_argument("path", path, true)?;
        self.control()?;

        let channel = self.take_data_channel()?;
        let command = if path.is_empty() {
            "LIST".to_string()
        } else {
            format!("LIST {}", path)
        };
        let control = self.control()?;
        control.write_command(&command)?;
        let res = control.read_single_response()?;
        // 425 and every other non-1xx reply mean no data will flow
        if !ftp_status::is_preliminary(res.status) {
            return Err(FtpError::UnexpectedResponse(res));
        }

        let mut stream = channel.acquire_stream(self.timeout)?;
        let mut raw = vec![];
        stream
            .read_to_end(&mut raw)
            .map_err(|e| FtpError::io("read listing", e))?;
        drop(stream);

        let lines = split_listing(&raw);
        let trailer = self.control()?.read_single_response()?;
        if ftp_status::is_negative(trailer.status) {
            warn!("LIST {} ended with: {}", path, trailer.last_line());
        } else {
            debug!("LIST {} returned {} lines", path, lines.len());
        }
        Ok(lines)
    }

    /// Uploads the local file `local` to `remote` with `STOR`.
    pub fn put<P: AsRef<Path>>(
        &mut self,
        remote: &str,
        local: P,
        mode: TransferMode,
    ) -> Result<&mut Self> {
        check_argument("remote path", remote, false)?;
        self.control()?;

        let local = local.as_ref();
        let mut file = open_readable(local)?;

        let channel = self.take_data_channel()?;
        if let Err(e) = self.set_type(mode) {
            self.data = Some(channel);
            return Err(e);
        }

        debug!("Storing {} as {}", local.display(), remote);
        let control = self.control()?;
        control.write_command(&format!("STOR {}", remote))?;
        control.wait_readable()?;
        control.expect_single_response(&[
            ftp_status::FILE_OPENING_DATA,
            ftp_status::DATA_TRANSFER_STARTING,
        ])?;

        let mut stream = channel.acquire_stream(self.timeout)?;
        let sent = send_file(local, &mut file, &mut stream)?;
        drop(stream);
        drop(file);

        self.wait_transfer_complete()?;
        debug!("Stored {} bytes to {}", sent, remote);
        Ok(self)
    }

    /// Downloads `remote` into the local file `local` with `RETR`.
    pub fn get<P: AsRef<Path>>(
        &mut self,
        local: P,
        remote: &str,
        mode: TransferMode,
    ) -> Result<&mut Self> {
        check_argument("remote path", remote, false)?;
        self.control()?;

        let local = local.as_ref();
        check_writable_target(local)?;

        let channel = self.take_data_channel()?;
        if let Err(e) = self.set_type(mode) {
            self.data = Some(channel);
            return Err(e);
        }

        debug!("Retrieving {} into {}", remote, local.display());
        let control = self.control()?;
        control.write_command(&format!("RETR {}", remote))?;
        control.expect_single_response(&[
            ftp_status::FILE_OPENING_DATA,
            ftp_status::DATA_TRANSFER_STARTING,
        ])?;

        let file = File::create(local).map_err(|e| FtpError::local_file(local, e))?;
        let timeout = self.timeout;
        let result = receive_into(local, file, channel, timeout).and_then(|received| {
            self.control()?
                .expect_single_response(&[ftp_status::DATA_CLOSING])?;
            Ok(received)
        });

        match result {
            Ok(received) => {
                debug!("Retrieved {} bytes from {}", received, remote);
                Ok(self)
            }
            Err(e) => {
                // a failed download leaves no partial file behind
                if let Err(rm) = fs::remove_file(local) {
                    warn!("Unable to remove {}: {}", local.display(), rm);
                }
                Err(e)
            }
        }
    }

    fn set_type(&mut self, mode: TransferMode) -> Result<()> {
        self.control()?.execute_expect(
            &format!("TYPE {}", mode.type_code()),
            &[ftp_status::COMMAND_OKAY],
        )?;
        Ok(())
    }

    /// Skips replies until `226`; a negative reply fails the transfer.
    fn wait_transfer_complete(&mut self) -> Result<()> {
        let control = self.control()?;
        loop {
            let res = control.read_single_response()?;
            if res.status == ftp_status::DATA_CLOSING {
                return Ok(());
            }
            if ftp_status::is_negative(res.status) {
                return Err(FtpError::UnexpectedResponse(res));
            }
            debug!("Skipping reply while waiting for 226: {}", res.last_line());
        }
    }
}

fn open_readable(path: &Path) -> Result<File> {
    let file = File::open(path).map_err(|e| FtpError::local_file(path, e))?;
    let meta = file
        .metadata()
        .map_err(|e| FtpError::local_file(path, e))?;
    if meta.is_dir() {
        return Err(FtpError::local_file(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "is a directory"),
        ));
    }
    Ok(file)
}

fn check_writable_target(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Err(FtpError::local_file(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "is a directory"),
        ));
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let meta = fs::metadata(parent).map_err(|e| FtpError::local_file(parent, e))?;
    if !meta.is_dir() {
        return Err(FtpError::local_file(
            parent,
            io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }
    if meta.permissions().readonly() {
        return Err(FtpError::local_file(
            parent,
            io::Error::new(io::ErrorKind::PermissionDenied, "directory is read-only"),
        ));
    }
    Ok(())
}

/// Streams the data channel into `file`; both are closed on return.
fn receive_into(path: &Path, file: File, channel: DataChannel, timeout: Duration) -> Result<u64> {
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut stream = channel.acquire_stream(timeout)?;
    receive_file(path, &mut stream, &mut writer)
}

fn send_file<W: Write>(path: &Path, file: &mut File, stream: &mut W) -> Result<u64> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FtpError::local_file(path, e)),
        };
        stream
            .write_all(&buf[..n])
            .map_err(|e| FtpError::io("send file data", e))?;
        total += n as u64;
    }
    stream
        .flush()
        .map_err(|e| FtpError::io("send file data", e))?;
    Ok(total)
}

fn receive_file<R: Read, W: Write>(path: &Path, stream: &mut R, writer: &mut W) -> Result<u64> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FtpError::io("receive file data", e)),
        };
        writer
            .write_all(&buf[..n])
            .map_err(|e| FtpError::local_file(path, e))?;
        total += n as u64;
    }
    writer.flush().map_err(|e| FtpError::local_file(path, e))?;
    Ok(total)
}

/// Splits listing bytes into lines, dropping the empty entry after the final
/// line break.
fn split_listing(raw: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(raw);
    let mut lines: Vec<String> = text
        .split('\n')
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect();
    if lines.last().map_or(false, String::is_empty) {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_drops_only_trailing_empty_line() {
        let raw = b"drwxr-xr-x 2 0 0 4096 Jan 01 2020 pub\r\n-rw-r--r-- 1 0 0 41 Feb 22 16:06 README\r\n";
        assert_eq!(
            split_listing(raw),
            vec![
                "drwxr-xr-x 2 0 0 4096 Jan 01 2020 pub".to_string(),
                "-rw-r--r-- 1 0 0 41 Feb 22 16:06 README".to_string(),
            ]
        );
        assert_eq!(split_listing(b"a\n\nb"), vec!["a", "", "b"]);
        assert!(split_listing(b"").is_empty());
    }

    #[test]
    fn transfer_mode_from_number() {
        assert_eq!(TransferMode::try_from(0).unwrap(), TransferMode::Ascii);
        assert_eq!(TransferMode::try_from(1).unwrap(), TransferMode::Binary);
        assert!(matches!(
            TransferMode::try_from(2),
            Err(FtpError::InvalidArgument(_))
        ));
        assert_eq!(TransferMode::default(), TransferMode::Binary);
        assert_eq!(TransferMode::Ascii.type_code(), "A");
        assert_eq!(TransferMode::Binary.type_code(), "I");
    }

    #[test]
    fn unwritable_target_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_writable_target(dir.path()).unwrap_err();
        assert_eq!(err.kind(), crate::error::FtpErrorKind::Resource);

        let missing = dir.path().join("missing").join("file.bin");
        assert!(check_writable_target(&missing).is_err());

        assert!(check_writable_target(&dir.path().join("file.bin")).is_ok());
    }
}
