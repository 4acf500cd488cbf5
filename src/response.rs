use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::FtpError;
use crate::status::ftp_status;

lazy_static! {
    static ref PASV_ADDR_RE: Regex =
        Regex::new(r"\((\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3})\)").unwrap();
}

/// One reply read from the control channel.
///
/// `lines` holds every physical line that made up the reply, without line
/// terminators. `status` always comes from the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpResponse {
    pub status: u16,
    pub lines: Vec<String>,
}

impl FtpResponse {
    pub(crate) fn from_lines(lines: Vec<String>) -> Result<FtpResponse, FtpError> {
        let last = match lines.last() {
            Some(v) => v,
            None => return Err(FtpError::InvalidResponseFormat(String::new())),
        };
        let status = parse_status(last)?;
        Ok(FtpResponse { status, lines })
    }

    /// The last line, the one carrying the status.
    pub fn last_line(&self) -> &str {
        self.lines.last().map(String::as_str).unwrap_or("")
    }

    /// The full reply text as the server sent it.
    pub fn text(&self) -> String {
        self.lines.join("\r\n")
    }

    pub fn parse_pasv_addr(&self) -> Result<SocketAddrV4, FtpError> {
        let caps = match PASV_ADDR_RE.captures(self.last_line()) {
            Some(v) => v,
            None => return Err(FtpError::UnexpectedResponse(self.clone())),
        };

        let mut numbers = [0u8; 6];
        for (i, slot) in numbers.iter_mut().enumerate() {
            *slot = match caps[i + 1].parse::<u8>() {
                Ok(v) => v,
                Err(_) => return Err(FtpError::UnexpectedResponse(self.clone())),
            };
        }

        Ok(SocketAddrV4::new(
            Ipv4Addr::new(numbers[0], numbers[1], numbers[2], numbers[3]),
            u16::from(numbers[4]) * 256 + u16::from(numbers[5]),
        ))
    }

    /// Text strictly between the first and the last `"` of a `257` reply.
    pub fn parse_quoted_path(&self) -> Result<String, FtpError> {
        let line = self.last_line();
        match (line.find('"'), line.rfind('"')) {
            (Some(start), Some(end)) if start < end => Ok(line[start + 1..end].to_string()),
            _ => Err(FtpError::UnexpectedResponse(self.clone())),
        }
    }

    /// Operating system token of a `215` reply, e.g. `UNIX` out of
    /// `215 UNIX Type: L8`.
    pub fn parse_system_type(&self) -> Option<String> {
        if self.status != ftp_status::SYSTEM_TYPE {
            return None;
        }
        let rest = self.last_line().get(4..)?;
        let token = match rest.find(' ') {
            Some(end) => &rest[..end],
            None => rest.trim_end(),
        };
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }
}

impl FromStr for FtpResponse {
    type Err = FtpError;

    fn from_str(s: &str) -> Result<FtpResponse, FtpError> {
        let line = s.trim_end_matches(|c| c == '\r' || c == '\n');
        FtpResponse::from_lines(vec![line.to_string()])
    }
}

/// Reads the 3-digit status at the start of a reply line.
pub(crate) fn parse_status(line: &str) -> Result<u16, FtpError> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(FtpError::InvalidResponseFormat(line.to_string()));
    }
    match bytes.get(3) {
        None | Some(b' ') | Some(b'-') => (),
        Some(_) => return Err(FtpError::InvalidResponseFormat(line.to_string())),
    }
    match line[..3].parse::<u16>() {
        Ok(status) if (100..600).contains(&status) => Ok(status),
        _ => Err(FtpError::InvalidResponseFormat(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(line: &str) -> FtpResponse {
        line.parse().unwrap()
    }

    #[test]
    fn status_comes_from_last_line() {
        let res = FtpResponse::from_lines(vec![
            "230-Welcome".to_string(),
            " to the archive".to_string(),
            "230 Login successful.".to_string(),
        ])
        .unwrap();
        assert_eq!(res.status, 230);
        assert_eq!(res.text(), "230-Welcome\r\n to the archive\r\n230 Login successful.");
    }

    #[test]
    fn rejects_non_reply_lines() {
        assert!(matches!(
            "hello".parse::<FtpResponse>(),
            Err(FtpError::InvalidResponseFormat(_))
        ));
        assert!(matches!(
            "2201 nope".parse::<FtpResponse>(),
            Err(FtpError::InvalidResponseFormat(_))
        ));
        assert!(matches!(
            "999 nope".parse::<FtpResponse>(),
            Err(FtpError::InvalidResponseFormat(_))
        ));
        assert_eq!(reply("220").status, 220);
    }

    #[test]
    fn pasv_endpoint() {
        let res = reply("227 Entering Passive Mode (127,0,0,1,200,34).");
        let addr = res.parse_pasv_addr().unwrap();
        assert_eq!(*addr.ip(), Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(addr.port(), 51234);
    }

    #[test]
    fn pasv_endpoint_out_of_range() {
        let res = reply("227 Entering Passive Mode (127,0,0,300,200,34).");
        assert!(matches!(
            res.parse_pasv_addr(),
            Err(FtpError::UnexpectedResponse(_))
        ));
        let res = reply("227 Entering Passive Mode.");
        assert!(res.parse_pasv_addr().is_err());
    }

    #[test]
    fn quoted_path() {
        let res = reply("257 \"/home/user\" is the current directory");
        assert_eq!(res.parse_quoted_path().unwrap(), "/home/user");

        let res = reply("257 \"/odd \"\"dir\"\"\" is current");
        assert_eq!(res.parse_quoted_path().unwrap(), "/odd \"\"dir\"\"");

        assert!(reply("257 no quotes").parse_quoted_path().is_err());
    }

    #[test]
    fn system_type_token() {
        assert_eq!(
            reply("215 UNIX Type: L8").parse_system_type(),
            Some("UNIX".to_string())
        );
        assert_eq!(
            reply("215 Windows_NT").parse_system_type(),
            Some("Windows_NT".to_string())
        );
        assert_eq!(reply("502 Not implemented").parse_system_type(), None);
    }
}
