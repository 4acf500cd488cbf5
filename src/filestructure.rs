//! Optional parsing of Unix-style `LIST` lines, for callers of
//! [`FtpSession::rawlist`](crate::FtpSession::rawlist).

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::FtpError;

lazy_static! {
    // `-rw-r--r--   1 0        0        41 Feb 22 16:06 README.txt`
    static ref UNIX_LIST_RE: Regex = Regex::new(
        r"^([dl-])[rwxsStT-]{9}\S*\s+\d+\s+\S+\s+\S+\s+(\d+)\s+[A-Za-z]{3}\s+\d{1,2}\s+(?:\d{4}|\d{1,2}:\d{2})\s+(.+)$"
    )
    .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryItemType {
    Link,
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryItem {
    pub name: String,
    pub item_type: DirectoryItemType,
    pub size: u64,
    /// Link target, for `name -> target` entries.
    pub target: Option<String>,
}

impl FromStr for DirectoryItem {
    type Err = FtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim_start_matches('\u{feff}').trim_end();
        let caps = match UNIX_LIST_RE.captures(line) {
            Some(v) => v,
            None => return Err(FtpError::InvalidResponseFormat(line.to_string())),
        };

        let item_type = match &caps[1] {
            "d" => DirectoryItemType::Directory,
            "l" => DirectoryItemType::Link,
            _ => DirectoryItemType::File,
        };
        let size = caps[2]
            .parse::<u64>()
            .map_err(|_| FtpError::InvalidResponseFormat(line.to_string()))?;

        let (name, target) = match (item_type, caps[3].find(" -> ")) {
            (DirectoryItemType::Link, Some(pos)) => (
                caps[3][..pos].to_string(),
                Some(caps[3][pos + 4..].to_string()),
            ),
            _ => (caps[3].to_string(), None),
        };

        Ok(DirectoryItem {
            name,
            item_type,
            size,
            target,
        })
    }
}
