pub mod ftp_status {
    /// Restart marker reply.
    pub const RESTART_MARKER_REPLY: u16 = 110;
    /// Service ready in nnn minutes.
    pub const READY_IN: u16 = 120;
    /// Data connection already open; transfer starting.
    pub const DATA_TRANSFER_STARTING: u16 = 125;
    /// File status okay; about to open the data connection.
    pub const FILE_OPENING_DATA: u16 = 150;

    /// Command okay.
    ///
    /// Expected after `TYPE`, `PORT`, `SITE CHMOD` and `SITE EXEC`.
    pub const COMMAND_OKAY: u16 = 200;
    /// Command not implemented, superfluous at this site.
    ///
    /// Servers without storage preallocation answer `ALLO` with it.
    pub const COMMAND_SUPERFLUOUS: u16 = 202;
    /// NAME system type.
    pub const SYSTEM_TYPE: u16 = 215;
    /// Service ready for new user.
    pub const SERVICE_READY: u16 = 220;
    /// Service closing control connection.
    pub const SERVICE_CLOSING_CONTROL: u16 = 221;
    /// Closing data connection, requested file action successful.
    pub const DATA_CLOSING: u16 = 226;
    /// Entering Passive Mode (h1,h2,h3,h4,p1,p2).
    pub const ENTERING_PASSIVE: u16 = 227;
    /// User logged in, proceed.
    pub const LOGGED_IN: u16 = 230;
    /// Requested file action okay, completed.
    pub const FILE_ACTION_COMPLETE: u16 = 250;
    /// "PATHNAME" created, also the reply to `PWD`.
    pub const PATHNAME_CREATED: u16 = 257;

    /// User name okay, need password.
    pub const PASSWORD_NEEDED: u16 = 331;

    /// Service not available, closing control connection.
    pub const SERVICE_NOT_AVAILABLE: u16 = 421;
    /// Can't open data connection.
    pub const DATA_CANNOT_CONNECT: u16 = 425;
    /// Connection closed; transfer aborted.
    pub const DATA_CLOSED_ABORTING: u16 = 426;

    /// Not logged in.
    pub const NOT_LOGGED_IN: u16 = 530;
    /// Requested action not taken, file unavailable.
    pub const ACTION_NOT_TAKEN: u16 = 550;

    /// 1yz: the command was accepted and another reply will follow.
    pub fn is_preliminary(code: u16) -> bool {
        (100..200).contains(&code)
    }

    /// 4yz and 5yz: the command failed.
    pub fn is_negative(code: u16) -> bool {
        (400..600).contains(&code)
    }
}
