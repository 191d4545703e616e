//! [`Command`] parsing out of a received [`ftp_protocol::Request`] line.

/// A parsed command line: a verb from the closed set, plus its trimmed argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `PWD` — print working directory.
    Pwd,
    /// `CWD <path>` — change working directory.
    Cwd(String),
    /// `MKD <path>` — make directory.
    Mkd(String),
    /// `RMD <path>` — remove directory.
    Rmd(String),
    /// `DELE <path>` — delete file.
    Dele(String),
    /// `PORT <ip>,<port>` — select ACTIVE data mode.
    Port(String),
    /// `PASV` — select PASSIVE data mode.
    Pasv,
    /// `LIST [path]` — list a directory over the data channel.
    List(String),
    /// `RETR <path>` — retrieve a file over the data channel.
    Retr(String),
    /// `STOR <path>` — store a file received over the data channel.
    Stor(String),
    /// `QUIT` — close the session.
    Quit,
    /// A verb outside the recognized set, or a malformed line.
    Unknown,
}

/// Parses a raw request line into a [`Command`].
///
/// Matches the head, case-insensitively, against the closed verb set
/// {PWD, CWD, MKD, RMD, PORT, PASV, DELE, LIST, RETR, STOR, QUIT} and takes
/// the trimmed remainder as the argument (the empty string for verbs that
/// take none). Any other verb, or an empty line, yields [`Command::Unknown`].
#[must_use]
pub fn parse(line: &str) -> Command {
    let trimmed = line.trim_end_matches('\0').trim();
    if trimmed.is_empty() {
        return Command::Unknown;
    }

    let (head, rest) = match trimmed.split_once(' ') {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };

    match head.to_ascii_uppercase().as_str() {
        "PWD" => Command::Pwd,
        "CWD" => Command::Cwd(rest.to_string()),
        "MKD" => Command::Mkd(rest.to_string()),
        "RMD" => Command::Rmd(rest.to_string()),
        "DELE" => Command::Dele(rest.to_string()),
        "PORT" => Command::Port(rest.to_string()),
        "PASV" => Command::Pasv,
        "LIST" => Command::List(rest.to_string()),
        "RETR" => Command::Retr(rest.to_string()),
        "STOR" => Command::Stor(rest.to_string()),
        "QUIT" => Command::Quit,
        _ => Command::Unknown,
    }
}
