use std::io;
use std::path::PathBuf;
use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("input file does not exist: {0}")]
    InputMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    #[error("disk full: {0}")]
    DiskFull(#[source] io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if is_disk_full(&err) {
            Error::DiskFull(err)
        } else {
            Error::Io(err)
        }
    }
}

/// Identifies out-of-space failures so the CLI can advise the user.
/// Matches the error kind or OS error code first and falls back to message
/// sniffing for wrapped errors that lost both.
fn is_disk_full(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::StorageFull {
        return true;
    }

    if let Some(code) = err.raw_os_error() {
        if cfg!(unix) && code == 28 {
            return true; // ENOSPC
        }
        if cfg!(windows) && (code == 39 || code == 112) {
            return true; // ERROR_HANDLE_DISK_FULL, ERROR_DISK_FULL
        }
    }

    let message = err.to_string().to_lowercase();
    message.contains("no space left")
        || message.contains("disk full")
        || message.contains("not enough space")
}
