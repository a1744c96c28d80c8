use std::fmt;
use std::io;

use mavbridge_ftf::FtfError;
use mavbridge_link::TransportError;
use mavbridge_router::RouterError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound
        | io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { ref source, .. } | TransportError::Open { ref source, .. } => {
            let code = io_error(context, io::Error::from(source.kind())).code;
            CliError::new(code, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
        TransportError::Malformed(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        TransportError::InvalidUrl { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn router_error(context: &str, err: RouterError) -> CliError {
    match err {
        RouterError::Transport(err) => transport_error(context, err),
        RouterError::InvalidId(_) => CliError::new(USAGE, format!("{context}: {err}")),
        RouterError::NoUplink => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

pub fn ftf_error(context: &str, err: FtfError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn transport_errors_map_to_codes() {
        let bind = TransportError::Bind {
            addr: "127.0.0.1:1".parse().unwrap(),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };
        assert_eq!(transport_error("bind", bind).code, TRANSPORT_ERROR);

        let denied = TransportError::Open {
            path: PathBuf::from("/dev/ttyS0"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        let err = transport_error("open", denied);
        assert_eq!(err.code, PERMISSION_DENIED);
        assert!(err.message.contains("/dev/ttyS0"));

        assert_eq!(
            transport_error(
                "open",
                TransportError::InvalidUrl {
                    url: "serial://".into(),
                    reason: "missing device".into()
                }
            )
            .code,
            USAGE
        );
        assert_eq!(
            transport_error("send", TransportError::QueueFull("fcu".into())).code,
            TRANSPORT_ERROR
        );
    }

    #[test]
    fn router_errors_map_to_codes() {
        assert_eq!(router_error("load", RouterError::InvalidId(300)).code, USAGE);
        assert_eq!(router_error("send", RouterError::NoUplink).code, TRANSPORT_ERROR);
        let nested = RouterError::Transport(TransportError::Io(io::Error::from(
            io::ErrorKind::TimedOut,
        )));
        assert_eq!(router_error("send", nested).code, TIMEOUT);
    }

    #[test]
    fn ftf_errors_are_data_invalid() {
        let err = ftf_error("transform", FtfError::DegenerateOrientation { norm: 0.0 });
        assert_eq!(err.code, DATA_INVALID);
    }
}
