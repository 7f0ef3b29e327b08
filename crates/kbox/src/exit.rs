use std::fmt;
use std::io;

use kbox_client::ClientError;
use kbox_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const RETRIES_EXHAUSTED: i32 = 3;
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
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { port, source } => {
            io_error(&format!("{context}: cannot open {port}"), source.into())
        }
        TransportError::Io(source) => io_error(context, source),
        TransportError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Transport(err) => transport_error(context, err),
        ClientError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ClientError::Protocol { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        ClientError::Device { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        ClientError::RetriesExhausted { .. } => {
            CliError::new(RETRIES_EXHAUSTED, format!("{context}: {err}"))
        }
        ClientError::InvalidRequest(_) => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn client_errors_map_to_exit_codes() {
        let code = |err| client_error("x", err).code;
        assert_eq!(code(ClientError::Timeout(Duration::from_secs(1))), TIMEOUT);
        assert_eq!(
            code(ClientError::Protocol {
                message: "bad".into(),
                frame: Default::default()
            }),
            DATA_INVALID
        );
        assert_eq!(
            code(ClientError::RetriesExhausted {
                file: "f".into(),
                offset: 0,
                attempts: 3
            }),
            RETRIES_EXHAUSTED
        );
        assert_eq!(code(ClientError::InvalidRequest("nul".into())), USAGE);
        assert_eq!(
            code(ClientError::Transport(TransportError::Closed)),
            FAILURE
        );
    }

    #[test]
    fn io_kinds_map_to_exit_codes() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(io_error("open", denied).code, PERMISSION_DENIED);
        let other = io::Error::other("boom");
        assert_eq!(io_error("open", other).code, INTERNAL);
    }
}
