use thiserror::Error;
use xmlrpc_transport::TransportError;

/// Flat classification of [`OdooError`], convenient for matching without caring about payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingCredentials,
    InvalidCredentials,
    LoginFailed,
    NotAuthenticated,
    UnknownChannel,
    ArityError,
    InvalidCriteria,
    UnexpectedResultShape,
    TransportFault,
}

/// Errors returned by [`RpcConnection`](crate::RpcConnection) and
/// [`OdooClient`](crate::OdooClient).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OdooError {
    /// Host, database, username or password was not configured before login
    #[error("Missing Odoo settings: {}", .missing.join(", "))]
    MissingCredentials { missing: Vec<&'static str> },

    /// The server answered the login call with `0`/`false`
    #[error("Invalid login: the server rejected the credentials")]
    InvalidCredentials,

    /// Eager login through the client failed; `cause` is the connection's recorded error
    #[error("Fail to login")]
    LoginFailed {
        #[source]
        cause: Option<Box<OdooError>>,
    },

    /// An `object` or `report` call was attempted without a session
    #[error("Impossible to call method if not logged")]
    NotAuthenticated,

    /// A channel name outside `db`, `common`, `object`, `report`
    #[error("Unknown channel '{0}'")]
    UnknownChannel(String),

    /// `call` needs at least the object and the method
    #[error("call must have at least 2 parameters (object, method), got {given}")]
    Arity { given: usize },

    /// Search criteria that is neither a domain array nor a [`Criteria`](crate::Criteria)
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    /// The server result of a typed helper is not an array
    #[error("{operation}: result must be an array, got {found}")]
    UnexpectedResultShape {
        operation: &'static str,
        found: &'static str,
    },

    /// Transport failure, including server faults
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl OdooError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            OdooError::MissingCredentials { .. } => ErrorKind::MissingCredentials,
            OdooError::InvalidCredentials => ErrorKind::InvalidCredentials,
            OdooError::LoginFailed { .. } => ErrorKind::LoginFailed,
            OdooError::NotAuthenticated => ErrorKind::NotAuthenticated,
            OdooError::UnknownChannel(_) => ErrorKind::UnknownChannel,
            OdooError::Arity { .. } => ErrorKind::ArityError,
            OdooError::InvalidCriteria(_) => ErrorKind::InvalidCriteria,
            OdooError::UnexpectedResultShape { .. } => ErrorKind::UnexpectedResultShape,
            OdooError::Transport(_) => ErrorKind::TransportFault,
        }
    }

    /// The transport error behind this error, looking through a login failure's cause.
    #[must_use]
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            OdooError::Transport(err) => Some(err),
            OdooError::LoginFailed { cause: Some(cause) } => cause.transport(),
            _ => None,
        }
    }
}
