use std::fmt;

use thiserror::Error;

/// Fault reported by the remote server inside a well-formed `methodResponse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: i64,
    pub message: String,
}

impl Fault {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Errors raised while encoding or decoding XML-RPC documents.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CodecError {
    /// The document is not well-formed XML
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Well-formed XML that does not follow the XML-RPC grammar
    #[error("Malformed XML-RPC document: {0}")]
    Malformed(String),

    /// A scalar whose text cannot be parsed as its declared type
    #[error("Invalid <{kind}> value '{text}'")]
    InvalidScalar { kind: &'static str, text: String },

    /// XML-RPC has no representation for NaN or infinity
    #[error("Cannot encode non-finite double {0}")]
    NonFiniteDouble(f64),

    /// Response bytes are not UTF-8
    #[error("Response body is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),
}

/// Errors returned by a [`Transport`](crate::Transport) call.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    /// The server answered with an XML-RPC fault
    #[error("XML-RPC fault {}: {}", .0.code, .0.message)]
    Fault(Fault),

    /// HTTP non-2xx status
    #[error("HTTP {status}: {body_preview}")]
    HttpStatus { status: u16, body_preview: String },

    /// Network level failure (DNS, connect, TLS, timeout, ...)
    #[error("Network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Reading the response body failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response body exceeded the configured limit
    #[error("Response body too large: limit {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// The request could not be encoded or the response could not be decoded
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Endpoint URL failed to parse
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// HTTP client options were rejected (e.g. an unparsable proxy)
    #[error("Invalid HTTP options: {0}")]
    InvalidOptions(String),
}

impl TransportError {
    /// The server fault, if this error is one.
    #[must_use]
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            TransportError::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    /// Human-readable message without the variant prefix; for faults this is the server text.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            TransportError::Fault(fault) => fault.message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<Fault> for TransportError {
    fn from(fault: Fault) -> Self {
        TransportError::Fault(fault)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::error::Error;

    #[derive(Debug)]
    struct TestError(&'static str);

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl Error for TestError {}

    #[test]
    fn network_error_preserves_source() {
        let err = TransportError::Network(Box::new(TestError("connection refused")));

        let source = err.source().expect("network error should have a source");
        let downcast = source.downcast_ref::<TestError>();
        assert_eq!(downcast.map(|e| e.0), Some("connection refused"));
    }

    #[test]
    fn fault_message_is_server_text() {
        let err = TransportError::from(Fault::new(1, "Access Denied"));
        assert_eq!(err.message(), "Access Denied");
        assert_eq!(err.to_string(), "XML-RPC fault 1: Access Denied");
        assert_eq!(err.fault().map(|f| f.code), Some(1));
    }

    #[test]
    fn non_fault_message_is_display() {
        let err = TransportError::BodyTooLarge { limit: 16 };
        assert!(err.fault().is_none());
        assert_eq!(err.message(), "Response body too large: limit 16 bytes");
    }
}
