use url::Url;

use crate::config::HttpOptions;
use crate::error::TransportError;
use crate::http::HttpTransport;
use crate::value::Value;

/// The last request issued through a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub params: Vec<Value>,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// A blocking XML-RPC endpoint.
///
/// Besides performing calls, a transport remembers the last request it issued and the last
/// value it decoded, so callers can render traces after the fact.
pub trait Transport: Send {
    /// Invoke `method` with positional `params`.
    ///
    /// # Errors
    /// Returns [`TransportError::Fault`] for server faults and other variants for network,
    /// HTTP or codec failures.
    fn call(&mut self, method: &str, params: &[Value]) -> Result<Value, TransportError>;

    /// The request most recently passed to [`call`](Self::call), successful or not.
    fn last_request(&self) -> Option<&Request>;

    /// The decoded value of the most recent successful call.
    fn last_response(&self) -> Option<&Value>;
}

/// Creates one transport per endpoint URL.
pub trait TransportFactory: Send + Sync {
    /// # Errors
    /// Returns [`TransportError`] when the options cannot be applied.
    fn create(
        &self,
        endpoint: &Url,
        options: &HttpOptions,
    ) -> Result<Box<dyn Transport>, TransportError>;
}

/// Factory for [`HttpTransport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransportFactory;

impl TransportFactory for HttpTransportFactory {
    fn create(
        &self,
        endpoint: &Url,
        options: &HttpOptions,
    ) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(HttpTransport::new(endpoint.clone(), options)?))
    }
}
