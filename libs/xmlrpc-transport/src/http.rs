use std::io::Read;

use url::Url;

use crate::codec::{check_encodable, decode_response, encode_call};
use crate::config::HttpOptions;
use crate::error::{CodecError, TransportError};
use crate::transport::{Request, Transport};
use crate::value::Value;

/// Characters of an error body kept in [`TransportError::HttpStatus`]
const BODY_PREVIEW_CHARS: usize = 256;

/// XML-RPC over blocking HTTP(S) for a single endpoint URL.
pub struct HttpTransport {
    endpoint: Url,
    agent: ureq::Agent,
    max_body_size: usize,
    last_request: Option<Request>,
    last_response: Option<Value>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint.as_str())
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Build a transport for `endpoint`.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidOptions`] when the proxy URL is rejected.
    pub fn new(endpoint: Url, options: &HttpOptions) -> Result<Self, TransportError> {
        let mut builder = ureq::AgentBuilder::new()
            .timeout(options.timeout)
            .timeout_connect(options.connect_timeout.unwrap_or(options.timeout))
            .user_agent(&options.user_agent)
            .redirects(options.redirects);

        if let Some(proxy) = &options.proxy {
            let proxy = ureq::Proxy::new(proxy).map_err(|e| {
                TransportError::InvalidOptions(format!("proxy '{proxy}': {e}"))
            })?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            endpoint,
            agent: builder.build(),
            max_body_size: options.max_body_size,
            last_request: None,
            last_response: None,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn post(&self, payload: &str) -> Result<String, TransportError> {
        tracing::trace!(url = %self.endpoint, bytes = payload.len(), "sending XML-RPC request");

        let response = match self
            .agent
            .post(self.endpoint.as_str())
            .set("Content-Type", "text/xml")
            .send_string(payload)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                return Err(TransportError::HttpStatus {
                    status,
                    body_preview: body_preview(response),
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(TransportError::Network(Box::new(transport)));
            }
        };

        let limit = self.max_body_size;
        let mut raw = Vec::new();
        response
            .into_reader()
            .take(u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1))
            .read_to_end(&mut raw)?;
        if raw.len() > limit {
            return Err(TransportError::BodyTooLarge { limit });
        }
        let body = String::from_utf8(raw).map_err(CodecError::from)?;

        tracing::trace!(url = %self.endpoint, bytes = body.len(), "received XML-RPC response");
        Ok(body)
    }
}

fn body_preview(response: ureq::Response) -> String {
    let mut raw = Vec::new();
    // Best effort: the status is what matters, the body is only context
    if response
        .into_reader()
        .take(4 * 1024)
        .read_to_end(&mut raw)
        .is_err()
    {
        return String::new();
    }
    String::from_utf8_lossy(&raw)
        .chars()
        .take(BODY_PREVIEW_CHARS)
        .collect()
}

impl Transport for HttpTransport {
    fn call(&mut self, method: &str, params: &[Value]) -> Result<Value, TransportError> {
        self.last_request = Some(Request::new(method, params.to_vec()));
        self.last_response = None;

        check_encodable(params)?;
        let body = self.post(&encode_call(method, params))?;
        let value = decode_response(&body)?.into_result()?;

        self.last_response = Some(value.clone());
        Ok(value)
    }

    fn last_request(&self) -> Option<&Request> {
        self.last_request.as_ref()
    }

    fn last_response(&self) -> Option<&Value> {
        self.last_response.as_ref()
    }
}
