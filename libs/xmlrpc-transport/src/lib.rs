#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Blocking XML-RPC client transport
//!
//! This crate provides:
//! - The XML-RPC [`Value`] model with conversions from Rust and JSON values
//! - A document [`codec`] built on `quick-xml`
//! - The [`Transport`] trait, which remembers the last request and response for tracing
//! - [`HttpTransport`], a `ureq`-based implementation configured by [`HttpOptions`]
//!
//! # Example
//!
//! ```ignore
//! use xmlrpc_transport::{HttpOptions, HttpTransport, Transport, Value};
//!
//! let url = "http://localhost:8069/xmlrpc/db".parse()?;
//! let mut transport = HttpTransport::new(url, &HttpOptions::default())?;
//! let databases = transport.call("list", &[])?;
//! ```

pub mod codec;
mod config;
mod error;
mod http;
mod transport;
mod value;

pub use codec::{
    MethodResponse, check_encodable, decode_response, encode_call, encode_fault, encode_response,
};
pub use config::{
    DEFAULT_MAX_BODY_SIZE, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, HttpOptions, humantime_duration,
};
pub use error::{CodecError, Fault, TransportError};
pub use http::HttpTransport;
pub use transport::{HttpTransportFactory, Request, Transport, TransportFactory};
pub use value::{DATETIME_FORMAT, Value};

pub use url::Url;
