#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Odoo/OpenERP client over XML-RPC
//!
//! This crate provides:
//! - [`OdooClient`]: `read`, `search`, `create`, `write` with lazy connection and login
//! - [`RpcConnection`]: session handling and the per-channel transport cache
//! - [`Criteria`]: fluent builder for search domains
//! - [`RequestLogFormatter`] and [`RequestLogger`]: password-masked request traces
//! - [`OdooConfig`]: YAML/environment configuration loaded with `figment`
//!
//! # Example
//!
//! ```ignore
//! use odoo_rpc::{Criteria, OdooClient};
//!
//! let mut odoo = OdooClient::new("https://erp.example.com", 443);
//! odoo.set_database("prod").set_username("admin").set_password("secret");
//!
//! let ids = odoo.search("res.users", Criteria::create().equal("active", true))?;
//! let first = odoo.read_one("res.users", 2, &["login"])?;
//! ```

mod channel;
mod client;
mod config;
mod connection;
pub mod criteria;
mod error;
mod log_format;
mod logger;
mod secret;
mod session;

/// Default XML-RPC port of an Odoo server.
pub const DEFAULT_PORT: u16 = 8069;

pub use channel::{Channel, channel_url};
pub use client::OdooClient;
pub use config::{ConfigError, ENV_PREFIX, OdooConfig};
pub use connection::RpcConnection;
pub use criteria::{Criteria, Criterion, Operator, SearchFilter};
pub use error::{ErrorKind, OdooError};
pub use log_format::{RequestLogFormatter, render};
pub use logger::{RequestLogger, TRACE_TARGET, TracingLogger};
pub use secret::Password;
pub use session::Session;

pub use xmlrpc_transport::{
    Fault, HttpOptions, HttpTransportFactory, Request, Transport, TransportError,
    TransportFactory, Url, Value,
};
