use std::fmt;
use std::str::FromStr;

use xmlrpc_transport::{TransportError, Url};

use crate::error::OdooError;

/// One of the four XML-RPC services exposed by an Odoo server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Db,
    Common,
    Object,
    Report,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Db,
        Channel::Common,
        Channel::Object,
        Channel::Report,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Db => "db",
            Channel::Common => "common",
            Channel::Object => "object",
            Channel::Report => "report",
        }
    }

    /// URL path of the service, appended to the server base URL.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Channel::Db => "/xmlrpc/db",
            Channel::Common => "/xmlrpc/common",
            Channel::Object => "/xmlrpc/object",
            Channel::Report => "/xmlrpc/report",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = OdooError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.as_str() == s)
            .ok_or_else(|| OdooError::UnknownChannel(s.to_owned()))
    }
}

/// Build the endpoint URL of `channel` on `host`.
///
/// `host` may carry an `http://` or `https://` scheme; plain hosts get `http://`. The port is
/// left out for `https` on 443 and `http` on 80.
///
/// # Errors
/// Returns [`TransportError::InvalidUrl`] when the result is not a valid URL.
pub fn channel_url(host: &str, port: u16, channel: Channel) -> Result<Url, TransportError> {
    let host = host.trim().trim_end_matches('/');
    let (scheme, rest) = if let Some(rest) = host.strip_prefix("https://") {
        ("https", rest)
    } else if let Some(rest) = host.strip_prefix("http://") {
        ("http", rest)
    } else {
        ("http", host)
    };

    let raw = match (scheme, port) {
        ("https", 443) | ("http", 80) => format!("{scheme}://{rest}{}", channel.path()),
        _ => format!("{scheme}://{rest}:{port}{}", channel.path()),
    };

    let url = Url::parse(&raw).map_err(|e| TransportError::InvalidUrl {
        url: raw.clone(),
        reason: e.to_string(),
    })?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(TransportError::InvalidUrl {
            url: raw,
            reason: "missing host".to_owned(),
        });
    }
    Ok(url)
}
