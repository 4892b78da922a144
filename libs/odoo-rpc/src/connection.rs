use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use xmlrpc_transport::{HttpOptions, HttpTransportFactory, Transport, TransportFactory, Value};

use crate::DEFAULT_PORT;
use crate::channel::{Channel, channel_url};
use crate::error::OdooError;
use crate::log_format::RequestLogFormatter;
use crate::logger::RequestLogger;
use crate::secret::Password;
use crate::session::Session;

/// One authenticated session against one Odoo server.
///
/// Transports are created lazily, one per [`Channel`], and reused for the lifetime of the
/// connection. Changing the URL, port or HTTP options drops them.
///
/// ```ignore
/// let mut connection = RpcConnection::new("https://erp.example.com", 443);
/// connection
///     .set_database("prod")
///     .set_username("admin")
///     .set_password("secret");
///
/// if connection.login()? {
///     let domain = Value::Array(vec![]);
///     let ids = connection.call(vec!["res.users".into(), "search".into(), domain])?;
/// } else if let Some(err) = connection.error() {
///     eprintln!("login failed: {err}");
/// }
/// ```
pub struct RpcConnection {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<Password>,
    database: Option<String>,
    options: HttpOptions,
    logger: Option<Arc<dyn RequestLogger>>,
    factory: Arc<dyn TransportFactory>,
    transports: HashMap<Channel, Box<dyn Transport>>,
    session: Option<Session>,
    last_error: Option<OdooError>,
}

impl fmt::Debug for RpcConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut channels: Vec<&Channel> = self.transports.keys().collect();
        channels.sort();
        f.debug_struct("RpcConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password)
            .field("options", &self.options)
            .field("logger", &self.logger.is_some())
            .field("transports", &channels)
            .field("session", &self.session)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl Default for RpcConnection {
    fn default() -> Self {
        Self::new("", DEFAULT_PORT)
    }
}

impl RpcConnection {
    /// Connection using [`HttpTransportFactory`]. No I/O happens until the first call.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_transport_factory(host, port, Arc::new(HttpTransportFactory))
    }

    /// Connection whose transports come from `factory`.
    pub fn with_transport_factory(
        host: impl Into<String>,
        port: u16,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            database: None,
            options: HttpOptions::default(),
            logger: None,
            factory,
            transports: HashMap::new(),
            session: None,
            last_error: None,
        }
    }

    /// Server host, with or without an `http://`/`https://` scheme.
    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        let url = url.into();
        if url != self.host {
            self.host = url;
            self.transports.clear();
        }
        self
    }

    pub fn set_port(&mut self, port: u16) -> &mut Self {
        if port != self.port {
            self.port = port;
            self.transports.clear();
        }
        self
    }

    pub fn set_username(&mut self, username: impl Into<String>) -> &mut Self {
        self.username = Some(username.into());
        self
    }

    pub fn set_password(&mut self, password: impl Into<Password>) -> &mut Self {
        self.password = Some(password.into());
        self
    }

    pub fn set_database(&mut self, database: impl Into<String>) -> &mut Self {
        self.database = Some(database.into());
        self
    }

    /// HTTP options for transports created from now on.
    pub fn set_client_options(&mut self, options: HttpOptions) -> &mut Self {
        if options != self.options {
            self.options = options;
            self.transports.clear();
        }
        self
    }

    /// Attach a sink receiving a trace of every call.
    pub fn set_logger(&mut self, logger: Arc<dyn RequestLogger>) -> &mut Self {
        self.logger = Some(logger);
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Authenticate with the configured database, username and password.
    ///
    /// Returns `Ok(false)` when the server rejects the credentials or the call fails; the
    /// reason is then available from [`error`](Self::error). Any previous session and error
    /// are dropped first.
    ///
    /// # Errors
    /// Returns [`OdooError::MissingCredentials`] when host, database, username or password is
    /// not set. Nothing is sent in that case.
    pub fn login(&mut self) -> Result<bool, OdooError> {
        let (database, username, password) = self.credentials()?;
        self.session = None;
        self.last_error = None;

        let params = vec![
            Value::from(&database),
            Value::from(&username),
            Value::from(password.expose()),
        ];
        let failure = match self.invoke(Channel::Common, "login", params) {
            Ok(Value::Int(uid)) if uid != 0 => {
                tracing::info!(
                    database = %database,
                    username = %username,
                    uid,
                    "logged in to Odoo"
                );
                self.session = Some(Session::new(database, uid, password));
                return Ok(true);
            }
            Ok(Value::Int(0) | Value::Bool(false)) => OdooError::InvalidCredentials,
            Ok(other) => OdooError::UnexpectedResultShape {
                operation: "login",
                found: other.type_name(),
            },
            Err(err) => err,
        };

        tracing::warn!(
            database = %database,
            username = %username,
            error = %failure,
            "Odoo login failed"
        );
        self.last_error = Some(failure);
        Ok(false)
    }

    /// Drop the session; the next `object`/`report` call needs a new login.
    pub fn logout(&mut self) {
        self.session = None;
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The uid of the current session.
    #[must_use]
    pub fn uid(&self) -> Option<i64> {
        self.session.as_ref().map(Session::uid)
    }

    /// The most recent login failure.
    #[must_use]
    pub fn error(&self) -> Option<&OdooError> {
        self.last_error.as_ref()
    }

    /// Take the most recent login failure out of the connection.
    pub fn take_error(&mut self) -> Option<OdooError> {
        self.last_error.take()
    }

    /// `object.execute(database, uid, password, args...)`.
    ///
    /// # Errors
    /// Returns [`OdooError::NotAuthenticated`] without a session and
    /// [`OdooError::Transport`] when the call fails.
    pub fn call(&mut self, args: Vec<Value>) -> Result<Value, OdooError> {
        self.session_call(Channel::Object, "execute", args)
    }

    /// `report.report(database, uid, password, args...)`.
    ///
    /// # Errors
    /// Same as [`call`](Self::call).
    pub fn report(&mut self, args: Vec<Value>) -> Result<Value, OdooError> {
        self.session_call(Channel::Report, "report", args)
    }

    /// `report.report_get(database, uid, password, args...)`.
    ///
    /// # Errors
    /// Same as [`call`](Self::call).
    pub fn get_report(&mut self, args: Vec<Value>) -> Result<Value, OdooError> {
        self.session_call(Channel::Report, "report_get", args)
    }

    /// `db.list()`; needs no session.
    ///
    /// # Errors
    /// Returns [`OdooError::Transport`] when the call fails.
    pub fn list_databases(&mut self) -> Result<Value, OdooError> {
        self.invoke(Channel::Db, "list", Vec::new())
    }

    /// Send `method(params)` on `channel`, tracing the exchange when a logger is attached.
    ///
    /// # Errors
    /// Returns [`OdooError::Transport`] when the endpoint URL is invalid or the call fails.
    pub fn invoke(
        &mut self,
        channel: Channel,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, OdooError> {
        let logger = self.logger.clone();
        let transport = self.transport(channel)?;
        let result = transport.call(method, &params);

        if let Some(logger) = logger {
            let formatter = RequestLogFormatter::new(&*transport);
            logger.debug(&formatter.format_request(channel));
            match &result {
                Ok(_) => logger.debug(&formatter.format_response()),
                Err(err) => logger.error(&formatter.format_fault(err)),
            }
        }

        result.map_err(OdooError::from)
    }

    fn session_call(
        &mut self,
        channel: Channel,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, OdooError> {
        let params = self
            .session
            .as_ref()
            .ok_or(OdooError::NotAuthenticated)?
            .params(args);
        self.invoke(channel, method, params)
    }

    fn transport(&mut self, channel: Channel) -> Result<&mut dyn Transport, OdooError> {
        match self.transports.entry(channel) {
            Entry::Occupied(entry) => Ok(&mut **entry.into_mut()),
            Entry::Vacant(entry) => {
                let url = channel_url(&self.host, self.port, channel)?;
                tracing::debug!(channel = %channel, url = %url, "creating XML-RPC transport");
                let transport = self.factory.create(&url, &self.options)?;
                Ok(&mut **entry.insert(transport))
            }
        }
    }

    fn credentials(&self) -> Result<(String, String, Password), OdooError> {
        let mut missing = Vec::new();
        if self.host.trim().is_empty() {
            missing.push("host");
        }
        let database = self.database.as_deref().filter(|s| !s.is_empty());
        if database.is_none() {
            missing.push("database");
        }
        let username = self.username.as_deref().filter(|s| !s.is_empty());
        if username.is_none() {
            missing.push("username");
        }
        let password = self.password.as_ref().filter(|p| !p.is_empty());
        if password.is_none() {
            missing.push("password");
        }

        match (database, username, password) {
            (Some(database), Some(username), Some(password)) if missing.is_empty() => Ok((
                database.to_owned(),
                username.to_owned(),
                password.clone(),
            )),
            _ => Err(OdooError::MissingCredentials { missing }),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_are_listed_in_order() {
        let mut connection = RpcConnection::new("", 8069);
        connection.set_username("admin");

        let err = connection.login().unwrap_err();
        match err {
            OdooError::MissingCredentials { missing } => {
                assert_eq!(missing, ["host", "database", "password"]);
            }
            other => panic!("expected MissingCredentials, got {other:?}"),
        }
        assert!(connection.transports.is_empty());
    }

    #[test]
    fn empty_values_count_as_missing() {
        let mut connection = RpcConnection::new("localhost", 8069);
        connection
            .set_database("")
            .set_username("admin")
            .set_password("");

        let err = connection.login().unwrap_err();
        assert!(
            matches!(err, OdooError::MissingCredentials { ref missing } if missing == &["database", "password"])
        );
    }

    #[test]
    fn calls_require_a_session() {
        let mut connection = RpcConnection::new("localhost", 8069);
        for result in [
            connection.call(vec!["res.users".into(), "search".into()]),
            connection.report(vec![]),
            connection.get_report(vec![]),
        ] {
            assert!(matches!(result, Err(OdooError::NotAuthenticated)));
        }
        assert_eq!(connection.uid(), None);
        assert!(connection.error().is_none());
    }

    #[test]
    fn debug_output_hides_password() {
        let mut connection = RpcConnection::default();
        connection.set_url("localhost").set_password("hunter2");
        let debug = format!("{connection:?}");
        assert!(debug.contains("localhost"));
        assert!(!debug.contains("hunter2"));
    }
}
