use std::fmt;
use std::sync::Arc;

use xmlrpc_transport::{HttpOptions, HttpTransportFactory, TransportFactory, Value};

use crate::DEFAULT_PORT;
use crate::config::OdooConfig;
use crate::connection::RpcConnection;
use crate::criteria::SearchFilter;
use crate::error::OdooError;
use crate::logger::{RequestLogger, TracingLogger};
use crate::secret::Password;

/// Domain-shaped access to an Odoo server.
///
/// The client connects lazily: the first model operation creates the [`RpcConnection`] and
/// logs in, [`get_dbs`](Self::get_dbs) only creates the connection.
///
/// ```ignore
/// use odoo_rpc::{Criteria, OdooClient};
///
/// let mut odoo = OdooClient::new("https://erp.example.com", 443);
/// odoo.set_database("prod").set_username("admin").set_password("secret");
///
/// let ids = odoo.search("res.users", Criteria::create().equal("login", "admin"))?;
/// let users = odoo.read("res.users", ids, &["name", "login"])?;
/// ```
pub struct OdooClient {
    host: String,
    port: u16,
    database: Option<String>,
    username: Option<String>,
    password: Option<Password>,
    options: HttpOptions,
    logger: Option<Arc<dyn RequestLogger>>,
    factory: Arc<dyn TransportFactory>,
    connection: Option<RpcConnection>,
}

impl fmt::Debug for OdooClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OdooClient")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password)
            .field("options", &self.options)
            .field("logger", &self.logger.is_some())
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

impl OdooClient {
    /// Client for `host` (with or without scheme) on `port`. Nothing is sent yet.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            database: None,
            username: None,
            password: None,
            options: HttpOptions::default(),
            logger: None,
            factory: Arc::new(HttpTransportFactory),
            connection: None,
        }
    }

    /// Client for `host` on the default port 8069.
    pub fn with_host(host: impl Into<String>) -> Self {
        Self::new(host, DEFAULT_PORT)
    }

    /// Client built from loaded configuration.
    #[must_use]
    pub fn from_config(config: OdooConfig) -> Self {
        let OdooConfig {
            host,
            port,
            database,
            username,
            password,
            http,
            trace_requests,
        } = config;

        let mut client = Self::new(host, port);
        client.database = database;
        client.username = username;
        client.password = password;
        client.options = http;
        if trace_requests {
            client.logger = Some(Arc::new(TracingLogger));
        }
        client
    }

    /// Use `factory` for every transport of connections created from now on.
    #[must_use]
    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn set_database(&mut self, database: impl Into<String>) -> &mut Self {
        self.database = Some(database.into());
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

    /// HTTP options for every transport, including those of an already created connection.
    pub fn set_client_options(&mut self, options: HttpOptions) -> &mut Self {
        if let Some(connection) = self.connection.as_mut() {
            connection.set_client_options(options.clone());
        }
        self.options = options;
        self
    }

    /// Attach a request trace sink, including to an already created connection.
    pub fn set_logger(&mut self, logger: Arc<dyn RequestLogger>) -> &mut Self {
        if let Some(connection) = self.connection.as_mut() {
            connection.set_logger(Arc::clone(&logger));
        }
        self.logger = Some(logger);
        self
    }

    /// The underlying connection, once created.
    #[must_use]
    pub fn connection(&self) -> Option<&RpcConnection> {
        self.connection.as_ref()
    }

    /// Session uid; `None` until a connection exists and is logged in.
    #[must_use]
    pub fn uid(&self) -> Option<i64> {
        self.connection.as_ref().and_then(RpcConnection::uid)
    }

    /// Log in now instead of on the first model call.
    ///
    /// # Errors
    /// Returns [`OdooError::MissingCredentials`] when database, username or password is not
    /// set, and [`OdooError::LoginFailed`] when the server refuses the login. The connection is
    /// discarded on failure.
    pub fn login(&mut self) -> Result<(), OdooError> {
        let mut missing = Vec::new();
        if self.database.is_none() {
            missing.push("database");
        }
        if self.username.is_none() {
            missing.push("username");
        }
        if self.password.is_none() {
            missing.push("password");
        }
        let (Some(database), Some(username), Some(password)) =
            (&self.database, &self.username, &self.password)
        else {
            return Err(OdooError::MissingCredentials { missing });
        };

        let connection = self.connection.get_or_insert_with(|| {
            new_connection(
                &self.host,
                self.port,
                &self.options,
                &self.factory,
                self.logger.as_ref(),
            )
        });
        connection
            .set_database(database)
            .set_username(username)
            .set_password(password.clone());

        if connection.login()? {
            return Ok(());
        }

        let cause = connection.take_error().map(Box::new);
        self.connection = None;
        Err(OdooError::LoginFailed { cause })
    }

    /// Make sure a connection exists and, when `require_login` is set, that it is logged in.
    ///
    /// # Errors
    /// Propagates [`login`](Self::login) failures.
    pub fn ensure_ready(&mut self, require_login: bool) -> Result<&mut RpcConnection, OdooError> {
        let logged_in = self
            .connection
            .as_ref()
            .is_some_and(RpcConnection::is_authenticated);
        if require_login && !logged_in {
            self.login()?;
        }

        Ok(self.connection.get_or_insert_with(|| {
            new_connection(
                &self.host,
                self.port,
                &self.options,
                &self.factory,
                self.logger.as_ref(),
            )
        }))
    }

    /// `execute` with positional arguments, starting with the model and the method.
    ///
    /// # Errors
    /// Returns [`OdooError::Arity`] with fewer than two arguments, login errors, and
    /// transport errors.
    pub fn call(&mut self, args: Vec<Value>) -> Result<Value, OdooError> {
        if args.len() < 2 {
            return Err(OdooError::Arity { given: args.len() });
        }
        self.ensure_ready(true)?.call(args)
    }

    /// Typed form of [`call`](Self::call): `model.method(args...)`.
    ///
    /// # Errors
    /// Same as [`call`](Self::call).
    pub fn execute(
        &mut self,
        model: &str,
        method: &str,
        args: impl IntoIterator<Item = Value>,
    ) -> Result<Value, OdooError> {
        let mut params = vec![Value::from(model), Value::from(method)];
        params.extend(args);
        self.call(params)
    }

    /// Read `fields` (all when empty) of the records `ids`.
    ///
    /// A single numeric id is sent as a one-element list.
    ///
    /// # Errors
    /// Returns [`OdooError::UnexpectedResultShape`] when the server does not answer with an
    /// array, plus the errors of [`call`](Self::call).
    pub fn read(
        &mut self,
        model: &str,
        ids: impl Into<Value>,
        fields: &[&str],
    ) -> Result<Value, OdooError> {
        let fields = Value::array(fields.iter().copied());
        let result = self.execute(model, "read", [normalize_ids(ids.into()), fields])?;
        expect_array("read", result)
    }

    /// Read one record; `Ok(None)` when it does not exist.
    ///
    /// # Errors
    /// Same as [`read`](Self::read).
    pub fn read_one(
        &mut self,
        model: &str,
        id: i64,
        fields: &[&str],
    ) -> Result<Option<Value>, OdooError> {
        let record = match self.read(model, id, fields)? {
            Value::Array(records) => records.into_iter().next(),
            _ => None,
        };
        Ok(record.filter(Value::is_array_like))
    }

    /// Ids of the records matching `criteria`, either a [`Criteria`](crate::Criteria) or a
    /// raw domain array.
    ///
    /// # Errors
    /// Returns [`OdooError::InvalidCriteria`] when a raw domain is not an array, plus the
    /// errors of [`read`](Self::read).
    pub fn search(
        &mut self,
        model: &str,
        criteria: impl Into<SearchFilter>,
    ) -> Result<Value, OdooError> {
        let domain = criteria.into().into_domain()?;
        let result = self.execute(model, "search", [domain])?;
        expect_array("search", result)
    }

    /// Create a record from `values`.
    ///
    /// # Errors
    /// Same as [`read`](Self::read).
    pub fn create(&mut self, model: &str, values: impl Into<Value>) -> Result<Value, OdooError> {
        let result = self.execute(model, "create", [values.into()])?;
        expect_array("create", result)
    }

    /// Update the records `ids` with `values`. A single numeric id is sent as a one-element
    /// list.
    ///
    /// # Errors
    /// Same as [`read`](Self::read).
    pub fn write(
        &mut self,
        model: &str,
        ids: impl Into<Value>,
        values: impl Into<Value>,
    ) -> Result<Value, OdooError> {
        let result = self.execute(
            model,
            "write",
            [normalize_ids(ids.into()), values.into()],
        )?;
        expect_array("write", result)
    }

    /// Databases available on the server. Does not log in.
    ///
    /// # Errors
    /// Returns [`OdooError::UnexpectedResultShape`] for a non-array answer and transport
    /// errors.
    pub fn get_dbs(&mut self) -> Result<Value, OdooError> {
        let result = self.ensure_ready(false)?.list_databases()?;
        expect_array("get_dbs", result)
    }
}

fn new_connection(
    host: &str,
    port: u16,
    options: &HttpOptions,
    factory: &Arc<dyn TransportFactory>,
    logger: Option<&Arc<dyn RequestLogger>>,
) -> RpcConnection {
    let mut connection = RpcConnection::with_transport_factory(host, port, Arc::clone(factory));
    connection.set_client_options(options.clone());
    if let Some(logger) = logger {
        connection.set_logger(Arc::clone(logger));
    }
    connection
}

/// Wrap a bare numeric id (`5`, `"5"`) into `[id]`; anything else is sent unchanged.
fn normalize_ids(ids: Value) -> Value {
    if ids.is_numeric() {
        Value::Array(vec![ids])
    } else {
        ids
    }
}

fn expect_array(operation: &'static str, value: Value) -> Result<Value, OdooError> {
    if value.is_array_like() {
        Ok(value)
    } else {
        Err(OdooError::UnexpectedResultShape {
            operation,
            found: value.type_name(),
        })
    }
}
