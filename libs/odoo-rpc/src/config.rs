use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::Deserialize;
use thiserror::Error;
use xmlrpc_transport::HttpOptions;

use crate::DEFAULT_PORT;
use crate::secret::Password;

/// Prefix of environment variables read by [`OdooConfig::load`].
pub const ENV_PREFIX: &str = "ODOO_";

/// Keys read from the environment verbatim, so `ODOO_PASSWORD=[abc]` stays a string.
const RAW_STRING_KEYS: [&str; 4] = ["host", "database", "username", "password"];

/// Connection settings for an [`OdooClient`](crate::OdooClient).
///
/// ```yaml
/// host: https://erp.example.com
/// port: 443
/// database: prod
/// username: admin
/// password: secret
/// trace_requests: true
/// http:
///   timeout: 10s
/// ```
///
/// Every field can be overridden from the environment, nested fields with `__`:
/// `ODOO_PASSWORD=...`, `ODOO_HTTP__TIMEOUT=5s`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OdooConfig {
    /// Server host, optionally with `http://` or `https://` (default: `localhost`)
    #[serde(deserialize_with = "string_lossy::deserialize")]
    pub host: String,

    /// XML-RPC port (default: 8069)
    pub port: u16,

    #[serde(deserialize_with = "string_lossy::option")]
    pub database: Option<String>,
    #[serde(deserialize_with = "string_lossy::option")]
    pub username: Option<String>,
    pub password: Option<Password>,

    /// HTTP client options
    pub http: HttpOptions,

    /// Trace every request through `tracing` (target `odoo_rpc::trace`)
    pub trace_requests: bool,
}

impl Default for OdooConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: DEFAULT_PORT,
            database: None,
            username: None,
            password: None,
            http: HttpOptions::default(),
            trace_requests: false,
        }
    }
}

/// Configuration could not be read or has invalid values.
#[derive(Error, Debug)]
#[error("Invalid Odoo configuration: {0}")]
pub struct ConfigError(#[source] Box<figment::Error>);

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

impl OdooConfig {
    /// Layered sources: the YAML file at `path` when given, then `ODOO_*` variables.
    ///
    /// Host and credentials are taken from the environment as plain strings; every other
    /// variable is parsed (`ODOO_PORT=8070`, `ODOO_TRACE_REQUESTS=true`).
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .split("__")
                .ignore(&RAW_STRING_KEYS),
        );
        for key in RAW_STRING_KEYS {
            let var = format!("{ENV_PREFIX}{}", key.to_ascii_uppercase());
            if let Ok(value) = std::env::var(&var) {
                figment = figment.merge(Serialized::default(key, value));
            }
        }
        figment
    }

    /// Load configuration from [`figment`](Self::figment) sources over the defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a source cannot be parsed or holds invalid values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Ok(Self::figment(path).extract()?)
    }
}

/// Scalars accepted where a string is expected: YAML reads `database: 2024` as a number.
mod string_lossy {
    use std::fmt;

    use serde::de::{self, Deserializer, Unexpected, Visitor};

    struct StringLossy;

    impl<'de> Visitor<'de> for StringLossy {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_owned()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }
    }

    pub fn option<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        d.deserialize_any(StringLossy)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        option(d)?.ok_or_else(|| de::Error::invalid_type(Unexpected::Unit, &"a string"))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::Write as _;
    use std::time::Duration;

    use super::*;

    fn yaml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const NO_ENV: [(&str, Option<&str>); 7] = [
        ("ODOO_HOST", None),
        ("ODOO_PORT", None),
        ("ODOO_DATABASE", None),
        ("ODOO_USERNAME", None),
        ("ODOO_PASSWORD", None),
        ("ODOO_TRACE_REQUESTS", None),
        ("ODOO_HTTP__TIMEOUT", None),
    ];

    #[test]
    fn defaults_without_sources() {
        temp_env::with_vars(NO_ENV, || {
            let config = OdooConfig::load(None).unwrap();
            assert_eq!(config.host, "localhost");
            assert_eq!(config.port, 8069);
            assert!(config.database.is_none());
            assert!(config.password.is_none());
            assert!(!config.trace_requests);
            assert_eq!(config.http, HttpOptions::default());
        });
    }

    #[test]
    fn reads_yaml_file() {
        let file = yaml_file(
            "host: https://erp.example.com\n\
             port: 443\n\
             database: prod\n\
             username: admin\n\
             password: secret\n\
             trace_requests: true\n\
             http:\n  timeout: 10s\n  redirects: 0\n",
        );

        temp_env::with_vars(NO_ENV, || {
            let config = OdooConfig::load(Some(file.path())).unwrap();
            assert_eq!(config.host, "https://erp.example.com");
            assert_eq!(config.port, 443);
            assert_eq!(config.database.as_deref(), Some("prod"));
            assert_eq!(config.username.as_deref(), Some("admin"));
            assert_eq!(config.password.as_ref().map(Password::expose), Some("secret"));
            assert!(config.trace_requests);
            assert_eq!(config.http.timeout, Duration::from_secs(10));
            assert_eq!(config.http.redirects, 0);
        });
    }

    #[test]
    fn env_overrides_file() {
        let file = yaml_file("host: erp.example.com\nport: 8069\ndatabase: prod\n");

        temp_env::with_vars(
            [
                ("ODOO_HOST", None),
                ("ODOO_USERNAME", None),
                ("ODOO_TRACE_REQUESTS", None),
                ("ODOO_PORT", Some("8070")),
                ("ODOO_DATABASE", Some("staging")),
                ("ODOO_PASSWORD", Some("123456")),
                ("ODOO_HTTP__TIMEOUT", Some("5s")),
            ],
            || {
                let config = OdooConfig::load(Some(file.path())).unwrap();
                assert_eq!(config.host, "erp.example.com");
                assert_eq!(config.port, 8070);
                assert_eq!(config.database.as_deref(), Some("staging"));
                assert_eq!(config.password.as_ref().map(Password::expose), Some("123456"));
                assert_eq!(config.http.timeout, Duration::from_secs(5));
            },
        );
    }

    #[test]
    fn env_credentials_are_plain_strings() {
        for password in ["1.5", "true", "[abc]", "{x}", "007"] {
            temp_env::with_vars(
                [
                    ("ODOO_HOST", Some("10.0.0.5")),
                    ("ODOO_PORT", None),
                    ("ODOO_TRACE_REQUESTS", None),
                    ("ODOO_HTTP__TIMEOUT", None),
                    ("ODOO_DATABASE", Some("2024")),
                    ("ODOO_USERNAME", Some("1001")),
                    ("ODOO_PASSWORD", Some(password)),
                ],
                || {
                    let config = OdooConfig::load(None).unwrap();
                    assert_eq!(config.host, "10.0.0.5");
                    assert_eq!(config.database.as_deref(), Some("2024"));
                    assert_eq!(config.username.as_deref(), Some("1001"));
                    assert_eq!(config.password.as_ref().map(Password::expose), Some(password));
                },
            );
        }
    }

    #[test]
    fn yaml_scalars_are_accepted_as_strings() {
        let file = yaml_file("database: 2024
username: 1001
password: 1.5
");

        temp_env::with_vars(NO_ENV, || {
            let config = OdooConfig::load(Some(file.path())).unwrap();
            assert_eq!(config.database.as_deref(), Some("2024"));
            assert_eq!(config.username.as_deref(), Some("1001"));
            assert_eq!(config.password.as_ref().map(Password::expose), Some("1.5"));
        });
    }

    #[test]
    fn null_database_stays_unset() {
        let file = yaml_file("database: ~
");

        temp_env::with_vars(NO_ENV, || {
            let config = OdooConfig::load(Some(file.path())).unwrap();
            assert!(config.database.is_none());
        });
    }

    #[test]
    fn invalid_values_are_reported() {
        let file = yaml_file("port: not-a-port\n");

        temp_env::with_vars(NO_ENV, || {
            let err = OdooConfig::load(Some(file.path())).unwrap_err();
            assert!(err.to_string().starts_with("Invalid Odoo configuration"), "{err}");
        });
    }
}
