use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use odoo_rpc::{Criteria, OdooClient, OdooConfig, Operator, Value};
use tracing_subscriber::EnvFilter;

/// Odoo XML-RPC client
#[derive(Parser)]
#[command(name = "odoo")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a YAML configuration file; `ODOO_*` variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log every XML-RPC request and response (passwords masked)
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Connection settings taking precedence over the configuration file and environment.
/// The password is only read from configuration (`ODOO_PASSWORD`).
#[derive(Args)]
struct Overrides {
    #[arg(long, global = true)]
    host: Option<String>,

    #[arg(short, long, global = true)]
    port: Option<u16>,

    #[arg(short, long, global = true)]
    database: Option<String>,

    #[arg(short, long, global = true)]
    username: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut OdooConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.database.is_some() {
            config.database = self.database;
        }
        if self.username.is_some() {
            config.username = self.username;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List databases (no login)
    Dbs,
    /// Log in and print the user id
    Login,
    /// Search record ids
    Search {
        model: String,
        /// Criterion, repeatable: `--filter login = admin`
        #[arg(long, num_args = 3, value_names = ["FIELD", "OP", "VALUE"])]
        filter: Vec<String>,
        /// Raw domain as JSON, e.g. `[["active","=",true]]`
        #[arg(long, conflicts_with = "filter")]
        domain: Option<String>,
    },
    /// Read records
    Read {
        model: String,
        #[arg(required = true)]
        ids: Vec<i64>,
        /// Comma separated field names; all fields when omitted
        #[arg(short, long, value_delimiter = ',')]
        fields: Vec<String>,
    },
    /// Create a record from a JSON object
    Create { model: String, values: String },
    /// Update records with a JSON object
    Write {
        model: String,
        #[arg(long, required = true, value_delimiter = ',')]
        ids: Vec<i64>,
        values: String,
    },
    /// Call any model method; each argument is JSON or a plain string
    Call {
        model: String,
        method: String,
        args: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.trace);

    let mut config = OdooConfig::load(cli.config.as_deref())?;
    cli.overrides.apply(&mut config);
    config.trace_requests |= cli.trace;
    tracing::debug!(host = %config.host, port = config.port, "Odoo settings loaded");

    let mut odoo = OdooClient::from_config(config);
    let result = run(&mut odoo, cli.command)?;
    println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    Ok(())
}

fn init_logging(verbose: u8, trace: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let directives = if trace {
        format!("{level},{}=debug", odoo_rpc::TRACE_TARGET)
    } else {
        level.to_owned()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(odoo: &mut OdooClient, command: Commands) -> Result<Value> {
    let value = match command {
        Commands::Dbs => odoo.get_dbs()?,
        Commands::Login => {
            odoo.login()?;
            odoo.uid().map_or(Value::Nil, Value::from)
        }
        Commands::Search {
            model,
            filter,
            domain,
        } => match domain {
            Some(domain) => {
                let domain: serde_json::Value =
                    serde_json::from_str(&domain).context("--domain is not valid JSON")?;
                odoo.search(&model, Value::from(domain))?
            }
            None => odoo.search(&model, criteria_from(&filter)?)?,
        },
        Commands::Read { model, ids, fields } => {
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            odoo.read(&model, ids, &fields)?
        }
        // `execute` keeps the server's answer as is; `create` usually returns a bare id.
        Commands::Create { model, values } => {
            odoo.execute(&model, "create", [json_object(&values)?])?
        }
        Commands::Write { model, ids, values } => {
            odoo.execute(&model, "write", [Value::from(ids), json_object(&values)?])?
        }
        Commands::Call {
            model,
            method,
            args,
        } => odoo.execute(&model, &method, args.iter().map(|arg| parse_value(arg)))?,
    };
    Ok(value)
}

/// Build criteria from flattened `FIELD OP VALUE` triples.
fn criteria_from(filter: &[String]) -> Result<Criteria> {
    let mut criteria = Criteria::create();
    for triple in filter.chunks_exact(3) {
        let operator: Operator = triple[1].parse()?;
        criteria = criteria.add(&triple[0], parse_value(&triple[2]), operator);
    }
    Ok(criteria)
}

/// JSON when it parses, a plain string otherwise.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str::<serde_json::Value>(raw).map_or_else(|_| Value::from(raw), Value::from)
}

fn json_object(raw: &str) -> Result<Value> {
    let json: serde_json::Value = serde_json::from_str(raw).context("values are not valid JSON")?;
    anyhow::ensure!(json.is_object(), "values must be a JSON object");
    Ok(Value::from(json))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn filters_are_grouped_in_triples() {
        let cli = Cli::try_parse_from([
            "odoo", "search", "res.users", "--filter", "login", "=", "admin", "--filter", "id",
            ">", "3",
        ])
        .unwrap();
        let Commands::Search { filter, .. } = cli.command else {
            panic!("expected search");
        };

        let criteria = criteria_from(&filter).unwrap();

        assert_eq!(
            Value::from(criteria),
            Value::array([
                Value::array(["login", "=", "admin"]),
                Value::array([Value::from("id"), Value::from(">"), Value::Int(3)]),
            ])
        );
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let filter = ["name".to_owned(), "~".to_owned(), "x".to_owned()];
        assert!(criteria_from(&filter).is_err());
    }

    #[test]
    fn values_fall_back_to_strings() {
        assert_eq!(parse_value("42"), Value::Int(42));
        assert_eq!(parse_value("true"), Value::Bool(true));
        assert_eq!(parse_value("admin"), Value::from("admin"));
        assert_eq!(parse_value("[1,2]"), Value::array([1, 2]));
    }

    #[test]
    fn values_must_be_objects() {
        assert!(json_object("[1]").is_err());
        assert_eq!(
            json_object(r#"{"name":"Bob"}"#).unwrap(),
            Value::structure([("name", "Bob")])
        );
    }

    #[test]
    fn overrides_replace_configured_values() {
        let cli = Cli::try_parse_from([
            "odoo", "dbs", "--host", "erp.local", "-p", "8070", "-d", "staging",
        ])
        .unwrap();
        let mut config = OdooConfig::default();

        cli.overrides.apply(&mut config);

        assert_eq!(config.host, "erp.local");
        assert_eq!(config.port, 8070);
        assert_eq!(config.database.as_deref(), Some("staging"));
        assert!(config.username.is_none());
    }
}
