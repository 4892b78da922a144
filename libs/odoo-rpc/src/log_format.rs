use std::fmt;

use xmlrpc_transport::{DATETIME_FORMAT, Transport, TransportError, Value};

use crate::channel::Channel;

const MASK: &str = "*****";

/// Renders human-readable traces of the last call made through a transport.
///
/// Passwords are always masked: position 2 of `common` calls and of the `object` login prefix.
pub struct RequestLogFormatter<'a> {
    transport: &'a dyn Transport,
}

impl<'a> RequestLogFormatter<'a> {
    #[must_use]
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Describe the last request sent on `channel`.
    ///
    /// ```text
    /// Call: res.users:read with database: prod , uid: 2 , pass: *****
    /// Arg 1 : array (
    ///   0 => 5,
    /// )
    /// ```
    #[must_use]
    pub fn format_request(&self, channel: Channel) -> String {
        let (method, params) = self
            .transport
            .last_request()
            .map_or(("", &[][..]), |r| (r.method.as_str(), r.params.as_slice()));

        match channel {
            Channel::Common => {
                let args: Vec<String> = params
                    .iter()
                    .enumerate()
                    .map(|(i, v)| if i == 2 { MASK.to_owned() } else { render(v) })
                    .collect();
                build_request("", method, None, &args)
            }
            Channel::Object => {
                let plain_at = |i: usize| params.get(i).map(plain).unwrap_or_default();
                let login = (plain_at(0), plain_at(1));
                let args: Vec<String> = params.iter().skip(5).map(render).collect();
                build_request(&plain_at(3), &plain_at(4), Some(login), &args)
            }
            Channel::Db => build_request("db", "list", None, &[]),
            Channel::Report => "Nothing...".to_owned(),
        }
    }

    /// Describe the value decoded from the last successful response.
    #[must_use]
    pub fn format_response(&self) -> String {
        let value = self.transport.last_response().unwrap_or(&Value::Nil);
        format!("Response :\n{}", render(value))
    }

    /// Describe a failed call; server faults are shown by their message.
    #[must_use]
    pub fn format_fault(&self, error: &TransportError) -> String {
        format!("Response with Fault :\n{}", error.message())
    }
}

fn build_request(
    object: &str,
    method: &str,
    login: Option<(String, String)>,
    args: &[String],
) -> String {
    CallText {
        object,
        method,
        login,
        args,
    }
    .to_string()
}

struct CallText<'a> {
    object: &'a str,
    method: &'a str,
    login: Option<(String, String)>,
    args: &'a [String],
}

impl fmt::Display for CallText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Call: {}:{}", self.object, self.method)?;
        if let Some((database, uid)) = &self.login {
            write!(f, " with database: {database} , uid: {uid} , pass: {MASK}")?;
        }
        f.write_str("\n")?;
        for (i, arg) in self.args.iter().enumerate() {
            writeln!(f, "Arg {} : {arg}", i + 1)?;
        }
        Ok(())
    }
}

/// Strings and integers as bare text, anything else rendered.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        other => render(other),
    }
}

/// Render a value for a trace line.
///
/// Scalars carry a type tag (`bool(true)`, `int(5)`, `float(1.5)`), strings are shown as they
/// are and compound values are dumped structurally.
#[must_use]
pub fn render(value: &Value) -> String {
    match value {
        Value::Bool(b) => format!("bool({b})"),
        Value::Int(i) => format!("int({i})"),
        Value::Double(d) => format!("float({d})"),
        Value::String(s) => s.clone(),
        other => Dump {
            value: other,
            indent: 0,
        }
        .to_string(),
    }
}

/// Structural dump in the `array ( key => value, )` layout.
struct Dump<'a> {
    value: &'a Value,
    indent: usize,
}

impl Dump<'_> {
    fn entries<'v>(
        &self,
        f: &mut fmt::Formatter<'_>,
        entries: impl Iterator<Item = (String, &'v Value)>,
    ) -> fmt::Result {
        let pad = " ".repeat(self.indent);
        f.write_str("array (\n")?;
        for (key, value) in entries {
            write!(f, "{pad}  {key} => ")?;
            if value.is_array_like() {
                write!(f, "\n{pad}  ")?;
            }
            let nested = Dump {
                value,
                indent: self.indent + 2,
            };
            writeln!(f, "{nested},")?;
        }
        write!(f, "{pad})")
    }
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Array(items) => {
                self.entries(f, items.iter().enumerate().map(|(i, v)| (i.to_string(), v)))
            }
            Value::Struct(members) => self.entries(f, members.iter().map(|(k, v)| (quote(k), v))),
            Value::Int(i) => write!(f, "{i}"),
            Value::Double(d) if d.is_finite() && d.fract() == 0.0 => write!(f, "{d:.1}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::String(s) => f.write_str(&quote(s)),
            Value::DateTime(dt) => f.write_str(&quote(&dt.format(DATETIME_FORMAT).to_string())),
            Value::Base64(_) => {
                f.write_str(&quote(self.value.to_json().as_str().unwrap_or_default()))
            }
            Value::Nil => f.write_str("NULL"),
        }
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}
