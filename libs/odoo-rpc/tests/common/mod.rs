#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

//! In-memory Odoo server used by the integration tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use odoo_rpc::{
    Fault, HttpOptions, Request, RequestLogger, Transport, TransportError, TransportFactory, Url,
    Value,
};
use parking_lot::Mutex;

/// One call received by the fake server.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedCall {
    pub path: String,
    pub method: String,
    pub params: Vec<Value>,
}

struct User {
    login: String,
    password: String,
    uid: i64,
}

#[derive(Default)]
struct State {
    databases: Vec<String>,
    users: Vec<User>,
    records: BTreeMap<String, BTreeMap<i64, BTreeMap<String, Value>>>,
    next_id: i64,
    calls: Vec<ReceivedCall>,
    endpoints: Vec<String>,
    options: Vec<HttpOptions>,
    login_override: Option<Value>,
    method_faults: HashMap<String, Fault>,
    method_results: HashMap<String, Value>,
}

/// Fake Odoo with minimal `db`, `common`, `object` and `report` services.
///
/// `create` and `write` answer with one-element arrays so the typed client helpers accept them.
#[derive(Clone, Default)]
pub struct FakeOdoo {
    state: Arc<Mutex<State>>,
}

impl FakeOdoo {
    pub fn new() -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state.lock();
            state.databases = vec!["prod".to_owned(), "staging".to_owned()];
            state.next_id = 1;
        }
        fake.add_user("admin", "admin", 2);
        fake
    }

    pub fn factory(&self) -> Arc<dyn TransportFactory> {
        Arc::new(self.clone())
    }

    pub fn add_user(&self, login: &str, password: &str, uid: i64) {
        self.state.lock().users.push(User {
            login: login.to_owned(),
            password: password.to_owned(),
            uid,
        });
    }

    /// Answer every `common.login` with `value`.
    pub fn login_returns(&self, value: Value) {
        self.state.lock().login_override = Some(value);
    }

    /// Fail every call of `method` (on any service) with `fault`.
    pub fn fail(&self, method: &str, fault: Fault) {
        self.state
            .lock()
            .method_faults
            .insert(method.to_owned(), fault);
    }

    /// Answer every `object.execute` of `method` with `value`.
    pub fn respond(&self, method: &str, value: Value) {
        self.state
            .lock()
            .method_results
            .insert(method.to_owned(), value);
    }

    pub fn insert(&self, model: &str, fields: &[(&str, Value)]) -> i64 {
        let values = fields
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        self.state.lock().create(model, values)
    }

    pub fn calls(&self) -> Vec<ReceivedCall> {
        self.state.lock().calls.clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<ReceivedCall> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }

    /// URLs of every transport created so far.
    pub fn endpoints(&self) -> Vec<String> {
        self.state.lock().endpoints.clone()
    }

    /// HTTP options handed to every transport created so far.
    pub fn options_seen(&self) -> Vec<HttpOptions> {
        self.state.lock().options.clone()
    }
}

impl TransportFactory for FakeOdoo {
    fn create(
        &self,
        endpoint: &Url,
        options: &HttpOptions,
    ) -> Result<Box<dyn Transport>, TransportError> {
        {
            let mut state = self.state.lock();
            state.endpoints.push(endpoint.to_string());
            state.options.push(options.clone());
        }
        Ok(Box::new(FakeTransport {
            path: endpoint.path().to_owned(),
            state: Arc::clone(&self.state),
            last_request: None,
            last_response: None,
        }))
    }
}

struct FakeTransport {
    path: String,
    state: Arc<Mutex<State>>,
    last_request: Option<Request>,
    last_response: Option<Value>,
}

impl Transport for FakeTransport {
    fn call(&mut self, method: &str, params: &[Value]) -> Result<Value, TransportError> {
        self.last_request = Some(Request::new(method, params.to_vec()));
        self.last_response = None;

        let value = self.state.lock().dispatch(&self.path, method, params)?;
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

impl State {
    fn dispatch(&mut self, path: &str, method: &str, params: &[Value]) -> Result<Value, Fault> {
        self.calls.push(ReceivedCall {
            path: path.to_owned(),
            method: method.to_owned(),
            params: params.to_vec(),
        });
        if let Some(fault) = self.method_faults.get(method) {
            return Err(fault.clone());
        }

        match (path, method) {
            ("/xmlrpc/db", "list") => Ok(Value::array(self.databases.iter())),
            ("/xmlrpc/common", "login") => Ok(self.login(params)),
            ("/xmlrpc/object", "execute") => {
                self.authorize(params)?;
                let model = params.get(3).and_then(Value::as_str).unwrap_or_default();
                let model_method = params.get(4).and_then(Value::as_str).unwrap_or_default();
                if let Some(value) = self.method_results.get(model_method) {
                    return Ok(value.clone());
                }
                self.execute(model, model_method, &params[5.min(params.len())..])
            }
            ("/xmlrpc/report", "report" | "report_get") => {
                self.authorize(params)?;
                Ok(Value::structure([
                    ("state", Value::Bool(true)),
                    ("args", Value::Array(params[3.min(params.len())..].to_vec())),
                ]))
            }
            _ => Err(Fault::new(1, format!("Method not found: {method} on {path}"))),
        }
    }

    fn login(&self, params: &[Value]) -> Value {
        if let Some(value) = &self.login_override {
            return value.clone();
        }
        let database = params.first().and_then(Value::as_str);
        let login = params.get(1).and_then(Value::as_str);
        let password = params.get(2).and_then(Value::as_str);
        if !database.is_some_and(|db| self.databases.iter().any(|d| d == db)) {
            return Value::Bool(false);
        }
        self.users
            .iter()
            .find(|u| Some(u.login.as_str()) == login && Some(u.password.as_str()) == password)
            .map_or(Value::Int(0), |u| Value::Int(u.uid))
    }

    fn authorize(&self, params: &[Value]) -> Result<(), Fault> {
        let uid = params.get(1).and_then(Value::as_i64);
        let password = params.get(2).and_then(Value::as_str);
        let known = self
            .users
            .iter()
            .any(|u| Some(u.uid) == uid && Some(u.password.as_str()) == password);
        if known {
            Ok(())
        } else {
            Err(Fault::new(3, "Access Denied"))
        }
    }

    fn execute(&mut self, model: &str, method: &str, args: &[Value]) -> Result<Value, Fault> {
        match method {
            "search" => {
                let domain = args.first().and_then(Value::as_array).unwrap_or_default();
                let table = self.records.get(model);
                let ids = table
                    .into_iter()
                    .flatten()
                    .filter(|(_, record)| domain.iter().all(|term| matches(record, term)))
                    .map(|(id, _)| Value::Int(*id));
                Ok(ids.collect())
            }
            "read" => {
                let ids = args.first().and_then(Value::as_array).unwrap_or_default();
                let fields: Vec<&str> = args
                    .get(1)
                    .and_then(Value::as_array)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(Value::as_str)
                    .collect();
                let table = self.records.get(model);
                let rows = ids
                    .iter()
                    .filter_map(Value::as_i64)
                    .filter_map(|id| table.and_then(|t| t.get(&id)).map(|r| (id, r)))
                    .map(|(id, record)| {
                        let mut row: BTreeMap<String, Value> = record
                            .iter()
                            .filter(|(k, _)| fields.is_empty() || fields.contains(&k.as_str()))
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect();
                        row.insert("id".to_owned(), Value::Int(id));
                        Value::Struct(row)
                    });
                Ok(rows.collect())
            }
            "create" => {
                let values = args
                    .first()
                    .and_then(Value::as_struct)
                    .cloned()
                    .ok_or_else(|| Fault::new(2, "create expects a struct of values"))?;
                let id = self.create(model, values);
                Ok(Value::array([id]))
            }
            "write" => {
                let ids = args.first().and_then(Value::as_array).unwrap_or_default();
                let values = args
                    .get(1)
                    .and_then(Value::as_struct)
                    .cloned()
                    .unwrap_or_default();
                let table = self.records.entry(model.to_owned()).or_default();
                let ids = ids
                    .iter()
                    .filter_map(|id| id.as_i64().or_else(|| id.as_str()?.trim().parse().ok()));
                for id in ids {
                    let record = table
                        .get_mut(&id)
                        .ok_or_else(|| Fault::new(2, format!("Record {model}({id}) does not exist")))?;
                    record.extend(values.clone());
                }
                Ok(Value::array([true]))
            }
            other => Err(Fault::new(1, format!("Unknown method {model}.{other}"))),
        }
    }

    fn create(&mut self, model: &str, values: BTreeMap<String, Value>) -> i64 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.records
            .entry(model.to_owned())
            .or_default()
            .insert(id, values);
        id
    }
}

fn matches(record: &BTreeMap<String, Value>, term: &Value) -> bool {
    let Some([field, op, expected]) = term.as_array() else {
        return false;
    };
    let actual = field.as_str().and_then(|f| record.get(f));
    match op.as_str() {
        Some("=") => actual == Some(expected),
        Some("!=") => actual != Some(expected),
        _ => false,
    }
}

/// [`RequestLogger`] keeping every message with its level.
#[derive(Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        self.lines.lock().clone()
    }
}

impl RequestLogger for RecordingLogger {
    fn debug(&self, message: &str) {
        self.lines.lock().push(("debug", message.to_owned()));
    }

    fn error(&self, message: &str) {
        self.lines.lock().push(("error", message.to_owned()));
    }
}
