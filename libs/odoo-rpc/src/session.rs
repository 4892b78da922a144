use xmlrpc_transport::Value;

use crate::secret::Password;

/// Authenticated `(database, uid, password)` triple obtained from a successful login.
///
/// The triple prefixes every `object` and `report` call.
#[derive(Debug, Clone)]
pub struct Session {
    database: String,
    uid: i64,
    password: Password,
}

impl Session {
    pub(crate) fn new(database: String, uid: i64, password: Password) -> Self {
        Self {
            database,
            uid,
            password,
        }
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    #[must_use]
    pub fn uid(&self) -> i64 {
        self.uid
    }

    /// Call parameters: the session triple followed by `args`.
    pub(crate) fn params(&self, args: Vec<Value>) -> Vec<Value> {
        let mut params = Vec::with_capacity(args.len() + 3);
        params.push(Value::from(&self.database));
        params.push(Value::Int(self.uid));
        params.push(Value::from(self.password.expose()));
        params.extend(args);
        params
    }
}
