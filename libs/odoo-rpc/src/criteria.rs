//! Search domain builder
//!
//! Odoo's `search` takes a *domain*: an ordered list of `[field, operator, value]` triples that
//! are implicitly AND-ed. [`Criteria`] accumulates such triples fluently and renders them
//! verbatim, in insertion order.
//!
//! # Example
//!
//! ```
//! use odoo_rpc::{Criteria, Value};
//!
//! let criteria = Criteria::create()
//!     .equal("active", true)
//!     .ilike("login", "adm%");
//!
//! assert_eq!(
//!     criteria.to_domain(),
//!     Value::array([
//!         Value::array([Value::from("active"), "=".into(), true.into()]),
//!         Value::array([Value::from("login"), "ilike".into(), "adm%".into()]),
//!     ])
//! );
//! ```

use std::fmt;
use std::str::FromStr;

use xmlrpc_transport::Value;

use crate::error::OdooError;

/// Comparison operator of a [`Criterion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operator {
    #[default]
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Like,
    ILike,
}

impl Operator {
    /// Operator as understood by the server.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterEqual => ">=",
            Operator::Like => "like",
            Operator::ILike => "ilike",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = OdooError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "=" => Operator::Equal,
            "!=" => Operator::NotEqual,
            "<" => Operator::LessThan,
            "<=" => Operator::LessEqual,
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterEqual,
            "like" => Operator::Like,
            "ilike" => Operator::ILike,
            other => return Err(OdooError::InvalidCriteria(format!("unknown operator '{other}'"))),
        })
    }
}

/// One `(field, operator, value)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl From<Criterion> for Value {
    fn from(c: Criterion) -> Self {
        Value::Array(vec![
            Value::String(c.field),
            Value::from(c.operator.as_str()),
            c.value,
        ])
    }
}

/// Ordered list of search criteria.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    criteria: Vec<Criterion>,
}

impl Criteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty criteria, the entry point of a builder chain.
    #[must_use]
    pub fn create() -> Self {
        Self::new()
    }

    /// Append `(field, operator, value)`.
    #[must_use]
    pub fn add(
        mut self,
        field: impl Into<String>,
        value: impl Into<Value>,
        operator: Operator,
    ) -> Self {
        self.criteria.push(Criterion {
            field: field.into(),
            operator,
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn equal(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(field, value, Operator::Equal)
    }

    #[must_use]
    pub fn not_equal(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(field, value, Operator::NotEqual)
    }

    #[must_use]
    pub fn less_than(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(field, value, Operator::LessThan)
    }

    #[must_use]
    pub fn less_equal(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(field, value, Operator::LessEqual)
    }

    #[must_use]
    pub fn greater_than(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(field, value, Operator::GreaterThan)
    }

    #[must_use]
    pub fn greater_equal(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(field, value, Operator::GreaterEqual)
    }

    #[must_use]
    pub fn like(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(field, value, Operator::Like)
    }

    #[must_use]
    pub fn ilike(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(field, value, Operator::ILike)
    }

    /// The accumulated criteria, in insertion order.
    #[must_use]
    pub fn get(&self) -> &[Criterion] {
        &self.criteria
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Domain filter as sent to the server.
    #[must_use]
    pub fn to_domain(&self) -> Value {
        self.clone().into()
    }
}

impl From<Criteria> for Value {
    fn from(c: Criteria) -> Self {
        c.criteria.into_iter().map(Value::from).collect()
    }
}

/// Argument of [`OdooClient::search`](crate::OdooClient::search): a builder or a raw domain.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchFilter {
    Criteria(Criteria),
    Domain(Value),
}

impl SearchFilter {
    /// Resolve into the domain value sent to the server.
    ///
    /// # Errors
    /// Returns [`OdooError::InvalidCriteria`] when a raw domain is not an array.
    pub fn into_domain(self) -> Result<Value, OdooError> {
        match self {
            SearchFilter::Criteria(criteria) => Ok(criteria.into()),
            SearchFilter::Domain(domain @ Value::Array(_)) => Ok(domain),
            SearchFilter::Domain(other) => Err(OdooError::InvalidCriteria(format!(
                "criteria must be an array or a Criteria builder, got {}",
                other.type_name()
            ))),
        }
    }
}

impl From<Criteria> for SearchFilter {
    fn from(c: Criteria) -> Self {
        SearchFilter::Criteria(c)
    }
}

impl From<Value> for SearchFilter {
    fn from(v: Value) -> Self {
        SearchFilter::Domain(v)
    }
}

impl From<Vec<Value>> for SearchFilter {
    fn from(v: Vec<Value>) -> Self {
        SearchFilter::Domain(Value::Array(v))
    }
}
