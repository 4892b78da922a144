use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Odoo account password.
///
/// `Debug` and `Display` both print `[REDACTED]`. The wire protocol re-sends the password with
/// every `object` call, so the value is kept for the session lifetime and zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Read-only access to the secret. Callers must not log the returned slice.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Clone for Password {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// Configuration formats parse unquoted scalars, so `1234`, `1.5` or `true` arrive typed.
impl<'de> Deserialize<'de> for Password {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PasswordVisitor;

        impl Visitor<'_> for PasswordVisitor {
            type Value = Password;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a password string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Password, E> {
                Ok(Password::new(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Password, E> {
                Ok(Password(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Password, E> {
                Ok(Password(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Password, E> {
                Ok(Password(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Password, E> {
                Ok(Password(v.to_string()))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Password, E> {
                Ok(Password(v.to_string()))
            }
        }

        deserializer.deserialize_any(PasswordVisitor)
    }
}
