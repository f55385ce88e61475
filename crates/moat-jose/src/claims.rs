//! JWT claims (RFC 7519 §4).
//!
//! Registered claims are typed; everything else rides in the flattened
//! `extra` map. Numeric dates are whole seconds since the Unix epoch in
//! an `i64`, which covers the registered `exp`/`nbf`/`iat` range well
//! past any plausible expiry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::JoseError;

/// The `aud` claim: a single value or an array of values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Self::One(aud) => aud == audience,
            Self::Many(auds) => auds.iter().any(|aud| aud == audience),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        match self {
            Self::One(aud) => std::slice::from_ref(aud).iter(),
            Self::Many(auds) => auds.iter(),
        }
        .map(String::as_str)
    }
}

impl From<&str> for Audience {
    fn from(aud: &str) -> Self {
        Self::One(aud.to_owned())
    }
}

impl From<String> for Audience {
    fn from(aud: String) -> Self {
        Self::One(aud)
    }
}

impl From<Vec<String>> for Audience {
    fn from(auds: Vec<String>) -> Self {
        Self::Many(auds)
    }
}

/// A JWT claims set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issuer(mut self, iss: impl Into<String>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    pub fn with_subject(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    pub fn with_audience(mut self, aud: impl Into<Audience>) -> Self {
        self.aud = Some(aud.into());
        self
    }

    pub fn with_jwt_id(mut self, jti: impl Into<String>) -> Self {
        self.jti = Some(jti.into());
        self
    }

    pub fn with_expiry(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    pub fn with_not_before(mut self, nbf: i64) -> Self {
        self.nbf = Some(nbf);
        self
    }

    pub fn with_issued_at(mut self, iat: i64) -> Self {
        self.iat = Some(iat);
        self
    }

    /// Set a private claim.
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Look up any claim by name, registered or private.
    pub fn get(&self, name: &str) -> Option<Value> {
        match name {
            "iss" => self.iss.clone().map(Value::from),
            "sub" => self.sub.clone().map(Value::from),
            "jti" => self.jti.clone().map(Value::from),
            "exp" => self.exp.map(Value::from),
            "nbf" => self.nbf.map(Value::from),
            "iat" => self.iat.map(Value::from),
            "aud" => self
                .aud
                .as_ref()
                .map(|aud| serde_json::to_value(aud).expect("audience serializes")),
            _ => self.extra.get(name).cloned(),
        }
    }

    pub fn has_claim(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, JoseError> {
        serde_json::from_slice(bytes).map_err(|e| JoseError::Json(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, JoseError> {
        serde_json::to_string(self).map_err(|e| JoseError::Json(e.to_string()))
    }
}
