//! JSON Web Key Sets (RFC 7517 §5).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::JoseError;
use crate::jwk::Jwk;

/// The `{"keys": [...]}` document shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }

    /// Parse and validate every key in the set.
    pub fn from_json(json: &str) -> Result<Self, JoseError> {
        let set: Self = serde_json::from_str(json).map_err(|e| JoseError::Json(e.to_string()))?;
        for key in &set.keys {
            key.validate()?;
        }
        Ok(set)
    }

    pub fn to_json(&self) -> Result<String, JoseError> {
        serde_json::to_string(self).map_err(|e| JoseError::Json(e.to_string()))
    }

    /// First key with the given `kid`, in set order.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid.as_deref() == Some(kid))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Jwk> {
        self.keys.iter()
    }
}

/// A key set with a `kid` index, built once per refresh.
#[derive(Debug)]
pub struct IndexedJwkSet {
    set: JwkSet,
    by_kid: HashMap<String, usize>,
}

impl IndexedJwkSet {
    pub fn new(set: JwkSet) -> Self {
        let mut by_kid = HashMap::with_capacity(set.keys.len());
        for (index, key) in set.keys.iter().enumerate() {
            if let Some(kid) = &key.kid {
                // First key wins when kids collide, matching set order.
                by_kid.entry(kid.clone()).or_insert(index);
            }
        }
        Self { set, by_kid }
    }

    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.by_kid.get(kid).map(|&index| &self.set.keys[index])
    }

    pub fn keys(&self) -> &[Jwk] {
        &self.set.keys
    }

    pub fn as_set(&self) -> &JwkSet {
        &self.set
    }
}

/// A key set shared across threads and refreshable atomically, e.g. from
/// a JWKS endpoint poller. Readers holding the previous snapshot keep a
/// consistent view.
#[derive(Debug)]
pub struct SharedJwkSet {
    inner: RwLock<Arc<IndexedJwkSet>>,
}

impl SharedJwkSet {
    pub fn new(set: JwkSet) -> Self {
        Self {
            inner: RwLock::new(Arc::new(IndexedJwkSet::new(set))),
        }
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<IndexedJwkSet> {
        self.inner.read().clone()
    }

    /// Replace the whole set in one step.
    pub fn refresh(&self, set: JwkSet) {
        *self.inner.write() = Arc::new(IndexedJwkSet::new(set));
    }
}

impl Default for SharedJwkSet {
    fn default() -> Self {
        Self::new(JwkSet::default())
    }
}
