//! Cache key construction.
//!
//! A [`CacheKey`] is the tuple `(kind, identifier, params)`. Parameters are
//! held in a [`BTreeMap`], so two keys built from the same pairs compare and
//! hash equal no matter what order the pairs were inserted in.
//!
//! The codec does not resolve name↔id equivalence: `Identifier::Id(25)` and
//! `Identifier::Name("pikachu")` are different keys. Collaborators that know
//! the mapping (see [`NameIndex`](crate::api::NameIndex)) should build keys
//! from the canonical numeric id.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CacheError, Result};

/// Resource family a key belongs to, e.g. `"pokemon"` or `"evolution-chain"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKind(String);

impl ResourceKind {
    /// Create a kind, rejecting empty or whitespace-only names.
    pub fn new(kind: impl Into<String>) -> Result<Self> {
        let kind = kind.into();
        let trimmed = kind.trim();
        if trimmed.is_empty() {
            return Err(CacheError::InvalidKey("resource kind is empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a single resource: numeric id or name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Id(u64),
    Name(String),
}

impl Identifier {
    /// Parse user input: all-digit strings become [`Identifier::Id`].
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.parse::<u64>() {
            Ok(id) => Identifier::Id(id),
            Err(_) => Identifier::Name(trimmed.to_string()),
        }
    }

    pub fn as_id(&self) -> Option<u64> {
        match self {
            Identifier::Id(id) => Some(*id),
            Identifier::Name(_) => None,
        }
    }

    /// Canonical form: names trimmed and lowercased. Empty names are rejected.
    fn canonicalize(self) -> Result<Self> {
        match self {
            Identifier::Id(id) => Ok(Identifier::Id(id)),
            Identifier::Name(name) => {
                let name = name.trim().to_lowercase();
                if name.is_empty() {
                    return Err(CacheError::InvalidKey("identifier is empty".into()));
                }
                Ok(Identifier::Name(name))
            }
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Id(id) => write!(f, "{id}"),
            Identifier::Name(name) => f.write_str(name),
        }
    }
}

impl From<u64> for Identifier {
    fn from(id: u64) -> Self {
        Identifier::Id(id)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::Name(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier::Name(name)
    }
}

/// Request parameters, canonically ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any previous value for `name`.
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        self.0.insert(name.into(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Canonical identifier for a cacheable request.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    kind: ResourceKind,
    identifier: Identifier,
    params: Params,
}

impl CacheKey {
    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

/// Canonical string form: `kind/identifier?a=1&b=2`.
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.identifier)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{name}={value}")?;
        }
        Ok(())
    }
}

/// Build a canonical cache key.
///
/// Fails with [`CacheError::InvalidKey`] if `kind` is blank or the
/// identifier is an empty name.
pub fn make_key(
    kind: impl Into<String>,
    identifier: impl Into<Identifier>,
    params: Params,
) -> Result<CacheKey> {
    Ok(CacheKey {
        kind: ResourceKind::new(kind)?,
        identifier: identifier.into().canonicalize()?,
        params,
    })
}
