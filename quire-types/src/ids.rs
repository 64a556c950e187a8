//! Identifier types used throughout Quire.
//!
//! Local rows are keyed by UUID v7; federated objects are addressed by URI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

use crate::Error;

/// Unique identifier for an entity in the local store.
/// Uses UUID v7 which embeds a timestamp for natural ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new entity ID with the current timestamp.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates an entity ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses an entity ID from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A dereferenceable identifier asserted by a federated peer.
///
/// Only absolute `http`/`https` URIs qualify: anything else cannot be
/// fetched, so it cannot address a remote object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(Url);

impl RemoteId {
    /// Parses and validates a remote identifier.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let url = Url::parse(s).map_err(|source| Error::InvalidRemoteId {
            value: s.to_string(),
            source,
        })?;
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            _ => Err(Error::UnsupportedScheme(s.to_string())),
        }
    }

    /// Returns the identifier as a URL ready to fetch.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.0
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Host name of the peer that owns this identifier.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    /// Whether the identifier lives on `domain` (optionally with a port).
    #[must_use]
    pub fn is_on_domain(&self, domain: &str) -> bool {
        let Some(host) = self.0.host_str() else {
            return false;
        };
        match self.0.port() {
            Some(port) => {
                domain.eq_ignore_ascii_case(&format!("{host}:{port}")) || domain.eq_ignore_ascii_case(host)
            }
            None => domain.eq_ignore_ascii_case(host),
        }
    }

    /// Builds the canonical identifier for a locally hosted entity.
    pub fn local(domain: &str, path: &str, id: &EntityId) -> crate::Result<Self> {
        Self::parse(&format!("https://{domain}/{path}/{id}"))
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl FromStr for RemoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RemoteId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RemoteId> for String {
    fn from(value: RemoteId) -> Self {
        value.0.into()
    }
}
