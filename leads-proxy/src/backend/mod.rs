//! Data backends serving the protected routes.
//!
//! [`DataBackend`] is the seam between the router and where records live:
//! [`MemoryBackend`] keeps seeded collections in process, [`RemoteBackend`]
//! forwards every call to a MockAPI-style HTTP store.

pub mod memory;
pub mod remote;

pub use memory::MemoryBackend;
pub use remote::RemoteBackend;

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Query pairs passed through to list calls, in request order
pub type QueryPairs = Vec<(String, String)>;

/// Allow-list of collections reachable through the router.
///
/// Local route names map to a fixed remote path; anything else is
/// [`Error::UnknownResource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Customers,
    Leads,
    Campaigns,
}

impl Resource {
    /// Resolve a local route segment
    pub fn from_segment(segment: &str) -> Result<Self> {
        match segment {
            "customers" => Ok(Resource::Customers),
            "Leads" | "leads" => Ok(Resource::Leads),
            "campaigns" => Ok(Resource::Campaigns),
            other => Err(Error::UnknownResource(other.to_string())),
        }
    }

    /// Collection path on the remote store
    pub fn remote_path(&self) -> &'static str {
        match self {
            Resource::Customers => "customers",
            Resource::Leads => "Leads",
            Resource::Campaigns => "campaigns",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.remote_path())
    }
}

/// Result of a list call
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    /// Response body, normally a JSON array of records
    pub body: Value,
    /// Pre-pagination count, when the backend knows it
    pub total: Option<u64>,
}

impl Listing {
    /// Records in the body; empty when the body is not an array
    pub fn items(&self) -> &[Value] {
        self.body.as_array().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Storage strategy behind the router
#[async_trait]
pub trait DataBackend: Send + Sync {
    /// Short human-readable description for the service info route
    fn describe(&self) -> String;

    /// List records, applying filter/pagination/sort query pairs
    async fn list(&self, resource: Resource, query: &QueryPairs) -> Result<Listing>;

    // Single-record calls also carry the request's query pairs. Remote stores
    // receive them verbatim; the in-memory backend has no use for them.

    /// Get one record by id
    async fn get(&self, resource: Resource, id: &str, query: &QueryPairs) -> Result<Value>;

    /// Create a record; the store assigns its id
    async fn create(&self, resource: Resource, record: Value, query: &QueryPairs)
    -> Result<Value>;

    /// Replace a record wholesale
    async fn replace(
        &self,
        resource: Resource,
        id: &str,
        record: Value,
        query: &QueryPairs,
    ) -> Result<Value>;

    /// Merge the given fields into a record, leaving others unchanged
    async fn patch(
        &self,
        resource: Resource,
        id: &str,
        fields: Map<String, Value>,
        query: &QueryPairs,
    ) -> Result<Value>;

    /// Delete one record, returning it
    async fn delete(&self, resource: Resource, id: &str, query: &QueryPairs) -> Result<Value>;

    /// Delete every record in a collection, returning how many were removed.
    ///
    /// Not atomic: a failure part-way leaves the collection partially wiped.
    async fn delete_all(&self, resource: Resource) -> Result<usize>;
}

/// Render a record id for URL paths and comparisons.
/// Remote stores may hand back numeric ids.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
