use super::{DataBackend, Listing, QueryPairs, Resource, id_string};
use crate::error::{Error, Result};
use crate::seed::SeedData;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Largest page size a list call will return
pub const MAX_LIMIT: i64 = 1000;
/// Page size used when only `page` is given
pub const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Default)]
struct Collection {
    records: Vec<Value>,
    next_id: u64,
}

impl Collection {
    fn assign_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.get("id").and_then(id_string).as_deref() == Some(id))
    }
}

/// In-process collections seeded from [`SeedData`].
///
/// `customers` and `Leads` are stored; `campaigns` is a read-only view
/// aggregated from the `campaignId` of the current leads.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<Resource, Collection>>,
}

impl MemoryBackend {
    /// Empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend populated with the default seed dataset
    pub fn seeded() -> Self {
        Self::from_seed(&SeedData::build())
    }

    pub fn from_seed(seed: &SeedData) -> Self {
        let backend = Self::new();
        {
            let mut collections = backend.collections.write().unwrap_or_else(|e| e.into_inner());

            let customers = collections.entry(Resource::Customers).or_default();
            for customer in &seed.customers {
                if let Ok(record) = serde_json::to_value(customer) {
                    customers.records.push(record);
                }
            }
            customers.next_id = max_numeric_id(&customers.records);

            let leads = collections.entry(Resource::Leads).or_default();
            for lead in &seed.leads {
                if let Ok(Value::Object(mut record)) = serde_json::to_value(lead) {
                    let id = leads.assign_id();
                    record.insert("id".to_string(), Value::String(id));
                    leads.records.push(Value::Object(record));
                }
            }
        }
        backend
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<Resource, Collection>) -> T) -> Result<T> {
        let collections = self
            .collections
            .read()
            .map_err(|_| Error::Internal("memory backend lock poisoned".to_string()))?;
        Ok(f(&collections))
    }

    fn write<T>(
        &self,
        resource: Resource,
        method: &str,
        f: impl FnOnce(&mut Collection) -> Result<T>,
    ) -> Result<T> {
        if resource == Resource::Campaigns {
            return Err(Error::MethodNotAllowed(method.to_string()));
        }
        let mut collections = self
            .collections
            .write()
            .map_err(|_| Error::Internal("memory backend lock poisoned".to_string()))?;
        f(collections.entry(resource).or_default())
    }

    /// Current records of a collection, before any query is applied
    fn snapshot(&self, resource: Resource) -> Result<Vec<Value>> {
        self.read(|collections| match resource {
            Resource::Campaigns => campaign_summaries(
                collections
                    .get(&Resource::Leads)
                    .map(|c| c.records.as_slice())
                    .unwrap_or(&[]),
            ),
            other => collections
                .get(&other)
                .map(|c| c.records.clone())
                .unwrap_or_default(),
        })
    }
}

#[async_trait]
impl DataBackend for MemoryBackend {
    fn describe(&self) -> String {
        "in-memory".to_string()
    }

    async fn list(&self, resource: Resource, query: &QueryPairs) -> Result<Listing> {
        let params = ListParams::parse(query)?;
        let records = self.snapshot(resource)?;
        let (page, total) = params.apply(records);
        Ok(Listing {
            body: Value::Array(page),
            total: Some(total as u64),
        })
    }

    async fn get(&self, resource: Resource, id: &str, _query: &QueryPairs) -> Result<Value> {
        self.snapshot(resource)?
            .into_iter()
            .find(|r| r.get("id").and_then(id_string).as_deref() == Some(id))
            .ok_or_else(|| not_found(resource, id))
    }

    async fn create(
        &self,
        resource: Resource,
        record: Value,
        _query: &QueryPairs,
    ) -> Result<Value> {
        let Value::Object(mut record) = record else {
            return Err(Error::InvalidRequest(
                "record must be a JSON object".to_string(),
            ));
        };
        self.write(resource, "POST", |collection| {
            let id = collection.assign_id();
            record.insert("id".to_string(), Value::String(id));
            let record = Value::Object(record);
            collection.records.push(record.clone());
            Ok(record)
        })
    }

    async fn replace(
        &self,
        resource: Resource,
        id: &str,
        record: Value,
        _query: &QueryPairs,
    ) -> Result<Value> {
        let Value::Object(mut record) = record else {
            return Err(Error::InvalidRequest(
                "record must be a JSON object".to_string(),
            ));
        };
        self.write(resource, "PUT", |collection| {
            let index = collection
                .position(id)
                .ok_or_else(|| not_found(resource, id))?;
            record.insert("id".to_string(), Value::String(id.to_string()));
            collection.records[index] = Value::Object(record);
            Ok(collection.records[index].clone())
        })
    }

    async fn patch(
        &self,
        resource: Resource,
        id: &str,
        fields: Map<String, Value>,
        _query: &QueryPairs,
    ) -> Result<Value> {
        self.write(resource, "PATCH", |collection| {
            let index = collection
                .position(id)
                .ok_or_else(|| not_found(resource, id))?;
            if let Value::Object(record) = &mut collection.records[index] {
                for (key, value) in fields {
                    if key != "id" {
                        record.insert(key, value);
                    }
                }
            }
            Ok(collection.records[index].clone())
        })
    }

    async fn delete(&self, resource: Resource, id: &str, _query: &QueryPairs) -> Result<Value> {
        self.write(resource, "DELETE", |collection| {
            let index = collection
                .position(id)
                .ok_or_else(|| not_found(resource, id))?;
            Ok(collection.records.remove(index))
        })
    }

    async fn delete_all(&self, resource: Resource) -> Result<usize> {
        self.write(resource, "DELETE", |collection| {
            let removed = collection.records.len();
            *collection = Collection::default();
            Ok(removed)
        })
    }
}

fn not_found(resource: Resource, id: &str) -> Error {
    Error::NotFound(format!("{} {} not found", resource, id))
}

fn max_numeric_id(records: &[Value]) -> u64 {
    records
        .iter()
        .filter_map(|r| r.get("id").and_then(id_string))
        .filter_map(|id| id.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

fn campaign_summaries(leads: &[Value]) -> Vec<Value> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for lead in leads {
        if let Some(id) = lead.get("campaignId").and_then(id_string) {
            *counts.entry(id).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(id, count)| json!({ "id": id, "leadCount": count }))
        .collect()
}

/// Filter, sort and pagination options of a list call
#[derive(Debug, Default, PartialEq)]
struct ListParams {
    filters: Vec<(String, String)>,
    sort_by: Option<String>,
    descending: bool,
    page: Option<i64>,
    limit: Option<i64>,
}

impl ListParams {
    fn parse(query: &QueryPairs) -> Result<Self> {
        let mut params = ListParams::default();
        for (key, value) in query {
            match key.as_str() {
                "page" => params.page = Some(parse_int("page", value)?),
                "limit" => params.limit = Some(parse_int("limit", value)?),
                "sortBy" => params.sort_by = Some(value.clone()).filter(|v| !v.is_empty()),
                "order" => {
                    params.descending = match value.to_ascii_lowercase().as_str() {
                        "" | "asc" => false,
                        "desc" => true,
                        _ => {
                            return Err(Error::InvalidRequest(
                                "order must be 'asc' or 'desc'".to_string(),
                            ));
                        }
                    }
                }
                _ => params.filters.push((key.clone(), value.clone())),
            }
        }
        Ok(params)
    }

    /// Returns the requested page and the filtered count before paging
    fn apply(&self, records: Vec<Value>) -> (Vec<Value>, usize) {
        let mut records: Vec<Value> = records
            .into_iter()
            .filter(|r| {
                self.filters
                    .iter()
                    .all(|(field, expected)| field_text(r, field).as_deref() == Some(expected))
            })
            .collect();

        if let Some(field) = &self.sort_by {
            records.sort_by(|a, b| {
                match (a.get(field.as_str()), b.get(field.as_str())) {
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(_), None) => Ordering::Less,
                    (Some(x), Some(y)) => {
                        let ordering = compare_values(x, y);
                        if self.descending {
                            ordering.reverse()
                        } else {
                            ordering
                        }
                    }
                }
            });
        }

        let total = records.len();
        if self.page.is_none() && self.limit.is_none() {
            return (records, total);
        }

        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as usize;
        let page = self.page.unwrap_or(1).max(1) as usize;
        let page = records
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();
        (page, total)
    }
}

fn parse_int(name: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidRequest(format!("{} must be an integer", name)))
}

fn field_text(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numbers (and numeric strings such as ids) compare numerically,
/// everything else by its text.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    let numeric = |v: &Value| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => match (a, b) {
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}
