//! Batched relationship loading.
//!
//! Relationship fields are not resolved row by row. Projection enqueues one
//! load per (row, field) into a [`JoinBatch`]; flushing the batch groups the
//! loads by relationship and subquery shape and issues a single fetch per
//! group, filtered by the distinct join keys of the group. Results are cached
//! per request, keyed by shape and join key. A key is claimed in the cache
//! before its fetch starts, so concurrent executions sharing the cache (the
//! entries of a foreach request) wait on that fetch instead of repeating it.

use futures::channel::oneshot;
use futures::future::{join_all, try_join_all, FutureExt, Shared};
use parking_lot::Mutex;
use quarry_core::{Row, Value};
use quarry_registry::{Column, Relationship, TableSchema};
use quarry_request::{Expression, Query, QueryResponse};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::aggregates::evaluate_all;
use crate::executor::{QueryExecutor, Window};
use crate::{QueryError, QueryResult};

// ==================== Join Keys ====================

/// One hashable component of a join key.
///
/// Floats with an integral value normalize to `Int` so `1` and `1.0` join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
}

impl KeyPart {
    /// Normalize a value. Null and non-finite floats have no key.
    pub fn from_value(value: &Value) -> Option<KeyPart> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(KeyPart::Bool(*b)),
            Value::Int(i) => Some(KeyPart::Int(*i)),
            Value::Float(f) if !f.is_finite() => None,
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some(KeyPart::Int(*f as i64))
            }
            Value::Float(f) => Some(KeyPart::Float(f.to_bits())),
            Value::String(s) => Some(KeyPart::String(s.clone())),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            KeyPart::Bool(b) => Value::Bool(*b),
            KeyPart::Int(i) => Value::Int(*i),
            KeyPart::Float(bits) => Value::Float(f64::from_bits(*bits)),
            KeyPart::String(s) => Value::String(s.clone()),
        }
    }

    /// Coerce a parent-side value to the declared type of the target column.
    /// Returns None when the value cannot be compared against that column.
    fn coerce(value: &Value, target: Option<&Column>) -> Option<KeyPart> {
        match target {
            Some(column) if column.is_numeric() => match value {
                Value::Int(_) | Value::Float(_) => KeyPart::from_value(value),
                Value::String(s) => {
                    let s = s.trim();
                    match s.parse::<i64>() {
                        Ok(i) => Some(KeyPart::Int(i)),
                        Err(_) => s
                            .parse::<f64>()
                            .ok()
                            .and_then(|f| KeyPart::from_value(&Value::Float(f))),
                    }
                }
                Value::Bool(_) | Value::Null => None,
            },
            Some(column) if column.type_name == "string" => match value {
                Value::Null => None,
                Value::String(s) => Some(KeyPart::String(s.clone())),
                other => Some(KeyPart::String(other.to_string())),
            },
            _ => KeyPart::from_value(value),
        }
    }
}

/// The values of a row's join columns, in column-mapping order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinKey(Vec<KeyPart>);

impl JoinKey {
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Key of a target-side row over the given columns.
    fn from_row<'c>(row: &Row, columns: impl IntoIterator<Item = &'c str>) -> Option<JoinKey> {
        columns
            .into_iter()
            .map(|column| row.get(column).and_then(KeyPart::from_value))
            .collect::<Option<Vec<_>>>()
            .map(JoinKey)
    }

    /// Key of a parent row for a relationship, coerced to the target table's
    /// column types.
    pub(crate) fn for_parent(
        row: &Row,
        relationship: &Relationship,
        target: &TableSchema,
    ) -> KeyLookup {
        let mut parts = Vec::with_capacity(relationship.column_mapping.len());
        for (local, remote) in &relationship.column_mapping {
            let value = row.get(local).unwrap_or(&Value::Null);
            if value.is_null() {
                return KeyLookup::Null;
            }
            match KeyPart::coerce(value, target.column(remote)) {
                Some(part) => parts.push(part),
                None => return KeyLookup::Invalid(value.clone()),
            }
        }
        KeyLookup::Key(JoinKey(parts))
    }
}

/// Outcome of computing a parent row's join key.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum KeyLookup {
    Key(JoinKey),
    /// A local join column is null.
    Null,
    /// A local join column holds a value the target column cannot match.
    Invalid(Value),
}

/// Filter selecting target rows whose join columns match any of the keys.
fn key_filter(columns: &[&str], keys: &[JoinKey]) -> Expression {
    if let [column] = columns {
        let values = keys
            .iter()
            .filter_map(|key| key.parts().first().map(KeyPart::to_value))
            .collect();
        return Expression::is_in(*column, values);
    }

    Expression::or(
        keys.iter()
            .map(|key| {
                Expression::and(
                    columns
                        .iter()
                        .zip(key.parts())
                        .map(|(column, part)| Expression::equal(*column, part.to_value()))
                        .collect(),
                )
            })
            .collect(),
    )
}

// ==================== Cache ====================

/// Completion signal of an in-flight load, awaited by every execution that
/// needs one of its keys.
type Landing = Shared<oneshot::Receiver<QueryResult<()>>>;

enum Slot {
    Ready(QueryResponse),
    /// Claimed by a fetch that has not finished yet.
    Loading(Landing),
}

/// Request-scoped cache of relationship loads, keyed by shape and join key.
#[derive(Default)]
pub(crate) struct JoinCache {
    entries: Mutex<HashMap<(String, JoinKey), Slot>>,
}

/// Keys a caller must fetch itself, and the in-flight loads it must await
/// for the rest.
struct Claim {
    owned: Vec<JoinKey>,
    waits: Vec<Landing>,
    done: oneshot::Sender<QueryResult<()>>,
}

impl JoinCache {
    /// Claim every key that is neither cached nor being loaded. Keys must be
    /// distinct.
    fn claim<'k>(&self, shape: &str, keys: impl IntoIterator<Item = &'k JoinKey>) -> Claim {
        let (done, receiver) = oneshot::channel();
        let landing = receiver.shared();
        let mut owned = Vec::new();
        let mut waits = Vec::new();

        let mut entries = self.entries.lock();
        for key in keys {
            let slot = (shape.to_string(), key.clone());
            match entries.get(&slot) {
                Some(Slot::Ready(_)) => {}
                Some(Slot::Loading(other)) => waits.push(other.clone()),
                None => {
                    entries.insert(slot, Slot::Loading(landing.clone()));
                    owned.push(key.clone());
                }
            }
        }
        Claim { owned, waits, done }
    }

    /// Store the outcome of a claimed fetch. On failure the claims are
    /// released so the keys read as uncached.
    fn settle(
        &self,
        shape: &str,
        owned: &[JoinKey],
        loaded: QueryResult<HashMap<JoinKey, QueryResponse>>,
    ) -> QueryResult<()> {
        let mut entries = self.entries.lock();
        match loaded {
            Ok(mut loaded) => {
                for key in owned {
                    let slot = (shape.to_string(), key.clone());
                    match loaded.remove(key) {
                        Some(response) => entries.insert(slot, Slot::Ready(response)),
                        None => entries.remove(&slot),
                    };
                }
                Ok(())
            }
            Err(err) => {
                for key in owned {
                    entries.remove(&(shape.to_string(), key.clone()));
                }
                Err(err)
            }
        }
    }

    fn get(&self, shape: &str, key: JoinKey) -> Option<QueryResponse> {
        match self.entries.lock().get(&(shape.to_string(), key)) {
            Some(Slot::Ready(response)) => Some(response.clone()),
            _ => None,
        }
    }
}

// ==================== Batching ====================

/// Loads queued during one projection step.
#[derive(Default)]
pub(crate) struct JoinBatch<'q> {
    groups: Vec<PendingGroup<'q>>,
}

struct PendingGroup<'q> {
    /// Relationship and subquery serialized; identifies the batch.
    shape: String,
    relationship: &'q Relationship,
    target: &'q TableSchema,
    query: &'q Query,
    loads: Vec<PendingLoad>,
}

struct PendingLoad {
    row: usize,
    field: String,
    key: Option<JoinKey>,
}

/// A load resolved by a flush.
pub(crate) struct Resolved {
    pub row: usize,
    pub field: String,
    pub response: QueryResponse,
}

impl<'q> JoinBatch<'q> {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Find or open the group for a relationship and subquery shape.
    pub fn group(
        &mut self,
        relationship: &'q Relationship,
        target: &'q TableSchema,
        query: &'q Query,
    ) -> QueryResult<usize> {
        let shape = serde_json::to_string(&(relationship, query))?;
        if let Some(index) = self.groups.iter().position(|g| g.shape == shape) {
            return Ok(index);
        }
        self.groups.push(PendingGroup {
            shape,
            relationship,
            target,
            query,
            loads: Vec::new(),
        });
        Ok(self.groups.len() - 1)
    }

    /// Queue the load of one relationship field for one parent row. A missing
    /// key resolves to no match.
    pub fn enqueue(&mut self, group: usize, row: usize, field: &str, key: Option<JoinKey>) {
        self.groups[group].loads.push(PendingLoad {
            row,
            field: field.to_string(),
            key,
        });
    }
}

impl<'a> QueryExecutor<'a> {
    /// Resolve every queued load. Groups are fetched concurrently.
    pub(crate) async fn flush(&self, batch: JoinBatch<'_>) -> QueryResult<Vec<Resolved>> {
        let groups = batch.groups.into_iter().map(|group| self.resolve_group(group));
        let resolved = try_join_all(groups).await?;
        Ok(resolved.into_iter().flatten().collect())
    }

    async fn resolve_group(&self, group: PendingGroup<'_>) -> QueryResult<Vec<Resolved>> {
        let claim = {
            let mut seen = HashSet::new();
            let keys = group
                .loads
                .iter()
                .filter_map(|load| load.key.as_ref())
                .filter(|key| seen.insert(*key));
            self.cache().claim(&group.shape, keys)
        };

        if !claim.owned.is_empty() {
            let loaded = self.load_keys(&group, &claim.owned).await;
            let settled = self.cache().settle(&group.shape, &claim.owned, loaded);
            // Nobody may be waiting; a closed channel is fine.
            let _ = claim.done.send(settled.clone());
            settled?;
        }

        // Shapes strictly nest, so a load never waits on one of its own
        // nested loads.
        if !claim.waits.is_empty() {
            debug!(
                shape = %group.shape,
                waits = claim.waits.len(),
                "awaiting in-flight relationship loads"
            );
            for landed in join_all(claim.waits).await {
                landed.map_err(|_| {
                    QueryError::source_unavailable("relationship load was cancelled")
                })??;
            }
        }

        let empty = no_match(group.query)?;
        Ok(group
            .loads
            .into_iter()
            .map(|load| {
                let response = load
                    .key
                    .and_then(|key| self.cache().get(&group.shape, key))
                    .unwrap_or_else(|| empty.clone());
                Resolved {
                    row: load.row,
                    field: load.field,
                    response,
                }
            })
            .collect())
    }

    /// One unrestricted fetch of the target table for all keys, partitioned
    /// back per key. The subquery's own pagination applies per key.
    async fn load_keys(
        &self,
        group: &PendingGroup<'_>,
        keys: &[JoinKey],
    ) -> QueryResult<HashMap<JoinKey, QueryResponse>> {
        let relationship = group.relationship;
        let query = group.query;
        let join_columns: Vec<&str> = relationship.target_columns().collect();

        let batch_query = Query {
            r#where: Some(Expression::conjoin(
                query.r#where.clone(),
                key_filter(&join_columns, keys),
            )),
            limit: None,
            offset: None,
            aggregates_limit: None,
            ..query.clone()
        };
        let rows = self
            .select(group.target, &batch_query, Window::default(), &join_columns)
            .await?;
        debug!(
            target_table = %relationship.target_table,
            keys = keys.len(),
            rows = rows.len(),
            "resolved relationship batch"
        );

        let mut partitions: HashMap<JoinKey, Vec<&Row>> = HashMap::new();
        for row in &rows {
            let Some(key) = JoinKey::from_row(row, join_columns.iter().copied()) else {
                continue;
            };
            let matched = partitions.entry(key).or_default();
            if relationship.is_object() && !matched.is_empty() {
                continue;
            }
            matched.push(row);
        }

        // Project the selected rows of every key in one step so nested
        // relationships batch across parents too.
        let mut selected: Vec<Row> = Vec::new();
        let mut spans = Vec::with_capacity(keys.len());
        let mut aggregates = Vec::with_capacity(keys.len());
        for key in keys {
            let matched = partitions.get(key).map(Vec::as_slice).unwrap_or_default();
            let matched = Window::new(query.offset, None).slice(matched);
            let returned = Window::new(None, query.limit).slice(matched);
            aggregates.push(match &query.aggregates {
                Some(requested) => Some(evaluate_all(
                    requested,
                    Window::new(None, query.aggregates_limit)
                        .slice(matched)
                        .iter()
                        .copied(),
                )?),
                None => None,
            });
            spans.push(selected.len()..selected.len() + returned.len());
            selected.extend(returned.iter().map(|row| (*row).clone()));
        }

        let projected = match &query.fields {
            Some(fields) => Some(self.project_rows(group.target, fields, &selected).await?),
            None => None,
        };

        Ok(keys
            .iter()
            .zip(spans)
            .zip(aggregates)
            .map(|((key, span), aggregates)| {
                let response = QueryResponse {
                    aggregates,
                    rows: projected.as_ref().map(|rows| rows[span].to_vec()),
                };
                (key.clone(), response)
            })
            .collect())
    }
}

/// Response for a parent with no matching rows: aggregates over the empty
/// set and an empty row list.
fn no_match(query: &Query) -> QueryResult<QueryResponse> {
    let aggregates = match &query.aggregates {
        Some(requested) => Some(evaluate_all(requested, &[] as &[Row])?),
        None => None,
    };
    Ok(QueryResponse {
        aggregates,
        rows: query.fields.as_ref().map(|_| Vec::new()),
    })
}
