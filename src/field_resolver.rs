use serde::Serialize;
use serde_json::Value;

use crate::RequestContext;
use crate::error::StoreError;

/// How one field invocation should be resolved. Built once per invocation by
/// `classify`; the resolvers themselves never inspect context shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupMode {
    /// The parent record references exactly one record in the target
    /// collection; resolve that identifier.
    ChildLookup(String),
    /// No parent, but an explicit `id` argument; resolve that identifier and
    /// wrap it in a one-element sequence.
    FilterLookup(String),
    /// Neither parent reference nor argument; return the full collection.
    EnumerateAll,
}

/// What a resolver hands back to projection: a single (possibly absent)
/// record, or a sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    Unit(Option<Value>),
    Seq(Vec<Value>),
}

/// The key under which a parent record of `parent_type` carries a reference
/// into the collection behind `field`, when such a key exists.
pub fn reference_key(parent_type: &str, field: &str) -> Option<&'static str> {
    match (parent_type, field) {
        ("Launch", "launchpad") => Some("launchpad"),
        // A launchpad record carries no launch references; its `launches`
        // field falls through `classify` to the argument/enumerate path.
        // TODO: once the store exposes POST /launches/query, resolve a pad's
        // launches as a query on their `launchpad` reference instead of the
        // unfiltered fall-through.
        _ => None,
    }
}

/// Pick the lookup mode from the shape of the invocation context. Resolution
/// order: parent reference first, then the `id` argument, then enumerate.
///
/// Returns `None` when the parent carries the relationship's reference key
/// but no value in it: the field is null and nothing is fetched. A parent
/// with no reference key for the field does not count as parent context.
pub fn classify(
    parent: Option<&Value>,
    reference_key: Option<&str>,
    id_argument: Option<String>,
) -> Option<LookupMode> {
    if let (Some(parent), Some(key)) = (parent, reference_key) {
        return parent
            .get(key)
            .and_then(Value::as_str)
            .map(|id| LookupMode::ChildLookup(id.to_string()));
    }
    match id_argument {
        Some(id) => Some(LookupMode::FilterLookup(id)),
        None => Some(LookupMode::EnumerateAll),
    }
}

fn record_value<T: Serialize>(record: &T) -> Value {
    serde_json::to_value(record).unwrap_or(Value::Null)
}

/// Resolver for the launch collection. Launches have no batched path, so
/// single-identifier lookups go straight to the store.
pub struct LaunchResolver;

impl LaunchResolver {
    pub async fn resolve(mode: LookupMode, ctx: &RequestContext) -> Result<Resolved, StoreError> {
        match mode {
            LookupMode::ChildLookup(id) => {
                let launch = ctx.store.fetch_one_launch(&id).await?;
                Ok(Resolved::Unit(launch.as_ref().map(record_value)))
            }
            LookupMode::FilterLookup(id) => {
                let launch = ctx.store.fetch_one_launch(&id).await?;
                Ok(Resolved::Seq(vec![
                    launch.as_ref().map(record_value).unwrap_or(Value::Null),
                ]))
            }
            LookupMode::EnumerateAll => {
                let launches = ctx.store.fetch_all_launches().await?;
                Ok(Resolved::Seq(launches.iter().map(record_value).collect()))
            }
        }
    }
}

/// Resolver for the launchpad collection. Single-identifier lookups funnel
/// through the request's batch loader; only enumeration bypasses it.
pub struct LaunchpadResolver;

impl LaunchpadResolver {
    pub async fn resolve(mode: LookupMode, ctx: &RequestContext) -> Result<Resolved, StoreError> {
        match mode {
            LookupMode::ChildLookup(id) => {
                let pad = ctx.launchpads.load(&id).await?;
                Ok(Resolved::Unit(pad.as_ref().map(record_value)))
            }
            LookupMode::FilterLookup(id) => {
                let pad = ctx.launchpads.load(&id).await?;
                Ok(Resolved::Seq(vec![
                    pad.as_ref().map(record_value).unwrap_or(Value::Null),
                ]))
            }
            LookupMode::EnumerateAll => {
                let pads = ctx.store.fetch_all_launchpads().await?;
                Ok(Resolved::Seq(pads.iter().map(record_value).collect()))
            }
        }
    }
}
