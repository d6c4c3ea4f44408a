//! Endpoint registry.
//!
//! Two lock levels:
//! - the registry `RwLock` guards the `id -> endpoint` table, the path index
//!   and endpoint identity fields (name, path, config);
//! - each endpoint's [`RateAccumulator`] has its own lock.
//!
//! The registry lock is always released before an accumulator is touched on
//! the request path, so traffic on one endpoint never waits on management
//! calls against another. When both are needed the registry lock comes first.
//! The [`RouteBinder`] is invoked while the registry write lock is held, so
//! its own locking sits below the registry as well.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::endpoint::{
    default_path, is_protected, normalize_path, ConfigPatch, Endpoint, EndpointConfig,
    EndpointPatch, EndpointReplace, EndpointSeed,
};
use crate::error::{MockError, Result};
use crate::rate::{RateAccumulator, RateSnapshot};

const ID_LEN: usize = 8;
const NO_REQUEST: i64 = i64::MIN;

/// Route registration seam towards the transport layer.
///
/// Called with the registry write lock held: implementations must not call
/// back into the registry.
pub trait RouteBinder: Send + Sync {
    fn bind(&self, path: &str, id: &str);
    fn unbind(&self, path: &str);
}

struct Slot {
    name: String,
    path: String,
    config: Arc<EndpointConfig>,
    accumulator: Arc<RateAccumulator>,
    created_at: DateTime<Utc>,
    /// Microseconds since epoch, `NO_REQUEST` until the first hit.
    last_request: AtomicI64,
}

impl Slot {
    fn view(&self, id: &str) -> Endpoint {
        let last = self.last_request.load(Ordering::Relaxed);
        Endpoint {
            id: id.to_string(),
            name: self.name.clone(),
            path: self.path.clone(),
            config: (*self.config).clone(),
            accumulator: Arc::clone(&self.accumulator),
            created_at: self.created_at,
            last_request_at: if last == NO_REQUEST {
                None
            } else {
                DateTime::from_timestamp_micros(last)
            },
        }
    }
}

#[derive(Default)]
struct Table {
    slots: HashMap<String, Slot>,
    by_path: HashMap<String, String>,
}

enum ConfigChange {
    Keep,
    Merge(ConfigPatch),
    Replace(EndpointConfig),
}

/// In-memory table of virtual endpoints.
#[derive(Default)]
pub struct Registry {
    table: RwLock<Table>,
    binder: Option<Arc<dyn RouteBinder>>,
    reserved_prefixes: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the transport's route table in step with registrations.
    pub fn with_binder(mut self, binder: Arc<dyn RouteBinder>) -> Self {
        self.binder = Some(binder);
        self
    }

    /// Refuse endpoint paths at or below `prefix` (e.g. the management API).
    pub fn reserve_prefix(mut self, prefix: &str) -> Self {
        self.reserved_prefixes.push(prefix.trim_end_matches('/').to_string());
        self
    }

    /// Register a new endpoint under a generated id.
    ///
    /// A missing or blank `path` becomes `/w/{id}`.
    pub fn create(&self, name: &str, path: Option<&str>, config: EndpointConfig) -> Result<Endpoint> {
        let mut table = self.write();
        let id = fresh_id(&table);
        let path = match path.filter(|p| !p.trim().is_empty()) {
            Some(p) => normalize_path(p)?,
            None => default_path(&id),
        };
        self.admit(&mut table, id, name, path, config)
    }

    /// Register an endpoint under a caller-supplied id (startup config).
    pub fn insert(&self, seed: EndpointSeed) -> Result<Endpoint> {
        let id = seed.id.trim();
        if id.is_empty() || id.contains(|c: char| c == '/' || c.is_whitespace()) {
            return Err(MockError::InvalidConfig(format!("invalid endpoint id: {:?}", seed.id)));
        }
        let path = match seed.path.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(p) => normalize_path(p)?,
            None => default_path(id),
        };

        let mut table = self.write();
        if table.slots.contains_key(id) {
            return Err(MockError::DuplicateId(id.to_string()));
        }
        self.admit(&mut table, id.to_string(), &seed.name, path, seed.config)
    }

    pub fn get(&self, id: &str) -> Result<Endpoint> {
        let table = self.read();
        table
            .slots
            .get(id)
            .map(|s| s.view(id))
            .ok_or_else(|| MockError::NotFound(id.to_string()))
    }

    /// All endpoints, in no particular order.
    pub fn list(&self) -> Vec<Endpoint> {
        let table = self.read();
        table.slots.iter().map(|(id, s)| s.view(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge the fields present in `patch`; absent fields keep their value.
    pub fn update(&self, id: &str, patch: EndpointPatch) -> Result<Endpoint> {
        let change = match patch.config {
            Some(c) if !c.is_empty() => ConfigChange::Merge(c),
            _ => ConfigChange::Keep,
        };
        self.apply(id, patch.name, patch.path, change)
    }

    /// Replace the whole config, optionally renaming or moving the endpoint.
    pub fn replace(&self, id: &str, req: EndpointReplace) -> Result<Endpoint> {
        self.apply(id, req.name, req.path, ConfigChange::Replace(req.config))
    }

    /// Remove an endpoint. Protected and unknown ids return `false`.
    pub fn delete(&self, id: &str) -> bool {
        if is_protected(id) {
            return false;
        }
        let mut table = self.write();
        let Some(slot) = table.slots.remove(id) else {
            return false;
        };
        table.by_path.remove(&slot.path);
        if let Some(b) = &self.binder {
            b.unbind(&slot.path);
        }
        tracing::info!(id = %id, path = %slot.path, "endpoint deleted");
        true
    }

    /// Hot path: count one request against `id` and hand back its config.
    ///
    /// The registry read lock covers only the lookup and the `last_request_at`
    /// stamp; the accumulator is updated after it is released.
    pub fn record_and_respond(&self, id: &str) -> Result<Arc<EndpointConfig>> {
        let now = Utc::now();
        let (config, accumulator) = {
            let table = self.read();
            let slot = table
                .slots
                .get(id)
                .ok_or_else(|| MockError::NotFound(id.to_string()))?;
            slot.last_request
                .fetch_max(now.timestamp_micros(), Ordering::Relaxed);
            (Arc::clone(&slot.config), Arc::clone(&slot.accumulator))
        };
        accumulator.record_at(now);
        Ok(config)
    }

    /// Shared handle to one endpoint's accumulator.
    pub fn accumulator(&self, id: &str) -> Result<Arc<RateAccumulator>> {
        let table = self.read();
        table
            .slots
            .get(id)
            .map(|s| Arc::clone(&s.accumulator))
            .ok_or_else(|| MockError::NotFound(id.to_string()))
    }

    pub fn snapshot(&self, id: &str) -> Result<RateSnapshot> {
        Ok(self.accumulator(id)?.snapshot())
    }

    pub fn reset(&self, id: &str) -> Result<()> {
        self.accumulator(id)?.reset();
        Ok(())
    }

    fn admit(
        &self,
        table: &mut Table,
        id: String,
        name: &str,
        path: String,
        config: EndpointConfig,
    ) -> Result<Endpoint> {
        validate_name(name)?;
        config.validate()?;
        self.check_path(table, &path, None)?;

        let slot = Slot {
            name: name.to_string(),
            path: path.clone(),
            config: Arc::new(config),
            accumulator: Arc::new(RateAccumulator::new()),
            created_at: Utc::now(),
            last_request: AtomicI64::new(NO_REQUEST),
        };
        let view = slot.view(&id);

        table.by_path.insert(path.clone(), id.clone());
        table.slots.insert(id.clone(), slot);
        if let Some(b) = &self.binder {
            b.bind(&path, &id);
        }
        tracing::info!(id = %id, path = %path, "endpoint registered");
        Ok(view)
    }

    /// Validate everything first, then commit; a rejected change leaves the
    /// endpoint untouched.
    fn apply(
        &self,
        id: &str,
        name: Option<String>,
        path: Option<String>,
        change: ConfigChange,
    ) -> Result<Endpoint> {
        let mut table = self.write();
        let slot = table
            .slots
            .get(id)
            .ok_or_else(|| MockError::NotFound(id.to_string()))?;

        if let Some(n) = &name {
            validate_name(n)?;
        }

        let new_path = match path {
            Some(p) => {
                let p = normalize_path(&p)?;
                if p == slot.path {
                    None
                } else if is_protected(id) {
                    return Err(MockError::Protected(id.to_string()));
                } else {
                    Some(p)
                }
            }
            None => None,
        };

        let new_config = match change {
            ConfigChange::Keep => None,
            ConfigChange::Merge(patch) => {
                let mut cfg = (*slot.config).clone();
                patch.apply_to(&mut cfg);
                Some(cfg)
            }
            ConfigChange::Replace(cfg) => Some(cfg),
        };
        if let Some(cfg) = &new_config {
            cfg.validate()?;
        }
        if let Some(p) = &new_path {
            self.check_path(&table, p, Some(id))?;
        }

        let moved = new_path.and_then(|p| {
            let slot = table.slots.get_mut(id)?;
            let old = std::mem::replace(&mut slot.path, p.clone());
            Some((old, p))
        });
        if let Some((old, new)) = &moved {
            table.by_path.remove(old);
            table.by_path.insert(new.clone(), id.to_string());
            if let Some(b) = &self.binder {
                b.unbind(old);
                b.bind(new, id);
            }
            tracing::info!(id = %id, from = %old, to = %new, "endpoint path changed");
        }

        let slot = table
            .slots
            .get_mut(id)
            .ok_or_else(|| MockError::Internal(format!("endpoint vanished under lock: {id}")))?;
        if let Some(n) = name {
            slot.name = n;
        }
        if let Some(cfg) = new_config {
            slot.config = Arc::new(cfg);
        }
        Ok(slot.view(id))
    }

    fn check_path(&self, table: &Table, path: &str, owner: Option<&str>) -> Result<()> {
        let reserved = self
            .reserved_prefixes
            .iter()
            .any(|pre| path == pre || path.strip_prefix(pre.as_str()).is_some_and(|rest| rest.starts_with('/')));
        if reserved {
            return Err(MockError::InvalidConfig(format!("path is reserved: {path}")));
        }
        match table.by_path.get(path) {
            Some(existing) if Some(existing.as_str()) != owner => {
                Err(MockError::DuplicatePath(path.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Table> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MockError::InvalidConfig("name must not be empty".into()));
    }
    Ok(())
}

/// 8 hex chars of a v4 UUID, re-drawn while it clashes with an existing id
/// or its `/w/{id}` path is already bound to another endpoint.
fn fresh_id(table: &Table) -> String {
    fresh_id_from(table, || {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(ID_LEN);
        id
    })
}

fn fresh_id_from(table: &Table, mut draw: impl FnMut() -> String) -> String {
    loop {
        let id = draw();
        if !table.slots.contains_key(&id) && !table.by_path.contains_key(&default_path(&id)) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn id_is_redrawn_when_its_route_is_taken() {
        let reg = Registry::new();
        reg.create("squatter", Some("/w/aaaaaaaa"), EndpointConfig::default())
            .unwrap();

        let table = reg.read();
        let mut draws = vec!["bbbbbbbb".to_string(), "aaaaaaaa".to_string()];
        let id = fresh_id_from(&table, || draws.pop().unwrap());
        assert_eq!(id, "bbbbbbbb");
    }

    #[test]
    fn id_is_redrawn_on_id_clash() {
        let reg = Registry::new();
        let taken = reg.create("a", None, EndpointConfig::default()).unwrap().id;

        let table = reg.read();
        let mut draws = vec!["cccccccc".to_string(), taken];
        assert_eq!(fresh_id_from(&table, || draws.pop().unwrap()), "cccccccc");
    }
}
