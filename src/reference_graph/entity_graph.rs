//! In-memory entity graphs.
//!
//! An [`EntityGraph`] is a shared handle to one entity row plus the related
//! entities attached to its reference properties. Handles are cheap to
//! clone and compare by identity, so cycles (a team whose leader is also
//! one of its users, two types pointing at each other) are expressed
//! directly.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::entity_catalog::{metadata, Entity, EntityCatalogError, EntityMetadata};
use crate::value::Value;

/// Contents of a reference property.
#[derive(Debug, Clone)]
pub enum RefValue {
    Single(EntityGraph),
    Many(Vec<EntityGraph>),
}

#[derive(Debug)]
pub struct EntityNode {
    meta: Arc<EntityMetadata>,
    values: Vec<Value>,
    references: HashMap<String, RefValue>,
}

#[derive(Clone)]
pub struct EntityGraph(Arc<Mutex<EntityNode>>);

impl EntityGraph {
    /// Empty row of `T`; every field starts out `NULL`.
    pub fn new<T: Entity>() -> Self {
        Self::from_metadata(metadata::<T>())
    }

    pub fn from_metadata(meta: Arc<EntityMetadata>) -> Self {
        let values = vec![Value::Null; meta.fields().len()];
        Self::from_values(meta, values)
    }

    /// Row with values in field order; missing trailing values are `NULL`.
    pub fn from_values(meta: Arc<EntityMetadata>, mut values: Vec<Value>) -> Self {
        values.resize(meta.fields().len(), Value::Null);
        Self(Arc::new(Mutex::new(EntityNode {
            meta,
            values,
            references: HashMap::new(),
        })))
    }

    fn lock(&self) -> MutexGuard<'_, EntityNode> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builder-style setter.
    pub fn with(self, field: &str, value: impl Into<Value>) -> Result<Self, EntityCatalogError> {
        self.set(field, value)?;
        Ok(self)
    }

    pub fn meta(&self) -> Arc<EntityMetadata> {
        Arc::clone(&self.lock().meta)
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &EntityGraph) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the node, stable for the lifetime of the graph.
    pub fn node_id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn get(&self, field: &str) -> Result<Value, EntityCatalogError> {
        let node = self.lock();
        let index = node.meta.require_field(field)?;
        Ok(node.values[index].clone())
    }

    pub fn set(&self, field: &str, value: impl Into<Value>) -> Result<(), EntityCatalogError> {
        let mut node = self.lock();
        let index = node.meta.require_field(field)?;
        node.values[index] = value.into();
        Ok(())
    }

    pub fn value_at(&self, index: usize) -> Value {
        self.lock().values.get(index).cloned().unwrap_or_default()
    }

    pub fn set_value_at(&self, index: usize, value: Value) {
        if let Some(slot) = self.lock().values.get_mut(index) {
            *slot = value;
        }
    }

    /// All field values in field order.
    pub fn values(&self) -> Vec<Value> {
        self.lock().values.clone()
    }

    /// Primary-key value, `NULL` for entities without a key.
    pub fn key(&self) -> Value {
        let node = self.lock();
        node.meta
            .primary_key_index()
            .map(|pk| node.values[pk].clone())
            .unwrap_or_default()
    }

    pub fn set_key(&self, key: Value) -> Result<(), EntityCatalogError> {
        let mut node = self.lock();
        let pk = node.meta.require_primary_key()?;
        node.values[pk] = key;
        Ok(())
    }

    fn check_reference(&self, name: &str) -> Result<String, EntityCatalogError> {
        let node = self.lock();
        node.meta
            .reference(name)
            .map(|r| r.name.clone())
            .ok_or_else(|| EntityCatalogError::UnknownReference {
                entity: node.meta.name().to_string(),
                reference: name.to_string(),
            })
    }

    pub fn set_reference(&self, name: &str, value: RefValue) -> Result<(), EntityCatalogError> {
        let name = self.check_reference(name)?;
        self.lock().references.insert(name, value);
        Ok(())
    }

    pub fn set_one(&self, name: &str, child: &EntityGraph) -> Result<(), EntityCatalogError> {
        self.set_reference(name, RefValue::Single(child.clone()))
    }

    pub fn set_many(&self, name: &str, children: Vec<EntityGraph>) -> Result<(), EntityCatalogError> {
        self.set_reference(name, RefValue::Many(children))
    }

    /// Append to a collection reference, creating it when unset.
    pub fn push_many(&self, name: &str, child: &EntityGraph) -> Result<(), EntityCatalogError> {
        let name = self.check_reference(name)?;
        let mut node = self.lock();
        match node.references.get_mut(&name) {
            Some(RefValue::Many(children)) => children.push(child.clone()),
            _ => {
                node.references
                    .insert(name, RefValue::Many(vec![child.clone()]));
            }
        }
        Ok(())
    }

    pub fn clear_reference(&self, name: &str) {
        let mut node = self.lock();
        let key = node
            .references
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned();
        if let Some(key) = key {
            node.references.remove(&key);
        }
    }

    /// Contents of a reference property, `None` when unset.
    pub fn reference(&self, name: &str) -> Option<RefValue> {
        let node = self.lock();
        node.references
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    pub fn one(&self, name: &str) -> Option<EntityGraph> {
        match self.reference(name)? {
            RefValue::Single(child) => Some(child),
            RefValue::Many(children) => children.into_iter().next(),
        }
    }

    pub fn many(&self, name: &str) -> Option<Vec<EntityGraph>> {
        match self.reference(name)? {
            RefValue::Single(child) => Some(vec![child]),
            RefValue::Many(children) => Some(children),
        }
    }

    /// Every entity attached under `name`, empty when unset.
    pub(crate) fn children(&self, name: &str) -> Vec<EntityGraph> {
        self.many(name).unwrap_or_default()
    }
}

impl fmt::Debug for EntityGraph {
    // References are listed by name only; printing them would loop on cycles
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_lock() {
            Ok(node) => {
                let mut refs: Vec<&String> = node.references.keys().collect();
                refs.sort();
                f.debug_struct("EntityGraph")
                    .field("entity", &node.meta.name())
                    .field("values", &node.values)
                    .field("references", &refs)
                    .finish()
            }
            Err(_) => f.write_str("EntityGraph(<locked>)"),
        }
    }
}
