//! Process-wide memo of entity metadata, one entry per Rust type.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use lazy_static::lazy_static;

use super::descriptor::Entity;
use super::entity_schema::{EntityMetadata, EntityType};

lazy_static! {
    static ref ENTITY_REGISTRY: RwLock<HashMap<TypeId, Arc<EntityMetadata>>> =
        RwLock::new(HashMap::new());
}

/// Metadata for `T`, described on first access and cached for the process.
///
/// Concurrent first calls may each run `T::describe()`, but only the first
/// insert is kept and every caller gets that same `Arc` back.
pub fn metadata<T: Entity>() -> Arc<EntityMetadata> {
    let key = TypeId::of::<T>();
    if let Some(meta) = ENTITY_REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Arc::clone(meta);
    }

    // Built outside the lock: describe() resolves base types through this
    // same registry.
    let built = Arc::new(T::describe().build(entity_type::<T>()));
    log::debug!("Registered entity metadata for {}", built.name());

    let mut registry = ENTITY_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(registry.entry(key).or_insert(built))
}

/// Lightweight identity of `T` that can resolve its metadata later.
pub fn entity_type<T: Entity>() -> EntityType {
    EntityType::new(TypeId::of::<T>(), short_type_name::<T>(), metadata::<T>)
}

/// Whether metadata for `T` has been built already.
pub fn is_registered<T: Entity>() -> bool {
    ENTITY_REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(&TypeId::of::<T>())
}

fn short_type_name<T: 'static>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
