//! Entity metadata: field lists, keys, references and table naming.
//!
//! Entities describe themselves once through [`Entity::describe`]; the
//! [`registry`] turns that description into a flattened [`EntityMetadata`]
//! and memoizes it per type.

pub mod descriptor;
pub mod entity_schema;
pub mod errors;
pub mod registry;

pub use descriptor::{Entity, EntityDescriptor, FieldDef, ReferenceDef};
pub use entity_schema::{
    Cardinality, EntityMetadata, EntityType, FieldDefinition, ForeignKey, ForeignKeyKind,
    ReferenceLink, ReferenceProperty,
};
pub use errors::EntityCatalogError;
pub use registry::{entity_type, metadata};
