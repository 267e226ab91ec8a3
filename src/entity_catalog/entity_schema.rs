//! Resolved, immutable metadata for one entity type.
//!
//! An [`EntityMetadata`] is produced once per Rust type by the registry and
//! shared behind an `Arc` for the rest of the process. Field lists are already
//! flattened (base-type fields first) so nothing downstream has to walk an
//! inheritance chain.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use super::errors::EntityCatalogError;
use crate::value::SqlType;

/// Identity of an entity type plus a lazy handle to its metadata.
///
/// References between entities store this instead of the target's metadata so
/// two types that point at each other never recurse while being described.
#[derive(Clone, Copy)]
pub struct EntityType {
    type_id: TypeId,
    name: &'static str,
    resolve: fn() -> Arc<EntityMetadata>,
}

impl EntityType {
    pub(crate) fn new(
        type_id: TypeId,
        name: &'static str,
        resolve: fn() -> Arc<EntityMetadata>,
    ) -> Self {
        Self {
            type_id,
            name,
            resolve,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Short Rust type name (without module path).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Metadata of this entity, built on first access.
    pub fn metadata(&self) -> Arc<EntityMetadata> {
        (self.resolve)()
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for EntityType {}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityType({})", self.name)
    }
}

/// How a foreign-key field relates to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyKind {
    /// The row belongs to the target (child holds the parent's key).
    Owning,
    /// The row points at a child it owns ("primary child" pattern).
    SelfRef,
    /// FK under a name that does not follow the `{Target}Id` convention.
    Aliased,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub target: EntityType,
    pub kind: ForeignKeyKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    /// Property name used in the DSL.
    pub name: String,
    /// Column name when it differs from the property name.
    pub alias: Option<String>,
    pub sql_type: SqlType,
    pub is_primary_key: bool,
    pub is_auto_generated: bool,
    pub is_nullable: bool,
    pub foreign_key: Option<ForeignKey>,
}

impl FieldDefinition {
    /// Column name in the table.
    pub fn column_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn references_type(&self, target: &EntityType) -> bool {
        self.foreign_key
            .as_ref()
            .is_some_and(|fk| fk.target == *target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// A navigation property: a single related entity or a collection of them.
///
/// These are not columns; the loader fills them from supplemental queries.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceProperty {
    pub name: String,
    pub target: EntityType,
    pub cardinality: Cardinality,
    /// Explicit child-side FK field.
    pub via: Option<String>,
    /// Explicit parent-side FK field (parent points at the child).
    pub self_id: Option<String>,
}

/// Which side of a reference holds the foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceLink {
    /// `child.fields[child_fk]` holds the parent's primary key.
    ChildHoldsKey { child_fk: usize },
    /// `parent.fields[parent_fk]` holds the child's primary key.
    ParentHoldsKey { parent_fk: usize },
}

#[derive(Debug, Clone)]
pub struct EntityMetadata {
    pub(crate) entity: EntityType,
    pub(crate) name: String,
    pub(crate) table: String,
    pub(crate) schema: Option<String>,
    pub(crate) default_alias: Option<String>,
    pub(crate) fields: Vec<FieldDefinition>,
    pub(crate) primary_key: Option<usize>,
    pub(crate) references: Vec<ReferenceProperty>,
    pub(crate) capabilities: Vec<String>,
}

impl EntityMetadata {
    pub fn entity_type(&self) -> EntityType {
        self.entity
    }

    /// Model name, e.g. `"TeamUser"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn default_alias(&self) -> Option<&str> {
        self.default_alias.as_deref()
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn references(&self) -> &[ReferenceProperty] {
        &self.references
    }

    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.eq_ignore_ascii_case(capability))
    }

    /// Find a field by property name, then column name, then ignoring case.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .or_else(|| self.fields.iter().position(|f| f.column_name() == name))
            .or_else(|| {
                self.fields.iter().position(|f| {
                    f.name.eq_ignore_ascii_case(name) || f.column_name().eq_ignore_ascii_case(name)
                })
            })
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.field_index(name).map(|i| &self.fields[i])
    }

    pub fn require_field(&self, name: &str) -> Result<usize, EntityCatalogError> {
        self.field_index(name)
            .ok_or_else(|| EntityCatalogError::UnknownField {
                entity: self.name.clone(),
                field: name.to_string(),
            })
    }

    pub fn primary_key_index(&self) -> Option<usize> {
        self.primary_key
    }

    pub fn primary_key(&self) -> Option<&FieldDefinition> {
        self.primary_key.map(|i| &self.fields[i])
    }

    pub fn require_primary_key(&self) -> Result<usize, EntityCatalogError> {
        self.primary_key
            .ok_or_else(|| EntityCatalogError::MissingPrimaryKey(self.name.clone()))
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceProperty> {
        self.references
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Work out which side of `reference` holds the foreign key.
    ///
    /// Collections are always child-held. A single reference is parent-held
    /// when an explicit `self_id` is declared or the parent has a field
    /// pointing at the target (explicit FK first, then the `{Target}Id`
    /// naming convention); otherwise the child holds the parent's key.
    pub fn resolve_reference(
        &self,
        reference: &ReferenceProperty,
        child: &EntityMetadata,
    ) -> Result<ReferenceLink, EntityCatalogError> {
        if let Some(via) = &reference.via {
            let child_fk = child.require_field(via)?;
            return Ok(ReferenceLink::ChildHoldsKey { child_fk });
        }

        if reference.cardinality == Cardinality::One {
            if let Some(self_id) = &reference.self_id {
                let parent_fk = self.require_field(self_id)?;
                return Ok(ReferenceLink::ParentHoldsKey { parent_fk });
            }
            if let Some(parent_fk) = self.self_reference_field(reference, child) {
                return Ok(ReferenceLink::ParentHoldsKey { parent_fk });
            }
        }

        self.child_reference_field(child)
            .map(|child_fk| ReferenceLink::ChildHoldsKey { child_fk })
            .ok_or_else(|| EntityCatalogError::ReferenceKeyNotFound {
                parent: self.name.clone(),
                reference: reference.name.clone(),
                child: child.name.clone(),
            })
    }

    fn self_reference_field(
        &self,
        reference: &ReferenceProperty,
        child: &EntityMetadata,
    ) -> Option<usize> {
        let target = child.entity_type();
        let by_property = format!("{}Id", reference.name);
        let fk_fields: Vec<usize> = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.references_type(&target))
            .map(|(i, _)| i)
            .collect();

        // A self-referencing entity (Employee -> Employee) only uses its own
        // FK for the parent-held direction when the naming says so.
        let same_type = target == self.entity;

        fk_fields
            .iter()
            .copied()
            .find(|&i| {
                matches!(
                    self.fields[i].foreign_key.as_ref().map(|fk| fk.kind),
                    Some(ForeignKeyKind::SelfRef)
                )
            })
            .or_else(|| {
                fk_fields
                    .iter()
                    .copied()
                    .find(|&i| self.fields[i].name.eq_ignore_ascii_case(&by_property))
            })
            .or_else(|| {
                if same_type {
                    None
                } else {
                    fk_fields.first().copied()
                }
            })
            .or_else(|| {
                if same_type {
                    return None;
                }
                let by_convention = format!("{}Id", child.name);
                self.fields
                    .iter()
                    .position(|f| f.name.eq_ignore_ascii_case(&by_convention))
            })
    }

    fn child_reference_field(&self, child: &EntityMetadata) -> Option<usize> {
        let parent = self.entity;
        let explicit: Vec<usize> = child
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.references_type(&parent))
            .map(|(i, _)| i)
            .collect();

        explicit
            .iter()
            .copied()
            .find(|&i| {
                matches!(
                    child.fields[i].foreign_key.as_ref().map(|fk| fk.kind),
                    Some(ForeignKeyKind::Owning)
                )
            })
            .or_else(|| explicit.first().copied())
            .or_else(|| {
                let by_convention = format!("{}Id", self.name);
                child
                    .fields
                    .iter()
                    .position(|f| f.name.eq_ignore_ascii_case(&by_convention))
            })
    }
}
