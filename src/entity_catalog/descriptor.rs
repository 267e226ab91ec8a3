//! Builder types entities use to describe themselves.
//!
//! ```ignore
//! impl Entity for Team {
//!     fn describe() -> EntityDescriptor {
//!         EntityDescriptor::new("Team")
//!             .field(FieldDef::new("Id", SqlType::Int).primary_key().auto_increment())
//!             .field(FieldDef::new("Name", SqlType::Text))
//!             .field(FieldDef::new("TeamLeaderId", SqlType::Int).nullable().references_as::<TeamUser>())
//!             .reference_many::<TeamUser>("Users")
//!     }
//! }
//! ```

use super::entity_schema::{
    Cardinality, EntityMetadata, EntityType, FieldDefinition, ForeignKey, ForeignKeyKind,
    ReferenceProperty,
};
use super::registry::entity_type;
use crate::value::SqlType;

/// A Rust type mapped to one table.
pub trait Entity: 'static {
    fn describe() -> EntityDescriptor;
}

/// Declaration of a single column.
#[derive(Debug, Clone)]
pub struct FieldDef {
    inner: FieldDefinition,
}

impl FieldDef {
    pub fn new(name: &str, sql_type: SqlType) -> Self {
        Self {
            inner: FieldDefinition {
                name: name.to_string(),
                alias: None,
                sql_type,
                is_primary_key: false,
                is_auto_generated: false,
                is_nullable: false,
                foreign_key: None,
            },
        }
    }

    /// Column name when it differs from the property name.
    pub fn alias(mut self, column: &str) -> Self {
        self.inner.alias = Some(column.to_string());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.inner.is_primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.inner.is_auto_generated = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.inner.is_nullable = true;
        self
    }

    pub fn references<T: Entity>(self) -> Self {
        self.foreign_key(entity_type::<T>(), ForeignKeyKind::Owning)
    }

    pub fn references_self<T: Entity>(self) -> Self {
        self.foreign_key(entity_type::<T>(), ForeignKeyKind::SelfRef)
    }

    pub fn references_as<T: Entity>(self) -> Self {
        self.foreign_key(entity_type::<T>(), ForeignKeyKind::Aliased)
    }

    fn foreign_key(mut self, target: EntityType, kind: ForeignKeyKind) -> Self {
        self.inner.foreign_key = Some(ForeignKey { target, kind });
        self
    }
}

/// Declaration of a navigation property.
#[derive(Debug, Clone)]
pub struct ReferenceDef {
    inner: ReferenceProperty,
}

impl ReferenceDef {
    pub fn one<T: Entity>(name: &str) -> Self {
        Self::new(name, entity_type::<T>(), Cardinality::One)
    }

    pub fn many<T: Entity>(name: &str) -> Self {
        Self::new(name, entity_type::<T>(), Cardinality::Many)
    }

    fn new(name: &str, target: EntityType, cardinality: Cardinality) -> Self {
        Self {
            inner: ReferenceProperty {
                name: name.to_string(),
                target,
                cardinality,
                via: None,
                self_id: None,
            },
        }
    }

    /// Child-side FK field holding the parent's key.
    pub fn via(mut self, field: &str) -> Self {
        self.inner.via = Some(field.to_string());
        self
    }

    /// Parent-side FK field holding the child's key.
    pub fn self_id(mut self, field: &str) -> Self {
        self.inner.self_id = Some(field.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    name: String,
    table: Option<String>,
    schema: Option<String>,
    default_alias: Option<String>,
    fields: Vec<FieldDefinition>,
    references: Vec<ReferenceProperty>,
    capabilities: Vec<String>,
}

impl EntityDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            table: None,
            schema: None,
            default_alias: None,
            fields: Vec::new(),
            references: Vec::new(),
            capabilities: Vec::new(),
        }
    }

    /// Physical table name when it differs from the model name.
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.to_string());
        self
    }

    /// Alias used for this entity in queries when none is requested.
    pub fn default_alias(mut self, alias: &str) -> Self {
        self.default_alias = Some(alias.to_string());
        self
    }

    /// Inherit every field, reference and capability of `B`.
    ///
    /// Base members come first; a field redeclared later with the same name
    /// replaces the inherited one.
    pub fn extends<B: Entity>(mut self) -> Self {
        let base = entity_type::<B>().metadata();
        let mut fields: Vec<FieldDefinition> = base
            .fields
            .iter()
            .filter(|b| !self.fields.iter().any(|f| f.name == b.name))
            .cloned()
            .collect();
        fields.append(&mut self.fields);
        self.fields = fields;

        let mut references: Vec<ReferenceProperty> = base
            .references
            .iter()
            .filter(|b| !self.references.iter().any(|r| r.name == b.name))
            .cloned()
            .collect();
        references.append(&mut self.references);
        self.references = references;

        for capability in &base.capabilities {
            if !self.capabilities.contains(capability) {
                self.capabilities.push(capability.clone());
            }
        }
        if self.schema.is_none() {
            self.schema = base.schema.clone();
        }
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        let field = field.inner;
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn reference(mut self, reference: ReferenceDef) -> Self {
        let reference = reference.inner;
        match self
            .references
            .iter_mut()
            .find(|r| r.name == reference.name)
        {
            Some(existing) => *existing = reference,
            None => self.references.push(reference),
        }
        self
    }

    pub fn reference_one<T: Entity>(self, name: &str) -> Self {
        self.reference(ReferenceDef::one::<T>(name))
    }

    pub fn reference_many<T: Entity>(self, name: &str) -> Self {
        self.reference(ReferenceDef::many::<T>(name))
    }

    /// Tag the entity with a capability such as `"SoftDelete"`.
    pub fn capability(mut self, capability: &str) -> Self {
        self.capabilities.push(capability.to_string());
        self
    }

    pub(crate) fn build(self, entity: EntityType) -> EntityMetadata {
        let mut fields = self.fields;

        let primary_key = fields
            .iter()
            .position(|f| f.is_primary_key)
            .or_else(|| fields.iter().position(|f| f.name.eq_ignore_ascii_case("id")))
            .or(if fields.is_empty() { None } else { Some(0) });

        if let Some(pk) = primary_key {
            // Only one primary key survives flattening
            for (i, field) in fields.iter_mut().enumerate() {
                field.is_primary_key = i == pk;
            }
        }

        EntityMetadata {
            entity,
            table: self.table.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            schema: self.schema,
            default_alias: self.default_alias,
            fields,
            primary_key,
            references: self.references,
            capabilities: self.capabilities,
        }
    }
}
