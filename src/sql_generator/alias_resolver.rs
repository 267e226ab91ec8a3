/// Alias tracking for the tables of one query
///
/// Every source of a query (the root table and each join) gets an
/// [`AliasBinding`]. Column references are qualified through the binding,
/// so a table joined twice under two aliases yields two independent column
/// sets. Default aliases that would collide are rejected; the resolver never
/// invents a disambiguating name on its own.
use std::sync::Arc;

use crate::dialect::Dialect;
use crate::entity_catalog::{EntityMetadata, EntityType};

use super::errors::AliasError;

#[derive(Debug, Clone)]
pub struct AliasBinding {
    pub entity: EntityType,
    pub meta: Arc<EntityMetadata>,
    /// Name this binding is known by (alias, or table when no alias)
    pub token: String,
    /// Alias emitted after the table name, if any
    pub alias: Option<String>,
    /// Whether the caller asked for the alias
    pub explicit: bool,
    /// Quoted prefix for column references
    pub qualifier: String,
    /// Quoted `table alias` for FROM / JOIN
    pub table_reference: String,
}

impl AliasBinding {
    /// `qualifier.column` for a column name.
    pub fn qualify(&self, dialect: &dyn Dialect, column: &str) -> String {
        format!("{}.{}", self.qualifier, dialect.quote_name(column))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    bindings: Vec<AliasBinding>,
}

impl AliasResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver holding only the root source of a query.
    pub fn with_root(meta: Arc<EntityMetadata>, requested: Option<&str>, dialect: &dyn Dialect) -> Self {
        Self {
            bindings: vec![make_binding(meta, requested, dialect)],
        }
    }

    /// Bind a source table under `requested`, or its default alias.
    pub fn bind(
        &mut self,
        meta: Arc<EntityMetadata>,
        requested: Option<&str>,
        dialect: &dyn Dialect,
    ) -> Result<&AliasBinding, AliasError> {
        let binding = make_binding(meta, requested, dialect);
        if self
            .bindings
            .iter()
            .any(|b| b.token.eq_ignore_ascii_case(&binding.token))
        {
            return Err(AliasError::Collision {
                alias: binding.token,
                entity: binding.meta.name().to_string(),
            });
        }

        log::trace!("Bound {} as '{}'", binding.meta.name(), binding.token);
        self.bindings.push(binding);
        Ok(&self.bindings[self.bindings.len() - 1])
    }

    /// Drop the most recent binding (used when a join fails to compile).
    pub(crate) fn unbind_last(&mut self) {
        self.bindings.pop();
    }

    /// Binding for an unqualified column of `entity`.
    ///
    /// A single binding is used directly. With several, the one bound
    /// without an explicit alias wins; otherwise the column is ambiguous.
    pub fn for_entity(&self, entity: &EntityType) -> Result<&AliasBinding, AliasError> {
        let mut matching = self.bindings.iter().filter(|b| b.entity == *entity);
        let first = matching
            .next()
            .ok_or_else(|| AliasError::Unbound(entity.name().to_string()))?;
        let rest: Vec<&AliasBinding> = matching.collect();
        if rest.is_empty() {
            return Ok(first);
        }

        let mut implicit = std::iter::once(first)
            .chain(rest)
            .filter(|b| !b.explicit);
        match (implicit.next(), implicit.next()) {
            (Some(binding), None) => Ok(binding),
            _ => Err(AliasError::Ambiguous(entity.name().to_string())),
        }
    }

    pub fn by_alias(&self, alias: &str) -> Result<&AliasBinding, AliasError> {
        self.bindings
            .iter()
            .find(|b| b.token.eq_ignore_ascii_case(alias))
            .ok_or_else(|| AliasError::UnknownAlias(alias.to_string()))
    }

    pub fn root(&self) -> Option<&AliasBinding> {
        self.bindings.first()
    }

    pub fn bindings(&self) -> &[AliasBinding] {
        &self.bindings
    }
}

fn make_binding(meta: Arc<EntityMetadata>, requested: Option<&str>, dialect: &dyn Dialect) -> AliasBinding {
    let alias = requested
        .map(str::to_string)
        .or_else(|| meta.default_alias().map(str::to_string));
    let token = alias.clone().unwrap_or_else(|| meta.table().to_string());

    let quoted_table = dialect.quote_table(meta.schema(), meta.table());
    let qualifier = match &alias {
        Some(alias) => dialect.quote_name(alias),
        None => quoted_table.clone(),
    };
    let table_reference = dialect.table_reference(&quoted_table, alias.as_deref());

    AliasBinding {
        entity: meta.entity_type(),
        meta,
        token,
        alias,
        explicit: requested.is_some(),
        qualifier,
        table_reference,
    }
}
