//! Batched reference loading.
//!
//! For every reference property the loader collects the distinct non-null
//! keys of the parents, queries the child table with `key IN (..)` in
//! batches of at most `in_batch_size`, and stitches the children back onto
//! their parents in memory. Parents whose key is `NULL` are skipped
//! entirely: they contribute nothing to the query and their reference stays
//! unset.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::entity_graph::EntityGraph;
use super::errors::GraphError;
use super::reference_plan::{plan_references, Include, ReferencePlan};
use super::{AsyncGraphLoader, GraphLoader};
use crate::config::{self, OrmSettings};
use crate::dialect::DialectRef;
use crate::entity_catalog::{metadata, Cardinality, Entity, EntityMetadata, ReferenceLink};
use crate::execution::{AsyncExecutor, Executor, Row, RowMapper};
use crate::expression::Expr;
use crate::query_builder::{CompiledSql, Query, ResultShape};
use crate::value::Value;

/// `query` with the registered select filters applied, compiled.
fn root_statement(query: &Query) -> Result<CompiledSql, GraphError> {
    let meta = query.root_metadata();
    if query.shape() != ResultShape::Entity {
        return Err(GraphError::NotEntityProjection {
            entity: meta.name().to_string(),
        });
    }

    let mut filtered = query.clone();
    apply_select_filters(&meta, &mut filtered)?;
    Ok(filtered.to_select_statement())
}

fn apply_select_filters(meta: &EntityMetadata, query: &mut Query) -> Result<(), GraphError> {
    for filter in config::select_filters_for(meta) {
        filter(query)?;
    }
    Ok(())
}

fn by_id_query(meta: Arc<EntityMetadata>, dialect: DialectRef, id: Value) -> Result<Query, GraphError> {
    let pk = meta.require_primary_key()?;
    let column = Expr::column(meta.entity_type(), meta.fields()[pk].name.clone());
    let mut query = Query::from_metadata(meta, dialect);
    query.filter(column.eq(id))?;
    Ok(query)
}

fn materialize(meta: &Arc<EntityMetadata>, rows: &[Row]) -> Result<Vec<EntityGraph>, GraphError> {
    let mapper = RowMapper::new(Arc::clone(meta));
    Ok(mapper
        .map_rows(rows)?
        .into_iter()
        .map(|values| EntityGraph::from_values(Arc::clone(meta), values))
        .collect())
}

/// Key a parent is matched on for `plan`.
fn parent_key(parent: &EntityGraph, plan: &ReferencePlan) -> Value {
    match plan.link {
        ReferenceLink::ChildHoldsKey { .. } => parent.key(),
        ReferenceLink::ParentHoldsKey { parent_fk } => parent.value_at(parent_fk),
    }
}

/// Child field the parent keys are compared against.
fn child_key_field(plan: &ReferencePlan) -> Result<usize, GraphError> {
    match plan.link {
        ReferenceLink::ChildHoldsKey { child_fk } => Ok(child_fk),
        ReferenceLink::ParentHoldsKey { .. } => Ok(plan.child.require_primary_key()?),
    }
}

/// Supplemental queries for one reference, empty when no parent has a key.
fn reference_statements(
    dialect: &DialectRef,
    parents: &[EntityGraph],
    plan: &ReferencePlan,
    settings: &OrmSettings,
) -> Result<Vec<CompiledSql>, GraphError> {
    let mut seen = HashSet::new();
    let keys: Vec<Value> = parents
        .iter()
        .map(|parent| parent_key(parent, plan))
        .filter(|key| {
            key.match_key(settings.case_insensitive)
                .is_some_and(|k| seen.insert(k))
        })
        .collect();

    if keys.is_empty() {
        log::debug!(
            "Skipping reference {}: no parent has a key",
            plan.reference.name
        );
        return Ok(Vec::new());
    }

    let field = &plan.child.fields()[child_key_field(plan)?];
    let lower = settings.case_insensitive && field.sql_type.is_textual();

    let mut statements = Vec::new();
    for chunk in keys.chunks(settings.in_batch_size.max(1)) {
        log::debug!(
            "Loading reference {} ({}) for {} key(s)",
            plan.reference.name,
            plan.child.name(),
            chunk.len()
        );

        let column = Expr::column(plan.child.entity_type(), field.name.clone());
        let predicate = if lower {
            column
                .lower()
                .in_list(chunk.iter().map(Value::to_lowercase))
        } else {
            column.in_list(chunk.iter().cloned())
        };

        let mut query = Query::from_metadata(Arc::clone(&plan.child), Arc::clone(dialect));
        apply_select_filters(&plan.child, &mut query)?;
        query.filter(predicate)?;
        statements.push(query.to_select_statement());
    }
    Ok(statements)
}

/// Attach loaded children to their parents.
fn stitch(parents: &[EntityGraph], plan: &ReferencePlan, children: Vec<EntityGraph>, case_insensitive: bool) -> Result<(), GraphError> {
    let child_field = child_key_field(plan)?;

    let mut by_key: HashMap<String, Vec<EntityGraph>> = HashMap::new();
    for child in children {
        if let Some(key) = child.value_at(child_field).match_key(case_insensitive) {
            by_key.entry(key).or_default().push(child);
        }
    }

    let name = &plan.reference.name;
    for parent in parents {
        let Some(key) = parent_key(parent, plan).match_key(case_insensitive) else {
            continue;
        };
        let matched = by_key.get(&key).cloned().unwrap_or_default();
        match plan.reference.cardinality {
            Cardinality::Many => parent.set_many(name, matched)?,
            Cardinality::One => {
                if let Some(first) = matched.into_iter().next() {
                    parent.set_one(name, &first)?;
                }
            }
        }
    }
    Ok(())
}

fn plans_for(parents: &[EntityGraph], include: &Include) -> Result<Vec<ReferencePlan>, GraphError> {
    match parents.first() {
        Some(first) => plan_references(&first.meta(), include),
        None => Ok(Vec::new()),
    }
}

impl<E: Executor> GraphLoader<E> {
    /// Run `query` and load the selected references of every row.
    pub fn load_select(&mut self, query: &Query, include: &Include) -> Result<Vec<EntityGraph>, GraphError> {
        let statement = root_statement(query)?;
        let rows = self.executor.query(&statement.sql, &statement.values())?;
        let graphs = materialize(&query.root_metadata(), &rows)?;
        self.load_references(&graphs, include)?;
        Ok(graphs)
    }

    pub fn load_single_by_id<T: Entity>(
        &mut self,
        id: impl Into<Value>,
        include: &Include,
    ) -> Result<Option<EntityGraph>, GraphError> {
        let query = by_id_query(metadata::<T>(), Arc::clone(&self.dialect), id.into())?;
        Ok(self.load_select(&query, include)?.into_iter().next())
    }

    /// Fill reference properties of already loaded entities of one type.
    pub fn load_references(&mut self, parents: &[EntityGraph], include: &Include) -> Result<(), GraphError> {
        let settings = config::current();
        for plan in plans_for(parents, include)? {
            let mut children = Vec::new();
            for statement in reference_statements(&self.dialect, parents, &plan, &settings)? {
                let rows = self.executor.query(&statement.sql, &statement.values())?;
                children.extend(materialize(&plan.child, &rows)?);
            }
            stitch(parents, &plan, children, settings.case_insensitive)?;
        }
        Ok(())
    }
}

impl<E: AsyncExecutor> AsyncGraphLoader<E> {
    pub async fn load_select(&mut self, query: &Query, include: &Include) -> Result<Vec<EntityGraph>, GraphError> {
        let statement = root_statement(query)?;
        let rows = self
            .executor
            .query(&statement.sql, &statement.values())
            .await?;
        let graphs = materialize(&query.root_metadata(), &rows)?;
        self.load_references(&graphs, include).await?;
        Ok(graphs)
    }

    pub async fn load_single_by_id<T: Entity>(
        &mut self,
        id: impl Into<Value>,
        include: &Include,
    ) -> Result<Option<EntityGraph>, GraphError> {
        let query = by_id_query(metadata::<T>(), Arc::clone(&self.dialect), id.into())?;
        Ok(self.load_select(&query, include).await?.into_iter().next())
    }

    pub async fn load_references(&mut self, parents: &[EntityGraph], include: &Include) -> Result<(), GraphError> {
        let settings = config::current();
        for plan in plans_for(parents, include)? {
            let mut children = Vec::new();
            for statement in reference_statements(&self.dialect, parents, &plan, &settings)? {
                let rows = self
                    .executor
                    .query(&statement.sql, &statement.values())
                    .await?;
                children.extend(materialize(&plan.child, &rows)?);
            }
            stitch(parents, &plan, children, settings.case_insensitive)?;
        }
        Ok(())
    }
}
