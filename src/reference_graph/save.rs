//! Depth-first graph save.
//!
//! A node is visited at most once per call. That single rule is what ends
//! cycles: by the time a reference leads back to a visited node, that node
//! is already persisted and has its key, so only foreign keys are patched.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use super::entity_graph::EntityGraph;
use super::errors::GraphError;
use super::reference_plan::{plan_references, Include, ReferencePlan};
use super::{AsyncGraphLoader, GraphLoader};
use crate::dialect::Dialect;
use crate::entity_catalog::{EntityMetadata, ReferenceLink};
use crate::execution::{AsyncExecutor, Executor};
use crate::query_builder::statements::{self, CompiledSql};
use crate::value::Value;

/// First statement needed to persist one row.
enum Persist {
    /// Insert and read back the generated key
    InsertReturning(CompiledSql),
    /// Probe for the key, then UPDATE or INSERT
    Probe(CompiledSql),
}

fn persist_step(dialect: &dyn Dialect, node: &EntityGraph) -> Result<Persist, GraphError> {
    let meta = node.meta();
    let pk = meta.require_primary_key()?;
    let values = node.values();
    if meta.fields()[pk].is_auto_generated && values[pk].is_unassigned_key() {
        Ok(Persist::InsertReturning(statements::insert_returning_id(
            dialect, &meta, &values,
        )?))
    } else {
        Ok(Persist::Probe(statements::count_by_id(
            dialect,
            &meta,
            &values[pk],
        )?))
    }
}

fn write_statement(dialect: &dyn Dialect, node: &EntityGraph, exists: bool) -> Result<CompiledSql, GraphError> {
    let meta = node.meta();
    let values = node.values();
    if exists {
        Ok(statements::update_by_id(dialect, &meta, &values)?)
    } else {
        Ok(statements::insert(dialect, &meta, &values))
    }
}

fn store_generated_key(meta: &EntityMetadata, node: &EntityGraph, key: Option<Value>) -> Result<(), GraphError> {
    match key {
        Some(key) if !key.is_null() => {
            log::debug!("{} saved with generated key {}", meta.name(), key);
            node.set_key(key)?;
            Ok(())
        }
        _ => Err(GraphError::MissingGeneratedKey {
            entity: meta.name().to_string(),
        }),
    }
}

fn plans_for(node: &EntityGraph, with_references: bool) -> Result<Vec<ReferencePlan>, GraphError> {
    if with_references {
        plan_references(&node.meta(), &Include::All)
    } else {
        Ok(Vec::new())
    }
}

/// Copy keys of already-keyed children into the parent's FK columns so the
/// first write of the parent carries them.
fn link_keyed_children(node: &EntityGraph, plans: &[ReferencePlan]) {
    for plan in plans {
        if let ReferenceLink::ParentHoldsKey { parent_fk } = plan.link {
            if let Some(child) = node.one(&plan.reference.name) {
                let key = child.key();
                if !key.is_unassigned_key() {
                    node.set_value_at(parent_fk, key);
                }
            }
        }
    }
}

/// Point a parent-held FK at the saved child; true when the parent changed.
fn take_child_key(node: &EntityGraph, parent_fk: usize, child: &EntityGraph) -> bool {
    let key = child.key();
    if key.is_unassigned_key() || node.value_at(parent_fk) == key {
        return false;
    }
    node.set_value_at(parent_fk, key);
    true
}

impl<E: Executor> GraphLoader<E> {
    /// Save one entity, and with `with_references` everything reachable
    /// from it.
    pub fn save(&mut self, graph: &EntityGraph, with_references: bool) -> Result<(), GraphError> {
        let mut visited = HashSet::new();
        self.save_node(graph, with_references, &mut visited)
    }

    /// Save several roots; a node shared between them is written once.
    pub fn save_all(&mut self, graphs: &[EntityGraph], with_references: bool) -> Result<(), GraphError> {
        let mut visited = HashSet::new();
        for graph in graphs {
            self.save_node(graph, with_references, &mut visited)?;
        }
        Ok(())
    }

    fn save_node(
        &mut self,
        node: &EntityGraph,
        with_references: bool,
        visited: &mut HashSet<usize>,
    ) -> Result<(), GraphError> {
        if !visited.insert(node.node_id()) {
            return Ok(());
        }

        let plans = plans_for(node, with_references)?;
        link_keyed_children(node, &plans);
        self.persist(node)?;

        let mut dirty = false;
        for plan in &plans {
            match plan.link {
                ReferenceLink::ChildHoldsKey { child_fk } => {
                    let key = node.key();
                    for child in node.children(&plan.reference.name) {
                        if visited.contains(&child.node_id()) {
                            if child.value_at(child_fk) != key {
                                child.set_value_at(child_fk, key.clone());
                                self.update(&child)?;
                            }
                        } else {
                            child.set_value_at(child_fk, key.clone());
                            self.save_node(&child, with_references, visited)?;
                        }
                    }
                }
                ReferenceLink::ParentHoldsKey { parent_fk } => {
                    let Some(child) = node.one(&plan.reference.name) else {
                        continue;
                    };
                    if !visited.contains(&child.node_id()) {
                        self.save_node(&child, with_references, visited)?;
                    }
                    dirty |= take_child_key(node, parent_fk, &child);
                }
            }
        }

        if dirty {
            self.update(node)?;
        }
        Ok(())
    }

    fn persist(&mut self, node: &EntityGraph) -> Result<(), GraphError> {
        match persist_step(self.dialect.as_ref(), node)? {
            Persist::InsertReturning(statement) => {
                let key = self.executor.scalar(&statement.sql, &statement.values())?;
                store_generated_key(&node.meta(), node, key)
            }
            Persist::Probe(probe) => {
                let count = self.executor.scalar(&probe.sql, &probe.values())?;
                let exists = count.and_then(|c| c.as_i64()).unwrap_or(0) > 0;
                let statement = write_statement(self.dialect.as_ref(), node, exists)?;
                self.executor.execute(&statement.sql, &statement.values())?;
                Ok(())
            }
        }
    }

    fn update(&mut self, node: &EntityGraph) -> Result<(), GraphError> {
        let statement = write_statement(self.dialect.as_ref(), node, true)?;
        self.executor.execute(&statement.sql, &statement.values())?;
        Ok(())
    }
}

type SaveFuture<'a> = Pin<Box<dyn Future<Output = Result<(), GraphError>> + Send + 'a>>;

impl<E: AsyncExecutor> AsyncGraphLoader<E> {
    pub async fn save(&mut self, graph: &EntityGraph, with_references: bool) -> Result<(), GraphError> {
        let mut visited = HashSet::new();
        self.save_node(graph.clone(), with_references, &mut visited).await
    }

    pub async fn save_all(&mut self, graphs: &[EntityGraph], with_references: bool) -> Result<(), GraphError> {
        let mut visited = HashSet::new();
        for graph in graphs {
            self.save_node(graph.clone(), with_references, &mut visited)
                .await?;
        }
        Ok(())
    }

    fn save_node<'a>(
        &'a mut self,
        node: EntityGraph,
        with_references: bool,
        visited: &'a mut HashSet<usize>,
    ) -> SaveFuture<'a> {
        Box::pin(async move {
            if !visited.insert(node.node_id()) {
                return Ok(());
            }

            let plans = plans_for(&node, with_references)?;
            link_keyed_children(&node, &plans);
            self.persist(&node).await?;

            let mut dirty = false;
            for plan in &plans {
                match plan.link {
                    ReferenceLink::ChildHoldsKey { child_fk } => {
                        let key = node.key();
                        for child in node.children(&plan.reference.name) {
                            if visited.contains(&child.node_id()) {
                                if child.value_at(child_fk) != key {
                                    child.set_value_at(child_fk, key.clone());
                                    self.update(&child).await?;
                                }
                            } else {
                                child.set_value_at(child_fk, key.clone());
                                self.save_node(child, with_references, &mut *visited)
                                    .await?;
                            }
                        }
                    }
                    ReferenceLink::ParentHoldsKey { parent_fk } => {
                        let Some(child) = node.one(&plan.reference.name) else {
                            continue;
                        };
                        if !visited.contains(&child.node_id()) {
                            self.save_node(child.clone(), with_references, &mut *visited)
                                .await?;
                        }
                        dirty |= take_child_key(&node, parent_fk, &child);
                    }
                }
            }

            if dirty {
                self.update(&node).await?;
            }
            Ok(())
        })
    }

    async fn persist(&mut self, node: &EntityGraph) -> Result<(), GraphError> {
        match persist_step(self.dialect.as_ref(), node)? {
            Persist::InsertReturning(statement) => {
                let key = self
                    .executor
                    .scalar(&statement.sql, &statement.values())
                    .await?;
                store_generated_key(&node.meta(), node, key)
            }
            Persist::Probe(probe) => {
                let count = self.executor.scalar(&probe.sql, &probe.values()).await?;
                let exists = count.and_then(|c| c.as_i64()).unwrap_or(0) > 0;
                let statement = write_statement(self.dialect.as_ref(), node, exists)?;
                self.executor
                    .execute(&statement.sql, &statement.values())
                    .await?;
                Ok(())
            }
        }
    }

    async fn update(&mut self, node: &EntityGraph) -> Result<(), GraphError> {
        let statement = write_statement(self.dialect.as_ref(), node, true)?;
        self.executor
            .execute(&statement.sql, &statement.values())
            .await?;
        Ok(())
    }
}
