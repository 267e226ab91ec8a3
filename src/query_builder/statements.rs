//! Compiled statements and the row-level DML used when saving entities.

use crate::dialect::Dialect;
use crate::entity_catalog::{EntityCatalogError, EntityMetadata};
use crate::sql_generator::{merge, Fragment, ParameterSlot};
use crate::value::Value;

use super::projection::ResultShape;

/// Final SQL text plus its ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSql {
    pub sql: String,
    pub params: Vec<ParameterSlot>,
    pub shape: ResultShape,
}

impl CompiledSql {
    pub fn from_fragment(dialect: &dyn Dialect, fragment: &Fragment, shape: ResultShape) -> Self {
        let (sql, params) = merge(dialect, std::slice::from_ref(fragment));
        Self { sql, params, shape }
    }

    /// Parameter values in placeholder order.
    pub fn values(&self) -> Vec<Value> {
        self.params.iter().map(|p| p.value.clone()).collect()
    }
}

fn quoted_table(dialect: &dyn Dialect, meta: &EntityMetadata) -> String {
    dialect.quote_table(meta.schema(), meta.table())
}

/// `INSERT INTO t (..) VALUES (..)` for one row.
///
/// An auto-generated primary key is left out when `values` has no key yet.
pub fn insert(dialect: &dyn Dialect, meta: &EntityMetadata, values: &[Value]) -> CompiledSql {
    let skip = meta.primary_key_index().filter(|&pk| {
        meta.fields()[pk].is_auto_generated
            && values.get(pk).map_or(true, Value::is_unassigned_key)
    });

    let mut columns = Vec::new();
    let mut params = Vec::new();
    for (i, field) in meta.fields().iter().enumerate() {
        if Some(i) == skip {
            continue;
        }
        columns.push(dialect.quote_name(field.column_name()));
        params.push(Fragment::param(values.get(i).cloned().unwrap_or_default()));
    }

    let mut fragment = Fragment::sql(format!(
        "INSERT INTO {} ({}) VALUES (",
        quoted_table(dialect, meta),
        columns.join(",")
    ));
    fragment.append(Fragment::join(params, ","));
    fragment.push_sql(")");
    CompiledSql::from_fragment(dialect, &fragment, ResultShape::Map)
}

/// INSERT whose scalar result is the generated primary key.
pub fn insert_returning_id(
    dialect: &dyn Dialect,
    meta: &EntityMetadata,
    values: &[Value],
) -> Result<CompiledSql, EntityCatalogError> {
    let pk = meta.require_primary_key()?;
    let mut statement = insert(dialect, meta, values);
    let quoted_pk = dialect.quote_name(meta.fields()[pk].column_name());
    statement.sql = dialect.insert_returning_id(&statement.sql, &quoted_pk);
    Ok(statement)
}

/// `UPDATE t SET .. WHERE pk = ..`
pub fn update_by_id(
    dialect: &dyn Dialect,
    meta: &EntityMetadata,
    values: &[Value],
) -> Result<CompiledSql, EntityCatalogError> {
    let pk = meta.require_primary_key()?;

    let assignments = meta
        .fields()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != pk)
        .map(|(i, field)| {
            let mut f = Fragment::sql(format!("{}=", dialect.quote_name(field.column_name())));
            f.push_param(values.get(i).cloned().unwrap_or_default());
            f
        });

    let mut fragment = Fragment::sql(format!("UPDATE {} SET ", quoted_table(dialect, meta)));
    fragment.append(Fragment::join(assignments, ", "));
    fragment.push_sql(&format!(
        " WHERE {}=",
        dialect.quote_name(meta.fields()[pk].column_name())
    ));
    fragment.push_param(values.get(pk).cloned().unwrap_or_default());
    Ok(CompiledSql::from_fragment(dialect, &fragment, ResultShape::Map))
}

/// `SELECT COUNT(*) FROM t WHERE pk = ..`
pub fn count_by_id(
    dialect: &dyn Dialect,
    meta: &EntityMetadata,
    key: &Value,
) -> Result<CompiledSql, EntityCatalogError> {
    let pk = meta.require_primary_key()?;
    let mut fragment = Fragment::sql(format!(
        "SELECT COUNT(*) FROM {} WHERE {}=",
        quoted_table(dialect, meta),
        dialect.quote_name(meta.fields()[pk].column_name())
    ));
    fragment.push_param(key.clone());
    Ok(CompiledSql::from_fragment(dialect, &fragment, ResultShape::Map))
}
