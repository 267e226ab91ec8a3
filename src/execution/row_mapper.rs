//! Maps result columns onto entity fields.
//!
//! Matching runs in passes so that a guess can never steal a column that
//! some field matches exactly:
//!
//! 1. exact column name (case-insensitive)
//! 2. the field's property name, for fields stored under a column alias
//! 3. lenient mode only: a normalised name guess over the columns nobody
//!    claimed yet, accepting prefixed columns such as `t130_CustomerId`
//!
//! In strict mode any field left over after pass 2 is an error.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use super::errors::ColumnMappingError;
use super::Row;
use crate::config;
use crate::entity_catalog::EntityMetadata;
use crate::value::Value;

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new(r"[^0-9a-zA-Z]").expect("valid regex");
}

fn normalize(name: &str) -> String {
    NON_ALNUM.replace_all(name, "").to_lowercase()
}

#[derive(Debug, Clone)]
pub struct RowMapper {
    meta: Arc<EntityMetadata>,
    strict: bool,
}

impl RowMapper {
    /// Mapper using the process-wide strictness setting.
    pub fn new(meta: Arc<EntityMetadata>) -> Self {
        Self {
            meta,
            strict: config::current().strict_column_mapping,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Column index for each field, in field order.
    pub fn plan(&self, columns: &[String]) -> Result<Vec<Option<usize>>, ColumnMappingError> {
        let fields = self.meta.fields();
        let mut plan: Vec<Option<usize>> = vec![None; fields.len()];
        let mut taken = vec![false; columns.len()];

        let mut claim = |plan: &mut Vec<Option<usize>>, field: usize, column: usize| {
            plan[field] = Some(column);
            taken[column] = true;
        };

        for (i, field) in fields.iter().enumerate() {
            if let Some(c) = columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(field.column_name()))
            {
                claim(&mut plan, i, c);
            }
        }

        for (i, field) in fields.iter().enumerate() {
            if plan[i].is_some() || field.alias.is_none() {
                continue;
            }
            if let Some(c) = columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(&field.name))
            {
                claim(&mut plan, i, c);
            }
        }

        let unmapped: Vec<usize> = (0..fields.len()).filter(|&i| plan[i].is_none()).collect();
        if unmapped.is_empty() {
            return Ok(plan);
        }

        if self.strict {
            return Err(ColumnMappingError::ColumnMappingMismatch {
                entity: self.meta.name().to_string(),
                fields: unmapped.iter().map(|&i| fields[i].name.clone()).collect(),
            });
        }

        let normalized: Vec<String> = columns.iter().map(|c| normalize(c)).collect();
        for i in unmapped {
            let field = &fields[i];
            let wanted = [normalize(&field.name), normalize(field.column_name())];

            let free = &taken;
            let candidates = || (0..columns.len()).filter(move |&c| !free[c]);
            let guess = candidates()
                .find(|&c| wanted.iter().any(|w| !w.is_empty() && normalized[c] == *w))
                .or_else(|| {
                    candidates().find(|&c| {
                        wanted
                            .iter()
                            .any(|w| !w.is_empty() && normalized[c].ends_with(w.as_str()))
                    })
                });

            match guess {
                Some(c) => {
                    log::warn!(
                        "Mapping column '{}' to {}.{} by name guess",
                        columns[c],
                        self.meta.name(),
                        field.name
                    );
                    plan[i] = Some(c);
                    taken[c] = true;
                }
                None => log::warn!(
                    "No column for {}.{}; leaving it NULL",
                    self.meta.name(),
                    field.name
                ),
            }
        }
        Ok(plan)
    }

    /// Field values for one row.
    pub fn map_row(&self, row: &Row) -> Result<Vec<Value>, ColumnMappingError> {
        let plan = self.plan(row.columns())?;
        Ok(apply_plan(&plan, row))
    }

    /// Field values for every row; the column plan is worked out once.
    pub fn map_rows(&self, rows: &[Row]) -> Result<Vec<Vec<Value>>, ColumnMappingError> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let plan = self.plan(first.columns())?;
        Ok(rows.iter().map(|row| apply_plan(&plan, row)).collect())
    }
}

fn apply_plan(plan: &[Option<usize>], row: &Row) -> Vec<Value> {
    plan.iter()
        .map(|column| {
            column
                .and_then(|c| row.get_index(c))
                .cloned()
                .unwrap_or_default()
        })
        .collect()
}
