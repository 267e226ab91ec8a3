/// Parameter merging
///
/// Flattens fragments into one SQL string, giving every literal the next
/// placeholder of the dialect. Literals of embedded sub-queries are numbered
/// where they appear in the text, so they continue the outer sequence rather
/// than restarting at zero.
use crate::dialect::Dialect;
use crate::value::Value;

use super::fragment::{Fragment, Part};

/// Where a literal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamOrigin {
    Outer,
    MergedSubQuery,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSlot {
    /// 0-based position in the final parameter list
    pub index: usize,
    pub value: Value,
    pub origin: ParamOrigin,
}

pub struct ParameterStore<'d> {
    dialect: &'d dyn Dialect,
    sql: String,
    slots: Vec<ParameterSlot>,
}

impl<'d> ParameterStore<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            slots: Vec::new(),
        }
    }

    /// Append a fragment, numbering its literals after those already merged.
    pub fn push(&mut self, fragment: &Fragment) {
        self.push_at_depth(fragment, 0);
    }

    fn push_at_depth(&mut self, fragment: &Fragment, depth: usize) {
        for part in fragment.parts() {
            match part {
                Part::Sql(text) => self.sql.push_str(text),
                Part::Param(value) => {
                    let index = self.slots.len();
                    self.sql.push_str(&self.dialect.param_placeholder(index));
                    self.slots.push(ParameterSlot {
                        index,
                        value: value.clone(),
                        origin: if depth == 0 {
                            ParamOrigin::Outer
                        } else {
                            ParamOrigin::MergedSubQuery
                        },
                    });
                }
                Part::SubQuery(inner) => self.push_at_depth(inner, depth + 1),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn finish(self) -> (String, Vec<ParameterSlot>) {
        (self.sql, self.slots)
    }
}

/// Merge fragments in order into one statement.
pub fn merge(dialect: &dyn Dialect, fragments: &[Fragment]) -> (String, Vec<ParameterSlot>) {
    let mut store = ParameterStore::new(dialect);
    for fragment in fragments {
        store.push(fragment);
    }
    store.finish()
}

/// Render a fragment with every literal inlined through the dialect.
///
/// Only meant for logging and diagnostics; executed statements always use
/// placeholders.
pub fn inline_literals(dialect: &dyn Dialect, fragment: &Fragment) -> String {
    let mut sql = String::new();
    inline_into(dialect, fragment, &mut sql);
    sql
}

fn inline_into(dialect: &dyn Dialect, fragment: &Fragment, sql: &mut String) {
    for part in fragment.parts() {
        match part {
            Part::Sql(text) => sql.push_str(text),
            Part::Param(value) => sql.push_str(&dialect.format_literal(value)),
            Part::SubQuery(inner) => inline_into(dialect, inner, sql),
        }
    }
}
