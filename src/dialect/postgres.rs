use super::Dialect;
use crate::value::SqlType;

/// PostgreSQL: double-quoted identifiers, 1-based `$n` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn quote_name(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn format_bytes(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'::bytea", hex::encode(bytes))
    }

    fn true_literal(&self) -> &'static str {
        "true"
    }

    fn false_literal(&self) -> &'static str {
        "false"
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "true"
        } else {
            "false"
        }
    }

    fn sql_type_name(&self, sql_type: SqlType) -> &'static str {
        match sql_type {
            SqlType::Text => "TEXT",
            SqlType::Bytes => "BYTEA",
            SqlType::Uuid => "UUID",
            SqlType::Bool => "BOOLEAN",
            SqlType::Int => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Float => "DOUBLE PRECISION",
            SqlType::Date => "DATE",
            SqlType::DateTime => "TIMESTAMP",
        }
    }

    fn limit_clause(&self, offset: Option<u64>, rows: Option<u64>, _has_order_by: bool) -> Option<String> {
        match (offset, rows) {
            (None, None) => None,
            (None, Some(rows)) => Some(format!("LIMIT {rows}")),
            (Some(offset), Some(rows)) => Some(format!("LIMIT {rows} OFFSET {offset}")),
            (Some(offset), None) => Some(format!("OFFSET {offset}")),
        }
    }

    fn insert_returning_id(&self, insert_sql: &str, quoted_pk: &str) -> String {
        format!("{insert_sql} RETURNING {quoted_pk}")
    }
}
