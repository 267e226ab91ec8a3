//! SQL dialect providers.
//!
//! Everything that differs between database engines goes through the
//! [`Dialect`] trait: identifier quoting, placeholders, literal rendering,
//! function names and paging. The rest of the crate never hard-codes any of
//! these.

pub mod function_registry;
mod mysql;
mod oracle;
mod postgres;
mod sqlite;
mod sqlserver;

use std::fmt;
use std::sync::Arc;

pub use function_registry::{get_function_mapping, FunctionMapping};
pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

use crate::sql_generator::fragment::Fragment;
use crate::value::{SqlType, Value};

/// Escape character used for LIKE patterns.
pub const LIKE_ESCAPE_CHAR: char = '^';

/// Database-specific SQL syntax.
///
/// Implementations are stateless strategies shared behind an `Arc`.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Dialect identifier (e.g., "sqlite", "postgresql").
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column or alias).
    fn quote_name(&self, name: &str) -> String;

    /// Quote a possibly schema-qualified table name.
    fn quote_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) => format!("{}.{}", self.quote_name(schema), self.quote_name(table)),
            None => self.quote_name(table),
        }
    }

    /// Placeholder for the 0-based parameter `index`.
    fn param_placeholder(&self, index: usize) -> String;

    /// Render a value as an inline SQL literal.
    fn format_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => self.bool_literal(*b).to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => quote_string(s),
            Value::Bytes(b) => self.format_bytes(b),
            Value::Date(d) => quote_string(&d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => quote_string(&dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            Value::Uuid(u) => quote_string(&u.to_string()),
        }
    }

    fn format_bytes(&self, bytes: &[u8]) -> String {
        format!("X'{}'", hex::encode(bytes))
    }

    /// A predicate that is always true.
    fn true_literal(&self) -> &'static str {
        "(1=1)"
    }

    /// A predicate that is always false.
    fn false_literal(&self) -> &'static str {
        "(1=0)"
    }

    /// Boolean value as stored in a column.
    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn coalesce(&self, args: Vec<Fragment>) -> Fragment {
        Fragment::call("COALESCE", args)
    }

    fn modulo(&self, left: Fragment, right: Fragment) -> Fragment {
        Fragment::infix(left, "%", right)
    }

    fn count_distinct(&self, expr: Fragment) -> Fragment {
        Fragment::call("COUNT", vec![expr.wrap("DISTINCT ", "")])
    }

    fn concat(&self, args: Vec<Fragment>) -> Fragment {
        Fragment::join(args, " || ").parenthesized()
    }

    fn lower(&self, expr: Fragment) -> Fragment {
        Fragment::call("LOWER", vec![expr])
    }

    fn upper(&self, expr: Fragment) -> Fragment {
        Fragment::call("UPPER", vec![expr])
    }

    fn sql_type_name(&self, sql_type: SqlType) -> &'static str {
        match sql_type {
            SqlType::Bool => "BOOLEAN",
            SqlType::Int => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Float => "DOUBLE PRECISION",
            SqlType::Text => "VARCHAR(8000)",
            SqlType::Bytes => "BLOB",
            SqlType::Date => "DATE",
            SqlType::DateTime => "TIMESTAMP",
            SqlType::Uuid => "CHAR(36)",
        }
    }

    fn cast(&self, expr: Fragment, sql_type: SqlType) -> Fragment {
        expr.wrap("CAST(", &format!(" AS {})", self.sql_type_name(sql_type)))
    }

    /// Escape LIKE wildcards in a user-supplied value.
    fn escape_wildcards(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        for c in value.chars() {
            if c == LIKE_ESCAPE_CHAR || c == '%' || c == '_' {
                out.push(LIKE_ESCAPE_CHAR);
            }
            out.push(c);
        }
        out
    }

    /// Clause appended after a LIKE pattern produced by `escape_wildcards`.
    fn like_escape_clause(&self) -> String {
        format!(" ESCAPE '{LIKE_ESCAPE_CHAR}'")
    }

    fn map_function(&self, name: &str) -> Option<FunctionMapping> {
        get_function_mapping(self.name(), name)
    }

    /// Paging clause placed after ORDER BY, if any paging was requested.
    fn limit_clause(&self, offset: Option<u64>, rows: Option<u64>, _has_order_by: bool) -> Option<String> {
        match (offset, rows) {
            (None, None) => None,
            (None, Some(rows)) => Some(format!("LIMIT {rows}")),
            (Some(offset), Some(rows)) => Some(format!("LIMIT {rows} OFFSET {offset}")),
            (Some(offset), None) => Some(format!("LIMIT -1 OFFSET {offset}")),
        }
    }

    /// `table alias` as written in FROM and JOIN clauses.
    fn table_reference(&self, quoted_table: &str, alias: Option<&str>) -> String {
        match alias {
            Some(alias) => format!("{} {}", quoted_table, self.quote_name(alias)),
            None => quoted_table.to_string(),
        }
    }

    /// Turn an INSERT into a statement whose scalar result is the generated key.
    fn insert_returning_id(&self, insert_sql: &str, quoted_pk: &str) -> String;
}

/// Shared handle to a dialect.
pub type DialectRef = Arc<dyn Dialect>;

/// Single-quote a string literal, doubling embedded quotes.
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Look up a dialect by name, as used in configuration files.
pub fn dialect_by_name(name: &str) -> Option<DialectRef> {
    match name.to_lowercase().as_str() {
        "sqlite" => Some(Arc::new(SqliteDialect)),
        "postgres" | "postgresql" | "pg" => Some(Arc::new(PostgresDialect)),
        "sqlserver" | "mssql" => Some(Arc::new(SqlServerDialect)),
        "mysql" | "mariadb" => Some(Arc::new(MySqlDialect)),
        "oracle" => Some(Arc::new(OracleDialect)),
        _ => None,
    }
}
