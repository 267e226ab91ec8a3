use super::Dialect;

/// SQLite: double-quoted identifiers, `@0` placeholders, no schemas.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_name(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// SQLite has no schemas; the schema becomes a table-name prefix.
    fn quote_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) => self.quote_name(&format!("{schema}_{table}")),
            None => self.quote_name(table),
        }
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("@{index}")
    }

    fn insert_returning_id(&self, insert_sql: &str, _quoted_pk: &str) -> String {
        format!("{insert_sql}; SELECT last_insert_rowid()")
    }
}
